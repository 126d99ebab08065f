use std::sync::OnceLock;

use mathvar_core::{PageSegMode, RecognitionProfile};

/// Digits, Latin letters, brackets, operators and the math symbols that show
/// up in school problems.
pub const LATIN_MATH_WHITELIST: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz()[]{}+-×÷=.,?!:;/$%^&*<>≤≥±∞π√∑∫αβγδθλμσφχψω";

/// [`LATIN_MATH_WHITELIST`] plus every precomposed Hangul syllable (가..힣).
pub fn korean_math_whitelist() -> &'static str {
    static W: OnceLock<String> = OnceLock::new();
    W.get_or_init(|| {
        let mut chars: String = LATIN_MATH_WHITELIST.to_string();
        chars.extend('가'..='힣');
        chars
    })
}

/// The recognition catalog, in the order it is tried: bilingual block,
/// bilingual word, Latin block, Korean full-auto, bilingual engine defaults.
pub fn default_catalog() -> Vec<RecognitionProfile> {
    vec![
        RecognitionProfile::new("math+kor+eng (PSM_6)", "kor+eng")
            .with_page_segmentation(PageSegMode::SingleBlock)
            .with_whitelist(korean_math_whitelist()),
        RecognitionProfile::new("math+kor+eng (PSM_8)", "kor+eng")
            .with_page_segmentation(PageSegMode::SingleWord)
            .with_whitelist(korean_math_whitelist()),
        RecognitionProfile::new("math+eng (PSM_6)", "eng")
            .with_page_segmentation(PageSegMode::SingleBlock)
            .with_whitelist(LATIN_MATH_WHITELIST),
        RecognitionProfile::new("kor (PSM_3)", "kor")
            .with_page_segmentation(PageSegMode::FullyAutomatic),
        RecognitionProfile::new("defaults", "kor+eng"),
    ]
}
