use serde::{Deserialize, Serialize};

/// Tesseract page-segmentation modes used by the recognition catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// PSM 3: fully automatic page segmentation, no OSD.
    FullyAutomatic,
    /// PSM 6: a single uniform block of text.
    SingleBlock,
    /// PSM 7: a single text line.
    SingleLine,
    /// PSM 8: a single word.
    SingleWord,
}

impl PageSegMode {
    /// Value for the `tessedit_pageseg_mode` engine variable.
    pub fn as_tesseract(self) -> &'static str {
        match self {
            PageSegMode::FullyAutomatic => "3",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SingleWord => "8",
        }
    }
}

impl std::fmt::Display for PageSegMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PSM_{}", self.as_tesseract())
    }
}

/// One recognition configuration: which languages, how to segment, which
/// characters the engine may emit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecognitionProfile {
    pub name: String,
    /// Tesseract language set, e.g. `kor+eng`.
    pub language: String,
    /// `None` leaves the engine default in place.
    #[serde(default)]
    pub page_segmentation: Option<PageSegMode>,
    #[serde(default)]
    pub char_whitelist: Option<String>,
    #[serde(default = "default_true")]
    pub preserve_interword_spaces: bool,
}

fn default_true() -> bool {
    true
}

impl RecognitionProfile {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            page_segmentation: None,
            char_whitelist: None,
            preserve_interword_spaces: true,
        }
    }

    pub fn with_page_segmentation(mut self, mode: PageSegMode) -> Self {
        self.page_segmentation = Some(mode);
        self
    }

    pub fn with_whitelist(mut self, chars: impl Into<String>) -> Self {
        self.char_whitelist = Some(chars.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn psm_values() {
        assert_eq!(PageSegMode::SingleBlock.as_tesseract(), "6");
        assert_eq!(PageSegMode::SingleWord.as_tesseract(), "8");
        assert_eq!(PageSegMode::FullyAutomatic.to_string(), "PSM_3");
    }

    #[test]
    fn profile_from_toml_defaults() {
        let p: RecognitionProfile = toml::from_str(
            r#"
            name = "plain"
            language = "eng"
            page_segmentation = "single_line"
            "#,
        )
        .unwrap();
        assert_eq!(p.page_segmentation, Some(PageSegMode::SingleLine));
        assert!(p.char_whitelist.is_none());
        assert!(p.preserve_interword_spaces);
    }
}
