use std::sync::OnceLock;

use regex::{NoExpand, Regex};

use crate::types::CanonicalText;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_line_break, r"\r\n?");
re!(re_whitespace, r"\s+");

re!(re_split_digits, r"([0-9])\s+([0-9])");
re!(re_operator, r"([0-9])\s*([+\-×÷=])\s*[0-9]");
re!(re_open_bracket, r"([(\[])\s+");
re!(re_close_bracket, r"\s+([)\]])");

re!(re_dollar_after, r"\$\s+");
re!(re_dollar_before, r"\s+\$");
re!(re_backslash, r"\\\s+");
re!(re_open_brace, r"\{\s+");
re!(re_close_brace, r"\s+\}");

re!(re_fraction, r"([0-9])\s*(/)\s*[0-9]");
re!(re_korean_fraction, r"([0-9]+)\s*분\s*의\s*([0-9]+)");

re!(re_exponent_brace, r"\^\s*\{");
re!(re_exponent_digit, r"\^\s*([0-9])");

/// Domain words OCR tends to split into spaced syllables.
const SPACED_TERMS: &[(&str, &str)] = &[
    ("문 제", "문제"),
    ("해 설", "해설"),
    ("정 답", "정답"),
    ("풀 이", "풀이"),
    ("계 산", "계산"),
];

// ── Public API ────────────────────────────────────────────────────────────────

/// Rewrite recognized text into canonical form. The rule sequence is applied
/// until nothing changes, so the result is a fixed point.
pub fn canonicalize(raw: &str) -> CanonicalText {
    let mut current = apply_rules(raw);
    // Every rule deletes characters or turns other whitespace into ' ', so a
    // fixed point is reached within one pass per char.
    for _ in 0..=current.chars().count() {
        let next = apply_rules(&current);
        if next == current {
            break;
        }
        current = next;
    }
    CanonicalText(current)
}

fn apply_rules(text: &str) -> String {
    let s = collapse_whitespace(text);
    let s = tighten_arithmetic(&s);
    let s = tighten_markup(&s);
    let s = repair_spaced_terms(&s);
    let s = normalize_fractions(&s);
    let s = normalize_exponents(&s);
    re_whitespace().replace_all(&s, " ").trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    let s = re_line_break().replace_all(text, "\n");
    re_whitespace().replace_all(&s, " ").into_owned()
}

fn tighten_arithmetic(text: &str) -> String {
    let s = re_split_digits().replace_all(text, "$1$2");
    let s = join_binary(re_operator(), &s);
    let s = re_open_bracket().replace_all(&s, "$1");
    re_close_bracket().replace_all(&s, "$1").into_owned()
}

fn tighten_markup(text: &str) -> String {
    let s = re_dollar_after().replace_all(text, NoExpand("$"));
    let s = re_dollar_before().replace_all(&s, NoExpand("$"));
    let s = re_backslash().replace_all(&s, NoExpand("\\"));
    let s = re_open_brace().replace_all(&s, NoExpand("{"));
    re_close_brace().replace_all(&s, NoExpand("}")).into_owned()
}

fn repair_spaced_terms(text: &str) -> String {
    SPACED_TERMS
        .iter()
        .fold(text.to_string(), |acc, (spaced, joined)| acc.replace(spaced, joined))
}

/// `3 / 4` → `3/4`; `N 분 의 M` ("M over N") → `M/N`.
fn normalize_fractions(text: &str) -> String {
    let s = join_binary(re_fraction(), text);
    re_korean_fraction().replace_all(&s, "$2/$1").into_owned()
}

/// Drop the whitespace around a binary operator matched by `re`, whose
/// groups are the left digit and the operator and whose match ends on the
/// right digit. The right digit is left unconsumed so it can be the left
/// operand of the next match (`1 + 2 + 3`).
fn join_binary(re: &Regex, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    while let Some(caps) = re.captures_at(text, last) {
        let (Some(whole), Some(lhs), Some(op)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            break;
        };
        // The right digit is the final char of the match.
        let rhs_start = whole.end() - 1;
        out.push_str(&text[last..lhs.end()]);
        out.push_str(op.as_str());
        last = rhs_start;
    }
    out.push_str(&text[last..]);
    out
}

fn normalize_exponents(text: &str) -> String {
    let s = re_exponent_brace().replace_all(text, NoExpand("^{"));
    re_exponent_digit().replace_all(&s, "^$1").into_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
