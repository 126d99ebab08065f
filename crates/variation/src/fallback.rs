use std::ops::Range;
use std::str::FromStr;
use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use mathvar_core::NumberVariation;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_number, r"[0-9]+(?:\.[0-9]+)?");
re!(re_proviso, r"\(\s*단\s*,[^)]*\)");

pub const MIN_FACTOR: f64 = 0.7;
pub const MAX_FACTOR: f64 = 1.3;

const MAX_INTEGER: i64 = 99_999;

fn min_decimal() -> Decimal {
    Decimal::new(1, 1)
}

fn max_decimal() -> Decimal {
    Decimal::new(99_999, 1)
}

/// Local substitute for the remote variation: scale the first one to three
/// numbers outside any `(단, ...)` clause by a random factor in
/// [`MIN_FACTOR`, `MAX_FACTOR`].
pub fn fallback_variation<R: Rng + ?Sized>(text: &str, rng: &mut R) -> NumberVariation {
    let protected: Vec<Range<usize>> = re_proviso().find_iter(text).map(|m| m.range()).collect();

    let targets: Vec<(Range<usize>, Decimal)> = re_number()
        .find_iter(text)
        .filter(|m| {
            !protected
                .iter()
                .any(|p| p.start <= m.start() && m.end() <= p.end)
        })
        .filter_map(|m| Decimal::from_str(m.as_str()).ok().map(|d| (m.range(), d)))
        .take(NumberVariation::MAX_CHANGES)
        .collect();

    if targets.is_empty() {
        return NumberVariation::unchanged(text);
    }

    let mut variation = NumberVariation::default();
    let mut modified_text = String::with_capacity(text.len());
    let mut last = 0;

    for (range, value) in targets {
        let factor = rng.gen_range(MIN_FACTOR..=MAX_FACTOR);
        let token = &text[range.clone()];
        let replacement = scale_number(value, token.contains('.'), factor);

        modified_text.push_str(&text[last..range.start]);
        modified_text.push_str(&replacement);
        last = range.end;

        variation.positions.push(text[..range.start].chars().count());
        variation.original_numbers.push(token.to_string());
        variation.modified_numbers.push(replacement);
    }
    modified_text.push_str(&text[last..]);
    variation.modified_text = modified_text;
    variation
}

/// Scale one number and render it. Integers stay integers in 1..=99999,
/// decimals keep one decimal place in 0.1..=9999.9. The result never equals
/// the input value.
pub fn scale_number(value: Decimal, is_decimal: bool, factor: f64) -> String {
    let factor_dec = Decimal::from_f64(factor).unwrap_or(Decimal::ONE);
    let upward = factor >= 1.0;

    if is_decimal {
        let scaled = scaled_or(value, factor_dec, max_decimal())
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
            .clamp(min_decimal(), max_decimal());
        let mut out = step_if_unchanged(
            value,
            scaled,
            Decimal::new(1, 1),
            upward,
            min_decimal(),
            max_decimal(),
        );
        out.rescale(1);
        out.to_string()
    } else {
        let (min, max) = (Decimal::ONE, Decimal::from(MAX_INTEGER));
        let scaled = scaled_or(value, factor_dec, max)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .clamp(min, max);
        let mut out = step_if_unchanged(value, scaled, Decimal::ONE, upward, min, max);
        out.rescale(0);
        out.to_string()
    }
}

/// `value * factor`, or `ceiling` when the product does not fit a `Decimal`.
fn scaled_or(value: Decimal, factor: Decimal, ceiling: Decimal) -> Decimal {
    value.checked_mul(factor).unwrap_or(ceiling)
}

fn step_if_unchanged(
    original: Decimal,
    scaled: Decimal,
    step: Decimal,
    upward: bool,
    min: Decimal,
    max: Decimal,
) -> Decimal {
    if scaled != original {
        return scaled;
    }
    let (first, second) = if upward {
        (original + step, original - step)
    } else {
        (original - step, original + step)
    };
    let first = first.clamp(min, max);
    if first != original {
        first
    } else {
        second.clamp(min, max)
    }
}
