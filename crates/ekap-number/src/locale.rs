use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::NumberParseError;

pub const THOUSANDS_SEPARATOR: char = '.';
pub const DECIMAL_SEPARATOR: char = ',';

/// Decimal places used for every monetary amount written into a document.
pub const MONEY_PLACES: u32 = 2;

/// Most decimal places [`format`] writes.
pub const MAX_PLACES: u32 = 28;

/// Parse a Turkish-formatted number (`1.234,56`).
///
/// Empty or unparsable input yields zero. Callers that need to tell "empty" apart from
/// "garbage" should use [`parse_strict`].
pub fn parse(text: &str) -> Decimal {
    parse_strict(text).unwrap_or(Decimal::ZERO)
}

/// Parse a Turkish-formatted number, reporting empty and malformed input as errors.
///
/// Every `.` is treated as a thousands separator and dropped; the first `,` becomes the decimal
/// point. Plain exponent notation (`1e3`) is accepted as a fallback.
pub fn parse_strict(text: &str) -> Result<Decimal, NumberParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NumberParseError::Empty);
    }

    let normalized = trimmed
        .replace(THOUSANDS_SEPARATOR, "")
        .replacen(DECIMAL_SEPARATOR, ".", 1);

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .map_err(|_| NumberParseError::Invalid(text.to_string()))
}

/// Format `value` with exactly `places` decimals, grouping the integer digits with `.`.
///
/// Rounding is half away from zero. With `places == 0` no decimal separator is written.
/// `places` is clamped to [`MAX_PLACES`], the finest scale a `Decimal` can carry.
pub fn format(value: Decimal, places: u32) -> String {
    let places = places.min(MAX_PLACES);
    let mut rounded =
        value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(places);

    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    if negative {
        out.push('-');
    }
    group_thousands_into(&mut out, int_part);
    if let Some(frac_part) = frac_part {
        out.push(DECIMAL_SEPARATOR);
        out.push_str(frac_part);
    }
    out
}

/// [`format`] with the document's monetary precision.
pub fn format_money(value: Decimal) -> String {
    format(value, MONEY_PLACES)
}

fn group_thousands_into(out: &mut String, int_part: &str) {
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        let pos_from_end = len - i;
        out.push(ch);
        if pos_from_end > 1 && pos_from_end % 3 == 1 {
            out.push(THOUSANDS_SEPARATOR);
        }
    }
}
