use std::str::FromStr;

use rust_decimal::Decimal;

/// Parse a price taken from a spreadsheet cell.
///
/// Cells arrive as formatted text and may follow either convention (`1.234,56` or `1,234.56`),
/// optionally with a currency symbol. The right-most separator decides which one is the decimal
/// separator. A lone comma followed by at most two digits is a decimal comma; otherwise commas
/// are grouping.
///
/// Returns `None` for empty, malformed or negative input.
pub fn parse_price_cell(value: &str) -> Option<Decimal> {
    let cleaned: String = value
        .chars()
        .filter(|ch| !ch.is_whitespace() && !matches!(ch, '₺' | '$' | '€' | '£'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replacen(',', ".", 1),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => match cleaned.split_once(',') {
            Some((_, frac)) if !frac.contains(',') && frac.len() <= 2 => {
                cleaned.replacen(',', ".", 1)
            }
            _ => cleaned.replace(',', ""),
        },
        (None, _) => cleaned,
    };

    let price = Decimal::from_str(&normalized).ok()?;
    (!price.is_sign_negative()).then_some(price)
}
