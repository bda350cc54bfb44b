use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const ONES: [&str; 10] = [
    "", "BİR", "İKİ", "ÜÇ", "DÖRT", "BEŞ", "ALTI", "YEDİ", "SEKİZ", "DOKUZ",
];
const TENS: [&str; 10] = [
    "", "ON", "YİRMİ", "OTUZ", "KIRK", "ELLİ", "ALTMIŞ", "YETMİŞ", "SEKSEN", "DOKSAN",
];
// Long enough for the full `Decimal` range (29 integer digits).
const SCALES: [&str; 10] = [
    "",
    "BİN",
    "MİLYON",
    "MİLYAR",
    "TRİLYON",
    "KATRİLYON",
    "KENTİLYON",
    "SEKSİLYON",
    "SEPTİLYON",
    "OKTİLYON",
];

/// Render an amount in Turkish words, the way bid letters spell out totals.
///
/// The sign is ignored. The amount is rounded half-up to kuruş first; a non-zero kuruş part is
/// appended after the currency (`BİN TRY ELLİ KRŞ`).
pub fn amount_to_words(amount: Decimal, currency: &str) -> String {
    let abs = amount
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let integer = abs.trunc();
    let kurus = ((abs - integer) * Decimal::ONE_HUNDRED).trunc();

    let integer_words = if integer.is_zero() {
        "SIFIR".to_string()
    } else {
        integer_to_words(&integer.normalize().to_string())
    };

    let mut out = format!("{integer_words} {currency}");
    let kurus = kurus.to_u32().unwrap_or(0);
    if kurus > 0 {
        out.push(' ');
        out.push_str(&group_to_words(kurus, false));
        out.push_str(" KRŞ");
    }
    out
}

fn integer_to_words(digits: &str) -> String {
    // Groups of three digits, least significant first.
    let bytes = digits.as_bytes();
    let mut groups = Vec::with_capacity(bytes.len() / 3 + 1);
    let mut end = bytes.len();
    while end > 0 {
        let start = end.saturating_sub(3);
        let group = bytes[start..end]
            .iter()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
        groups.push(group);
        end = start;
    }

    let mut parts: Vec<String> = Vec::new();
    for (scale, &group) in groups.iter().enumerate().rev() {
        if group == 0 {
            continue;
        }
        let words = group_to_words(group, scale == 1);
        if !words.is_empty() {
            parts.push(words);
        }
        if let Some(scale_word) = SCALES.get(scale).filter(|s| !s.is_empty()) {
            parts.push((*scale_word).to_string());
        }
    }
    parts.join(" ")
}

/// Words for `0..=999`. In the thousands group a lone "BİR" is dropped ("BİN", not "BİR BİN").
fn group_to_words(n: u32, thousands_group: bool) -> String {
    let hundreds = (n / 100) as usize;
    let tens = ((n % 100) / 10) as usize;
    let ones = (n % 10) as usize;

    let mut parts: Vec<&str> = Vec::with_capacity(4);
    match hundreds {
        0 => {}
        1 => parts.push("YÜZ"),
        h => parts.extend([ONES[h], "YÜZ"]),
    }
    if tens > 0 {
        parts.push(TENS[tens]);
    }
    if ones > 0 && !(thousands_group && n == 1) {
        parts.push(ONES[ones]);
    }
    parts.join(" ")
}
