//! Number handling for EKAP bid documents.
//!
//! EKAP markup stores every monetary amount and quantity as text in the Turkish convention:
//! `.` groups thousands and `,` separates decimals (`1.234.567,89`). All arithmetic is done on
//! [`rust_decimal::Decimal`]; binary floating point never enters the pipeline.
//!
//! This crate provides:
//! - [`parse`] / [`format`]: the lenient codec used by the document layer
//! - [`parse_strict`]: the same grammar, but reporting *why* a value was rejected
//! - [`parse_price_cell`]: spreadsheet cells that may use either locale convention
//! - [`amount_to_words`]: the legal "amount in words" rendering used on bid letters

mod cell;
mod error;
mod locale;
mod words;

pub use crate::cell::parse_price_cell;
pub use crate::error::NumberParseError;
pub use crate::locale::{
    format, format_money, parse, parse_strict, DECIMAL_SEPARATOR, MAX_PLACES, MONEY_PLACES,
    THOUSANDS_SEPARATOR,
};
pub use crate::words::amount_to_words;

pub use rust_decimal::Decimal;
