//! EKAP bid files (`.ekap`): open, edit prices, save.
//!
//! A bid file is an encrypted ZIP container (see [`ekap_crypto`]) holding two markup entries:
//! `teklifDosyasi.xml` with the tender and its items, and an optional `dosyaBilgileri.xml` that
//! is carried through untouched.
//!
//! The pipeline is:
//! - [`open_document`]: decrypt, [`unpack`], [`parse_container`]
//! - [`mutate_item_price`] / [`apply_price_updates`]: pure edits returning a new document
//! - [`save_document`]: [`serialize`] (rewrites the original markup in place), encrypt
//!
//! Item and tender totals are always recomputed from quantity and price; totals stored in the
//! source markup are never trusted.

mod archive;
mod error;
mod import;
mod model;
mod parse;
pub mod schema;
mod serialize;

pub use crate::archive::{
    pack, unpack, UnpackedContainer, MAIN_ENTRY, MAX_ENTRY_BYTES, SIDE_ENTRY, SIDE_PLACEHOLDER,
};
pub use crate::error::EkapError;
pub use crate::import::{
    apply_price_updates, match_price_rows, MatchField, MatchResult, PriceUpdate,
};
pub use crate::model::{mutate_item_price, EkapDocument, EkapItem, OfferShape, TenderInfo};
pub use crate::parse::{parse_container, parse_document};
pub use crate::serialize::{serialize, serialize_markup};

/// Decrypt and parse an `.ekap` file.
///
/// A wrong password and a damaged payload both surface as [`EkapError::DecryptionFailed`].
pub fn open_document(bytes: &[u8], password: &str) -> Result<EkapDocument, EkapError> {
    let container = ekap_crypto::decrypt_checked(bytes, password)?;
    let unpacked = unpack(&container)?;
    let document = parse_container(unpacked)?;
    log::debug!(
        "opened bid file: {} bytes, {} items",
        bytes.len(),
        document.items().len()
    );
    Ok(document)
}

/// Serialize and encrypt `document` with `password`.
pub fn save_document(document: &EkapDocument, password: &str) -> Result<Vec<u8>, EkapError> {
    let container = serialize(document)?;
    Ok(ekap_crypto::encrypt(&container, password))
}
