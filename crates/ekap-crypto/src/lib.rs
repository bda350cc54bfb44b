//! The encryption wrapper around EKAP bid files (`.ekap`).
//!
//! The file payload is raw AES-128 output: no header, no IV, no authentication tag.
//! - key = first 16 bytes of `SHA-1(utf8(password))` (unsalted, single iteration)
//! - AES-128 in ECB mode with PKCS#7 padding
//! - the plaintext is a ZIP archive, so the only integrity check on decode is the local file
//!   header signature `PK\x03\x04`
//!
//! This is the format the procurement platform reads and writes; it is reproduced exactly,
//! weaknesses included. Encryption is deterministic.

mod error;

use aes::Aes128;
use cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use sha1::{Digest as _, Sha1};
use zeroize::Zeroizing;

pub use crate::error::EkapCryptoError;

pub const KEY_LEN: usize = 16;
pub const BLOCK_LEN: usize = 16;

/// Signature at the start of every decrypted container (ZIP local file header).
pub const CONTAINER_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Derive the AES-128 key for `password`.
pub fn derive_key(password: &str) -> Zeroizing<[u8; KEY_LEN]> {
    let digest = Sha1::digest(password.as_bytes());
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&digest[..KEY_LEN]);
    key
}

/// Encrypt `plaintext` with the key derived from `password`.
pub fn encrypt(plaintext: &[u8], password: &str) -> Vec<u8> {
    let key = derive_key(password);
    encrypt_with_key(plaintext, &key)
}

/// AES-128-ECB encrypt with PKCS#7 padding. The output is always a non-empty multiple of
/// [`BLOCK_LEN`].
pub fn encrypt_with_key(plaintext: &[u8], key: &[u8; KEY_LEN]) -> Vec<u8> {
    let pad = BLOCK_LEN - plaintext.len() % BLOCK_LEN;
    let mut buf = Vec::with_capacity(plaintext.len() + pad);
    buf.extend_from_slice(plaintext);
    buf.resize(plaintext.len() + pad, pad as u8);

    let cipher = Aes128::new(GenericArray::from_slice(key));
    for block in buf.chunks_mut(BLOCK_LEN) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    buf
}

/// Decrypt an EKAP payload.
///
/// Returns `None` when the padding is invalid or the plaintext does not start with
/// [`CONTAINER_MAGIC`]. A wrong password and a corrupted file are indistinguishable.
pub fn decrypt(ciphertext: &[u8], password: &str) -> Option<Vec<u8>> {
    decrypt_checked(ciphertext, password).ok()
}

/// [`decrypt`] with a typed error, for callers that propagate with `?`.
pub fn decrypt_checked(ciphertext: &[u8], password: &str) -> Result<Vec<u8>, EkapCryptoError> {
    let key = derive_key(password);
    decrypt_with_key(ciphertext, &key)
}

/// Decrypt with an already-derived key and verify the container signature.
pub fn decrypt_with_key(
    ciphertext: &[u8],
    key: &[u8; KEY_LEN],
) -> Result<Vec<u8>, EkapCryptoError> {
    let plaintext = decrypt_unverified(ciphertext, key)?;
    if !has_container_signature(&plaintext) {
        log::debug!("decrypted payload does not start with the container signature");
        return Err(EkapCryptoError::DecryptionFailed);
    }
    Ok(plaintext)
}

/// AES-128-ECB decrypt and strip PKCS#7 padding without looking at the plaintext.
pub fn decrypt_unverified(
    ciphertext: &[u8],
    key: &[u8; KEY_LEN],
) -> Result<Vec<u8>, EkapCryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        log::debug!(
            "ciphertext length {} is not a positive multiple of {BLOCK_LEN}",
            ciphertext.len()
        );
        return Err(EkapCryptoError::DecryptionFailed);
    }

    let mut buf = ciphertext.to_vec();
    let cipher = Aes128::new(GenericArray::from_slice(key));
    for block in buf.chunks_mut(BLOCK_LEN) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }

    let unpadded_len = pkcs7_unpadded_len(&buf).ok_or(EkapCryptoError::DecryptionFailed)?;
    buf.truncate(unpadded_len);
    Ok(buf)
}

pub fn has_container_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(&CONTAINER_MAGIC)
}

fn pkcs7_unpadded_len(buf: &[u8]) -> Option<usize> {
    let pad = usize::from(*buf.last()?);
    if pad == 0 || pad > BLOCK_LEN || pad > buf.len() {
        return None;
    }
    let (data, padding) = buf.split_at(buf.len() - pad);
    padding
        .iter()
        .all(|&b| usize::from(b) == pad)
        .then_some(data.len())
}
