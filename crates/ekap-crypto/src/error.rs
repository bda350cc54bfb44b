use thiserror::Error;

/// Decryption failure.
///
/// Bad padding, a misaligned payload and a missing container signature all collapse into one
/// variant: with an unauthenticated ECB payload a wrong password cannot be told apart from a
/// damaged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EkapCryptoError {
    #[error("decryption failed (wrong password or damaged file)")]
    DecryptionFailed,
}
