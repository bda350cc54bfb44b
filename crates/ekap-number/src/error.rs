use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberParseError {
    #[error("empty number")]
    Empty,
    #[error("invalid number: {0:?}")]
    Invalid(String),
}
