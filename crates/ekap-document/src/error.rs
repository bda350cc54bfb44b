use thiserror::Error;

#[derive(Debug, Error)]
pub enum EkapError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("xml error: {0}")]
    Markup(#[from] roxmltree::Error),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("missing container entry: {0}")]
    MissingEntry(&'static str),
    #[error(
        "container entry is too large to load safely: {entry} is {size} bytes (max {max} bytes)"
    )]
    EntryTooLarge { entry: String, size: u64, max: u64 },
    #[error("decryption failed (wrong password or damaged file)")]
    DecryptionFailed,
}

impl EkapError {
    /// True for structural problems with the container or its markup, as opposed to a failed
    /// decryption or an I/O failure.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, EkapError::DecryptionFailed | EkapError::Io(_))
    }
}

impl From<ekap_crypto::EkapCryptoError> for EkapError {
    fn from(err: ekap_crypto::EkapCryptoError) -> Self {
        match err {
            ekap_crypto::EkapCryptoError::DecryptionFailed => EkapError::DecryptionFailed,
        }
    }
}
