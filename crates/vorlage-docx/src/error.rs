use thiserror::Error;

/// The input buffer is not a usable DOCX package.
///
/// Every variant means the same thing to callers: the template is corrupt or not a
/// WordprocessingML package, and retrying will not help. The variants only exist so the failure
/// can be logged precisely; callers should not leak them to end users.
#[derive(Debug, Error)]
pub enum MalformedDocument {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("missing docx part: {0}")]
    MissingPart(String),
    #[error(
        "docx package part is too large to load safely: {part} is {size} bytes (max {max} bytes)"
    )]
    PartTooLarge { part: String, size: u64, max: u64 },
    #[error("invalid docx: {0}")]
    Invalid(String),
}

impl From<std::string::FromUtf8Error> for MalformedDocument {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Utf8(err.utf8_error())
    }
}
