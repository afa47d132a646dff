/// The closed set of file types templates are uploaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// WordprocessingML package (`.docx`). The only kind this crate can patch.
    Docx,
    /// Legacy binary Word document (`.doc`).
    Doc,
    Pdf,
    Xlsx,
    Xls,
    Odt,
    Png,
    Jpeg,
    Other,
}

impl DocumentKind {
    /// Classify a declared file type or extension (`"docx"`, `".PDF"`, ...).
    pub fn from_type_tag(tag: &str) -> Self {
        let tag = tag.trim();
        let tag = tag.strip_prefix('.').unwrap_or(tag).to_ascii_lowercase();
        match tag.as_str() {
            "docx" => Self::Docx,
            "doc" => Self::Doc,
            "pdf" => Self::Pdf,
            "xlsx" => Self::Xlsx,
            "xls" => Self::Xls,
            "odt" => Self::Odt,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            _ => Self::Other,
        }
    }

    pub fn is_patchable(self) -> bool {
        matches!(self, Self::Docx)
    }

    /// Canonical file extension, without the leading dot.
    pub fn extension(self) -> Option<&'static str> {
        Some(match self {
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Odt => "odt",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Other => return None,
        })
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Doc => "application/msword",
            Self::Pdf => "application/pdf",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Odt => "application/vnd.oasis.opendocument.text",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Other => "application/octet-stream",
        }
    }
}

/// Whether a stored file of this declared type can be personalized by [`crate::patch_document`].
///
/// Everything else must be passed through unmodified.
pub fn is_patchable_document_type(file_type: Option<&str>) -> bool {
    file_type.is_some_and(|tag| DocumentKind::from_type_tag(tag).is_patchable())
}
