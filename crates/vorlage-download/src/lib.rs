//! The download side of template personalization.
//!
//! [`personalize_download`] reads a stored template, personalizes it with
//! [`vorlage_docx::patch_document`] when it is a DOCX, passes every other type through, and
//! names the result after the template and the company. [`DownloadService`] adds an optional
//! [`PersonalizedCache`] on top.

mod cache;
mod download;
mod output;
mod service;
mod settings;
mod storage;

pub use cache::{CacheKey, CacheStats, PersonalizedCache};
pub use download::{
    download_filename, personalize_download, sanitize_company_name, Company, Download,
    DownloadError, Template,
};
pub use output::atomic_write_bytes;
pub use service::DownloadService;
pub use settings::{Settings, SettingsError, DEFAULT_CACHE_CAPACITY};
pub use storage::{FsStorage, StorageError, TemplateStorage};
