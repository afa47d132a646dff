//! One download: read the stored template, personalize it if it is a DOCX, name it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vorlage_docx::{
    build_replacement_rules_with_order, is_patchable_document_type, patch_document,
    DocumentKind, MalformedDocument, TargetCompany,
};

use crate::settings::Settings;
use crate::storage::{StorageError, TemplateStorage};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("template {template_id} is not a valid document: {source}")]
    Malformed {
        template_id: String,
        #[source]
        source: MalformedDocument,
    },
}

/// A shared master template as recorded by the template library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    /// Bumped whenever a new file is uploaded for the template.
    pub version: u64,
    pub title: String,
    /// Declared file type (`"docx"`, `"pdf"`, ...).
    pub file_type: Option<String>,
    /// Location of the original file within template storage.
    pub storage_path: String,
}

impl Template {
    pub fn kind(&self) -> DocumentKind {
        self.file_type
            .as_deref()
            .map(DocumentKind::from_type_tag)
            .unwrap_or(DocumentKind::Other)
    }
}

/// The company a download is requested for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    #[serde(flatten)]
    pub details: TargetCompany,
}

/// A finished download, ready to be streamed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Produce the download of `template` for `company`.
///
/// DOCX templates are personalized with rules built from `settings.source` and the company's
/// details. Every other type is returned as stored.
pub fn personalize_download<S: TemplateStorage + ?Sized>(
    storage: &S,
    settings: &Settings,
    template: &Template,
    company: &Company,
) -> Result<Download, DownloadError> {
    let original = storage.read(&template.storage_path)?;
    let kind = template.kind();

    let bytes = if is_patchable_document_type(template.file_type.as_deref()) {
        let rules = build_replacement_rules_with_order(
            &settings.source,
            &company.details,
            settings.rule_order,
        );
        patch_document(&original, &rules).map_err(|source| {
            log::warn!(
                "template {} ({}) could not be personalized: {source}",
                template.id,
                template.storage_path
            );
            DownloadError::Malformed {
                template_id: template.id.clone(),
                source,
            }
        })?
    } else {
        if kind == DocumentKind::Other {
            log::warn!(
                "template {} has unrecognized type {:?}; passing it through",
                template.id,
                template.file_type
            );
        }
        original
    };

    let filename = download_filename(template, company);
    log::info!(
        "prepared {filename} for company {} ({} bytes)",
        company.id,
        bytes.len()
    );
    Ok(Download {
        filename,
        content_type: kind.content_type(),
        bytes,
    })
}

/// `"<title> - <company>.<extension>"`, with the company name reduced to filename-safe
/// characters. The shape is kept even when nothing of the name survives sanitizing.
pub fn download_filename(template: &Template, company: &Company) -> String {
    let title: String = template
        .title
        .trim()
        .chars()
        .map(|ch| if matches!(ch, '/' | '\\') { '-' } else { ch })
        .collect();
    let company_name = sanitize_company_name(company.details.name.as_deref().unwrap_or(""));

    let mut filename = format!("{title} - {company_name}");
    if let Some(extension) = file_extension(template) {
        filename.push('.');
        filename.push_str(&extension);
    }
    filename
}

/// Keep ASCII letters and digits, German umlauts and `ß`, spaces, `-` and `_`.
pub fn sanitize_company_name(name: &str) -> String {
    name.chars()
        .filter(|ch| {
            ch.is_ascii_alphanumeric()
                || matches!(ch, 'ä' | 'ö' | 'ü' | 'Ä' | 'Ö' | 'Ü' | 'ß' | ' ' | '-' | '_')
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn file_extension(template: &Template) -> Option<String> {
    if let Some(extension) = template.kind().extension() {
        return Some(extension.to_string());
    }
    let tag = template.file_type.as_deref()?.trim();
    let tag = tag.strip_prefix('.').unwrap_or(tag);
    (!tag.is_empty() && tag.chars().all(|ch| ch.is_ascii_alphanumeric()))
        .then(|| tag.to_ascii_lowercase())
}
