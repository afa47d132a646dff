//! DOCX template personalization.
//!
//! Shared templates contain the organization's own name, address and contact baked into their
//! text. Downloading a template for a specific company swaps those strings for the company's
//! data. The crate exposes three pieces:
//!
//! - [`build_replacement_rules`]: derive ordered `find -> replace` rules from the organization's
//!   [`SourceData`] and a [`TargetCompany`].
//! - [`is_patchable_document_type`] / [`DocumentKind`]: decide whether a stored file can be
//!   patched at all. Anything but DOCX is passed through unmodified by callers.
//! - [`patch_document`]: apply rules to a DOCX buffer. Matching happens on each paragraph's
//!   logical text (all of its runs concatenated), so placeholders that Word split across runs
//!   still match. Only the main document part is rewritten; every other ZIP entry is
//!   raw-copied.
//!
//! All operations are pure functions over their inputs. Placeholders that span a paragraph
//! break, a line break or a tab are not matched.

mod document_kind;
mod error;
mod paragraph;
mod patch;
mod relationships;
pub mod rules;
mod xml_tree;
mod zip_util;

pub use document_kind::{is_patchable_document_type, DocumentKind};
pub use error::MalformedDocument;
pub use paragraph::{ParagraphText, RunSpan};
pub use patch::{extract_paragraph_texts, extract_paragraphs, patch_document, MAIN_DOCUMENT_PART};
pub use rules::{
    apply_rules, build_replacement_rules, build_replacement_rules_with_order, ReplacementRule,
    RuleOrder, SourceData, TargetCompany,
};
