//! Container-level patching: locate the main document part, rewrite it, raw-copy the rest.

use std::io::{Cursor, Read, Seek, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::paragraph::{ParagraphText, WordDocument};
use crate::relationships::{main_document_target, PACKAGE_RELS_PART};
use crate::rules::ReplacementRule;
use crate::zip_util::{
    find_zip_part_index, read_zip_file_bytes_with_limit, read_zip_part_optional_with_limit,
    DEFAULT_MAX_ZIP_PART_BYTES,
};
use crate::MalformedDocument;

/// Well-known location of the main document part, used when the package relationships do not
/// name one.
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// Apply `rules` to the body text of a DOCX package and return the new package bytes.
///
/// - An empty rule list returns a copy of `bytes` without opening the archive.
/// - If no paragraph's text changes, a copy of `bytes` is returned as well.
/// - Otherwise only the main document part is rewritten; every other entry is raw-copied.
///
/// `bytes` is never modified, so one template buffer can be personalized for many companies.
pub fn patch_document(
    bytes: &[u8],
    rules: &[ReplacementRule],
) -> Result<Vec<u8>, MalformedDocument> {
    if rules.is_empty() {
        return Ok(bytes.to_vec());
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let main = read_main_document(&mut archive)?;
    let document = WordDocument::parse(&main.xml)?;
    let (rewritten, changed) = document.rewrite(rules)?;
    if changed == 0 {
        log::debug!(
            "no rule matched in {}; returning template unchanged",
            main.part_name
        );
        return Ok(bytes.to_vec());
    }

    log::debug!(
        "rewrote {changed} paragraph(s) in {} with {} rule(s)",
        main.part_name,
        rules.len()
    );
    let xml = rewritten.to_xml()?;
    write_package(&mut archive, main.index, &xml)
}

/// Logical text of every paragraph in the main document part, in document order.
pub fn extract_paragraphs(bytes: &[u8]) -> Result<Vec<ParagraphText>, MalformedDocument> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let main = read_main_document(&mut archive)?;
    WordDocument::parse(&main.xml)?.paragraphs()
}

/// Like [`extract_paragraphs`], without the run offset maps.
pub fn extract_paragraph_texts(bytes: &[u8]) -> Result<Vec<String>, MalformedDocument> {
    Ok(extract_paragraphs(bytes)?
        .into_iter()
        .map(|paragraph| paragraph.text)
        .collect())
}

struct MainDocumentPart {
    index: usize,
    part_name: String,
    xml: Vec<u8>,
}

fn read_main_document<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<MainDocumentPart, MalformedDocument> {
    let declared = match read_zip_part_optional_with_limit(
        archive,
        PACKAGE_RELS_PART,
        DEFAULT_MAX_ZIP_PART_BYTES,
    )? {
        Some(rels) => main_document_target(&rels).unwrap_or_else(|err| {
            log::warn!("ignoring unreadable {PACKAGE_RELS_PART}: {err}");
            None
        }),
        None => None,
    };

    let candidates = declared
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(MAIN_DOCUMENT_PART));
    let mut found = None;
    for candidate in candidates {
        if let Some(index) = find_zip_part_index(archive, candidate) {
            found = Some((index, candidate.to_string()));
            break;
        }
    }
    let Some((index, part_name)) = found else {
        return Err(MalformedDocument::MissingPart(
            declared.unwrap_or_else(|| MAIN_DOCUMENT_PART.to_string()),
        ));
    };

    let mut file = archive.by_index(index)?;
    if file.is_dir() {
        return Err(MalformedDocument::MissingPart(part_name));
    }
    log::debug!("main document part is {}", file.name());
    let xml = read_zip_file_bytes_with_limit(&mut file, &part_name, DEFAULT_MAX_ZIP_PART_BYTES)?;
    Ok(MainDocumentPart {
        index,
        part_name,
        xml,
    })
}

fn write_package<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    replaced_index: usize,
    replaced_xml: &[u8],
) -> Result<Vec<u8>, MalformedDocument> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        if i == replaced_index {
            // Keep the producer's entry name (including any odd casing/separators) and position.
            let name = file.name().to_string();
            drop(file);
            zip.start_file(name, options)?;
            zip.write_all(replaced_xml)?;
        } else {
            // Raw copy keeps unchanged parts byte-for-byte without a recompression pass.
            zip.raw_copy_file(file)?;
        }
    }

    Ok(zip.finish()?.into_inner())
}
