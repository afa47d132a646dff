use std::io::{Read, Seek};

use zip::read::ZipFile;
use zip::ZipArchive;

use crate::MalformedDocument;

/// Maximum uncompressed size permitted for any single part inflated into memory.
///
/// Guards against ZIP bombs and forged `uncompressed_size` metadata in uploaded templates.
pub(crate) const DEFAULT_MAX_ZIP_PART_BYTES: u64 = 256 * 1024 * 1024; // 256MiB

/// Compare two part names the way Word itself tolerates them: leading separators are ignored,
/// `\` is treated as `/`, valid `%xx` escapes are decoded and ASCII case is folded.
pub(crate) fn zip_part_names_equivalent(a: &str, b: &str) -> bool {
    normalized_part_name(a).eq(normalized_part_name(b))
}

fn normalized_part_name(name: &str) -> impl Iterator<Item = u8> + '_ {
    fn hex_val(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let mut bytes = name.as_bytes();
    let mut in_leading_separators = true;
    std::iter::from_fn(move || loop {
        let b = *bytes.first()?;
        let decoded = match (b, bytes.get(1).copied(), bytes.get(2).copied()) {
            (b'%', Some(hi), Some(lo)) if hex_val(hi).is_some() && hex_val(lo).is_some() => {
                bytes = &bytes[3..];
                (hex_val(hi)? << 4) | hex_val(lo)?
            }
            _ => {
                bytes = &bytes[1..];
                b
            }
        };

        if in_leading_separators && matches!(decoded, b'/' | b'\\') {
            continue;
        }
        in_leading_separators = false;

        return Some(if decoded == b'\\' {
            b'/'
        } else {
            decoded.to_ascii_lowercase()
        });
    })
}

/// Find the archive index of a part, preferring an exact name match over a leading-slash variant
/// over a case/separator-insensitive match.
///
/// `file_names()` yields entries in central-directory order, so the enumeration index is the
/// index accepted by `ZipArchive::by_index`.
pub(crate) fn find_zip_part_index<R: Read + Seek>(
    archive: &ZipArchive<R>,
    name: &str,
) -> Option<usize> {
    fn is_alt_slash_variant(entry: &str, name: &str) -> bool {
        match name.strip_prefix('/') {
            Some(stripped) => entry == stripped,
            None => entry.strip_prefix('/') == Some(name),
        }
    }

    let mut candidate = None::<(usize, u8)>;
    for (idx, entry) in archive.file_names().enumerate() {
        let score = if entry == name {
            3
        } else if is_alt_slash_variant(entry, name) {
            2
        } else if zip_part_names_equivalent(entry, name) {
            1
        } else {
            continue;
        };
        if candidate.map_or(true, |(_, best)| best < score) {
            candidate = Some((idx, score));
        }
    }

    candidate.map(|(idx, _)| idx)
}

/// Read a ZIP entry into memory with an uncompressed size limit.
///
/// The declared size is checked first, then the read itself is capped at `max_bytes + 1` so
/// forged metadata cannot force an unbounded allocation.
pub(crate) fn read_zip_file_bytes_with_limit<R: Read>(
    file: &mut ZipFile<'_, R>,
    part: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, MalformedDocument> {
    let declared_size = file.size();
    if declared_size > max_bytes {
        return Err(MalformedDocument::PartTooLarge {
            part: part.to_string(),
            size: declared_size,
            max: max_bytes,
        });
    }

    let mut buf = Vec::new();
    let read_limit = max_bytes.checked_add(1).unwrap_or(u64::MAX);
    file.take(read_limit).read_to_end(&mut buf)?;

    let observed = buf.len() as u64;
    if observed > max_bytes {
        return Err(MalformedDocument::PartTooLarge {
            part: part.to_string(),
            size: observed,
            max: max_bytes,
        });
    }
    Ok(buf)
}

/// Read a part by (tolerant) name, returning `Ok(None)` when the entry does not exist.
pub(crate) fn read_zip_part_optional_with_limit<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    max_part_bytes: u64,
) -> Result<Option<Vec<u8>>, MalformedDocument> {
    let Some(idx) = find_zip_part_index(archive, name) else {
        return Ok(None);
    };
    let mut file = archive.by_index(idx)?;
    if file.is_dir() {
        return Ok(None);
    }
    read_zip_file_bytes_with_limit(&mut file, name, max_part_bytes).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Cursor, Write};

    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn equivalent_handles_case_separators_and_leading_slashes() {
        assert!(zip_part_names_equivalent("Word\\Document.xml", "word/document.xml"));
        assert!(zip_part_names_equivalent("/word/document.xml", "word/document.xml"));
        assert!(zip_part_names_equivalent("%2Fword%2Fdocument.xml", "word/document.xml"));
        assert!(!zip_part_names_equivalent("word/document2.xml", "word/document.xml"));
    }

    #[test]
    fn find_prefers_exact_over_equivalent() {
        let bytes = build_zip(&[
            ("Word\\Document.xml", b"equivalent"),
            ("word/document.xml", b"exact"),
        ]);
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let idx = find_zip_part_index(&archive, "word/document.xml").unwrap();
        assert_eq!(archive.by_index(idx).unwrap().name(), "word/document.xml");
    }

    #[test]
    fn find_handles_leading_slash_variant() {
        let bytes = build_zip(&[("/word/document.xml", b"with_slash")]);
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let part = read_zip_part_optional_with_limit(&mut archive, "word/document.xml", 1024)
            .unwrap()
            .unwrap();
        assert_eq!(part, b"with_slash");
    }

    #[test]
    fn read_optional_returns_none_for_missing_part() {
        let bytes = build_zip(&[("a.txt", b"hello")]);
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let part = read_zip_part_optional_with_limit(&mut archive, "b.txt", 1024).unwrap();
        assert!(part.is_none());
    }

    #[test]
    fn read_optional_errors_when_too_large() {
        let bytes = build_zip(&[("a.txt", b"hello world")]); // 11 bytes
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let err = read_zip_part_optional_with_limit(&mut archive, "a.txt", 10).unwrap_err();
        match err {
            MalformedDocument::PartTooLarge { part, .. } => assert_eq!(part, "a.txt"),
            other => panic!("expected PartTooLarge, got {other:?}"),
        }
    }
}
