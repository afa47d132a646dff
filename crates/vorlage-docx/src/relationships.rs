use quick_xml::events::Event;
use quick_xml::Reader;

use crate::MalformedDocument;

/// Package-level relationships part.
pub(crate) const PACKAGE_RELS_PART: &str = "_rels/.rels";

const OFFICE_DOCUMENT_REL_SUFFIX: &str = "/officeDocument";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub(crate) type_uri: String,
    pub(crate) target: String,
    pub(crate) target_mode: Option<String>,
}

/// Resolve the main document part named by the package relationships, if any.
///
/// Covers both transitional (`.../2006/relationships/officeDocument`) and strict
/// (`.../officeDocument/relationships/officeDocument`) relationship types.
pub(crate) fn main_document_target(rels_xml: &[u8]) -> Result<Option<String>, MalformedDocument> {
    let target = parse_relationships(rels_xml)?
        .into_iter()
        .filter(|rel| {
            !rel.target_mode
                .as_deref()
                .is_some_and(|mode| mode.trim().eq_ignore_ascii_case("External"))
        })
        .find(|rel| rel.type_uri.ends_with(OFFICE_DOCUMENT_REL_SUFFIX))
        .map(|rel| package_part_name(&rel.target))
        .filter(|target| !target.is_empty());
    Ok(target)
}

/// Part name of a target declared in the package-level `_rels/.rels`.
///
/// Those targets are relative to the package root, with or without a leading `/`. URI fragments
/// are not part of OPC part names and are dropped.
pub(crate) fn package_part_name(target: &str) -> String {
    let target = target
        .split_once('#')
        .map(|(base, _)| base)
        .unwrap_or(target);

    let mut components: Vec<&str> = Vec::new();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            _ => components.push(segment),
        }
    }
    components.join("/")
}

pub(crate) fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>, MalformedDocument> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) | Event::Empty(start)
                if local_name(start.name().as_ref()).eq_ignore_ascii_case(b"Relationship") =>
            {
                let mut target = None;
                let mut type_uri = None;
                let mut target_mode = None;
                for attr in start.attributes() {
                    let attr = attr?;
                    let key = local_name(attr.key.as_ref());
                    let value = attr.unescape_value()?.into_owned();
                    if key.eq_ignore_ascii_case(b"Target") {
                        target = Some(value);
                    } else if key.eq_ignore_ascii_case(b"Type") {
                        type_uri = Some(value);
                    } else if key.eq_ignore_ascii_case(b"TargetMode") {
                        target_mode = Some(value);
                    }
                }
                if let (Some(target), Some(type_uri)) = (target, type_uri) {
                    relationships.push(Relationship {
                        type_uri,
                        target,
                        target_mode,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_main_document_relationship() {
        let rels = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="/word/document2.xml"/>
</Relationships>"#;
        assert_eq!(
            main_document_target(rels).unwrap().as_deref(),
            Some("word/document2.xml")
        );
    }

    #[test]
    fn strict_relationship_type_is_recognized() {
        let rels = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://purl.oclc.org/ooxml/officeDocument/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;
        assert_eq!(
            main_document_target(rels).unwrap().as_deref(),
            Some("word/document.xml")
        );
    }

    #[test]
    fn missing_relationship_yields_none() {
        let rels =
            br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#;
        assert_eq!(main_document_target(rels).unwrap(), None);
    }

    #[test]
    fn package_part_names_are_rooted_and_normalized() {
        assert_eq!(package_part_name("word/document.xml"), "word/document.xml");
        assert_eq!(package_part_name("/word/document.xml#frag"), "word/document.xml");
        assert_eq!(package_part_name("word/./document.xml"), "word/document.xml");
        assert_eq!(package_part_name("../word/document2.xml"), "word/document2.xml");
        assert_eq!(package_part_name("/"), "");
    }
}
