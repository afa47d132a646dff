//! Minimal owned element tree over `quick-xml` events.
//!
//! Start tags, text and every other event are kept as the raw events the reader produced, so
//! writing an untouched subtree back out reproduces its attributes and escaping verbatim.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::MalformedDocument;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum XmlNode {
    Element(XmlElement),
    /// Text, CDATA, comments, processing instructions, declarations.
    Other(Event<'static>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XmlElement {
    pub(crate) start: BytesStart<'static>,
    pub(crate) children: Vec<XmlNode>,
    /// Written back as `<name/>` while it has no children.
    pub(crate) self_closing: bool,
}

impl XmlElement {
    pub(crate) fn new(start: BytesStart<'static>, children: Vec<XmlNode>) -> Self {
        Self {
            start,
            children,
            self_closing: false,
        }
    }

    /// Qualified name, including any namespace prefix.
    pub(crate) fn name(&self) -> &[u8] {
        self.start.name().into_inner()
    }

    /// Same element with different children.
    pub(crate) fn with_children(&self, children: Vec<XmlNode>) -> Self {
        Self {
            start: self.start.clone(),
            children,
            self_closing: self.self_closing,
        }
    }

    pub(crate) fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(el) => Some(el),
            XmlNode::Other(_) => None,
        })
    }
}

pub(crate) fn parse_xml(xml: &[u8]) -> Result<Vec<XmlNode>, MalformedDocument> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;

    let mut buf = Vec::new();
    let mut top_level = Vec::new();
    let mut open: Vec<XmlElement> = Vec::new();

    loop {
        buf.clear();
        let node = match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                open.push(XmlElement::new(start.into_owned(), Vec::new()));
                continue;
            }
            Event::End(_) => {
                let element = open.pop().ok_or_else(|| {
                    MalformedDocument::Invalid("closing tag without matching start".to_string())
                })?;
                XmlNode::Element(element)
            }
            Event::Empty(start) => XmlNode::Element(XmlElement {
                start: start.into_owned(),
                children: Vec::new(),
                self_closing: true,
            }),
            Event::Eof => break,
            other => XmlNode::Other(other.into_owned()),
        };

        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => top_level.push(node),
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(MalformedDocument::Invalid(format!(
            "unexpected eof inside <{}>",
            String::from_utf8_lossy(unclosed.name())
        )));
    }
    Ok(top_level)
}

pub(crate) fn write_xml(nodes: &[XmlNode]) -> Result<Vec<u8>, MalformedDocument> {
    let mut writer = Writer::new(Vec::new());
    for node in nodes {
        write_node(&mut writer, node)?;
    }
    Ok(writer.into_inner())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), MalformedDocument> {
    match node {
        XmlNode::Other(event) => writer.write_event(event.borrow())?,
        XmlNode::Element(el) if el.self_closing && el.children.is_empty() => {
            writer.write_event(Event::Empty(el.start.borrow()))?
        }
        XmlNode::Element(el) => {
            writer.write_event(Event::Start(el.start.borrow()))?;
            for child in &el.children {
                write_node(writer, child)?;
            }
            writer.write_event(Event::End(el.start.to_end()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn roundtrips_markup_verbatim() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="urn:w"><w:body><w:p w:rsidR="00A1"><w:r><w:t xml:space="preserve">A &amp; B </w:t></w:r><w:r/></w:p><!-- note --></w:body></w:document>"#;
        let nodes = parse_xml(xml.as_bytes()).unwrap();
        let out = write_xml(&nodes).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), xml);
    }

    #[test]
    fn builds_nested_elements() {
        let nodes = parse_xml(b"<a><b>text</b><c/></a>").unwrap();
        let [XmlNode::Element(root)] = nodes.as_slice() else {
            panic!("expected a single root element, got {nodes:?}");
        };
        assert_eq!(root.name(), b"a");
        let names: Vec<&[u8]> = root.child_elements().map(XmlElement::name).collect();
        assert_eq!(names, vec![&b"b"[..], &b"c"[..]]);
    }

    #[test]
    fn rejects_unclosed_elements() {
        assert!(parse_xml(b"<a><b></b>").is_err());
    }

    #[test]
    fn rejects_mismatched_end_tags() {
        assert!(parse_xml(b"<a><b></a></b>").is_err());
    }
}
