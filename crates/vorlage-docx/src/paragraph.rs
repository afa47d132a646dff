//! Paragraph-level text normalization for WordprocessingML.
//!
//! Word splits a paragraph's text into runs (`w:r`) wherever formatting, spell-check state or
//! revision ids change, so a placeholder like `Mitterand Straße 35` can be stored as
//! `Mitterand` + ` Straße 35`. Matching therefore happens on a paragraph's *logical text*: the
//! concatenated `w:t` content of its direct runs, with `w:tab` read as `\t` and `w:br`/`w:cr`
//! read as `\n`.
//!
//! Tabs, breaks and other run content such as drawings or field characters split the logical
//! text into segments. Rules are applied per segment, so a placeholder never matches across a
//! line break and whatever sits between segments keeps its position.
//!
//! Rewriting never mutates the parsed tree. [`WordDocument::rewrite`] builds a new tree in which
//! every changed segment has its text collapsed into the segment's first `w:t`.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, BytesText, Event};

use crate::rules::{apply_rules, ReplacementRule};
use crate::xml_tree::{parse_xml, write_xml, XmlElement, XmlNode};
use crate::MalformedDocument;

const WORDML_NS: &[u8] = b"http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const WORDML_STRICT_NS: &[u8] = b"http://purl.oclc.org/ooxml/wordprocessingml/main";

/// Location of one run's text inside a paragraph's logical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSpan {
    /// Index of the run among the paragraph element's children.
    pub run_index: usize,
    /// Byte offset where the run's text starts in [`ParagraphText::text`].
    pub start: usize,
    /// Byte offset one past the run's text.
    pub end: usize,
}

/// Logical text of a paragraph plus the offset map back to the runs it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphText {
    pub text: String,
    /// Only runs that carry a `w:t`, `w:tab`, `w:br` or `w:cr` are listed, in document order.
    pub runs: Vec<RunSpan>,
}

/// Qualified names of the WordprocessingML elements we look at, using whatever prefix the
/// document binds to the WordprocessingML namespace on its root element.
#[derive(Debug, Clone)]
struct WordNames {
    p: Vec<u8>,
    r: Vec<u8>,
    t: Vec<u8>,
    tab: Vec<u8>,
    br: Vec<u8>,
    cr: Vec<u8>,
    r_pr: Vec<u8>,
}

impl WordNames {
    fn with_prefix(prefix: &[u8]) -> Self {
        fn qualify(prefix: &[u8], local: &[u8]) -> Vec<u8> {
            if prefix.is_empty() {
                return local.to_vec();
            }
            let mut name = Vec::with_capacity(prefix.len() + 1 + local.len());
            name.extend_from_slice(prefix);
            name.push(b':');
            name.extend_from_slice(local);
            name
        }
        Self {
            p: qualify(prefix, b"p"),
            r: qualify(prefix, b"r"),
            t: qualify(prefix, b"t"),
            tab: qualify(prefix, b"tab"),
            br: qualify(prefix, b"br"),
            cr: qualify(prefix, b"cr"),
            r_pr: qualify(prefix, b"rPr"),
        }
    }

    fn from_root(root: &XmlElement) -> Result<Self, MalformedDocument> {
        for attr in root.start.attributes() {
            let attr = attr?;
            let value = attr.value.as_ref();
            if value != WORDML_NS && value != WORDML_STRICT_NS {
                continue;
            }
            let key = attr.key.as_ref();
            if key == b"xmlns" {
                return Ok(Self::with_prefix(b""));
            }
            if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                return Ok(Self::with_prefix(prefix));
            }
        }
        Ok(Self::with_prefix(b"w"))
    }
}

/// A parsed main document part (`word/document.xml`).
#[derive(Debug, Clone)]
pub(crate) struct WordDocument {
    nodes: Vec<XmlNode>,
    names: WordNames,
}

impl WordDocument {
    pub(crate) fn parse(xml: &[u8]) -> Result<Self, MalformedDocument> {
        std::str::from_utf8(xml)?;
        let nodes = parse_xml(xml)?;
        let root = nodes
            .iter()
            .find_map(|node| match node {
                XmlNode::Element(el) => Some(el),
                XmlNode::Other(_) => None,
            })
            .ok_or_else(|| {
                MalformedDocument::Invalid("document part has no root element".to_string())
            })?;
        if root.start.local_name().as_ref() != b"document" {
            return Err(MalformedDocument::Invalid(format!(
                "unexpected document root <{}>",
                String::from_utf8_lossy(root.name())
            )));
        }
        let names = WordNames::from_root(root)?;
        Ok(Self { nodes, names })
    }

    pub(crate) fn to_xml(&self) -> Result<Vec<u8>, MalformedDocument> {
        write_xml(&self.nodes)
    }

    /// Logical text of every paragraph in document order, including paragraphs nested in text
    /// boxes (listed after the paragraph that contains them).
    pub(crate) fn paragraphs(&self) -> Result<Vec<ParagraphText>, MalformedDocument> {
        let mut out = Vec::new();
        let mut pending: Vec<&XmlElement> = self
            .nodes
            .iter()
            .rev()
            .filter_map(|node| match node {
                XmlNode::Element(el) => Some(el),
                XmlNode::Other(_) => None,
            })
            .collect();
        while let Some(el) = pending.pop() {
            if el.name() == self.names.p {
                out.push(paragraph_text(el, &self.names)?);
            }
            let children: Vec<&XmlElement> = el.child_elements().collect();
            pending.extend(children.into_iter().rev());
        }
        Ok(out)
    }

    /// Build a new document with `rules` applied to every paragraph's logical text.
    ///
    /// Returns the rewritten document and the number of paragraphs whose text changed.
    pub(crate) fn rewrite(
        &self,
        rules: &[ReplacementRule],
    ) -> Result<(WordDocument, usize), MalformedDocument> {
        let mut rewriter = Rewriter {
            names: &self.names,
            rules,
            changed_paragraphs: 0,
        };
        let nodes = rewriter.rewrite_nodes(&self.nodes)?;
        let changed = rewriter.changed_paragraphs;
        Ok((
            WordDocument {
                nodes,
                names: self.names.clone(),
            },
            changed,
        ))
    }
}

/// A `w:t` addressed by its run's index among the paragraph's children and its own index among
/// the run's children.
struct TextPiece {
    run: usize,
    child: usize,
    text: String,
}

/// Direct-run content of a paragraph, in document order.
enum Piece {
    Text(TextPiece),
    /// `w:tab` (`\t`), `w:br` or `w:cr` (`\n`).
    Break { run: usize, ch: char },
    /// Drawings, field characters and symbols inside a run, or a hyperlink, tracked change or
    /// content control between runs.
    Opaque,
}

fn is_run_formatting(el: &XmlElement, names: &WordNames) -> bool {
    el.name() == names.r_pr || el.start.local_name().as_ref() == b"lastRenderedPageBreak"
}

fn paragraph_pieces(
    paragraph: &XmlElement,
    names: &WordNames,
) -> Result<Vec<Piece>, MalformedDocument> {
    let mut pieces = Vec::new();
    for (run_index, child) in paragraph.children.iter().enumerate() {
        let XmlNode::Element(run) = child else {
            continue;
        };
        if run.name() != names.r {
            // Markers like `w:proofErr` and `w:bookmarkStart` are empty; wrappers are not.
            if run.child_elements().next().is_some() {
                pieces.push(Piece::Opaque);
            }
            continue;
        }

        for (child_index, child) in run.children.iter().enumerate() {
            let XmlNode::Element(el) = child else {
                continue;
            };
            let name = el.name();
            if name == names.t {
                pieces.push(Piece::Text(TextPiece {
                    run: run_index,
                    child: child_index,
                    text: text_content(el)?,
                }));
            } else if name == names.tab {
                pieces.push(Piece::Break {
                    run: run_index,
                    ch: '\t',
                });
            } else if name == names.br || name == names.cr {
                pieces.push(Piece::Break {
                    run: run_index,
                    ch: '\n',
                });
            } else if !is_run_formatting(el, names) {
                pieces.push(Piece::Opaque);
            }
        }
    }
    Ok(pieces)
}

fn paragraph_text(
    paragraph: &XmlElement,
    names: &WordNames,
) -> Result<ParagraphText, MalformedDocument> {
    let mut out = ParagraphText::default();
    for piece in paragraph_pieces(paragraph, names)? {
        let start = out.text.len();
        let run_index = match piece {
            Piece::Text(piece) => {
                out.text.push_str(&piece.text);
                piece.run
            }
            Piece::Break { run, ch } => {
                out.text.push(ch);
                run
            }
            Piece::Opaque => continue,
        };
        let end = out.text.len();
        match out.runs.last_mut() {
            Some(span) if span.run_index == run_index => span.end = end,
            _ => out.runs.push(RunSpan {
                run_index,
                start,
                end,
            }),
        }
    }
    Ok(out)
}

fn text_content(t: &XmlElement) -> Result<String, MalformedDocument> {
    let mut text = String::new();
    for child in &t.children {
        match child {
            XmlNode::Other(Event::Text(e)) => text.push_str(&e.unescape()?),
            XmlNode::Other(Event::CData(e)) => text.push_str(std::str::from_utf8(e)?),
            _ => {}
        }
    }
    Ok(text)
}

/// What happens to one `w:t` of a changed segment.
enum Edit {
    Replace(String),
    Remove,
}

/// Keyed by `(run index, child index)`. Empty when no segment changed.
type Edits = HashMap<(usize, usize), Edit>;

fn plan_edits(pieces: &[Piece], rules: &[ReplacementRule]) -> Edits {
    let mut edits = Edits::new();
    let mut segment: Vec<&TextPiece> = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) => segment.push(text),
            Piece::Break { .. } | Piece::Opaque => {
                plan_segment(&segment, rules, &mut edits);
                segment.clear();
            }
        }
    }
    plan_segment(&segment, rules, &mut edits);
    edits
}

/// The segment's first `w:t` receives the substituted text; the others are removed.
fn plan_segment(segment: &[&TextPiece], rules: &[ReplacementRule], edits: &mut Edits) {
    let Some((first, rest)) = segment.split_first() else {
        return;
    };
    let text: String = segment.iter().map(|piece| piece.text.as_str()).collect();
    let replaced = apply_rules(&text, rules);
    if replaced == text {
        return;
    }
    edits.insert((first.run, first.child), Edit::Replace(replaced));
    for piece in rest {
        edits.insert((piece.run, piece.child), Edit::Remove);
    }
}

struct Rewriter<'a> {
    names: &'a WordNames,
    rules: &'a [ReplacementRule],
    changed_paragraphs: usize,
}

impl Rewriter<'_> {
    fn rewrite_nodes(&mut self, nodes: &[XmlNode]) -> Result<Vec<XmlNode>, MalformedDocument> {
        nodes.iter().map(|node| self.rewrite_node(node)).collect()
    }

    fn rewrite_node(&mut self, node: &XmlNode) -> Result<XmlNode, MalformedDocument> {
        match node {
            XmlNode::Element(el) if el.name() == self.names.p => {
                Ok(XmlNode::Element(self.rewrite_paragraph(el)?))
            }
            XmlNode::Element(el) => Ok(XmlNode::Element(
                el.with_children(self.rewrite_nodes(&el.children)?),
            )),
            XmlNode::Other(event) => Ok(XmlNode::Other(event.clone())),
        }
    }

    fn rewrite_paragraph(
        &mut self,
        paragraph: &XmlElement,
    ) -> Result<XmlElement, MalformedDocument> {
        let edits = plan_edits(&paragraph_pieces(paragraph, self.names)?, self.rules);
        if edits.is_empty() {
            // Runs may still hold nested text-box paragraphs.
            return Ok(paragraph.with_children(self.rewrite_nodes(&paragraph.children)?));
        }

        self.changed_paragraphs += 1;
        log::debug!(
            "rewriting {} text node(s) of a paragraph after substitution",
            edits.len()
        );

        let mut children = Vec::with_capacity(paragraph.children.len());
        for (run_index, child) in paragraph.children.iter().enumerate() {
            match child {
                XmlNode::Element(run)
                    if run.name() == self.names.r
                        && edits.keys().any(|(edited, _)| *edited == run_index) =>
                {
                    if let Some(run) = self.rewrite_run(run, run_index, &edits)? {
                        children.push(XmlNode::Element(run));
                    }
                }
                other => children.push(self.rewrite_node(other)?),
            }
        }
        Ok(paragraph.with_children(children))
    }

    /// Copy of `run` with `edits` applied to its `w:t` children, or `None` when nothing but
    /// formatting would remain.
    fn rewrite_run(
        &mut self,
        run: &XmlElement,
        run_index: usize,
        edits: &Edits,
    ) -> Result<Option<XmlElement>, MalformedDocument> {
        let mut keeps_content = false;
        let mut children = Vec::with_capacity(run.children.len());
        for (child_index, child) in run.children.iter().enumerate() {
            match (child, edits.get(&(run_index, child_index))) {
                (XmlNode::Element(t), Some(Edit::Replace(text))) => {
                    keeps_content = true;
                    children.push(XmlNode::Element(text_element(t, text)?));
                }
                (_, Some(Edit::Remove)) => {}
                (XmlNode::Element(el), _) => {
                    keeps_content |= !is_run_formatting(el, self.names);
                    children.push(self.rewrite_node(child)?);
                }
                (XmlNode::Other(_), _) => children.push(child.clone()),
            }
        }
        Ok(keeps_content.then(|| run.with_children(children)))
    }
}

/// A fresh `w:t` (same qualified name as `template`) holding `text`, with whitespace preserved.
fn text_element(template: &XmlElement, text: &str) -> Result<XmlElement, MalformedDocument> {
    let name = std::str::from_utf8(template.name())?.to_string();
    let mut start = BytesStart::new(name);
    start.push_attribute(("xml:space", "preserve"));
    let children = if text.is_empty() {
        Vec::new()
    } else {
        vec![XmlNode::Other(Event::Text(BytesText::new(text).into_owned()))]
    };
    Ok(XmlElement::new(start, children))
}
