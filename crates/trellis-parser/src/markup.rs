//! Markup reader.
//!
//! Reads XML text into a [`Tree`] with `quick-xml`. Comments, processing
//! instructions, the XML declaration and doctypes are dropped; CDATA
//! sections become ordinary text. Every element remembers the byte span and
//! line of its start tag.

use std::{ops::Range, str};

use log::trace;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use thiserror::Error;
use trellis_core::{NodeId, Origin, SourceId, Span, Tree, source::LineIndex};

/// Error raised when markup cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct MarkupError {
    message: String,
    offset: usize,
    line: usize,
}

impl MarkupError {
    fn at(message: impl Into<String>, offset: usize, lines: &LineIndex) -> Self {
        Self {
            message: message.into(),
            offset,
            line: lines.line_of(offset),
        }
    }

    /// Reason the markup was rejected.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset of the failing construct.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 1-based line of the failing construct.
    pub fn line(&self) -> usize {
        self.line
    }
}

/// Parse a complete markup document.
///
/// `source` is recorded in every element's [`Origin`]; pass `None` for
/// markup that does not come from a file.
///
/// # Errors
///
/// Returns a [`MarkupError`] for ill-formed markup, an empty document,
/// several root elements, or text outside the root element.
pub fn parse_markup(text: &str, source: Option<SourceId>) -> Result<Tree, MarkupError> {
    let lines = LineIndex::new(text);
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut builder = TreeBuilder::new(source, &lines);
    loop {
        let start = position(&reader);
        let event = reader
            .read_event()
            .map_err(|err| MarkupError::at(err.to_string(), start, &lines))?;
        let end = position(&reader);

        match event {
            Event::Start(element) => builder.open(&element, start..end, false)?,
            Event::Empty(element) => builder.open(&element, start..end, true)?,
            Event::End(_) => builder.close(start)?,
            Event::Text(content) => {
                let content = content
                    .unescape()
                    .map_err(|err| MarkupError::at(err.to_string(), start, &lines))?;
                builder.text(&content, start)?;
            }
            Event::CData(content) => {
                let content = content.into_inner();
                let content = str::from_utf8(&content)
                    .map_err(|err| MarkupError::at(err.to_string(), start, &lines))?;
                builder.text(content, start)?;
            }
            Event::Eof => break,
            // Comments, processing instructions, declarations and doctypes
            _ => {}
        }
    }

    builder.finish(text.len())
}

fn position(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

/// Incremental tree construction from reader events.
struct TreeBuilder<'a> {
    source: Option<SourceId>,
    lines: &'a LineIndex,
    tree: Option<Tree>,
    open: Vec<NodeId>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: Option<SourceId>, lines: &'a LineIndex) -> Self {
        Self {
            source,
            lines,
            tree: None,
            open: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> MarkupError {
        MarkupError::at(message, offset, self.lines)
    }

    fn origin(&self, range: Range<usize>) -> Origin {
        let line = self.lines.line_of(range.start);
        let span = Span::new(range);
        match self.source {
            Some(source) => Origin::new(source, span, line),
            None => Origin::detached(span, line),
        }
    }

    fn open(
        &mut self,
        element: &BytesStart<'_>,
        range: Range<usize>,
        is_empty: bool,
    ) -> Result<(), MarkupError> {
        let offset = range.start;
        let tag = str::from_utf8(element.name().as_ref())
            .map_err(|err| self.error(err.to_string(), offset))?
            .to_string();

        let mut attributes = Vec::new();
        for attribute in element.attributes() {
            let attribute = attribute.map_err(|err| self.error(err.to_string(), offset))?;
            let key = str::from_utf8(attribute.key.as_ref())
                .map_err(|err| self.error(err.to_string(), offset))?
                .to_string();
            let value = attribute
                .unescape_value()
                .map_err(|err| self.error(err.to_string(), offset))?;
            attributes.push((key, value.into_owned()));
        }

        let origin = self.origin(range);
        let node = match self.tree.as_mut() {
            Some(tree) => {
                let Some(&parent) = self.open.last() else {
                    return Err(MarkupError::at(
                        "document has more than one root element",
                        offset,
                        self.lines,
                    ));
                };
                let node = tree.create_element(tag, Some(origin));
                tree.append(parent, node);
                node
            }
            None => {
                let tree = self.tree.insert(Tree::with_root(tag, Some(origin)));
                tree.root()
            }
        };

        if let Some(tree) = self.tree.as_mut() {
            for (key, value) in attributes {
                tree.set_attribute(node, key, value);
            }
        }
        if !is_empty {
            self.open.push(node);
        }
        Ok(())
    }

    fn close(&mut self, offset: usize) -> Result<(), MarkupError> {
        match self.open.pop() {
            Some(_) => Ok(()),
            None => Err(self.error("closing tag without matching opening tag", offset)),
        }
    }

    fn text(&mut self, content: &str, offset: usize) -> Result<(), MarkupError> {
        let parent = self.open.last().copied();
        let (Some(tree), Some(parent)) = (self.tree.as_mut(), parent) else {
            if content.trim().is_empty() {
                return Ok(());
            }
            return Err(MarkupError::at(
                "text outside the root element",
                offset,
                self.lines,
            ));
        };

        match tree.children(parent).last().copied() {
            Some(last) => {
                let tail = join(tree.tail(last), content);
                tree.set_tail(last, Some(tail));
            }
            None => {
                let text = join(tree.text(parent), content);
                tree.set_text(parent, Some(text));
            }
        }
        Ok(())
    }

    fn finish(self, end: usize) -> Result<Tree, MarkupError> {
        if let Some(&unclosed) = self.open.last() {
            let tag = self
                .tree
                .as_ref()
                .map(|tree| tree.tag(unclosed).to_string())
                .unwrap_or_default();
            return Err(self.error(format!("element <{tag}> is never closed"), end));
        }
        match self.tree {
            Some(tree) => {
                trace!(elements = tree.subtree(tree.root()).len(); "Read markup");
                Ok(tree)
            }
            None => Err(MarkupError::at(
                "document has no root element",
                end,
                self.lines,
            )),
        }
    }
}

fn join(existing: Option<&str>, content: &str) -> String {
    match existing {
        Some(existing) => format!("{existing}{content}"),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elements_text_and_tails() {
        let tree = parse_markup("<Root a=\"1\">head<A/>mid<B>inner</B>end</Root>", None)
            .expect("markup parses");
        let root = tree.root();
        let children = tree.children(root).to_vec();

        assert_eq!(tree.tag(root), "Root");
        assert_eq!(tree.attribute(root, "a"), Some("1"));
        assert_eq!(tree.text(root), Some("head"));
        assert_eq!(tree.tag(children[0]), "A");
        assert_eq!(tree.tail(children[0]), Some("mid"));
        assert_eq!(tree.text(children[1]), Some("inner"));
        assert_eq!(tree.tail(children[1]), Some("end"));
    }

    #[test]
    fn test_entities_and_cdata() {
        let tree = parse_markup(
            "<Root v=\"a &amp; b\">x &lt; y<![CDATA[ & raw <]]></Root>",
            None,
        )
        .expect("markup parses");
        let root = tree.root();

        assert_eq!(tree.attribute(root, "v"), Some("a & b"));
        assert_eq!(tree.text(root), Some("x < y & raw <"));
    }

    #[test]
    fn test_comments_and_declaration_dropped() {
        let tree = parse_markup(
            "<?xml version=\"1.0\"?>\n<!-- header -->\n<Root><!-- inner --><A/></Root>\n",
            None,
        )
        .expect("markup parses");

        assert_eq!(tree.children(tree.root()).len(), 1);
        assert_eq!(tree.text(tree.root()), None);
    }

    #[test]
    fn test_origins_record_lines() {
        let mut sources = trellis_core::SourceMap::new();
        let text = "<Root>\n  <A/>\n  <B/>\n</Root>";
        let file = sources.add("main.xml", text);
        let tree = parse_markup(text, Some(file)).expect("markup parses");

        let b = tree.children(tree.root())[1];
        let origin = tree.origin(b).expect("parsed elements have origins");
        assert_eq!(origin.line(), 3);
        assert_eq!(origin.source(), Some(file));
        assert_eq!(&text[origin.span().start()..origin.span().end()], "<B/>");
    }

    #[test]
    fn test_malformed_documents() {
        for text in [
            "",
            "   ",
            "<Root>",
            "<Root></Other>",
            "<A/><B/>",
            "text<Root/>",
            "<Root a=\"1\" a=\"2\"/>",
            "<Root>&unknown;</Root>",
        ] {
            assert!(parse_markup(text, None).is_err(), "{text:?} should fail");
        }
    }

    #[test]
    fn test_error_line() {
        let err = parse_markup("<Root>\n<A>\n</Root>", None).unwrap_err();
        assert!(err.line() >= 2);
        assert!(!err.message().is_empty());
    }
}
