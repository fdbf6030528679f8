//! Output preparation and serialization.
//!
//! Attributes carrying the reserved prefix (`data-` by default) hold values
//! that only matter during preprocessing; they are stripped before the tree
//! is written. Serialization uses `quick-xml`: elements with neither text
//! nor children are written as empty elements, text and attribute values
//! are escaped.

use std::fmt::Display;

use log::{debug, info};
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use trellis_core::{NodeId, Tree};

use crate::{config::OutputConfig, error::TrellisError};

/// Remove every attribute whose name starts with `prefix`.
///
/// An empty prefix removes nothing.
pub fn strip_attributes(tree: &mut Tree, prefix: &str) {
    if prefix.is_empty() {
        return;
    }

    info!(prefix; "Stripping reserved attributes");
    let mut removed = 0usize;
    for node in tree.subtree(tree.root()) {
        let names: Vec<String> = tree
            .attributes(node)
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        for name in names {
            tree.remove_attribute(node, &name);
            removed += 1;
        }
    }
    debug!(removed; "Reserved attributes stripped");
}

/// Serialize `tree` as markup text.
///
/// # Errors
///
/// Returns [`TrellisError::Output`] if the writer fails.
pub fn render(tree: &Tree, config: &OutputConfig) -> Result<String, TrellisError> {
    let mut writer = Writer::new(Vec::new());

    if config.xml_declaration() {
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(output_error)?;
        writer
            .write_event(Event::Text(BytesText::new("\n")))
            .map_err(output_error)?;
    }

    write_element(&mut writer, tree, tree.root())?;

    String::from_utf8(writer.into_inner()).map_err(output_error)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    tree: &Tree,
    id: NodeId,
) -> Result<(), TrellisError> {
    let tag = tree.tag(id);
    let mut start = BytesStart::new(tag);
    for (name, value) in tree.attributes(id) {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    let text = tree.text(id).filter(|text| !text.is_empty());
    let children = tree.children(id);

    if text.is_none() && children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(output_error)?;
    } else {
        writer.write_event(Event::Start(start)).map_err(output_error)?;
        if let Some(text) = text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(output_error)?;
        }
        for &child in children {
            write_element(writer, tree, child)?;
            if let Some(tail) = tree.tail(child).filter(|tail| !tail.is_empty()) {
                writer
                    .write_event(Event::Text(BytesText::new(tail)))
                    .map_err(output_error)?;
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(output_error)?;
    }
    Ok(())
}

fn output_error(err: impl Display) -> TrellisError {
    TrellisError::Output(err.to_string())
}

#[cfg(test)]
mod tests {
    use trellis_parser::parse_markup;

    use super::*;

    fn tree(source: &str) -> Tree {
        parse_markup(source, None).expect("valid markup")
    }

    #[test]
    fn test_strip_attributes() {
        let mut tree = tree(r#"<Root data-x="1" keep="2"><A data-y="3" datax="4"/></Root>"#);
        strip_attributes(&mut tree, "data-");

        let root = tree.root();
        let a = tree.children(root)[0];
        assert_eq!(tree.attributes(root).keys().collect::<Vec<_>>(), ["keep"]);
        assert_eq!(tree.attributes(a).keys().collect::<Vec<_>>(), ["datax"]);
    }

    #[test]
    fn test_empty_prefix_keeps_everything() {
        let mut tree = tree(r#"<Root data-x="1"/>"#);
        strip_attributes(&mut tree, "");
        assert_eq!(tree.attribute(tree.root(), "data-x"), Some("1"));
    }

    #[test]
    fn test_render_empty_and_text_elements() {
        let tree = tree(r#"<Root a="1"><Empty/><T>x &amp; y</T> tail</Root>"#);
        let out = render(&tree, &OutputConfig::default()).expect("render");
        assert_eq!(out, r#"<Root a="1"><Empty/><T>x &amp; y</T> tail</Root>"#);
    }

    #[test]
    fn test_render_escapes_attributes() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        tree.set_attribute(root, "q", "a<b\"c");
        let out = render(&tree, &OutputConfig::default()).expect("render");
        assert_eq!(out, r#"<Root q="a&lt;b&quot;c"/>"#);
    }

    #[test]
    fn test_render_declaration() {
        let tree = Tree::new("Root");
        let out = render(&tree, &OutputConfig::new("data-", true)).expect("render");
        assert_eq!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Root/>");
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// Text and attribute values read back unchanged after rendering.
            #[test]
            fn rendered_values_read_back(text in "[a-z <>&'\"]{1,24}", value in "[a-z <>&'\"]{0,24}") {
                let mut tree = Tree::new("Root");
                let root = tree.root();
                tree.set_attribute(root, "v", value.as_str());
                tree.set_text(root, Some(text.clone()));

                let out = render(&tree, &OutputConfig::default()).expect("render");
                let back = parse_markup(&out, None).expect("reparse");
                prop_assert_eq!(back.text(back.root()), Some(text.as_str()));
                prop_assert_eq!(back.attribute(back.root(), "v"), Some(value.as_str()));
            }
        }
    }
}
