//! `<Use>` resolution.
//!
//! Each `<Use href="#id">` is replaced by a fresh clone of the symbol it
//! names. Attributes of the `<Use>` (except `href`) are copied onto every
//! top-level element of the clone, nested uses inside the clone are resolved,
//! and then the `<Delete>` and `<Transform>` children of the `<Use>` edit
//! that one clone. The clone's children take the place of the `<Use>`.

use log::{debug, info, warn};

use trellis_core::{Construct, NodeId, Origin, Tree, construct::attr, path::ElementPath};
use trellis_parser::error::{Diagnostic, ErrorCode, Result};

use crate::symbols::SymbolTable;

/// Replace every `<Use>` in `tree`.
///
/// # Errors
///
/// - E004 when a `<Use>`, `<Delete>` or `<Transform>` lacks a required attribute
/// - E200 for an unknown symbol
/// - E101 when a delete path selects the fragment itself
/// - E201 / E202 when a delete or transform path matches nothing
/// - E203 for a malformed path
/// - E204 when a symbol uses itself
pub fn resolve_uses(tree: &mut Tree, symbols: &SymbolTable) -> Result<()> {
    info!("Resolving uses");
    let mut resolver = UseResolver {
        tree,
        symbols,
        active: Vec::new(),
        expanded: 0,
    };
    let root = resolver.tree.root();
    resolver.expand_children(root)?;
    info!(count = resolver.expanded; "Uses resolved");
    Ok(())
}

struct UseResolver<'a> {
    tree: &'a mut Tree,
    symbols: &'a SymbolTable,
    /// Symbols currently being expanded, innermost last.
    active: Vec<String>,
    expanded: usize,
}

/// The edits a `<Use>` applies to its clone.
struct Edits {
    deletes: Vec<NodeId>,
    transforms: Vec<NodeId>,
}

impl UseResolver<'_> {
    fn expand_children(&mut self, parent: NodeId) -> Result<()> {
        let mut index = 0;
        while let Some(&child) = self.tree.children(parent).get(index) {
            if self.tree.construct(child) == Construct::Use {
                index = self.replace_use(parent, index, child)?;
            } else {
                self.expand_children(child)?;
                index += 1;
            }
        }
        Ok(())
    }

    /// Replace `node` (child `index` of `parent`), returning the index just
    /// past the inserted content.
    fn replace_use(&mut self, parent: NodeId, index: usize, node: NodeId) -> Result<usize> {
        let origin = self.tree.origin(node);
        let Some(href) = self.tree.attribute(node, attr::HREF) else {
            return Err(missing_attribute("use", attr::HREF, origin));
        };
        let name = href.strip_prefix('#').unwrap_or(href).to_string();

        let Some(symbol) = self.symbols.get(&name) else {
            return Err(Diagnostic::error(format!("cannot find symbol `{name}`"))
                .with_code(ErrorCode::E200)
                .with_label(origin, "unknown symbol")
                .with_help("define it with <Symbol id=\"...\"> somewhere in the document"));
        };

        if self.active.contains(&name) {
            let chain = self
                .active
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(name.as_str()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(Diagnostic::error(format!("symbol `{name}` uses itself"))
                .with_code(ErrorCode::E204)
                .with_label(origin, "recursive use")
                .with_help(format!("use chain: {chain}")));
        }

        debug!(symbol = name.as_str(); "Replacing use");
        let edits = self.collect_edits(node);
        let overrides: Vec<(String, String)> = self
            .tree
            .attributes(node)
            .iter()
            .filter(|(key, _)| key.as_str() != attr::HREF)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        self.tree.detach(node);

        let copy = self.tree.deep_clone(symbol);
        for child in self.tree.children(copy).to_vec() {
            for (key, value) in &overrides {
                self.tree.set_attribute(child, key.as_str(), value.as_str());
            }
        }

        self.active.push(name);
        let nested = self.expand_children(copy);
        self.active.pop();
        nested?;

        for delete in edits.deletes {
            self.apply_delete(copy, delete)?;
        }
        for transform in edits.transforms {
            self.apply_transform(copy, transform)?;
        }

        self.expanded += 1;
        Ok(self.tree.splice(parent, index, copy, true))
    }

    fn collect_edits(&self, node: NodeId) -> Edits {
        let mut edits = Edits {
            deletes: Vec::new(),
            transforms: Vec::new(),
        };
        for &child in self.tree.children(node) {
            match self.tree.construct(child) {
                Construct::Delete => edits.deletes.push(child),
                Construct::Transform => edits.transforms.push(child),
                _ => {
                    warn!(tag = self.tree.tag(child); "Ignoring element inside <Use>");
                }
            }
        }
        edits
    }

    fn apply_delete(&mut self, copy: NodeId, delete: NodeId) -> Result<()> {
        let origin = self.tree.origin(delete);
        let path = self.element_path(delete, "delete")?;

        let matches = path.find_all(&*self.tree, copy);
        if matches.is_empty() {
            return Err(Diagnostic::error(format!(
                "cannot find any element to delete with href=\"{}\"",
                path.as_str()
            ))
            .with_code(ErrorCode::E201)
            .with_label(origin, "matches nothing"));
        }

        if matches.contains(&copy) {
            return Err(Diagnostic::error(format!(
                "delete path `{}` selects the fragment itself",
                path.as_str()
            ))
            .with_code(ErrorCode::E101)
            .with_label(origin, "matches an element with no parent")
            .with_help("use a path below the fragment root, or drop the <Use>"));
        }

        debug!(href = path.as_str(), count = matches.len(); "Deleting elements");
        for found in matches {
            self.tree.detach(found);
        }
        Ok(())
    }

    fn apply_transform(&mut self, copy: NodeId, transform: NodeId) -> Result<()> {
        let origin = self.tree.origin(transform);
        let path = self.element_path(transform, "transform")?;
        let target = self
            .tree
            .attribute(transform, attr::TARGET)
            .ok_or_else(|| missing_attribute("transform", attr::TARGET, origin))?
            .to_string();
        let value = self
            .tree
            .attribute(transform, attr::VALUE)
            .ok_or_else(|| missing_attribute("transform", attr::VALUE, origin))?
            .to_string();

        let matches = path.find_all(&*self.tree, copy);
        if matches.is_empty() {
            return Err(Diagnostic::error(format!(
                "cannot find any element to transform with href=\"{}\"",
                path.as_str()
            ))
            .with_code(ErrorCode::E202)
            .with_label(origin, "matches nothing"));
        }

        debug!(href = path.as_str(), target = target.as_str(); "Transforming elements");
        for found in matches {
            self.tree.set_attribute(found, target.as_str(), value.as_str());
        }
        Ok(())
    }

    fn element_path(&self, node: NodeId, kind: &str) -> Result<ElementPath> {
        let origin = self.tree.origin(node);
        let href = self
            .tree
            .attribute(node, attr::HREF)
            .ok_or_else(|| missing_attribute(kind, attr::HREF, origin))?;

        ElementPath::parse(href).map_err(|err| {
            Diagnostic::error(format!("invalid {kind} path `{}`", err.path()))
                .with_code(ErrorCode::E203)
                .with_label(origin, err.message().to_string())
        })
    }
}

fn missing_attribute(kind: &str, name: &str, origin: Option<Origin>) -> Diagnostic {
    Diagnostic::error(format!("{kind} has no `{name}` attribute"))
        .with_code(ErrorCode::E004)
        .with_label(origin, format!("missing `{name}`"))
}

#[cfg(test)]
mod tests {
    use trellis_parser::parse_markup;

    use super::*;
    use crate::config::SymbolsConfig;

    fn expand(source: &str) -> Result<Tree> {
        let mut tree = parse_markup(source, None).expect("valid markup");
        let symbols = SymbolTable::build(&mut tree, &SymbolsConfig::default())?;
        resolve_uses(&mut tree, &symbols)?;
        Ok(tree)
    }

    fn child_tags(tree: &Tree, id: NodeId) -> Vec<&str> {
        tree.children(id).iter().map(|&c| tree.tag(c)).collect()
    }

    #[test]
    fn test_use_is_replaced_by_symbol_children() {
        let tree = expand(
            r##"<Root><Symbol id="pair"><A/><B/></Symbol><Use href="#pair"/><C/></Root>"##,
        )
        .expect("expand");
        assert_eq!(child_tags(&tree, tree.root()), ["A", "B", "C"]);
    }

    #[test]
    fn test_href_without_hash() {
        let tree = expand(r#"<Root><Symbol id="s"><A/></Symbol><Use href="s"/></Root>"#)
            .expect("expand");
        assert_eq!(child_tags(&tree, tree.root()), ["A"]);
    }

    #[test]
    fn test_use_attributes_are_copied() {
        let tree = expand(
            r##"<Root><Symbol id="s"><A x="1"/></Symbol><Use href="#s" x="2" y="3"/></Root>"##,
        )
        .expect("expand");
        let a = tree.children(tree.root())[0];
        assert_eq!(tree.attribute(a, "x"), Some("2"));
        assert_eq!(tree.attribute(a, "y"), Some("3"));
        assert_eq!(tree.attribute(a, "href"), None);
    }

    #[test]
    fn test_nested_uses() {
        let tree = expand(
            r##"<Root>
                <Symbol id="leaf"><Leaf/></Symbol>
                <Symbol id="branch"><Branch><Use href="#leaf"/></Branch></Symbol>
                <Use href="#branch"/>
            </Root>"##,
        )
        .expect("expand");
        let branch = tree.children(tree.root())[0];
        assert_eq!(child_tags(&tree, branch), ["Leaf"]);
    }

    #[test]
    fn test_delete_and_transform_apply_to_one_clone() {
        let tree = expand(
            r##"<Root>
                <Symbol id="box"><G><Rect/><Circle r="1"/></G></Symbol>
                <Use href="#box">
                    <Delete href="G/Rect"/>
                    <Transform href="G/Circle" target="r" value="5"/>
                </Use>
                <Use href="#box"/>
            </Root>"##,
        )
        .expect("expand");

        let groups = tree.children(tree.root()).to_vec();
        assert_eq!(groups.len(), 2);
        assert_eq!(child_tags(&tree, groups[0]), ["Circle"]);
        assert_eq!(tree.attribute(tree.children(groups[0])[0], "r"), Some("5"));
        assert_eq!(child_tags(&tree, groups[1]), ["Rect", "Circle"]);
        assert_eq!(tree.attribute(tree.children(groups[1])[1], "r"), Some("1"));
    }

    #[test]
    fn test_unknown_symbol() {
        let err = expand(r##"<Root><Use href="#nope"/></Root>"##).expect_err("unknown");
        assert_eq!(err.code(), Some(ErrorCode::E200));
    }

    #[test]
    fn test_empty_delete() {
        let err = expand(
            r##"<Root><Symbol id="s"><G/></Symbol><Use href="#s"><Delete href="X"/></Use></Root>"##,
        )
        .expect_err("nothing to delete");
        assert_eq!(err.code(), Some(ErrorCode::E201));
    }

    #[test]
    fn test_delete_cannot_remove_the_fragment() {
        let err = expand(
            r##"<Root><Symbol id="s"><A/><B/></Symbol><Use href="#s"><Delete href="."/></Use></Root>"##,
        )
        .expect_err("fragment root has no parent");
        assert_eq!(err.code(), Some(ErrorCode::E101));
    }

    #[test]
    fn test_empty_transform() {
        let err = expand(
            r##"<Root><Symbol id="s"><G/></Symbol><Use href="#s"><Transform href="X" target="a" value="b"/></Use></Root>"##,
        )
        .expect_err("nothing to transform");
        assert_eq!(err.code(), Some(ErrorCode::E202));
    }

    #[test]
    fn test_invalid_path() {
        let err = expand(
            r##"<Root><Symbol id="s"><G/></Symbol><Use href="#s"><Transform href="/G" target="a" value="b"/></Use></Root>"##,
        )
        .expect_err("bad path");
        assert_eq!(err.code(), Some(ErrorCode::E203));
    }

    #[test]
    fn test_recursive_use() {
        let err = expand(
            r##"<Root><Symbol id="loop"><G><Use href="#loop"/></G></Symbol><Use href="#loop"/></Root>"##,
        )
        .expect_err("recursion");
        assert_eq!(err.code(), Some(ErrorCode::E204));
    }
}
