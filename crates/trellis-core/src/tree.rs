//! Arena-backed element tree.
//!
//! Nodes live in a single `Vec` owned by the [`Tree`] and are addressed by
//! [`NodeId`]. Each node keeps the id of its parent, so ancestor lookups
//! never need shared ownership. Moving a node (insert, append, splice)
//! always detaches it from its previous parent first, which keeps the
//! single-parent invariant without reference counting.
//!
//! Detached nodes stay in the arena. They are simply unreachable from the
//! root until something inserts them again.
//!
//! # Text model
//!
//! Text follows the ElementTree convention: [`NodeData::text`] is the text
//! before the first child and [`NodeData::tail`] is the text after the
//! node's end tag, up to the next sibling.
//!
//! # Example
//!
//! ```
//! use trellis_core::Tree;
//!
//! let mut tree = Tree::new("Root");
//! let root = tree.root();
//! let shape = tree.create_element("Shape", None);
//! tree.append(root, shape);
//! tree.set_attribute(shape, "color", "red");
//!
//! let copy = tree.deep_clone(shape);
//! tree.set_attribute(copy, "color", "blue");
//!
//! assert_eq!(tree.attribute(shape, "color"), Some("red"));
//! assert_eq!(tree.parent(shape), Some(root));
//! assert_eq!(tree.parent(copy), None);
//! ```

use std::fmt::Write as _;

use indexmap::IndexMap;
use log::trace;

use crate::{construct::Construct, source::Origin};

/// Handle of a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A single element.
#[derive(Debug, Clone)]
pub struct NodeData {
    tag: String,
    attributes: IndexMap<String, String>,
    text: Option<String>,
    tail: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    origin: Option<Origin>,
}

impl NodeData {
    fn new(tag: String, origin: Option<Origin>) -> Self {
        Self {
            tag,
            attributes: IndexMap::new(),
            text: None,
            tail: None,
            children: Vec::new(),
            parent: None,
            origin,
        }
    }

    /// Tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Construct kind derived from the tag name.
    pub fn construct(&self) -> Construct {
        Construct::from_tag(&self.tag)
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Text before the first child.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Text after the end tag.
    pub fn tail(&self) -> Option<&str> {
        self.tail.as_deref()
    }

    /// Child nodes in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent node, `None` for the root and for detached nodes.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Source location, `None` for nodes created by the preprocessor.
    pub fn origin(&self) -> Option<Origin> {
        self.origin
    }
}

/// An element tree with a single root.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Tree {
    /// Create a tree whose root element has the given tag.
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self::with_root(root_tag, None)
    }

    /// Create a tree whose root element has the given tag and origin.
    pub fn with_root(root_tag: impl Into<String>, origin: Option<Origin>) -> Self {
        Self {
            nodes: vec![NodeData::new(root_tag.into(), origin)],
            root: NodeId(0),
        }
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Replace the root with another node of this tree.
    ///
    /// The node is detached from its parent first.
    pub fn set_root(&mut self, id: NodeId) {
        self.detach(id);
        self.root = id;
    }

    /// Number of nodes allocated in the arena, reachable or not.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Access a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this tree.
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    /// Allocate a new detached element.
    pub fn create_element(&mut self, tag: impl Into<String>, origin: Option<Origin>) -> NodeId {
        self.push(NodeData::new(tag.into(), origin))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    /// Tag name of a node.
    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    /// Construct kind of a node.
    pub fn construct(&self, id: NodeId) -> Construct {
        self.node(id).construct()
    }

    /// Attributes of a node in document order.
    pub fn attributes(&self, id: NodeId) -> &IndexMap<String, String> {
        &self.node(id).attributes
    }

    /// Value of one attribute.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).attributes.get(name).map(String::as_str)
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.node_mut(id)
            .attributes
            .insert(name.into(), value.into());
    }

    /// Remove an attribute, preserving the order of the others.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.node_mut(id).attributes.shift_remove(name)
    }

    /// Text before the first child.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).text()
    }

    /// Replace the text before the first child.
    pub fn set_text(&mut self, id: NodeId, text: Option<String>) {
        self.node_mut(id).text = text;
    }

    /// Text after the node's end tag.
    pub fn tail(&self, id: NodeId) -> Option<&str> {
        self.node(id).tail()
    }

    /// Replace the text after the node's end tag.
    pub fn set_tail(&mut self, id: NodeId, tail: Option<String>) {
        self.node_mut(id).tail = tail;
    }

    /// Children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Source location of a node.
    pub fn origin(&self, id: NodeId) -> Option<Origin> {
        self.node(id).origin
    }

    /// Position of a node among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    /// Iterate over the ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// All descendants of a node in document order, excluding the node itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// The node and all of its descendants in document order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        out.extend(self.descendants(id));
        out
    }

    /// Whether the node can be reached from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|ancestor| ancestor == self.root)
    }

    /// Append `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert(parent, len, child);
    }

    /// Insert `child` at `index` among the children of `parent`.
    ///
    /// The child is detached from its current parent first. An index past
    /// the end appends.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        debug_assert!(
            child != parent && !self.ancestors(parent).any(|ancestor| ancestor == child),
            "inserting a node below itself"
        );

        let mut index = index;
        let old_parent = self.parent(child);
        if let Some(old_index) = self.detach(child) {
            if old_parent == Some(parent) && old_index < index {
                index -= 1;
            }
        }

        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Detach a node from its parent, returning its former index.
    ///
    /// Returns `None` if the node had no parent. The node keeps its tail.
    pub fn detach(&mut self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.node_mut(parent).children.remove(index);
        self.node_mut(id).parent = None;
        Some(index)
    }

    /// Insert `source` into `parent` at `index`.
    ///
    /// If `children_only` is set, or `source` is a transparent wrapper
    /// (`<Dummy>`), its children are moved instead of the node itself.
    /// Returns the index just past the inserted nodes.
    pub fn splice(
        &mut self,
        parent: NodeId,
        index: usize,
        source: NodeId,
        children_only: bool,
    ) -> usize {
        let start = index;
        let mut index = index;
        if children_only || self.construct(source).is_transparent() {
            let children = self.children(source).to_vec();
            for child in children {
                self.insert(parent, index, child);
                index += 1;
            }
        } else {
            self.insert(parent, index, source);
            index += 1;
        }
        trace!(
            parent = self.tag(parent),
            source = self.tag(source),
            count = index - start;
            "Spliced nodes"
        );
        index
    }

    /// Copy a subtree inside this arena.
    ///
    /// The copy is detached and shares nothing with the original: later
    /// edits to either side never affect the other. Tail text is copied too.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let mut data = self.node(id).clone();
        let children = std::mem::take(&mut data.children);
        data.parent = None;

        let copy = self.push(data);
        for child in children {
            let child_copy = self.deep_clone(child);
            self.attach_last(copy, child_copy);
        }
        copy
    }

    /// Copy a subtree of another tree into this arena, detached.
    pub fn import_subtree(&mut self, other: &Tree, id: NodeId) -> NodeId {
        let mut data = other.node(id).clone();
        data.children = Vec::new();
        data.parent = None;

        let copy = self.push(data);
        for &child in other.children(id) {
            let child_copy = self.import_subtree(other, child);
            self.attach_last(copy, child_copy);
        }
        copy
    }

    /// Copy a subtree into a new, independent tree.
    pub fn extract(&self, id: NodeId) -> Tree {
        let mut tree = Tree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.import_subtree(self, id);
        tree
    }

    fn attach_last(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Structural equality of two subtrees, possibly in different trees.
    ///
    /// Compares tags, attributes (including their order), text, tails and
    /// children. Origins are ignored.
    pub fn subtree_eq(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
        let a = self.node(id);
        let b = other.node(other_id);

        a.tag == b.tag
            && a.attributes.iter().eq(b.attributes.iter())
            && a.text == b.text
            && a.tail == b.tail
            && a.children.len() == b.children.len()
            && a
                .children
                .iter()
                .zip(&b.children)
                .all(|(&x, &y)| self.subtree_eq(x, other, y))
    }

    /// Indented outline of tag names, used for trace logging.
    pub fn outline(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_outline(id, 0, &mut out);
        out
    }

    fn write_outline(&self, id: NodeId, depth: usize, out: &mut String) {
        let _ = writeln!(out, "{:indent$}{}", "", self.tag(id), indent = depth * 3);
        for &child in self.children(id) {
            self.write_outline(child, depth + 1, out);
        }
    }
}

/// Iterator over the ancestors of a node, see [`Tree::ancestors`].
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        let a = tree.create_element("A", None);
        let b = tree.create_element("B", None);
        let c = tree.create_element("C", None);
        tree.append(root, a);
        tree.append(root, b);
        tree.append(a, c);
        (tree, a, b, c)
    }

    #[test]
    fn test_append_sets_parent() {
        let (tree, a, b, c) = sample();
        assert_eq!(tree.children(tree.root()), &[a, b]);
        assert_eq!(tree.parent(c), Some(a));
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn test_insert_moves_between_parents() {
        let (mut tree, a, b, c) = sample();
        tree.insert(b, 0, c);

        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), &[c]);
        assert_eq!(tree.parent(c), Some(b));
    }

    #[test]
    fn test_insert_within_same_parent() {
        let (mut tree, a, b, _) = sample();
        let root = tree.root();
        let d = tree.create_element("D", None);
        tree.append(root, d);

        // Move `a` behind `b`: [a, b, d] -> [b, a, d]
        tree.insert(root, 2, a);
        assert_eq!(tree.children(root), &[b, a, d]);
    }

    #[test]
    fn test_detach() {
        let (mut tree, a, b, _) = sample();
        let root = tree.root();

        assert_eq!(tree.detach(a), Some(0));
        assert_eq!(tree.children(root), &[b]);
        assert_eq!(tree.detach(a), None);
        assert_eq!(tree.detach(root), None);
        assert!(!tree.is_attached(a));
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let (tree, a, _, c) = sample();
        let ancestors: Vec<_> = tree.ancestors(c).collect();
        assert_eq!(ancestors, vec![a, tree.root()]);
    }

    #[test]
    fn test_descendants_document_order() {
        let (tree, a, b, c) = sample();
        assert_eq!(tree.descendants(tree.root()), vec![a, c, b]);
        assert_eq!(tree.subtree(a), vec![a, c]);
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let (mut tree, a, _, c) = sample();
        tree.set_attribute(c, "x", "1");
        tree.set_tail(a, Some("\n".to_string()));

        let copy = tree.deep_clone(a);
        let copy_child = tree.children(copy)[0];
        tree.set_attribute(copy_child, "x", "2");

        assert_eq!(tree.attribute(c, "x"), Some("1"));
        assert_eq!(tree.attribute(copy_child, "x"), Some("2"));
        assert_eq!(tree.parent(copy_child), Some(copy));
        assert_eq!(tree.parent(copy), None);
        assert_eq!(tree.tail(copy), Some("\n"));
    }

    #[test]
    fn test_splice_dummy_inserts_children() {
        let (mut tree, a, b, _) = sample();
        let root = tree.root();
        let dummy = tree.create_element("Dummy", None);
        let x = tree.create_element("X", None);
        let y = tree.create_element("Y", None);
        tree.append(dummy, x);
        tree.append(dummy, y);

        let next = tree.splice(root, 1, dummy, false);
        assert_eq!(next, 3);
        assert_eq!(tree.children(root), &[a, x, y, b]);
    }

    #[test]
    fn test_splice_element_inserts_itself() {
        let (mut tree, a, b, _) = sample();
        let root = tree.root();
        let x = tree.create_element("X", None);

        assert_eq!(tree.splice(root, 0, x, false), 1);
        assert_eq!(tree.children(root), &[x, a, b]);
    }

    #[test]
    fn test_import_and_subtree_eq() {
        let (mut tree, a, _, c) = sample();
        tree.set_text(c, Some("hello".to_string()));

        let extracted = tree.extract(a);
        assert!(tree.subtree_eq(a, &extracted, extracted.root()));

        let imported = tree.import_subtree(&extracted, extracted.root());
        assert!(tree.subtree_eq(a, &tree, imported));

        tree.set_attribute(imported, "k", "v");
        assert!(!tree.subtree_eq(a, &tree, imported));
    }

    #[test]
    fn test_attribute_order_preserved() {
        let mut tree = Tree::new("Root");
        let root = tree.root();
        tree.set_attribute(root, "b", "1");
        tree.set_attribute(root, "a", "2");
        tree.set_attribute(root, "b", "3");
        tree.remove_attribute(root, "missing");

        let keys: Vec<_> = tree.attributes(root).keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(tree.attribute(root, "b"), Some("3"));
    }

    #[test]
    fn test_outline() {
        let (tree, _, _, _) = sample();
        assert_eq!(tree.outline(tree.root()), "Root\n   A\n      C\n   B\n");
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// Random insert/detach sequences keep every parent link consistent.
            #[test]
            fn parent_links_stay_consistent(ops in prop::collection::vec((0usize..8, 0usize..8, 0usize..4), 1..40)) {
                let mut tree = Tree::new("Root");
                let mut ids = vec![tree.root()];
                for i in 0..7 {
                    let id = tree.create_element(format!("N{i}"), None);
                    ids.push(id);
                }

                for (parent, child, index) in ops {
                    let (parent, child) = (ids[parent], ids[child]);
                    if child == tree.root() {
                        continue;
                    }
                    if child == parent || tree.ancestors(parent).any(|a| a == child) {
                        tree.detach(child);
                        continue;
                    }
                    tree.insert(parent, index, child);
                }

                for &id in &ids {
                    for &child in tree.children(id) {
                        prop_assert_eq!(tree.parent(child), Some(id));
                    }
                    if let Some(parent) = tree.parent(id) {
                        let count = tree.children(parent).iter().filter(|&&c| c == id).count();
                        prop_assert_eq!(count, 1);
                    }
                }
            }
        }
    }
}
