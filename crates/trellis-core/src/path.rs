//! Element paths for selecting nodes relative to a context element.
//!
//! The syntax is the subset of XPath understood by ElementTree's `findall`:
//!
//! | Syntax            | Selects                                              |
//! |-------------------|------------------------------------------------------|
//! | `tag`             | children named `tag`                                 |
//! | `*`               | all children                                         |
//! | `.`               | the current node                                     |
//! | `..`              | the parent                                           |
//! | `a//b`            | `b` elements anywhere below `a`                      |
//! | `[@attr]`         | nodes carrying `attr`                                |
//! | `[@attr='v']`     | nodes whose `attr` equals `v`                        |
//! | `[tag]`           | nodes with at least one child named `tag`            |
//! | `[tag='text']`    | nodes with a child named `tag` whose text is `text`  |
//! | `[n]`, `[last()]` | the n-th (1-based) or last node among its siblings   |
//!
//! Paths are always relative: a leading `/` is rejected.

use indexmap::IndexSet;
use thiserror::Error;
use winnow::{
    Parser as _,
    ascii::digit1,
    combinator::{alt, delimited, eof, opt, preceded, repeat},
    error::{ContextError, ModalResult, StrContext},
    token::{one_of, take_till, take_while},
};

use crate::tree::{NodeId, Tree};

type PResult<O> = ModalResult<O, ContextError>;

/// Error raised for a malformed element path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid element path `{path}` at offset {offset}: {message}")]
pub struct PathError {
    path: String,
    offset: usize,
    message: String,
}

impl PathError {
    /// The path text that failed to parse.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Byte offset where parsing stopped.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Human readable reason.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Test {
    Tag(String),
    Any,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttr(String),
    AttrEq(String, String),
    HasChild(String),
    ChildText(String, String),
    Position(usize),
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: Test,
    predicates: Vec<Predicate>,
}

/// A parsed element path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath {
    source: String,
    steps: Vec<Step>,
}

impl ElementPath {
    /// Parse a path expression.
    ///
    /// # Errors
    ///
    /// Returns a [`PathError`] if the path is empty, absolute, or not
    /// well-formed.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let error = |offset: usize, message: &str| PathError {
            path: path.to_string(),
            offset,
            message: message.to_string(),
        };

        if path.trim().is_empty() {
            return Err(error(0, "path is empty"));
        }
        if path.starts_with('/') {
            return Err(error(0, "absolute paths are not allowed"));
        }

        let mut input = path;
        match (steps, eof).parse_next(&mut input) {
            Ok((steps, _)) => Ok(Self {
                source: path.to_string(),
                steps,
            }),
            Err(err) => {
                let offset = path.len() - input.len();
                let message = err
                    .into_inner()
                    .ok()
                    .and_then(|inner| {
                        inner.context().find_map(|ctx| match ctx {
                            StrContext::Label(label) => Some(format!("expected {label}")),
                            _ => None,
                        })
                    })
                    .unwrap_or_else(|| "unexpected character".to_string());
                Err(error(offset, &message))
            }
        }
    }

    /// The original path text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Find every node matching the path, relative to `context`.
    ///
    /// Results are in document order of discovery and contain no duplicates.
    pub fn find_all(&self, tree: &Tree, context: NodeId) -> Vec<NodeId> {
        let mut current = vec![context];
        for step in &self.steps {
            let mut next = IndexSet::new();
            for &node in &current {
                let candidates = step.candidates(tree, node);
                next.extend(step.filter(tree, candidates));
            }
            current = next.into_iter().collect();
        }
        current
    }
}

impl Step {
    fn candidates(&self, tree: &Tree, node: NodeId) -> Vec<NodeId> {
        match self.axis {
            Axis::Child => self.test.select(tree, node),
            Axis::Descendant => tree
                .subtree(node)
                .into_iter()
                .flat_map(|base| self.test.select(tree, base))
                .collect(),
        }
    }

    fn filter(&self, tree: &Tree, mut nodes: Vec<NodeId>) -> Vec<NodeId> {
        for predicate in &self.predicates {
            nodes = predicate.apply(tree, nodes);
        }
        nodes
    }
}

impl Test {
    fn select(&self, tree: &Tree, node: NodeId) -> Vec<NodeId> {
        match self {
            Test::Tag(tag) => tree
                .children(node)
                .iter()
                .copied()
                .filter(|&child| tree.tag(child) == tag)
                .collect(),
            Test::Any => tree.children(node).to_vec(),
            Test::SelfNode => vec![node],
            Test::Parent => tree.parent(node).into_iter().collect(),
        }
    }
}

impl Predicate {
    fn apply(&self, tree: &Tree, nodes: Vec<NodeId>) -> Vec<NodeId> {
        match self {
            Predicate::HasAttr(name) => nodes
                .into_iter()
                .filter(|&node| tree.attribute(node, name).is_some())
                .collect(),
            Predicate::AttrEq(name, value) => nodes
                .into_iter()
                .filter(|&node| tree.attribute(node, name) == Some(value.as_str()))
                .collect(),
            Predicate::HasChild(tag) => nodes
                .into_iter()
                .filter(|&node| tree.children(node).iter().any(|&c| tree.tag(c) == tag))
                .collect(),
            Predicate::ChildText(tag, text) => nodes
                .into_iter()
                .filter(|&node| {
                    tree.children(node).iter().any(|&c| {
                        tree.tag(c) == tag && tree.text(c).unwrap_or_default() == text
                    })
                })
                .collect(),
            Predicate::Position(position) => {
                Self::per_parent(tree, nodes, |group| group.get(position - 1).copied())
            }
            Predicate::Last => Self::per_parent(tree, nodes, |group| group.last().copied()),
        }
    }

    /// Group nodes by parent and pick at most one from each group.
    fn per_parent(
        tree: &Tree,
        nodes: Vec<NodeId>,
        pick: impl Fn(&[NodeId]) -> Option<NodeId>,
    ) -> Vec<NodeId> {
        let mut groups: Vec<(Option<NodeId>, Vec<NodeId>)> = Vec::new();
        for node in nodes {
            let parent = tree.parent(node);
            match groups.iter_mut().find(|(p, _)| *p == parent) {
                Some((_, group)) => group.push(node),
                None => groups.push((parent, vec![node])),
            }
        }
        groups.iter().filter_map(|(_, group)| pick(group)).collect()
    }
}

fn name<'a>(input: &mut &'a str) -> PResult<&'a str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| {
            c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
        }),
    )
        .take()
        .context(StrContext::Label("name"))
        .parse_next(input)
}

fn quoted<'a>(input: &mut &'a str) -> PResult<&'a str> {
    alt((
        delimited('\'', take_till(0.., '\''), '\''),
        delimited('"', take_till(0.., '"'), '"'),
    ))
    .context(StrContext::Label("quoted value"))
    .parse_next(input)
}

fn predicate(input: &mut &str) -> PResult<Predicate> {
    delimited(
        '[',
        alt((
            preceded('@', (name, opt(preceded('=', quoted)))).map(|(name, value)| match value {
                Some(value) => Predicate::AttrEq(name.to_string(), value.to_string()),
                None => Predicate::HasAttr(name.to_string()),
            }),
            "last()".value(Predicate::Last),
            digit1
                .verify_map(|digits: &str| digits.parse::<usize>().ok().filter(|&n| n > 0))
                .map(Predicate::Position),
            (name, opt(preceded('=', quoted))).map(|(tag, text)| match text {
                Some(text) => Predicate::ChildText(tag.to_string(), text.to_string()),
                None => Predicate::HasChild(tag.to_string()),
            }),
        )),
        ']',
    )
    .context(StrContext::Label("predicate"))
    .parse_next(input)
}

fn test(input: &mut &str) -> PResult<Test> {
    alt((
        "..".value(Test::Parent),
        '.'.value(Test::SelfNode),
        '*'.value(Test::Any),
        name.map(|tag| Test::Tag(tag.to_string())),
    ))
    .context(StrContext::Label("step"))
    .parse_next(input)
}

fn step(input: &mut &str) -> PResult<Step> {
    (test, repeat(0.., predicate))
        .map(|(test, predicates)| Step {
            axis: Axis::Child,
            test,
            predicates,
        })
        .parse_next(input)
}

fn axis(input: &mut &str) -> PResult<Axis> {
    alt(("//".value(Axis::Descendant), '/'.value(Axis::Child))).parse_next(input)
}

fn steps(input: &mut &str) -> PResult<Vec<Step>> {
    let first = step.parse_next(input)?;
    let rest: Vec<(Axis, Step)> = repeat(0.., (axis, step)).parse_next(input)?;

    let mut steps = vec![first];
    steps.extend(rest.into_iter().map(|(axis, mut step)| {
        step.axis = axis;
        step
    }));
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `<Root><a id="1"><b k="x">one</b><b>two</b></a><c><a id="2"><b/></a></c></Root>`
    fn sample() -> Tree {
        let mut tree = Tree::new("Root");
        let root = tree.root();

        let a1 = tree.create_element("a", None);
        tree.set_attribute(a1, "id", "1");
        tree.append(root, a1);
        let b1 = tree.create_element("b", None);
        tree.set_attribute(b1, "k", "x");
        tree.set_text(b1, Some("one".to_string()));
        tree.append(a1, b1);
        let b2 = tree.create_element("b", None);
        tree.set_text(b2, Some("two".to_string()));
        tree.append(a1, b2);

        let c = tree.create_element("c", None);
        tree.append(root, c);
        let a2 = tree.create_element("a", None);
        tree.set_attribute(a2, "id", "2");
        tree.append(c, a2);
        let b3 = tree.create_element("b", None);
        tree.append(a2, b3);

        tree
    }

    fn find(tree: &Tree, path: &str) -> Vec<String> {
        let path = ElementPath::parse(path).expect("path parses");
        path.find_all(tree, tree.root())
            .into_iter()
            .map(|id| {
                let mut label = tree.tag(id).to_string();
                if let Some(id) = tree.attribute(id, "id") {
                    label.push('#');
                    label.push_str(id);
                }
                label
            })
            .collect()
    }

    #[test]
    fn test_child_steps() {
        let tree = sample();
        assert_eq!(find(&tree, "a"), vec!["a#1"]);
        assert_eq!(find(&tree, "a/b").len(), 2);
        assert_eq!(find(&tree, "*"), vec!["a#1", "c"]);
        assert_eq!(find(&tree, "."), vec!["Root"]);
        assert!(find(&tree, "missing").is_empty());
    }

    #[test]
    fn test_descendant_steps() {
        let tree = sample();
        assert_eq!(find(&tree, ".//a"), vec!["a#1", "a#2"]);
        assert_eq!(find(&tree, ".//b").len(), 3);
        assert_eq!(find(&tree, "c//b").len(), 1);
    }

    #[test]
    fn test_predicates() {
        let tree = sample();
        assert_eq!(find(&tree, ".//a[@id='2']"), vec!["a#2"]);
        assert_eq!(find(&tree, ".//b[@k]").len(), 1);
        assert_eq!(find(&tree, ".//a[b='two']"), vec!["a#1"]);
        assert_eq!(find(&tree, "*[a]"), vec!["c"]);
        assert_eq!(find(&tree, "a/b[2]").len(), 1);
        assert_eq!(find(&tree, ".//b[1]").len(), 2);
        assert_eq!(find(&tree, "*[last()]"), vec!["c"]);
    }

    #[test]
    fn test_parent_step() {
        let tree = sample();
        assert_eq!(find(&tree, ".//b[@k]/.."), vec!["a#1"]);
    }

    #[test]
    fn test_invalid_paths() {
        for path in ["", "/a", "a/", "a[", "a[@]", "a[0]", "a]"] {
            assert!(ElementPath::parse(path).is_err(), "{path:?} should fail");
        }

        let err = ElementPath::parse("a/[x]").unwrap_err();
        assert_eq!(err.path(), "a/[x]");
        assert_eq!(err.offset(), 1);
    }
}
