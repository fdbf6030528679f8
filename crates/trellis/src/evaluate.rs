//! `<Define>` execution and inline expression substitution.
//!
//! The tree is walked in document order. A `<Define>` body runs as soon as
//! it is reached, so its bindings are visible to everything after it. Every
//! other element has its text, its tail and then each attribute value
//! searched for `{expression}` spans.
//!
//! Before a span is evaluated, scope references are replaced by raw
//! attribute text:
//!
//! - `PARENT.name`: `name` on the nearest ancestor that has it
//! - `PARENT`: the attribute being evaluated, looked up on the ancestors
//! - `SELF.name`: `name` on the element itself
//!
//! An expression that produces markup replaces the text it came from: text
//! results are spliced in as first children, tail results as following
//! siblings.

use std::rc::Rc;

use log::{debug, info};

use trellis_core::{Construct, NodeId, Origin, Tree};
use trellis_parser::{
    error::{Diagnostic, ErrorCode, Result},
    expr::{Environment, Value, evaluate, execute},
    inline::{ScopeRef, Segment, split_expressions, split_scope_refs},
};

/// Run every `<Define>`, substitute every expression span and remove the
/// `<Define>` elements.
///
/// # Errors
///
/// - E400 when a definition body fails
/// - E401 / E402 for unresolved `PARENT` / `SELF` references
/// - E403 when markup is mixed with other content or lands in an attribute
/// - E404 when a result contains braces
/// - E405 when an expression fails
/// - E101 when the root element is a `<Define>`
pub fn evaluate_document(tree: &mut Tree, env: &mut Environment) -> Result<()> {
    info!("Evaluating definitions and expressions");
    let mut evaluator = Evaluator { tree, env };
    let defines = evaluator.walk()?;

    let count = defines.len();
    for define in defines {
        if evaluator.tree.parent(define).is_none() {
            return Err(Diagnostic::error(
                "the root element is a definition and cannot be removed",
            )
            .with_code(ErrorCode::E101)
            .with_label(evaluator.tree.origin(define), "root definition")
            .with_help("wrap the definition in another element"));
        }
        evaluator.tree.detach(define);
    }

    info!(defines = count; "Definitions and expressions evaluated");
    Ok(())
}

/// Outcome of substituting one string.
enum Substitution {
    Text(String),
    Markup(Rc<Tree>),
}

/// Where the string being substituted lives.
#[derive(Clone, Copy)]
enum Slot<'a> {
    Text,
    Tail,
    Attribute(&'a str),
}

struct Evaluator<'a> {
    tree: &'a mut Tree,
    env: &'a mut Environment,
}

impl Evaluator<'_> {
    /// Visit the live tree in document order, returning the `<Define>`s met.
    fn walk(&mut self) -> Result<Vec<NodeId>> {
        let mut defines = Vec::new();
        let mut current = Some(self.tree.root());

        while let Some(node) = current {
            if self.tree.construct(node) == Construct::Define {
                self.run_define(node)?;
                defines.push(node);
                current = self.next_after(node);
                continue;
            }

            self.substitute_text(node)?;
            self.substitute_tail(node)?;
            self.substitute_attributes(node)?;

            current = match self.tree.children(node).first() {
                Some(&child) => Some(child),
                None => self.next_after(node),
            };
        }

        Ok(defines)
    }

    /// The next node in document order outside the subtree of `node`.
    fn next_after(&self, node: NodeId) -> Option<NodeId> {
        let root = self.tree.root();
        let mut current = node;
        while current != root {
            let parent = self.tree.parent(current)?;
            let index = self.tree.index_in_parent(current)?;
            if let Some(&sibling) = self.tree.children(parent).get(index + 1) {
                return Some(sibling);
            }
            current = parent;
        }
        None
    }

    fn run_define(&mut self, node: NodeId) -> Result<()> {
        let Some(source) = self.tree.text(node).and_then(definition_source) else {
            return Ok(());
        };

        debug!(source = source.as_str(); "Executing definition");
        execute(&source, self.env).map_err(|err| {
            Diagnostic::error(format!("error executing definition: {err}"))
                .with_code(ErrorCode::E400)
                .with_label(self.tree.origin(node), "in this definition")
        })?;
        Ok(())
    }

    fn substitute_text(&mut self, node: NodeId) -> Result<()> {
        let Some(text) = self.tree.text(node).map(str::trim).map(str::to_string) else {
            return Ok(());
        };
        if text.is_empty() {
            return Ok(());
        }

        match self.substitute(node, &text, Slot::Text)? {
            None => {}
            Some(Substitution::Text(value)) => self.tree.set_text(node, Some(value)),
            Some(Substitution::Markup(fragment)) => {
                self.tree.set_text(node, None);
                let copy = self.tree.import_subtree(&fragment, fragment.root());
                self.tree.splice(node, 0, copy, false);
            }
        }
        Ok(())
    }

    fn substitute_tail(&mut self, node: NodeId) -> Result<()> {
        let Some(tail) = self.tree.tail(node).map(str::trim).map(str::to_string) else {
            return Ok(());
        };
        if tail.is_empty() {
            return Ok(());
        }

        match self.substitute(node, &tail, Slot::Tail)? {
            None => {}
            Some(Substitution::Text(value)) => self.tree.set_tail(node, Some(value)),
            Some(Substitution::Markup(fragment)) => {
                self.tree.set_tail(node, None);
                if let (Some(parent), Some(index)) =
                    (self.tree.parent(node), self.tree.index_in_parent(node))
                {
                    let copy = self.tree.import_subtree(&fragment, fragment.root());
                    self.tree.splice(parent, index + 1, copy, false);
                }
            }
        }
        Ok(())
    }

    fn substitute_attributes(&mut self, node: NodeId) -> Result<()> {
        let names: Vec<String> = self.tree.attributes(node).keys().cloned().collect();
        for name in names {
            let Some(value) = self.tree.attribute(node, &name).map(str::to_string) else {
                continue;
            };
            match self.substitute(node, &value, Slot::Attribute(&name))? {
                None => {}
                Some(Substitution::Text(value)) => {
                    self.tree.set_attribute(node, name.as_str(), value);
                }
                Some(Substitution::Markup(_)) => {
                    return Err(Diagnostic::error(format!(
                        "attribute `{name}` evaluates to markup"
                    ))
                    .with_code(ErrorCode::E403)
                    .with_label(self.tree.origin(node), "in this element")
                    .with_help("markup can only replace element text"));
                }
            }
        }
        Ok(())
    }

    /// Substitute the expression spans of `text`, or return `None` when it
    /// has none.
    fn substitute(
        &mut self,
        node: NodeId,
        text: &str,
        slot: Slot<'_>,
    ) -> Result<Option<Substitution>> {
        let Some(segments) = split_expressions(text) else {
            return Ok(None);
        };
        let origin = self.tree.origin(node);

        let mut out = String::new();
        for segment in &segments {
            let source = match segment {
                Segment::Literal(literal) => {
                    out.push_str(literal);
                    continue;
                }
                Segment::Expression(source) => self.resolve_scope_refs(node, source, slot)?,
            };

            if source.is_empty() {
                continue;
            }

            let value = evaluate(&source, self.env).map_err(|err| {
                Diagnostic::error(format!("cannot evaluate {{{source}}}: {err}"))
                    .with_code(ErrorCode::E405)
                    .with_label(origin, "in this element")
            })?;

            match value {
                Value::Node(fragment) => {
                    if segments.len() != 1 {
                        return Err(Diagnostic::error(format!(
                            "evaluating \"{text}\": an expression that returns markup must be the only content"
                        ))
                        .with_code(ErrorCode::E403)
                        .with_label(origin, "in this element"));
                    }
                    debug!(source = source.as_str(); "Expression produced markup");
                    return Ok(Some(Substitution::Markup(fragment)));
                }
                Value::None => {}
                value => {
                    let rendered = value.to_string();
                    if rendered.contains(['{', '}']) {
                        return Err(Diagnostic::error(format!(
                            "result of {{{source}}} seems to contain another expression"
                        ))
                        .with_code(ErrorCode::E404)
                        .with_label(origin, "in this element")
                        .with_help(format!("the result was `{rendered}`")));
                    }
                    out.push_str(&rendered);
                }
            }
        }

        Ok(Some(Substitution::Text(out)))
    }

    /// Replace `PARENT` and `SELF` references in one expression.
    fn resolve_scope_refs(&self, node: NodeId, source: &str, slot: Slot<'_>) -> Result<String> {
        let origin = self.tree.origin(node);
        let mut out = String::with_capacity(source.len());

        for piece in split_scope_refs(source) {
            match piece {
                ScopeRef::Text(text) => out.push_str(text),
                ScopeRef::Parent(name) => {
                    let name = match (name, slot) {
                        (Some(name), _) => name,
                        (None, Slot::Attribute(name)) => name,
                        (None, Slot::Text | Slot::Tail) => {
                            return Err(Diagnostic::error(
                                "bare PARENT can only be used inside an attribute value",
                            )
                            .with_code(ErrorCode::E401)
                            .with_label(origin, "in this element")
                            .with_help("name the attribute, e.g. PARENT.width"));
                        }
                    };
                    let value = self
                        .tree
                        .ancestors(node)
                        .find_map(|ancestor| self.tree.attribute(ancestor, name))
                        .ok_or_else(|| parent_not_found(self.tree.tag(node), name, origin))?;
                    out.push_str(value);
                }
                ScopeRef::SelfAttr(name) => {
                    let value = self.tree.attribute(node, name).ok_or_else(|| {
                        Diagnostic::error(format!(
                            "cannot find SELF attribute `{name}` on <{}>",
                            self.tree.tag(node)
                        ))
                        .with_code(ErrorCode::E402)
                        .with_label(origin, "in this element")
                    })?;
                    out.push_str(value);
                }
            }
        }

        Ok(out)
    }
}

fn parent_not_found(tag: &str, name: &str, origin: Option<Origin>) -> Diagnostic {
    Diagnostic::error(format!(
        "cannot find any PARENT of <{tag}> with attribute `{name}`"
    ))
    .with_code(ErrorCode::E401)
    .with_label(origin, "in this element")
}

/// The runnable source of a `<Define>` body, or `None` if it is blank.
///
/// Everything up to the first newline is dropped. The indentation of the
/// first non-blank line is then removed from every line that starts with
/// it; other lines lose all leading whitespace.
fn definition_source(text: &str) -> Option<String> {
    let body = text.split_once('\n').map_or(text, |(_, rest)| rest);
    if body.trim().is_empty() {
        return None;
    }

    let indent = body
        .split('\n')
        .find(|line| !line.trim().is_empty())
        .map_or(0, |line| line.len() - line.trim_start_matches(' ').len());
    let prefix = " ".repeat(indent);

    let lines: Vec<&str> = body
        .split('\n')
        .map(|line| match line.strip_prefix(prefix.as_str()) {
            Some(rest) => rest,
            None => line.trim_start(),
        })
        .collect();
    Some(lines.join("\n"))
}
