//! `<Repeat>` unrolling.
//!
//! `<Repeat for="i" in="range(3)">body</Repeat>` becomes, for each value, a
//! `<Define>` binding the loop variable followed by a clone of the body:
//!
//! ```text
//! <Define>i = 0</Define> body <Define>i = 1</Define> body <Define>i = 2</Define> body
//! ```
//!
//! The walk then continues into the clones, so nested repeats unroll too. A
//! nested `in` expression may refer to enclosing loop variables: the
//! bindings of the injected `<Define>`s seen so far are passed down as a
//! scope frame.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, info};

use trellis_core::{Construct, NodeId, Origin, Tree, construct::attr};
use trellis_parser::{
    error::{Diagnostic, ErrorCode, Result},
    expr::{Environment, Value, evaluate, lexer::tokenize, tokens::Token},
};

type Scope = IndexMap<String, Value>;

/// Unroll every `<Repeat>` in `tree`.
///
/// # Errors
///
/// - E300 / E301 when `for` or `in` is missing
/// - E302 when `in` is not iterable or yields a value with no literal form
/// - E303 when `for` is not an identifier
/// - E405 when `in` fails to evaluate
pub fn expand_repeats(tree: &mut Tree, env: &mut Environment) -> Result<()> {
    info!("Expanding repeats");
    let mut expander = RepeatExpander {
        tree,
        env,
        injected: HashMap::new(),
    };
    let root = expander.tree.root();
    expander.expand_children(root, &Scope::new())?;
    info!(defines = expander.injected.len(); "Repeats expanded");
    Ok(())
}

struct RepeatExpander<'a> {
    tree: &'a mut Tree,
    env: &'a mut Environment,
    /// Loop variable bindings of the `<Define>`s inserted so far.
    injected: HashMap<NodeId, (String, Value)>,
}

impl RepeatExpander<'_> {
    fn expand_children(&mut self, parent: NodeId, outer: &Scope) -> Result<()> {
        let mut scope = outer.clone();
        let mut index = 0;
        while let Some(&child) = self.tree.children(parent).get(index) {
            if let Some((name, value)) = self.injected.get(&child) {
                scope.insert(name.clone(), value.clone());
                index += 1;
            } else if self.tree.construct(child) == Construct::Repeat {
                // The first inserted node (if any) now sits at `index`.
                self.expand_repeat(parent, index, child, &scope)?;
            } else {
                self.expand_children(child, &scope)?;
                index += 1;
            }
        }
        Ok(())
    }

    fn expand_repeat(
        &mut self,
        parent: NodeId,
        index: usize,
        repeat: NodeId,
        scope: &Scope,
    ) -> Result<()> {
        let origin = self.tree.origin(repeat);
        let var = self
            .tree
            .attribute(repeat, attr::FOR)
            .ok_or_else(|| {
                Diagnostic::error("repeat has no `for` attribute")
                    .with_code(ErrorCode::E300)
                    .with_label(origin, "missing `for`")
                    .with_help("name the loop variable, e.g. for=\"i\"")
            })?
            .trim()
            .to_string();
        let source = self
            .tree
            .attribute(repeat, attr::IN)
            .ok_or_else(|| {
                Diagnostic::error("repeat has no `in` attribute")
                    .with_code(ErrorCode::E301)
                    .with_label(origin, "missing `in`")
                    .with_help("give the values to iterate, e.g. in=\"range(3)\"")
            })?
            .to_string();

        if !is_identifier(&var) {
            return Err(
                Diagnostic::error(format!("`{var}` is not a valid loop variable"))
                    .with_code(ErrorCode::E303)
                    .with_label(origin, "invalid `for`")
                    .with_help("use a name made of letters, digits and underscores"),
            );
        }

        debug!(var = var.as_str(), source = source.as_str(); "Expanding repeat");

        let values = self
            .env
            .with_frame(scope.clone(), |env| evaluate(&source, env))
            .map_err(|err| {
                Diagnostic::error(format!("cannot evaluate `{source}`: {err}"))
                    .with_code(ErrorCode::E405)
                    .with_label(origin, "in this repeat")
            })?;
        let Some(items) = values.iterate() else {
            return Err(not_iterable(
                format!("`{source}` is a {}, which cannot be iterated", values.type_name()),
                origin,
            ));
        };

        let body = self.tree.children(repeat).to_vec();
        self.tree.detach(repeat);

        let mut position = index;
        for item in items {
            let Some(literal) = item.to_literal() else {
                return Err(not_iterable(
                    format!("`{source}` yields a {} with no literal form", item.type_name()),
                    origin,
                ));
            };

            let define = self.tree.create_element("Define", origin);
            self.tree.set_text(define, Some(format!("{var} = {literal}")));
            self.tree.insert(parent, position, define);
            self.injected.insert(define, (var.clone(), item));
            position += 1;

            for &node in &body {
                let copy = self.tree.deep_clone(node);
                self.tree.insert(parent, position, copy);
                position += 1;
            }
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    matches!(
        tokenize(name).as_deref(),
        Ok([token]) if matches!(token.token, Token::Identifier(word) if word == name)
    )
}

fn not_iterable(message: String, origin: Option<Origin>) -> Diagnostic {
    Diagnostic::error(message)
        .with_code(ErrorCode::E302)
        .with_label(origin, "in this repeat")
        .with_help("iterate a list, a string, a map or range(n)")
}

#[cfg(test)]
mod tests {
    use trellis_parser::parse_markup;

    use super::*;

    fn expand(source: &str) -> Result<Tree> {
        let mut tree = parse_markup(source, None).expect("valid markup");
        let mut env = Environment::new();
        expand_repeats(&mut tree, &mut env)?;
        Ok(tree)
    }

    fn summary(tree: &Tree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .iter()
            .map(|&child| match tree.construct(child) {
                Construct::Define => tree.text(child).unwrap_or_default().to_string(),
                _ => tree.tag(child).to_string(),
            })
            .collect()
    }

    #[test]
    fn test_unrolls_with_defines() {
        let tree = expand(r#"<Root><Repeat for="i" in="range(2)"><A/><B/></Repeat><C/></Root>"#)
            .expect("expand");
        assert_eq!(
            summary(&tree, tree.root()),
            ["i = 0", "A", "B", "i = 1", "A", "B", "C"]
        );
    }

    #[test]
    fn test_string_and_list_values() {
        let tree = expand(r#"<Root><Repeat for="c" in="'ab'"><X/></Repeat></Root>"#)
            .expect("expand");
        assert_eq!(summary(&tree, tree.root()), ["c = 'a'", "X", "c = 'b'", "X"]);

        let tree = expand(r#"<Root><Repeat for="v" in="[1.5, None]"><X/></Repeat></Root>"#)
            .expect("expand");
        assert_eq!(summary(&tree, tree.root()), ["v = 1.5", "X", "v = None", "X"]);
    }

    #[test]
    fn test_nested_repeat_sees_outer_variable() {
        let tree = expand(
            r#"<Root><Repeat for="i" in="range(1, 3)"><Row><Repeat for="j" in="range(i)"><Cell/></Repeat></Row></Repeat></Root>"#,
        )
        .expect("expand");

        let rows: Vec<NodeId> = tree
            .children(tree.root())
            .iter()
            .copied()
            .filter(|&id| tree.tag(id) == "Row")
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(summary(&tree, rows[0]), ["j = 0", "Cell"]);
        assert_eq!(summary(&tree, rows[1]), ["j = 0", "Cell", "j = 1", "Cell"]);
    }

    #[test]
    fn test_empty_iterable_removes_repeat() {
        let tree = expand(r#"<Root><Repeat for="i" in="[]"><A/></Repeat><B/></Root>"#)
            .expect("expand");
        assert_eq!(summary(&tree, tree.root()), ["B"]);
    }

    #[test]
    fn test_missing_attributes() {
        let err = expand(r#"<Root><Repeat in="range(2)"/></Root>"#).expect_err("no for");
        assert_eq!(err.code(), Some(ErrorCode::E300));
        let err = expand(r#"<Root><Repeat for="i"/></Root>"#).expect_err("no in");
        assert_eq!(err.code(), Some(ErrorCode::E301));
    }

    #[test]
    fn test_not_iterable() {
        let err = expand(r#"<Root><Repeat for="i" in="3"><A/></Repeat></Root>"#)
            .expect_err("int");
        assert_eq!(err.code(), Some(ErrorCode::E302));
    }

    #[test]
    fn test_invalid_loop_variable() {
        let err = expand(r#"<Root><Repeat for="a b" in="[1]"/></Root>"#).expect_err("two words");
        assert_eq!(err.code(), Some(ErrorCode::E303));
        let err = expand(r#"<Root><Repeat for="if" in="[1]"/></Root>"#).expect_err("keyword");
        assert_eq!(err.code(), Some(ErrorCode::E303));
    }

    #[test]
    fn test_expression_error() {
        let err = expand(r#"<Root><Repeat for="i" in="undefined_name"/></Root>"#)
            .expect_err("undefined");
        assert_eq!(err.code(), Some(ErrorCode::E405));
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// range(n) produces n copies of the body, each after its binding.
            #[test]
            fn range_unrolls_n_times(n in 0usize..12) {
                let tree = expand(&format!(r#"<Root><Repeat for="k" in="range({n})"><A/></Repeat></Root>"#))
                    .expect("expand");
                let expected: Vec<String> = (0..n)
                    .flat_map(|k| [format!("k = {k}"), "A".to_string()])
                    .collect();
                prop_assert_eq!(summary(&tree, tree.root()), expected);
            }
        }
    }
}
