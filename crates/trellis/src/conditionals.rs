//! `<If>` pruning.
//!
//! Conditions have already been through expression substitution, so most
//! of them are plain `True` or `False` by now. A kept `<If>` is replaced by
//! its children, which are examined again so nested conditionals work. A
//! dropped one takes its whole subtree with it.

use log::{debug, info};

use trellis_core::{Construct, NodeId, Tree, construct::attr};
use trellis_parser::{
    error::{Diagnostic, ErrorCode, Result},
    expr::{Environment, evaluate},
};

/// Resolve every `<If>` in `tree`.
///
/// # Errors
///
/// - E500 when an `<If>` has no `condition`
/// - E501 when the condition is not a boolean and fails to evaluate
pub fn prune_conditionals(tree: &mut Tree, env: &mut Environment) -> Result<()> {
    info!("Pruning conditionals");
    let root = tree.root();
    let mut stats = Stats::default();
    prune_children(tree, env, root, &mut stats)?;
    info!(kept = stats.kept, dropped = stats.dropped; "Conditionals pruned");
    Ok(())
}

#[derive(Default)]
struct Stats {
    kept: usize,
    dropped: usize,
}

fn prune_children(
    tree: &mut Tree,
    env: &mut Environment,
    parent: NodeId,
    stats: &mut Stats,
) -> Result<()> {
    let mut index = 0;
    while let Some(&child) = tree.children(parent).get(index) {
        if tree.construct(child) != Construct::If {
            prune_children(tree, env, child, stats)?;
            index += 1;
            continue;
        }

        let keep = condition_holds(tree, env, child)?;
        tree.detach(child);
        if keep {
            stats.kept += 1;
            tree.splice(parent, index, child, true);
        } else {
            stats.dropped += 1;
        }
    }
    Ok(())
}

fn condition_holds(tree: &Tree, env: &mut Environment, node: NodeId) -> Result<bool> {
    let origin = tree.origin(node);
    let condition = tree
        .attribute(node, attr::CONDITION)
        .ok_or_else(|| {
            Diagnostic::error("conditional has no `condition` attribute")
                .with_code(ErrorCode::E500)
                .with_label(origin, "missing `condition`")
                .with_help("add condition=\"...\" with a boolean expression")
        })?
        .trim();

    let keep = match condition {
        "True" | "true" => true,
        "False" | "false" | "" => false,
        expression => evaluate(expression, env)
            .map_err(|err| {
                Diagnostic::error(format!("invalid condition `{expression}`: {err}"))
                    .with_code(ErrorCode::E501)
                    .with_label(origin, "in this conditional")
            })?
            .is_truthy(),
    };

    debug!(condition, keep; "Considered conditional");
    Ok(keep)
}
