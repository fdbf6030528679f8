//! The state of one preprocessing run.

use trellis_core::{SourceMap, Tree};
use trellis_parser::{Diagnostic, expr::Environment};

use crate::symbols::SymbolTable;

/// A loaded document together with everything the phases share: the files
/// it was read from, the symbol table and the expression environment.
///
/// Separate documents share nothing, so several runs can happen side by
/// side in one process.
#[derive(Debug)]
pub struct Document {
    tree: Tree,
    sources: SourceMap,
    symbols: SymbolTable,
    env: Environment,
}

impl Document {
    pub(crate) fn new(tree: Tree, sources: SourceMap) -> Self {
        Self {
            tree,
            sources,
            symbols: SymbolTable::default(),
            env: Environment::new(),
        }
    }

    /// The element tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Every file read while loading.
    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    /// Symbols collected by the expansion, empty before it runs.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Warnings raised during expansion. They never stop the pipeline.
    pub fn warnings(&self) -> &[Diagnostic] {
        self.symbols.warnings()
    }

    /// Bindings made by `<Define>` bodies.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Consume the document, keeping only its tree.
    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Tree, &mut SymbolTable, &mut Environment) {
        (&mut self.tree, &mut self.symbols, &mut self.env)
    }
}
