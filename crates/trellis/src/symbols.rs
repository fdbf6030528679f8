//! Symbol table construction.
//!
//! Every `<Symbol id="...">` in the document, nested ones included, is
//! registered under its identifier and detached from the tree. The detached
//! subtrees stay in the document arena, and uses clone them from there.

use indexmap::IndexMap;
use log::{debug, info, warn};

use trellis_core::{Construct, NodeId, Tree, construct::attr};
use trellis_parser::error::{Diagnostic, ErrorCode, Result};

use crate::config::{DuplicateSymbols, SymbolsConfig};

/// Identifier → detached `<Symbol>` node.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: IndexMap<String, NodeId>,
    /// Redefinitions accepted under [`DuplicateSymbols::LastWins`].
    warnings: Vec<Diagnostic>,
}

impl SymbolTable {
    /// Collect and detach every `<Symbol>` of `tree`.
    ///
    /// # Errors
    ///
    /// - E100 when a symbol has no `id`
    /// - E101 when the root element is a symbol
    /// - E102 for a repeated identifier under [`DuplicateSymbols::Error`]
    pub fn build(tree: &mut Tree, config: &SymbolsConfig) -> Result<Self> {
        info!("Collecting symbols");

        let found: Vec<NodeId> = tree
            .subtree(tree.root())
            .into_iter()
            .filter(|&id| tree.construct(id) == Construct::Symbol)
            .collect();

        let mut symbols: IndexMap<String, NodeId> = IndexMap::new();
        let mut warnings = Vec::new();
        for &symbol in &found {
            let Some(name) = tree.attribute(symbol, attr::ID) else {
                return Err(Diagnostic::error("symbol has no identifier")
                    .with_code(ErrorCode::E100)
                    .with_label(tree.origin(symbol), "missing `id` attribute")
                    .with_help("add an `id` attribute naming the symbol"));
            };

            if symbol == tree.root() {
                return Err(Diagnostic::error(format!(
                    "symbol `{name}` is the document root and cannot be removed"
                ))
                .with_code(ErrorCode::E101)
                .with_label(tree.origin(symbol), "root symbol")
                .with_help("wrap the symbol in another element"));
            }

            if let Some(&previous) = symbols.get(name) {
                match config.duplicates() {
                    DuplicateSymbols::LastWins => {
                        warn!(symbol = name; "Symbol defined more than once, the last definition wins");
                        warnings.push(
                            Diagnostic::warning(format!("symbol `{name}` is redefined"))
                                .with_code(ErrorCode::E102)
                                .with_label(tree.origin(symbol), "this definition is used")
                                .with_secondary_label(tree.origin(previous), "ignored definition"),
                        );
                    }
                    DuplicateSymbols::Error => {
                        return Err(Diagnostic::error(format!(
                            "symbol `{name}` is defined multiple times"
                        ))
                        .with_code(ErrorCode::E102)
                        .with_label(tree.origin(symbol), "duplicate definition")
                        .with_secondary_label(tree.origin(previous), "first defined here")
                        .with_help("rename one of the symbols"));
                    }
                }
            }

            debug!(symbol = name; "Registered symbol");
            symbols.insert(name.to_string(), symbol);
        }

        for symbol in found {
            tree.detach(symbol);
        }

        info!(count = symbols.len(); "Symbols collected");
        Ok(Self { symbols, warnings })
    }

    /// The detached `<Symbol>` node registered under `name`.
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.symbols.get(name).copied()
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the document defined no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Identifiers in the order they were first defined.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    /// Non-fatal findings, currently one per redefined identifier.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use trellis_parser::parse_markup;

    use super::*;

    fn build(source: &str, duplicates: DuplicateSymbols) -> (Tree, Result<SymbolTable>) {
        let mut tree = parse_markup(source, None).expect("valid markup");
        let table = SymbolTable::build(&mut tree, &SymbolsConfig::new(duplicates));
        (tree, table)
    }

    #[test]
    fn test_symbols_are_detached() {
        let (tree, table) = build(
            r#"<Root><Symbol id="a"><A/></Symbol><B/><Symbol id="b"><C/></Symbol></Root>"#,
            DuplicateSymbols::LastWins,
        );
        let table = table.expect("symbols build");

        assert_eq!(table.names().collect::<Vec<_>>(), ["a", "b"]);
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 1);
        assert_eq!(tree.tag(tree.children(root)[0]), "B");

        let a = table.get("a").expect("a registered");
        assert_eq!(tree.parent(a), None);
        assert_eq!(tree.tag(tree.children(a)[0]), "A");
    }

    #[test]
    fn test_nested_symbols_are_registered() {
        let (tree, table) = build(
            r#"<Root><Symbol id="outer"><Symbol id="inner"><X/></Symbol><Y/></Symbol></Root>"#,
            DuplicateSymbols::LastWins,
        );
        let table = table.expect("symbols build");

        let outer = table.get("outer").expect("outer registered");
        assert!(table.get("inner").is_some());
        let children: Vec<&str> = tree.children(outer).iter().map(|&c| tree.tag(c)).collect();
        assert_eq!(children, ["Y"]);
    }

    #[test]
    fn test_duplicates_last_wins() {
        let (tree, table) = build(
            r#"<Root><Symbol id="a"><First/></Symbol><Symbol id="a"><Second/></Symbol></Root>"#,
            DuplicateSymbols::LastWins,
        );
        let table = table.expect("symbols build");
        let a = table.get("a").expect("a registered");
        assert_eq!(tree.tag(tree.children(a)[0]), "Second");
        assert_eq!(table.len(), 1);

        let [warning] = table.warnings() else {
            panic!("expected one warning, got {:?}", table.warnings());
        };
        assert!(warning.severity().is_warning());
        assert_eq!(warning.code(), Some(ErrorCode::E102));
        assert_eq!(warning.labels().len(), 2);
    }

    #[test]
    fn test_duplicates_error() {
        let (_, table) = build(
            r#"<Root><Symbol id="a"/><Symbol id="a"/></Root>"#,
            DuplicateSymbols::Error,
        );
        let err = table.expect_err("duplicate rejected");
        assert_eq!(err.code(), Some(ErrorCode::E102));
        assert_eq!(err.labels().len(), 2);
    }

    #[test]
    fn test_missing_identifier() {
        let (_, table) = build(r#"<Root><Symbol/></Root>"#, DuplicateSymbols::LastWins);
        assert_eq!(table.expect_err("no id").code(), Some(ErrorCode::E100));
    }

    #[test]
    fn test_root_symbol() {
        let (_, table) = build(r#"<Symbol id="top"><A/></Symbol>"#, DuplicateSymbols::LastWins);
        assert_eq!(table.expect_err("root").code(), Some(ErrorCode::E101));
    }
}
