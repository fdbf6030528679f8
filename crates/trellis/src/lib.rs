//! Trellis - a macro-expansion preprocessor for XML documents.
//!
//! A document is loaded with its imports spliced in, then expanded by a
//! fixed sequence of phases, each finishing before the next starts:
//!
//! 1. [`symbols`]: collect and detach `<Symbol>` fragments
//! 2. [`uses`]: replace `<Use>` with edited clones of those fragments
//! 3. [`repeats`]: unroll `<Repeat>`
//! 4. [`evaluate`]: run `<Define>` bodies and substitute `{expression}` spans
//! 5. [`conditionals`]: keep or drop `<If>` subtrees
//! 6. [`output`]: strip reserved attributes
//!
//! The result contains no macro constructs and is serialized with
//! [`Preprocessor::render`].

pub mod conditionals;
pub mod config;
pub mod evaluate;
pub mod loader;
pub mod output;
pub mod repeats;
pub mod symbols;
pub mod uses;

mod document;
mod error;

pub use trellis_core::{Construct, NodeId, SourceMap, Tree};
pub use trellis_parser::{Diagnostic, ErrorCode};

pub use document::Document;
pub use error::TrellisError;

use std::path::Path;

use log::{debug, info, trace};

use config::AppConfig;
use loader::Loader;
use symbols::SymbolTable;

/// Runs the preprocessing pipeline.
///
/// # Examples
///
/// ```rust,no_run
/// use trellis::{Preprocessor, config::AppConfig};
///
/// let preprocessor = Preprocessor::new(AppConfig::default());
///
/// // Load, expand and serialize in one go
/// let document = preprocessor
///     .process_file("watchface.xml")
///     .expect("Failed to preprocess");
/// let xml = preprocessor.render(&document).expect("Failed to render");
///
/// // Or use default config
/// let preprocessor = Preprocessor::default();
/// ```
#[derive(Debug, Default)]
pub struct Preprocessor {
    config: AppConfig,
}

impl Preprocessor {
    /// Create a new preprocessor with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Load a document from disk and splice in its imports.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Expand`] for unreadable or malformed files
    /// and for bad imports.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Document, TrellisError> {
        let mut sources = SourceMap::new();
        let loaded = Loader::new(self.config.loader(), &mut sources).load_file(path.as_ref());
        match loaded {
            Ok(tree) => Ok(Document::new(tree, sources)),
            Err(err) => Err(TrellisError::new_expand_error(err, sources)),
        }
    }

    /// Load a document from text. Imports resolve relative to `base_dir`.
    ///
    /// # Errors
    ///
    /// The same as [`Preprocessor::load`].
    pub fn load_str(
        &self,
        source: &str,
        base_dir: impl AsRef<Path>,
    ) -> Result<Document, TrellisError> {
        let mut sources = SourceMap::new();
        let loaded = Loader::new(self.config.loader(), &mut sources).load_source(
            "<input>",
            source,
            base_dir.as_ref(),
        );
        match loaded {
            Ok(tree) => Ok(Document::new(tree, sources)),
            Err(err) => Err(TrellisError::new_expand_error(err, sources)),
        }
    }

    /// Run every expansion phase on a loaded document.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Expand`] with the diagnostic of the first
    /// phase that fails.
    pub fn expand(&self, document: &mut Document) -> Result<(), TrellisError> {
        let result = self.run_phases(document);
        result.map_err(|err| TrellisError::new_expand_error(err, document.sources().clone()))
    }

    fn run_phases(&self, document: &mut Document) -> trellis_parser::error::Result<()> {
        let (tree, symbols, env) = document.parts_mut();

        *symbols = SymbolTable::build(tree, self.config.symbols())?;
        debug!(symbols:? = symbols.names().collect::<Vec<_>>(); "Symbol table built");
        uses::resolve_uses(tree, symbols)?;
        trace!(tree:% = tree.outline(tree.root()); "Uses resolved");

        repeats::expand_repeats(tree, env)?;
        trace!(tree:% = tree.outline(tree.root()); "Repeats expanded");

        evaluate::evaluate_document(tree, env)?;
        conditionals::prune_conditionals(tree, env)?;
        output::strip_attributes(tree, self.config.output().strip_prefix());

        debug!(nodes = tree.subtree(tree.root()).len(); "Expansion finished");
        trace!(tree:% = tree.outline(tree.root()); "Expanded document");
        Ok(())
    }

    /// Load and expand a document from disk.
    ///
    /// # Errors
    ///
    /// See [`Preprocessor::load`] and [`Preprocessor::expand`].
    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<Document, TrellisError> {
        let path = path.as_ref();
        info!(path:% = path.display(); "Preprocessing file");
        let mut document = self.load(path)?;
        self.expand(&mut document)?;
        Ok(document)
    }

    /// Load and expand a document from text.
    ///
    /// # Errors
    ///
    /// See [`Preprocessor::load_str`] and [`Preprocessor::expand`].
    pub fn process_str(
        &self,
        source: &str,
        base_dir: impl AsRef<Path>,
    ) -> Result<Document, TrellisError> {
        let mut document = self.load_str(source, base_dir)?;
        self.expand(&mut document)?;
        Ok(document)
    }

    /// Serialize a document as markup text.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Output`] if serialization fails.
    pub fn render(&self, document: &Document) -> Result<String, TrellisError> {
        let text = output::render(document.tree(), self.config.output())?;
        info!(bytes = text.len(); "Document rendered");
        Ok(text)
    }
}
