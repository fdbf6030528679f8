//! Configuration types for Trellis preprocessing.
//!
//! This module provides configuration structures that control how documents
//! are loaded, how symbols are collected and how the result is written. All
//! types implement [`serde::Deserialize`] for loading from external sources.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`LoaderConfig`] - Import handling: code file extensions and import depth.
//! - [`SymbolsConfig`] - What to do with duplicate symbol identifiers.
//! - [`OutputConfig`] - Attribute stripping and the XML declaration.
//!
//! # Example
//!
//! ```
//! # use trellis::config::{AppConfig, DuplicateSymbols};
//! let config = AppConfig::default();
//! assert_eq!(config.output().strip_prefix(), "data-");
//! assert_eq!(config.symbols().duplicates(), DuplicateSymbols::LastWins);
//! ```

use serde::Deserialize;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Loader configuration section.
    #[serde(default)]
    loader: LoaderConfig,

    /// Symbol table configuration section.
    #[serde(default)]
    symbols: SymbolsConfig,

    /// Output configuration section.
    #[serde(default)]
    output: OutputConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(loader: LoaderConfig, symbols: SymbolsConfig, output: OutputConfig) -> Self {
        Self {
            loader,
            symbols,
            output,
        }
    }

    /// Returns the loader configuration.
    pub fn loader(&self) -> &LoaderConfig {
        &self.loader
    }

    /// Returns the symbol table configuration.
    pub fn symbols(&self) -> &SymbolsConfig {
        &self.symbols
    }

    /// Returns the output configuration.
    pub fn output(&self) -> &OutputConfig {
        &self.output
    }
}

/// Import handling.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    /// Extensions (without the dot) of files imported as definition code
    /// instead of markup.
    #[serde(default = "default_code_extensions")]
    code_extensions: Vec<String>,

    /// Maximum nesting of imports.
    #[serde(default = "default_max_import_depth")]
    max_import_depth: usize,
}

fn default_code_extensions() -> Vec<String> {
    vec!["defs".to_string()]
}

fn default_max_import_depth() -> usize {
    64
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            code_extensions: default_code_extensions(),
            max_import_depth: default_max_import_depth(),
        }
    }
}

impl LoaderConfig {
    /// Creates a new [`LoaderConfig`].
    pub fn new(code_extensions: Vec<String>, max_import_depth: usize) -> Self {
        Self {
            code_extensions,
            max_import_depth,
        }
    }

    /// Returns the extensions treated as definition code.
    pub fn code_extensions(&self) -> &[String] {
        &self.code_extensions
    }

    /// Returns the maximum import depth.
    pub fn max_import_depth(&self) -> usize {
        self.max_import_depth
    }

    /// Whether a file with this extension is imported as code.
    pub fn is_code_extension(&self, extension: &str) -> bool {
        self.code_extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(extension))
    }
}

/// Policy for symbols that share an identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateSymbols {
    /// The later definition replaces the earlier one; a warning is logged.
    #[default]
    LastWins,
    /// A second definition is an error.
    Error,
}

/// Symbol table settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymbolsConfig {
    #[serde(default)]
    duplicates: DuplicateSymbols,
}

impl SymbolsConfig {
    /// Creates a new [`SymbolsConfig`].
    pub fn new(duplicates: DuplicateSymbols) -> Self {
        Self { duplicates }
    }

    /// Returns the duplicate symbol policy.
    pub fn duplicates(&self) -> DuplicateSymbols {
        self.duplicates
    }
}

/// Output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Attributes whose name starts with this prefix are removed before
    /// output. An empty prefix disables stripping.
    #[serde(default = "default_strip_prefix")]
    strip_prefix: String,

    /// Write an `<?xml ...?>` declaration before the root element.
    #[serde(default)]
    xml_declaration: bool,
}

fn default_strip_prefix() -> String {
    "data-".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            strip_prefix: default_strip_prefix(),
            xml_declaration: false,
        }
    }
}

impl OutputConfig {
    /// Creates a new [`OutputConfig`].
    pub fn new(strip_prefix: impl Into<String>, xml_declaration: bool) -> Self {
        Self {
            strip_prefix: strip_prefix.into(),
            xml_declaration,
        }
    }

    /// Returns the prefix of attributes removed before output.
    pub fn strip_prefix(&self) -> &str {
        &self.strip_prefix
    }

    /// Returns whether the XML declaration is written.
    pub fn xml_declaration(&self) -> bool {
        self.xml_declaration
    }
}
