//! Trellis Core Types and Definitions
//!
//! This crate provides the foundational types shared by every stage of the
//! Trellis markup preprocessor. It includes:
//!
//! - **Tree**: An arena-backed element tree with parent back-references ([`tree`] module)
//! - **Constructs**: Dispatch from tag names to macro constructs ([`construct`] module)
//! - **Sources**: File bookkeeping, spans and line lookup for diagnostics ([`source`] module)
//! - **Paths**: Element path selection used by delete/transform operators ([`path`] module)

pub mod construct;
pub mod path;
pub mod source;
pub mod tree;

pub use construct::Construct;
pub use source::{Origin, SourceId, SourceMap, Span};
pub use tree::{NodeId, Tree};
