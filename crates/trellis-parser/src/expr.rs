//! The expression sublanguage.
//!
//! `<Define>` bodies, inline `{expression}` spans, `<Repeat in="...">` and
//! `<If condition="...">` all use one small, Python-flavoured language:
//!
//! ```text
//! width = 40
//! half(x) = x / 2
//! labels = ["a", "b", "c"]
//! label = upper(labels[1]) if width > 30 else "?"
//! ```
//!
//! Source text is split into tokens by the [`lexer`], parsed into [`ast`]
//! nodes by the [`parser`] and run by the [`eval`] interpreter against an
//! explicit [`Environment`]. There are no loops and no side effects besides
//! bindings in the environment and the `log` builtin.

pub mod ast;
pub mod builtins;
pub mod env;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod tokens;
pub mod value;

mod error;

pub use env::Environment;
pub use error::ExprError;
pub use eval::{evaluate, execute};
pub use value::{Function, Value};
