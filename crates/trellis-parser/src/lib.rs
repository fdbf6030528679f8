//! # Trellis Parser
//!
//! Reading and evaluation for the Trellis markup preprocessor:
//!
//! - [`markup`]: XML text into a [`trellis_core::Tree`]
//! - [`inline`]: `{expression}` spans and `PARENT`/`SELF` scope references
//! - [`expr`]: the expression sublanguage used by `<Define>`, `<Repeat>`,
//!   `<If>` and inline spans
//! - [`error`]: diagnostics with error codes and source labels
//!
//! ## Usage
//!
//! ```
//! # use trellis_parser::expr::{Environment, Value, evaluate, execute};
//! let mut env = Environment::new();
//! execute("width = 40\nhalf(x) = x / 2", &mut env).unwrap();
//!
//! let value = evaluate("half(width)", &mut env).unwrap();
//! assert_eq!(value, Value::Float(20.0));
//! ```

pub mod error;
pub mod expr;
pub mod inline;
pub mod markup;

pub use error::{Diagnostic, ErrorCode, Label, Severity};
pub use markup::{MarkupError, parse_markup};
