//! Runtime values of the expression language.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use trellis_core::Tree;

use crate::expr::{ExprError, ast::Expr};

/// A value produced by evaluation.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// String-keyed map; insertion order is kept.
    Map(IndexMap<String, Value>),
    /// A detached markup fragment, spliced into the document when it is the
    /// result of an inline expression.
    Node(Rc<Tree>),
    Function(Rc<Function>),
}

/// A function defined in a `<Define>` body with `name(params) = body`.
#[derive(Debug)]
pub struct Function {
    name: String,
    params: Vec<String>,
    body: Expr,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Expr) -> Self {
        Self {
            name: name.into(),
            params,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }
}

impl Value {
    /// Name of the value's type, as shown in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Node(_) => "element",
            Value::Function(_) => "function",
        }
    }

    /// Truthiness: zero, empty and `None` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Node(_) | Value::Function(_) => true,
        }
    }

    /// Numeric view of booleans, integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Integer view of booleans and integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Int(_) | Value::Float(_))
    }

    /// The items produced by iterating the value: list items, the
    /// characters of a string or the keys of a map.
    pub fn iterate(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.clone()),
            Value::Str(s) => Some(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Map(entries) => Some(entries.keys().cloned().map(Value::Str).collect()),
            _ => None,
        }
    }

    /// Convert the value into a map key.
    pub fn to_key(&self) -> Result<String, ExprError> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) => Ok(self.to_string()),
            _ => Err(ExprError::type_error(format!(
                "unhashable type: '{}'",
                self.type_name()
            ))),
        }
    }

    /// Source text that evaluates back to this value.
    ///
    /// Nodes and functions have no literal form.
    pub fn to_literal(&self) -> Option<String> {
        let literal = match self {
            Value::Str(s) => quote(s),
            Value::Float(n) if !n.is_finite() => format!("float('{}')", format_float(*n)),
            Value::List(items) => {
                let items = items
                    .iter()
                    .map(Value::to_literal)
                    .collect::<Option<Vec<_>>>()?;
                format!("[{}]", items.join(", "))
            }
            Value::Map(entries) => {
                let entries = entries
                    .iter()
                    .map(|(key, value)| Some(format!("{}: {}", quote(key), value.to_literal()?)))
                    .collect::<Option<Vec<_>>>()?;
                format!("{{{}}}", entries.join(", "))
            }
            Value::Node(_) | Value::Function(_) => return None,
            Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) => self.to_string(),
        };
        Some(literal)
    }

    /// Representation used inside containers: strings are quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => quote(s),
            _ => self.to_string(),
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Shortest round-trip float text, with exponent notation for very large
/// and very small magnitudes.
pub(crate) fn format_float(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = n.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{n:e}");
        if let Some((mantissa, exponent)) = text.split_once('e') {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            return format!("{mantissa}e{sign}{digits:0>2}");
        }
        return text;
    }

    let text = n.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", quote(key), value.repr())?;
                }
                write!(f, "}}")
            }
            Value::Node(tree) => write!(f, "<element {}>", tree.tag(tree.root())),
            Value::Function(function) => write!(f, "<function {}>", function.name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a.subtree_eq(a.root(), b, b.root()),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Float(_), _) | (_, Value::Float(_)) => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            _ => match (self.as_i64(), other.as_i64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Tree> for Value {
    fn from(value: Tree) -> Self {
        Value::Node(Rc::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Float(1e20).to_string(), "1e+20");
        assert_eq!(Value::Float(1.5e-5).to_string(), "1.5e-05");
        assert_eq!(Value::from("a'b").to_string(), "a'b");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::from("x")]).to_string(),
            "[1, 'x']"
        );

        let mut map = IndexMap::new();
        map.insert("w".to_string(), Value::Float(1.0));
        assert_eq!(Value::Map(map).to_string(), "{'w': 1.0}");
    }

    #[test]
    fn test_literals() {
        assert_eq!(Value::from("it's").to_literal().as_deref(), Some(r"'it\'s'"));
        assert_eq!(Value::Int(4).to_literal().as_deref(), Some("4"));
        assert_eq!(
            Value::Float(f64::INFINITY).to_literal().as_deref(),
            Some("float('inf')")
        );
        assert_eq!(
            Value::List(vec![Value::None, Value::Bool(false)])
                .to_literal()
                .as_deref(),
            Some("[None, False]")
        );
        assert_eq!(Value::from(Tree::new("g")).to_literal(), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::Float(0.1).is_truthy());
        assert!(Value::from(Tree::new("g")).is_truthy());
    }

    #[test]
    fn test_numeric_equality() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Int(1), Value::from("1"));
        assert_ne!(Value::None, Value::Bool(false));
    }

    #[test]
    fn test_iterate() {
        assert_eq!(
            Value::from("ab").iterate(),
            Some(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(Value::Int(3).iterate(), None);
    }

    #[test]
    fn test_map_keys() {
        assert_eq!(Value::Int(2).to_key().as_deref(), Ok("2"));
        assert!(Value::List(vec![]).to_key().is_err());
    }
}
