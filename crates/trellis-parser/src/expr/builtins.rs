//! Builtin functions available to every expression.
//!
//! Only the functions listed in [`NAMES`] exist; there is no way to reach
//! the host system from an expression. A name bound in the
//! [`Environment`](super::Environment) shadows the builtin of the same name.

use std::{cmp::Ordering, rc::Rc};

use indexmap::IndexMap;
use log::info;
use trellis_core::Tree;

use crate::{
    expr::{
        ExprError, Value,
        eval::{binary, order},
        ast::BinaryOp,
    },
    markup::parse_markup,
};

/// Signature shared by all builtins.
pub type Builtin = fn(Vec<Value>) -> Result<Value, ExprError>;

/// Longest list `range` may produce.
const MAX_RANGE_LEN: usize = 1_000_000;

/// Names of all builtins.
pub const NAMES: &[&str] = &[
    "range", "len", "str", "int", "float", "bool", "abs", "min", "max", "round", "sum", "sorted",
    "reversed", "upper", "lower", "join", "split", "replace", "keys", "values", "sqrt", "sin",
    "cos", "tan", "floor", "ceil", "radians", "degrees", "element", "markup", "log",
];

/// Find a builtin by name.
pub fn lookup(name: &str) -> Option<Builtin> {
    let builtin: Builtin = match name {
        "range" => range,
        "len" => len,
        "str" => to_str,
        "int" => to_int,
        "float" => to_float,
        "bool" => to_bool,
        "abs" => abs,
        "min" => |args| extremum("min", args, Ordering::Less),
        "max" => |args| extremum("max", args, Ordering::Greater),
        "round" => round,
        "sum" => sum,
        "sorted" => sorted,
        "reversed" => reversed,
        "upper" => |args| map_str("upper", args, |s| s.to_uppercase()),
        "lower" => |args| map_str("lower", args, |s| s.to_lowercase()),
        "join" => join,
        "split" => split,
        "replace" => replace,
        "keys" => keys,
        "values" => values,
        "sqrt" => sqrt,
        "sin" => |args| math("sin", args, f64::sin),
        "cos" => |args| math("cos", args, f64::cos),
        "tan" => |args| math("tan", args, f64::tan),
        "radians" => |args| math("radians", args, f64::to_radians),
        "degrees" => |args| math("degrees", args, f64::to_degrees),
        "floor" => |args| rounding("floor", args, f64::floor),
        "ceil" => |args| rounding("ceil", args, f64::ceil),
        "element" => element,
        "markup" => markup,
        "log" => log_value,
        _ => return None,
    };
    Some(builtin)
}

fn check_arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), ExprError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("{min}")
    } else {
        format!("{min} to {max}")
    };
    Err(ExprError::type_error(format!(
        "{name}() takes {expected} arguments but {} were given",
        args.len()
    )))
}

fn expect_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, ExprError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(ExprError::type_error(format!(
            "{name}() expects a string, not '{}'",
            other.type_name()
        ))),
    }
}

fn expect_int(name: &str, value: &Value) -> Result<i64, ExprError> {
    value.as_i64().ok_or_else(|| {
        ExprError::type_error(format!(
            "{name}() expects an integer, not '{}'",
            value.type_name()
        ))
    })
}

fn expect_number(name: &str, value: &Value) -> Result<f64, ExprError> {
    value.as_f64().ok_or_else(|| {
        ExprError::type_error(format!(
            "{name}() expects a number, not '{}'",
            value.type_name()
        ))
    })
}

fn expect_iterable(name: &str, value: &Value) -> Result<Vec<Value>, ExprError> {
    value.iterate().ok_or_else(|| {
        ExprError::type_error(format!(
            "{name}() expects an iterable, not '{}'",
            value.type_name()
        ))
    })
}

fn expect_map<'a>(name: &str, value: &'a Value) -> Result<&'a IndexMap<String, Value>, ExprError> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(ExprError::type_error(format!(
            "{name}() expects a dict, not '{}'",
            other.type_name()
        ))),
    }
}

/// Truncate a float towards zero into an integer.
#[allow(clippy::cast_possible_truncation)]
fn float_to_int(n: f64) -> Result<i64, ExprError> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !n.is_finite() {
        return Err(ExprError::value_error(format!(
            "cannot convert float {n} to integer"
        )));
    }
    let truncated = n.trunc();
    if (-LIMIT..LIMIT).contains(&truncated) {
        Ok(truncated as i64)
    } else {
        Err(ExprError::value_error("integer overflow"))
    }
}

fn range(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("range", &args, 1, 3)?;
    let bounds = args
        .iter()
        .map(|arg| expect_int("range", arg))
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step, ..] => (*start, *stop, *step),
        [] => (0, 0, 1),
    };
    if step == 0 {
        return Err(ExprError::value_error("range() arg 3 must not be zero"));
    }

    let span = if step > 0 {
        i128::from(stop) - i128::from(start)
    } else {
        i128::from(start) - i128::from(stop)
    };
    let count = if span <= 0 {
        0
    } else {
        let step = i128::from(step).abs();
        (span + step - 1) / step
    };
    if count > MAX_RANGE_LEN as i128 {
        return Err(ExprError::value_error(format!(
            "range() would produce more than {MAX_RANGE_LEN} items"
        )));
    }

    let mut items = Vec::new();
    let mut current = start;
    for _ in 0..count {
        items.push(Value::Int(current));
        current = current.saturating_add(step);
    }
    Ok(Value::List(items))
}

fn len(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("len", &args, 1, 1)?;
    let len = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(entries) => entries.len(),
        other => {
            return Err(ExprError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| ExprError::value_error("length does not fit an integer"))
}

fn to_str(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("str", &args, 0, 1)?;
    Ok(Value::Str(
        args.first().map(ToString::to_string).unwrap_or_default(),
    ))
}

fn to_int(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("int", &args, 0, 1)?;
    let Some(value) = args.first() else {
        return Ok(Value::Int(0));
    };
    match value {
        Value::Bool(_) | Value::Int(_) => Ok(Value::Int(expect_int("int", value)?)),
        Value::Float(n) => float_to_int(*n).map(Value::Int),
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            ExprError::value_error(format!("invalid literal for int(): '{s}'"))
        }),
        other => Err(ExprError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("float", &args, 0, 1)?;
    let Some(value) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    match value {
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            ExprError::value_error(format!("could not convert string to float: '{s}'"))
        }),
        other => expect_number("float", other).map(Value::Float),
    }
}

fn to_bool(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("bool", &args, 0, 1)?;
    Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
}

fn abs(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("abs", &args, 1, 1)?;
    match &args[0] {
        Value::Float(n) => Ok(Value::Float(n.abs())),
        other => expect_int("abs", other)?
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| ExprError::value_error("integer overflow")),
    }
}

fn extremum(name: &str, args: Vec<Value>, wanted: Ordering) -> Result<Value, ExprError> {
    if args.is_empty() {
        return Err(ExprError::type_error(format!(
            "{name}() expects at least 1 argument"
        )));
    }
    let items = if args.len() == 1 {
        expect_iterable(name, &args[0])?
    } else {
        args
    };

    let mut items = items.into_iter();
    let Some(mut best) = items.next() else {
        return Err(ExprError::value_error(format!("{name}() arg is an empty sequence")));
    };
    for item in items {
        if order(&item, &best)? == wanted {
            best = item;
        }
    }
    Ok(best)
}

fn round(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("round", &args, 1, 2)?;
    let digits = match args.get(1) {
        None | Some(Value::None) => None,
        Some(value) => Some(expect_int("round", value)?),
    };

    match (&args[0], digits) {
        (Value::Float(n), None) => float_to_int(n.round_ties_even()).map(Value::Int),
        (Value::Float(n), Some(digits)) => {
            let digits = i32::try_from(digits.clamp(-308, 308)).unwrap_or_default();
            let scale = 10f64.powi(digits);
            Ok(Value::Float((n * scale).round_ties_even() / scale))
        }
        (other, _) => Ok(Value::Int(expect_int("round", other)?)),
    }
}

fn sum(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("sum", &args, 1, 2)?;
    let start = args.get(1).cloned().unwrap_or(Value::Int(0));
    expect_iterable("sum", &args[0])?
        .iter()
        .try_fold(start, |total, item| binary(BinaryOp::Add, &total, item))
}

fn sorted(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("sorted", &args, 1, 1)?;
    let mut items = expect_iterable("sorted", &args[0])?;

    let mut error = None;
    items.sort_by(|a, b| {
        order(a, b).unwrap_or_else(|e| {
            error.get_or_insert(e);
            Ordering::Equal
        })
    });
    match error {
        Some(error) => Err(error),
        None => Ok(Value::List(items)),
    }
}

fn reversed(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("reversed", &args, 1, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Str(s.chars().rev().collect())),
        other => {
            let mut items = expect_iterable("reversed", other)?;
            items.reverse();
            Ok(Value::List(items))
        }
    }
}

fn map_str(name: &str, args: Vec<Value>, f: fn(&str) -> String) -> Result<Value, ExprError> {
    check_arity(name, &args, 1, 1)?;
    Ok(Value::Str(f(expect_str(name, &args[0])?)))
}

fn join(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("join", &args, 2, 2)?;
    let separator = expect_str("join", &args[0])?;
    let items = expect_iterable("join", &args[1])?;
    Ok(Value::Str(
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(separator),
    ))
}

fn split(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("split", &args, 1, 2)?;
    let text = expect_str("split", &args[0])?;
    let parts: Vec<Value> = match args.get(1) {
        None | Some(Value::None) => text.split_whitespace().map(Value::from).collect(),
        Some(separator) => {
            let separator = expect_str("split", separator)?;
            if separator.is_empty() {
                return Err(ExprError::value_error("empty separator"));
            }
            text.split(separator).map(Value::from).collect()
        }
    };
    Ok(Value::List(parts))
}

fn replace(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("replace", &args, 3, 3)?;
    let text = expect_str("replace", &args[0])?;
    let old = expect_str("replace", &args[1])?;
    let new = expect_str("replace", &args[2])?;
    Ok(Value::Str(text.replace(old, new)))
}

fn keys(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("keys", &args, 1, 1)?;
    let entries = expect_map("keys", &args[0])?;
    Ok(Value::List(entries.keys().cloned().map(Value::Str).collect()))
}

fn values(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("values", &args, 1, 1)?;
    let entries = expect_map("values", &args[0])?;
    Ok(Value::List(entries.values().cloned().collect()))
}

fn math(name: &str, args: Vec<Value>, f: fn(f64) -> f64) -> Result<Value, ExprError> {
    check_arity(name, &args, 1, 1)?;
    Ok(Value::Float(f(expect_number(name, &args[0])?)))
}

fn sqrt(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("sqrt", &args, 1, 1)?;
    let n = expect_number("sqrt", &args[0])?;
    if n < 0.0 {
        return Err(ExprError::value_error("math domain error"));
    }
    Ok(Value::Float(n.sqrt()))
}

fn rounding(name: &str, args: Vec<Value>, f: fn(f64) -> f64) -> Result<Value, ExprError> {
    check_arity(name, &args, 1, 1)?;
    match &args[0] {
        Value::Float(n) => float_to_int(f(*n)).map(Value::Int),
        other => expect_int(name, other).map(Value::Int),
    }
}

/// `element(tag, attrs?, text?)`: a new element node.
fn element(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("element", &args, 1, 3)?;
    let tag = expect_str("element", &args[0])?;
    if tag.is_empty() || tag.contains(|c: char| c.is_whitespace() || "<>&\"'/=".contains(c)) {
        return Err(ExprError::value_error(format!("invalid tag name '{tag}'")));
    }

    let mut tree = Tree::new(tag);
    let root = tree.root();
    match args.get(1) {
        None | Some(Value::None) => {}
        Some(attributes) => {
            for (name, value) in expect_map("element", attributes)? {
                tree.set_attribute(root, name.clone(), value.to_string());
            }
        }
    }
    match args.get(2) {
        None | Some(Value::None) => {}
        Some(text) => tree.set_text(root, Some(text.to_string())),
    }
    Ok(Value::Node(Rc::new(tree)))
}

/// `markup(source)`: parse markup text into a node.
fn markup(args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("markup", &args, 1, 1)?;
    let source = expect_str("markup", &args[0])?;
    let tree = parse_markup(source, None)?;
    Ok(Value::Node(Rc::new(tree)))
}

/// `log(value, prompt?)`: log the value and return it unchanged.
fn log_value(mut args: Vec<Value>) -> Result<Value, ExprError> {
    check_arity("log", &args, 1, 2)?;
    let prompt = match args.get(1) {
        Some(prompt) => prompt.to_string(),
        None => String::new(),
    };
    let value = args.swap_remove(0);
    info!(value:% = value; "{prompt}");
    Ok(value)
}
