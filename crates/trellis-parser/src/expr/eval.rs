//! Tree-walking interpreter for the expression language.

use std::{cmp::Ordering, rc::Rc};

use indexmap::IndexMap;
use log::trace;

use crate::expr::{
    Environment, ExprError, Function, Value,
    ast::{BinaryOp, CompareOp, Expr, Statement, UnaryOp},
    builtins, parser,
};

/// Maximum nesting of user function calls.
const MAX_CALL_DEPTH: usize = 64;

/// Largest string or list built by repetition.
const MAX_REPEAT_LEN: usize = 1 << 24;

/// Evaluate a single expression.
///
/// # Errors
///
/// Returns an [`ExprError`] when the source does not parse or evaluation
/// fails.
pub fn evaluate(source: &str, env: &mut Environment) -> Result<Value, ExprError> {
    let expr = parser::parse_expression(source)?;
    Interpreter::new(env).eval(&expr)
}

/// Run a program of statements, binding names in `env`.
///
/// Returns the value of the last statement when it is a bare expression.
///
/// # Errors
///
/// Returns an [`ExprError`] when the source does not parse or a statement
/// fails. Bindings made by earlier statements are kept.
pub fn execute(source: &str, env: &mut Environment) -> Result<Option<Value>, ExprError> {
    let program = parser::parse_program(source)?;
    let mut interpreter = Interpreter::new(env);

    let mut last = None;
    for statement in &program {
        last = interpreter.run(statement)?;
    }
    Ok(last)
}

struct Interpreter<'env> {
    env: &'env mut Environment,
    depth: usize,
}

impl<'env> Interpreter<'env> {
    fn new(env: &'env mut Environment) -> Self {
        Self { env, depth: 0 }
    }

    fn run(&mut self, statement: &Statement) -> Result<Option<Value>, ExprError> {
        match statement {
            Statement::Assign(name, expr) => {
                let value = self.eval(expr)?;
                trace!(name = name.as_str(), value:% = value; "Bound name");
                self.env.set(name.clone(), value);
                Ok(None)
            }
            Statement::Function { name, params, body } => {
                let function = Function::new(name.clone(), params.clone(), body.clone());
                trace!(name = name.as_str(), arity = params.len(); "Defined function");
                self.env.set(name.clone(), Value::Function(Rc::new(function)));
                Ok(None)
            }
            Statement::Expr(expr) => self.eval(expr).map(Some),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ExprError> {
        match expr {
            Expr::None => Ok(Value::None),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(n) => Ok(Value::Float(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Name(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::UndefinedName(name.clone())),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Map(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval(key)?.to_key()?;
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            Expr::Unary(op, operand) => {
                let operand = self.eval(operand)?;
                unary(*op, operand)
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, &lhs, &rhs)
            }
            Expr::Compare(first, rest) => {
                let mut left = self.eval(first)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::And(lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                if lhs.is_truthy() { self.eval(rhs) } else { Ok(lhs) }
            }
            Expr::Or(lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                if lhs.is_truthy() { Ok(lhs) } else { self.eval(rhs) }
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Call(callee, args) => self.call(callee, args),
            Expr::Index(container, index) => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                subscript(&container, &index)
            }
            Expr::Attribute(object, name) => {
                let object = self.eval(object)?;
                match object {
                    Value::Map(mut entries) => entries
                        .swap_remove(name)
                        .ok_or_else(|| ExprError::KeyNotFound(name.clone())),
                    other => Err(ExprError::type_error(format!(
                        "'{}' object has no attribute '{name}'",
                        other.type_name()
                    ))),
                }
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, ExprError> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    /// Call by name: user bindings shadow builtins.
    fn call_named(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
        match self.env.get(name).cloned() {
            Some(callee) => self.call_value(callee, args),
            None => match builtins::lookup(name) {
                Some(builtin) => builtin(args),
                None => Err(ExprError::UndefinedName(name.to_string())),
            },
        }
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, ExprError> {
        match callee {
            Expr::Name(name) => {
                let args = self.eval_args(args)?;
                self.call_named(name, args)
            }
            // `value.name(args)` is `name(value, args)`
            Expr::Attribute(receiver, name) => {
                let mut values = vec![self.eval(receiver)?];
                values.extend(self.eval_args(args)?);
                self.call_named(name, values)
            }
            other => {
                let callee = self.eval(other)?;
                let args = self.eval_args(args)?;
                self.call_value(callee, args)
            }
        }
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, ExprError> {
        let Value::Function(function) = callee else {
            return Err(ExprError::type_error(format!(
                "'{}' object is not callable",
                callee.type_name()
            )));
        };

        if function.params().len() != args.len() {
            return Err(ExprError::type_error(format!(
                "{}() takes {} arguments but {} were given",
                function.name(),
                function.params().len(),
                args.len()
            )));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ExprError::RecursionLimit);
        }

        let frame = function.params().iter().cloned().zip(args).collect();
        self.env.push_frame(frame);
        self.depth += 1;
        let result = self.eval(function.body());
        self.depth -= 1;
        self.env.pop_frame();
        result
    }
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value, ExprError> {
    match (op, &operand) {
        (UnaryOp::Not, _) => Ok(Value::Bool(!operand.is_truthy())),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Pos, Value::Float(n)) => Ok(Value::Float(*n)),
        (UnaryOp::Neg, _) if operand.as_i64().is_some() => operand
            .as_i64()
            .and_then(i64::checked_neg)
            .map(Value::Int)
            .ok_or_else(overflow),
        (UnaryOp::Pos, _) if operand.as_i64().is_some() => {
            Ok(operand.as_i64().map_or(Value::None, Value::Int))
        }
        _ => Err(ExprError::type_error(format!(
            "bad operand type for unary {op}: '{}'",
            operand.type_name()
        ))),
    }
}

fn overflow() -> ExprError {
    ExprError::value_error("integer overflow")
}

fn repeat_count(n: i64, len: usize) -> Result<usize, ExprError> {
    let count = usize::try_from(n.max(0)).map_err(|_| overflow())?;
    match count.checked_mul(len) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(count),
        _ => Err(ExprError::value_error("repetition result is too large")),
    }
}

pub(crate) fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Mul, Value::Str(s), n) | (BinaryOp::Mul, n, Value::Str(s))
            if n.as_i64().is_some() =>
        {
            let count = repeat_count(n.as_i64().unwrap_or_default(), s.len())?;
            Ok(Value::Str(s.repeat(count)))
        }
        (BinaryOp::Mul, Value::List(items), n) | (BinaryOp::Mul, n, Value::List(items))
            if n.as_i64().is_some() =>
        {
            let count = repeat_count(n.as_i64().unwrap_or_default(), items.len())?;
            Ok(Value::List(
                std::iter::repeat_n(items.iter().cloned(), count)
                    .flatten()
                    .collect(),
            ))
        }
        _ => match (lhs.as_i64(), rhs.as_i64()) {
            (Some(a), Some(b)) => int_arithmetic(op, a, b),
            _ => match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => float_arithmetic(op, a, b),
                _ => Err(ExprError::type_error(format!(
                    "unsupported operand type(s) for {op}: '{}' and '{}'",
                    lhs.type_name(),
                    rhs.type_name()
                ))),
            },
        },
    }
}

#[allow(clippy::cast_precision_loss)]
fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value, ExprError> {
    let value = match op {
        BinaryOp::Add => a.checked_add(b).ok_or_else(overflow)?,
        BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
        BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
        BinaryOp::Div => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            let quotient = a.checked_div(b).ok_or_else(overflow)?;
            if a % b != 0 && (a < 0) != (b < 0) {
                quotient - 1
            } else {
                quotient
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            let remainder = a.checked_rem(b).unwrap_or(0);
            if remainder != 0 && (remainder < 0) != (b < 0) {
                remainder + b
            } else {
                remainder
            }
        }
        BinaryOp::Pow => match u32::try_from(b) {
            Ok(exponent) => a.checked_pow(exponent).ok_or_else(overflow)?,
            Err(_) if b < 0 => return Ok(Value::Float((a as f64).powf(b as f64))),
            Err(_) => return Err(overflow()),
        },
    };
    Ok(Value::Int(value))
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value, ExprError> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
            return Err(ExprError::DivisionByZero);
        }
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => {
            let remainder = a % b;
            if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
                remainder + b
            } else {
                remainder
            }
        }
        BinaryOp::Pow => a.powf(b),
    };
    Ok(Value::Float(value))
}

/// Total order used by comparisons, `min`, `max` and `sorted`.
pub(crate) fn order(lhs: &Value, rhs: &Value) -> Result<Ordering, ExprError> {
    let unordered = || {
        ExprError::type_error(format!(
            "comparison not supported between instances of '{}' and '{}'",
            lhs.type_name(),
            rhs.type_name()
        ))
    };

    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                match order(x, y)? {
                    Ordering::Equal => {}
                    other => return Ok(other),
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => match (lhs.as_i64(), rhs.as_i64()) {
            (Some(a), Some(b)) => Ok(a.cmp(&b)),
            _ => match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(unordered),
                _ => Err(unordered()),
            },
        },
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, ExprError> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(ExprError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(items.contains(item)),
        Value::Map(entries) => Ok(entries.contains_key(&item.to_key()?)),
        other => Err(ExprError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool, ExprError> {
    match op {
        CompareOp::Eq => Ok(lhs == rhs),
        CompareOp::NotEq => Ok(lhs != rhs),
        CompareOp::In => contains(rhs, lhs),
        CompareOp::NotIn => contains(rhs, lhs).map(|found| !found),
        CompareOp::Less => Ok(order(lhs, rhs)?.is_lt()),
        CompareOp::LessEq => Ok(order(lhs, rhs)?.is_le()),
        CompareOp::Greater => Ok(order(lhs, rhs)?.is_gt()),
        CompareOp::GreaterEq => Ok(order(lhs, rhs)?.is_ge()),
    }
}

/// Resolve a possibly negative index against a length.
pub(crate) fn resolve_index(index: i64, len: usize) -> Result<usize, ExprError> {
    let signed_len = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if index < 0 { index + signed_len } else { index };
    usize::try_from(resolved)
        .ok()
        .filter(|&i| i < len)
        .ok_or(ExprError::IndexOutOfRange { index, len })
}

fn subscript(container: &Value, index: &Value) -> Result<Value, ExprError> {
    let position = |len: usize| match index.as_i64() {
        Some(i) => resolve_index(i, len),
        None => Err(ExprError::type_error(format!(
            "{} indices must be integers, not {}",
            container.type_name(),
            index.type_name()
        ))),
    };

    match container {
        Value::List(items) => Ok(items[position(items.len())?].clone()),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::Str(chars[position(chars.len())?].to_string()))
        }
        Value::Map(entries) => {
            let key = index.to_key()?;
            entries
                .get(&key)
                .cloned()
                .ok_or(ExprError::KeyNotFound(key))
        }
        other => Err(ExprError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}
