//! Parser for expression-language tokens.
//!
//! This module transforms the token stream from the [`lexer`](super::lexer)
//! into [`ast`](super::ast) nodes. The public entry points are
//! [`parse_program`] for `<Define>` bodies and [`parse_expression`] for a
//! single expression.
//!
//! Operator precedence, loosest first:
//!
//! | Level       | Syntax                                   |
//! |-------------|------------------------------------------|
//! | conditional | `a if cond else b`                       |
//! | or          | `a or b`                                 |
//! | and         | `a and b`                                |
//! | not         | `not a`                                  |
//! | comparison  | `== != < <= > >= in`, `not in` (chained) |
//! | additive    | `+ -`                                    |
//! | term        | `* / // %`                               |
//! | unary       | `-a`, `+a`                               |
//! | power       | `a ** b` (right associative)             |
//! | postfix     | `f(x)`, `a[i]`, `a.name`                 |

use winnow::{
    Parser as _,
    combinator::{alt, opt, repeat},
    error::{ContextError, ErrMode},
    stream::{Stateful, Stream, TokenSlice},
    token::any,
};

use crate::expr::{
    ExprError,
    ast::{BinaryOp, CompareOp, Expr, Statement, UnaryOp},
    lexer,
    tokens::{PositionedToken, Token},
};

/// Context type for parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Description of what is currently being parsed
    Label(&'static str),
    /// Brackets, prefix operators or conditionals nest past [`MAX_NESTING_DEPTH`]
    Nesting,
}

/// Deepest nesting of sub-expressions the parser descends into.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Token stream carrying the current nesting depth.
type Input<'src> = Stateful<TokenSlice<'src, PositionedToken<'src>>, usize>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;

/// Match one token of the given kind.
fn symbol<'src>(
    kind: Token<'static>,
    label: &'static str,
) -> impl winnow::Parser<Input<'src>, (), ErrMode<ContextError<Context>>> {
    any.verify(move |token: &PositionedToken<'src>| token.token == kind)
        .void()
        .context(Context::Label(label))
}

/// Parse a statement separator
fn newline<'src>(input: &mut Input<'src>) -> IResult<()> {
    symbol(Token::Newline, "end of statement").parse_next(input)
}

/// Parse a raw identifier
fn identifier<'src>(input: &mut Input<'src>) -> IResult<&'src str> {
    any.verify_map(|token: &PositionedToken<'src>| match &token.token {
        Token::Identifier(name) => Some(*name),
        _ => None,
    })
    .context(Context::Label("identifier"))
    .parse_next(input)
}

/// Run `parser` one nesting level deeper, failing past [`MAX_NESTING_DEPTH`].
fn nested<'src, O>(
    input: &mut Input<'src>,
    parser: impl FnOnce(&mut Input<'src>) -> IResult<O>,
) -> IResult<O> {
    if input.state >= MAX_NESTING_DEPTH {
        let mut error = ContextError::new();
        error.push(Context::Nesting);
        return Err(ErrMode::Cut(error));
    }
    input.state += 1;
    let result = parser(input);
    input.state -= 1;
    result
}

fn token_input<'src>(tokens: &'src [PositionedToken<'src>]) -> Input<'src> {
    Stateful {
        input: TokenSlice::new(tokens),
        state: 0,
    }
}

/// Parse items up to and including the closing token.
///
/// Items are separated by commas; a trailing comma is allowed.
fn comma_separated<'src, O>(
    input: &mut Input<'src>,
    mut item: impl FnMut(&mut Input<'src>) -> IResult<O>,
    close: Token<'static>,
    label: &'static str,
) -> IResult<Vec<O>> {
    let mut items = Vec::new();
    loop {
        if opt(symbol(close.clone(), label))
            .parse_next(input)?
            .is_some()
        {
            return Ok(items);
        }
        items.push(item(input)?);
        if opt(symbol(Token::Comma, "comma"))
            .parse_next(input)?
            .is_none()
        {
            symbol(close, label).parse_next(input)?;
            return Ok(items);
        }
    }
}

/// Parse literal and name atoms
fn literal<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    any.verify_map(|token: &PositionedToken<'src>| match &token.token {
        Token::Int(n) => Some(Expr::Int(*n)),
        Token::Float(n) => Some(Expr::Float(*n)),
        Token::Str(s) => Some(Expr::Str(s.clone())),
        Token::True => Some(Expr::Bool(true)),
        Token::False => Some(Expr::Bool(false)),
        Token::None => Some(Expr::None),
        Token::Identifier(name) => Some(Expr::Name(name.to_string())),
        _ => None,
    })
    .parse_next(input)
}

fn parenthesized<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    symbol(Token::LeftParen, "(").parse_next(input)?;
    let inner = expression(input)?;
    symbol(Token::RightParen, "closing parenthesis").parse_next(input)?;
    Ok(inner)
}

fn list<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    symbol(Token::LeftBracket, "[").parse_next(input)?;
    let items = comma_separated(input, expression, Token::RightBracket, "closing bracket")?;
    Ok(Expr::List(items))
}

fn map_entry<'src>(input: &mut Input<'src>) -> IResult<(Expr, Expr)> {
    let key = expression(input)?;
    symbol(Token::Colon, "colon").parse_next(input)?;
    let value = expression(input)?;
    Ok((key, value))
}

fn map<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    symbol(Token::LeftBrace, "{").parse_next(input)?;
    let entries = comma_separated(input, map_entry, Token::RightBrace, "closing brace")?;
    Ok(Expr::Map(entries))
}

fn atom<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    alt((literal, parenthesized, list, map))
        .context(Context::Label("expression"))
        .parse_next(input)
}

/// Parse an atom followed by calls, indexing and attribute access
fn postfix<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    let mut expr = atom(input)?;
    loop {
        if opt(symbol(Token::LeftParen, "(")).parse_next(input)?.is_some() {
            let args = comma_separated(input, expression, Token::RightParen, "closing parenthesis")?;
            expr = Expr::Call(Box::new(expr), args);
        } else if opt(symbol(Token::LeftBracket, "[")).parse_next(input)?.is_some() {
            let index = expression(input)?;
            symbol(Token::RightBracket, "closing bracket").parse_next(input)?;
            expr = Expr::Index(Box::new(expr), Box::new(index));
        } else if opt(symbol(Token::Dot, ".")).parse_next(input)?.is_some() {
            let name = identifier(input)?;
            expr = Expr::Attribute(Box::new(expr), name.to_string());
        } else {
            return Ok(expr);
        }
    }
}

fn power<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    let base = postfix(input)?;
    if opt(symbol(Token::DoubleStar, "**")).parse_next(input)?.is_some() {
        let exponent = nested(input, unary)?;
        return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
    }
    Ok(base)
}

fn unary<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    let op = opt(any.verify_map(|token: &PositionedToken<'src>| match token.token {
        Token::Minus => Some(UnaryOp::Neg),
        Token::Plus => Some(UnaryOp::Pos),
        _ => None,
    }))
    .parse_next(input)?;

    match op {
        Some(op) => Ok(Expr::Unary(op, Box::new(nested(input, unary)?))),
        None => power(input),
    }
}

fn term_op<'src>(input: &mut Input<'src>) -> IResult<BinaryOp> {
    any.verify_map(|token: &PositionedToken<'src>| match token.token {
        Token::Star => Some(BinaryOp::Mul),
        Token::Slash => Some(BinaryOp::Div),
        Token::DoubleSlash => Some(BinaryOp::FloorDiv),
        Token::Percent => Some(BinaryOp::Mod),
        _ => None,
    })
    .parse_next(input)
}

fn term<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    let mut lhs = unary(input)?;
    while let Some(op) = opt(term_op).parse_next(input)? {
        let rhs = unary(input)?;
        lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn additive_op<'src>(input: &mut Input<'src>) -> IResult<BinaryOp> {
    any.verify_map(|token: &PositionedToken<'src>| match token.token {
        Token::Plus => Some(BinaryOp::Add),
        Token::Minus => Some(BinaryOp::Sub),
        _ => None,
    })
    .parse_next(input)
}

fn additive<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    let mut lhs = term(input)?;
    while let Some(op) = opt(additive_op).parse_next(input)? {
        let rhs = term(input)?;
        lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn compare_op<'src>(input: &mut Input<'src>) -> IResult<CompareOp> {
    alt((
        any.verify_map(|token: &PositionedToken<'src>| match token.token {
            Token::EqualEqual => Some(CompareOp::Eq),
            Token::NotEqual => Some(CompareOp::NotEq),
            Token::Less => Some(CompareOp::Less),
            Token::LessEqual => Some(CompareOp::LessEq),
            Token::Greater => Some(CompareOp::Greater),
            Token::GreaterEqual => Some(CompareOp::GreaterEq),
            Token::In => Some(CompareOp::In),
            _ => None,
        }),
        (symbol(Token::Not, "not"), symbol(Token::In, "in")).value(CompareOp::NotIn),
    ))
    .parse_next(input)
}

fn comparison<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    let first = additive(input)?;
    let mut rest = Vec::new();
    while let Some(op) = opt(compare_op).parse_next(input)? {
        rest.push((op, additive(input)?));
    }

    if rest.is_empty() {
        Ok(first)
    } else {
        Ok(Expr::Compare(Box::new(first), rest))
    }
}

fn not_expr<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    if opt(symbol(Token::Not, "not")).parse_next(input)?.is_some() {
        return Ok(Expr::Unary(UnaryOp::Not, Box::new(nested(input, not_expr)?)));
    }
    comparison(input)
}

fn and_expr<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    let mut lhs = not_expr(input)?;
    while opt(symbol(Token::And, "and")).parse_next(input)?.is_some() {
        let rhs = not_expr(input)?;
        lhs = Expr::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn or_expr<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    let mut lhs = and_expr(input)?;
    while opt(symbol(Token::Or, "or")).parse_next(input)?.is_some() {
        let rhs = and_expr(input)?;
        lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

/// Parse a full expression, including the conditional form
fn expression<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    nested(input, conditional)
}

fn conditional<'src>(input: &mut Input<'src>) -> IResult<Expr> {
    let then = or_expr(input)?;
    if opt(symbol(Token::If, "if")).parse_next(input)?.is_none() {
        return Ok(then);
    }

    let condition = or_expr(input)?;
    symbol(Token::Else, "else").parse_next(input)?;
    let otherwise = expression(input)?;
    Ok(Expr::Conditional {
        condition: Box::new(condition),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    })
}

/// Parse `name(params) =`
fn function_head<'src>(input: &mut Input<'src>) -> IResult<(String, Vec<String>)> {
    let name = identifier(input)?;
    symbol(Token::LeftParen, "(").parse_next(input)?;
    let params = comma_separated(
        input,
        |input: &mut Input<'src>| identifier(input).map(str::to_string),
        Token::RightParen,
        "closing parenthesis",
    )?;
    symbol(Token::Equals, "=").parse_next(input)?;
    Ok((name.to_string(), params))
}

/// Parse `name =`
fn assignment_target<'src>(input: &mut Input<'src>) -> IResult<String> {
    let name = identifier(input)?;
    symbol(Token::Equals, "=").parse_next(input)?;
    Ok(name.to_string())
}

fn statement<'src>(input: &mut Input<'src>) -> IResult<Statement> {
    let start = input.checkpoint();

    if let Ok((name, params)) = function_head(input) {
        let body = expression(input)?;
        return Ok(Statement::Function { name, params, body });
    }
    input.reset(&start);

    if let Ok(name) = assignment_target(input) {
        let value = expression(input)?;
        return Ok(Statement::Assign(name, value));
    }
    input.reset(&start);

    expression(input).map(Statement::Expr)
}

fn program<'src>(input: &mut Input<'src>) -> IResult<Vec<Statement>> {
    let mut statements = Vec::new();
    loop {
        repeat::<_, _, (), _, _>(0.., newline).parse_next(input)?;
        if input.eof_offset() == 0 {
            return Ok(statements);
        }
        statements.push(statement(input)?);
        if input.eof_offset() == 0 {
            return Ok(statements);
        }
        newline(input)?;
    }
}

/// Convert a winnow error into an [`ExprError::Syntax`] pointing at the
/// token where parsing stopped.
fn convert_error(
    error: ErrMode<ContextError<Context>>,
    tokens: &[PositionedToken],
    remaining: usize,
    source_len: usize,
) -> ExprError {
    let position = tokens.len().saturating_sub(remaining);
    let (offset, found) = match tokens.get(position) {
        Some(token) => (token.span.start(), format!("`{}`", token.token)),
        None => (source_len, "end of input".to_string()),
    };

    let context: Vec<&Context> = match &error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e.context().collect(),
        ErrMode::Incomplete(_) => Vec::new(),
    };
    if context.iter().any(|ctx| **ctx == Context::Nesting) {
        return ExprError::syntax(
            format!("expression nested more than {MAX_NESTING_DEPTH} levels deep"),
            offset,
        );
    }
    let expected = context.iter().find_map(|ctx| match ctx {
        Context::Label(label) => Some(*label),
        Context::Nesting => None,
    });

    let message = match expected {
        Some(expected) => format!("expected {expected}, found {found}"),
        None => format!("unexpected {found}"),
    };
    ExprError::syntax(message, offset)
}

/// Parse a `<Define>` body into statements.
///
/// # Errors
///
/// Returns [`ExprError::Syntax`] for invalid tokens or grammar.
pub fn parse_program(source: &str) -> Result<Vec<Statement>, ExprError> {
    let tokens = lexer::tokenize(source)?;
    let mut input = token_input(&tokens);

    program(&mut input).map_err(|e| convert_error(e, &tokens, input.eof_offset(), source.len()))
}

/// Parse a single expression.
///
/// Leading and trailing statement separators are ignored.
///
/// # Errors
///
/// Returns [`ExprError::Syntax`] for invalid tokens, invalid grammar or
/// trailing input.
pub fn parse_expression(source: &str) -> Result<Expr, ExprError> {
    let tokens = lexer::tokenize(source)?;
    let start = tokens
        .iter()
        .position(|t| t.token != Token::Newline)
        .unwrap_or(tokens.len());
    let end = tokens
        .iter()
        .rposition(|t| t.token != Token::Newline)
        .map_or(start, |last| last + 1);
    let tokens = &tokens[start..end];
    if tokens.is_empty() {
        return Err(ExprError::syntax("expected expression, found end of input", source.len()));
    }

    let mut input = token_input(tokens);
    let expr = expression(&mut input)
        .map_err(|e| convert_error(e, tokens, input.eof_offset(), source.len()))?;

    if let Some(extra) = tokens.get(tokens.len() - input.eof_offset()) {
        return Err(ExprError::syntax(
            format!("unexpected `{}` after expression", extra.token),
            extra.span.start(),
        ));
    }
    Ok(expr)
}
