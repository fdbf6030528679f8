//! Lexical analyzer for the expression language.
//!
//! The lexer converts source text into a stream of [`Token`]s for the
//! [`parser`](super::parser). Whitespace, `#` comments and backslash line
//! continuations are skipped. A newline becomes a [`Token::Newline`]
//! statement separator only outside brackets, so a list or a call may span
//! several lines.

use winnow::{
    Parser as _,
    ascii::{digit0, digit1},
    combinator::{alt, opt, repeat},
    error::{ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{literal, one_of, take_till, take_while},
};

use trellis_core::Span;

use crate::expr::{
    ExprError,
    tokens::{PositionedToken, Token},
};

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O, ContextError>;

/// Skip spaces, tabs, comments and line continuations.
fn trivia(input: &mut Input<'_>) -> IResult<()> {
    repeat(
        0..,
        alt((
            take_while(1.., [' ', '\t', '\r']).void(),
            ('#', take_till(0.., '\n')).void(),
            literal("\\\n").void(),
        )),
    )
    .parse_next(input)
}

/// Parse a single or double quoted string literal.
///
/// Supports the escapes `\n`, `\t`, `\r`, `\0`, `\\`, `\'` and `\"`; any
/// other backslash is kept as is. Strings end at the line.
fn string_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let quote = one_of(['"', '\'']).parse_next(input)?;

    let mut value = String::new();
    loop {
        match input.next_token() {
            Some(c) if c == quote => return Ok(Token::Str(value)),
            Some('\\') => match input.next_token() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some('r') => value.push('\r'),
                Some('0') => value.push('\0'),
                Some(c @ ('\\' | '\'' | '"')) => value.push(c),
                Some('\n') | None => return Err(ErrMode::Cut(ContextError::new())),
                Some(c) => {
                    value.push('\\');
                    value.push(c);
                }
            },
            Some('\n') | None => return Err(ErrMode::Cut(ContextError::new())),
            Some(c) => value.push(c),
        }
    }
}

/// Parse an integer or float literal.
///
/// Integers too large for `i64` become floats.
fn number<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let text = (
        digit1,
        opt(('.', digit0)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)?;

    if !text.contains(['.', 'e', 'E']) {
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Token::Int(n));
        }
    }
    text.parse::<f64>()
        .map(Token::Float)
        .map_err(|_| ErrMode::Cut(ContextError::new()))
}

/// Parse identifiers and keywords
fn identifier<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .map(|word: &str| match word {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "in" => Token::In,
            "if" => Token::If,
            "else" => Token::Else,
            "True" | "true" => Token::True,
            "False" | "false" => Token::False,
            "None" => Token::None,
            _ => Token::Identifier(word),
        })
        .parse_next(input)
}

/// Parse multi-character operators (order matters - longest first)
fn multi_char_operator<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        literal("**").value(Token::DoubleStar),
        literal("//").value(Token::DoubleSlash),
        literal("==").value(Token::EqualEqual),
        literal("!=").value(Token::NotEqual),
        literal("<=").value(Token::LessEqual),
        literal(">=").value(Token::GreaterEqual),
    ))
    .parse_next(input)
}

/// Parse single character tokens
fn single_char_token<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    alt((
        alt((
            '+'.value(Token::Plus),
            '-'.value(Token::Minus),
            '*'.value(Token::Star),
            '/'.value(Token::Slash),
            '%'.value(Token::Percent),
            '<'.value(Token::Less),
            '>'.value(Token::Greater),
            '='.value(Token::Equals),
        )),
        alt((
            '('.value(Token::LeftParen),
            ')'.value(Token::RightParen),
            '['.value(Token::LeftBracket),
            ']'.value(Token::RightBracket),
            '{'.value(Token::LeftBrace),
            '}'.value(Token::RightBrace),
            ','.value(Token::Comma),
            ':'.value(Token::Colon),
            alt((
                '.'.value(Token::Dot),
                ';'.value(Token::Newline),
                '\n'.value(Token::Newline),
            )),
        )),
    ))
    .parse_next(input)
}

/// Parse a single token with position tracking
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<PositionedToken<'a>> {
    let start_pos = input.current_token_start();

    let token = alt((
        string_literal,      // Must come before any single char
        number,              // Must come before `.`
        identifier,          // Includes keywords
        multi_char_operator, // Must come before single char operators
        single_char_token,
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();
    Ok(PositionedToken::new(token, Span::new(start_pos..end_pos)))
}

fn lex_error(source: &str, offset: usize) -> ExprError {
    match source.get(offset..).and_then(|rest| rest.chars().next()) {
        Some('"' | '\'') => ExprError::syntax("unterminated string literal", offset),
        Some(c) => ExprError::syntax(format!("unexpected character `{c}`"), offset),
        None => ExprError::syntax("unexpected end of input", offset),
    }
}

/// Split source text into tokens.
///
/// # Errors
///
/// Returns [`ExprError::Syntax`] at the first character that starts no
/// valid token, or at an unterminated string.
pub fn tokenize(source: &str) -> Result<Vec<PositionedToken<'_>>, ExprError> {
    let mut input = LocatingSlice::new(source);
    let mut tokens = Vec::new();
    let mut depth = 0usize;

    loop {
        trivia
            .parse_next(&mut input)
            .map_err(|_| lex_error(source, input.current_token_start()))?;
        if input.is_empty() {
            break;
        }

        let start = input.current_token_start();
        let token = positioned_token(&mut input).map_err(|_| lex_error(source, start))?;

        if token.is_open_bracket() {
            depth += 1;
        } else if token.is_close_bracket() {
            depth = depth.saturating_sub(1);
        } else if token.token == Token::Newline && depth > 0 {
            continue;
        }
        tokens.push(token);
    }

    Ok(tokens)
}
