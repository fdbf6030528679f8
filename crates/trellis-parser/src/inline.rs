//! Inline expression spans and scope references.
//!
//! Text and attribute values may embed `{expression}` spans. A span runs
//! from an opening brace to the first closing brace on the same line; a
//! brace without a closing partner on its line is plain text.
//!
//! Before an expression is evaluated, the scope references `PARENT.name`,
//! bare `PARENT` and `SELF.name` are replaced by raw attribute text.
//! [`split_scope_refs`] finds them.

use winnow::{
    Parser as _,
    combinator::{alt, delimited, eof, repeat, terminated},
    error::{ContextError, ModalResult},
    token::{one_of, take_till, take_while},
};

type PResult<O> = ModalResult<O, ContextError>;

/// A piece of a string with inline expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied unchanged.
    Literal(&'a str),
    /// Expression source between the braces.
    Expression(&'a str),
}

/// A piece of an expression with scope references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRef<'a> {
    /// Expression text copied unchanged.
    Text(&'a str),
    /// `PARENT.name`, or bare `PARENT` (`None`) meaning the attribute
    /// currently being evaluated.
    Parent(Option<&'a str>),
    /// `SELF.name`.
    SelfAttr(&'a str),
}

/// Split `text` into literal and expression segments.
///
/// Returns `None` when the text contains no expression span, so callers
/// can leave it untouched.
pub fn split_expressions(text: &str) -> Option<Vec<Segment<'_>>> {
    let mut input = text;
    let segments: Vec<Segment<'_>> = terminated(repeat(0.., segment), eof)
        .parse_next(&mut input)
        .ok()?;

    segments
        .iter()
        .any(|segment| matches!(segment, Segment::Expression(_)))
        .then_some(segments)
}

/// Split an expression into plain text and scope references.
pub fn split_scope_refs(expression: &str) -> Vec<ScopeRef<'_>> {
    let mut input = expression;
    terminated(repeat(0.., scope_ref), eof)
        .parse_next(&mut input)
        .unwrap_or_else(|_| vec![ScopeRef::Text(expression)])
}

fn segment<'a>(input: &mut &'a str) -> PResult<Segment<'a>> {
    alt((
        delimited('{', take_till(0.., ['}', '\n']), '}').map(Segment::Expression),
        take_till(1.., '{').map(Segment::Literal),
        '{'.take().map(Segment::Literal),
    ))
    .parse_next(input)
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn word<'a>(input: &mut &'a str) -> PResult<&'a str> {
    (one_of(is_word_start), take_while(0.., is_word_char))
        .take()
        .parse_next(input)
}

fn hyphenated_word(input: &mut &str) -> PResult<()> {
    ('-', one_of(char::is_alphabetic), take_while(0.., is_word_char))
        .void()
        .parse_next(input)
}

/// An attribute name: a word, optionally continued by `-word` parts.
fn attribute_name<'a>(input: &mut &'a str) -> PResult<&'a str> {
    (word, repeat::<_, _, (), _, _>(0.., hyphenated_word))
        .take()
        .parse_next(input)
}

fn scope_ref<'a>(input: &mut &'a str) -> PResult<ScopeRef<'a>> {
    alt((
        ("PARENT.", attribute_name).map(|(_, name)| ScopeRef::Parent(Some(name))),
        ("SELF.", attribute_name).map(|(_, name)| ScopeRef::SelfAttr(name)),
        word.map(|word| match word {
            "PARENT" => ScopeRef::Parent(None),
            _ => ScopeRef::Text(word),
        }),
        take_till(1.., is_word_start).map(ScopeRef::Text),
    ))
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_expressions() {
        assert_eq!(split_expressions("plain text"), None);
        assert_eq!(split_expressions(""), None);
        assert_eq!(split_expressions("open { only"), None);
        assert_eq!(split_expressions("{across\nlines}"), None);
    }

    #[test]
    fn test_segments() {
        assert_eq!(
            split_expressions("x={a + 1}px"),
            Some(vec![
                Segment::Literal("x="),
                Segment::Expression("a + 1"),
                Segment::Literal("px"),
            ])
        );
        assert_eq!(
            split_expressions("{a}{b}"),
            Some(vec![Segment::Expression("a"), Segment::Expression("b")])
        );
        assert_eq!(split_expressions("{}"), Some(vec![Segment::Expression("")]));
    }

    #[test]
    fn test_span_ends_at_first_closing_brace() {
        assert_eq!(
            split_expressions("{a{b}c}"),
            Some(vec![Segment::Expression("a{b"), Segment::Literal("c}")])
        );
    }

    #[test]
    fn test_brace_before_newline_is_literal() {
        assert_eq!(
            split_expressions("{\n{x}"),
            Some(vec![
                Segment::Literal("{"),
                Segment::Literal("\n"),
                Segment::Expression("x"),
            ])
        );
    }

    #[test]
    fn test_scope_refs() {
        assert_eq!(
            split_scope_refs("PARENT.width - SELF.x2 + PARENT"),
            vec![
                ScopeRef::Parent(Some("width")),
                ScopeRef::Text(" - "),
                ScopeRef::SelfAttr("x2"),
                ScopeRef::Text(" + "),
                ScopeRef::Parent(None),
            ]
        );
    }

    #[test]
    fn test_scope_ref_names_with_hyphens() {
        assert_eq!(
            split_scope_refs("PARENT.data-size-10"),
            vec![ScopeRef::Parent(Some("data-size")), ScopeRef::Text("-10")]
        );
    }

    fn has_scope_refs(expression: &str) -> bool {
        split_scope_refs(expression)
            .iter()
            .any(|piece| !matches!(piece, ScopeRef::Text(_)))
    }

    #[test]
    fn test_scope_refs_respect_word_boundaries() {
        assert!(!has_scope_refs("PARENTAL + mySELF.x + SELF"));
        assert!(has_scope_refs("f(PARENT)"));
        assert_eq!(split_scope_refs(""), vec![]);
    }
}
