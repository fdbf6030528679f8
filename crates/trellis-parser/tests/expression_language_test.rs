//! The reader, span splitter and expression language used together.

use trellis_parser::{
    expr::{Environment, ExprError, Value, evaluate, execute},
    inline::{Segment, split_expressions},
    parse_markup,
};

/// Substitute every span of `text` the simple way: evaluate and display.
fn render(text: &str, env: &mut Environment) -> Result<String, ExprError> {
    let Some(segments) = split_expressions(text) else {
        return Ok(text.to_string());
    };
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(literal) => out.push_str(literal),
            Segment::Expression(source) => out.push_str(&evaluate(source, env)?.to_string()),
        }
    }
    Ok(out)
}

#[test]
fn test_definitions_feed_attribute_spans() {
    let tree = parse_markup(
        r#"<Face><Define>
    size = 48
    label(n) = 'item ' + str(n)
</Define><Cell w="{size // 2}" name="{label(3)}" raw="no spans"/></Face>"#,
        None,
    )
    .expect("valid markup");

    let root = tree.root();
    let define = tree.children(root)[0];
    let cell = tree.children(root)[1];

    let mut env = Environment::new();
    execute(tree.text(define).expect("definition body"), &mut env).expect("definitions run");

    assert_eq!(render(tree.attribute(cell, "w").unwrap_or_default(), &mut env), Ok("24".into()));
    assert_eq!(
        render(tree.attribute(cell, "name").unwrap_or_default(), &mut env),
        Ok("item 3".into())
    );
    assert_eq!(
        render(tree.attribute(cell, "raw").unwrap_or_default(), &mut env),
        Ok("no spans".into())
    );
}

#[test]
fn test_text_with_several_spans() {
    let mut env = Environment::new();
    execute("hours = 9\nminutes = 5", &mut env).expect("bindings run");

    let text = "{hours}:{'0' + str(minutes) if minutes < 10 else minutes} {upper('am')}";
    assert_eq!(render(text, &mut env), Ok("9:05 AM".into()));
}

#[test]
fn test_markup_values_are_trees() {
    let mut env = Environment::new();
    let value = evaluate("markup('<G><A/><B k=\"v\"/></G>')", &mut env).expect("markup parses");

    let Value::Node(fragment) = value else {
        panic!("expected an element value");
    };
    let root = fragment.root();
    assert_eq!(fragment.tag(root), "G");
    let children = fragment.children(root);
    assert_eq!(children.len(), 2);
    assert_eq!(fragment.attribute(children[1], "k"), Some("v"));

    let element = evaluate("element('Dot', {'r': 2}, 'x')", &mut env).expect("element builds");
    let Value::Node(dot) = element else {
        panic!("expected an element value");
    };
    assert_eq!(dot.attribute(dot.root(), "r"), Some("2"));
    assert_eq!(dot.text(dot.root()), Some("x"));
}

#[test]
fn test_errors_are_reported_not_panicked() {
    let mut env = Environment::new();

    assert!(matches!(
        evaluate("1 +", &mut env),
        Err(ExprError::Syntax { .. })
    ));
    assert!(matches!(
        evaluate("markup('<Open>')", &mut env),
        Err(ExprError::Markup(_))
    ));
    assert!(matches!(
        evaluate("element('bad tag')", &mut env),
        Err(ExprError::Value(_))
    ));
    assert_eq!(
        evaluate("missing * 2", &mut env),
        Err(ExprError::UndefinedName("missing".to_string()))
    );
}

#[test]
fn test_constants_and_math() {
    let mut env = Environment::new();
    assert_eq!(evaluate("round(pi * 100)", &mut env), Ok(Value::Int(314)));
    assert_eq!(evaluate("floor(sqrt(17))", &mut env), Ok(Value::Int(4)));
    assert_eq!(
        evaluate("max([3, 9, 4]) - min(3, 1)", &mut env),
        Ok(Value::Int(8))
    );
}
