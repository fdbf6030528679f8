//! Loading documents that import other files from disk.

use std::{fs, path::Path};

use tempfile::TempDir;
use trellis::{
    ErrorCode, Preprocessor, TrellisError,
    config::{AppConfig, LoaderConfig, OutputConfig, SymbolsConfig},
};

fn write(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(path, text).expect("write fixture");
}

fn code(err: &TrellisError) -> Option<ErrorCode> {
    err.diagnostic().and_then(|diag| diag.code())
}

#[test]
fn test_imported_symbols_and_definitions() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "lib/shapes.xml", r#"<Dummy><Symbol id="dot"><Circle r="{size}"/></Symbol></Dummy>"#);
    write(dir.path(), "lib/sizes.defs", "size = 3\nlarge = size * 2\n");
    write(
        dir.path(),
        "main.xml",
        r##"<Face>
    <Import href="lib/sizes.defs"/>
    <Import href="lib/shapes.xml"/>
    <Use href="#dot"/>
    <Use href="#dot" r="{large}"/>
</Face>"##,
    );

    let preprocessor = Preprocessor::default();
    let document = preprocessor
        .process_file(dir.path().join("main.xml"))
        .expect("document expands");
    let xml = preprocessor.render(&document).expect("document renders");

    assert!(xml.contains(r#"<Circle r="3"/>"#), "{xml}");
    assert!(xml.contains(r#"<Circle r="6"/>"#), "{xml}");
    assert!(!xml.contains("Import"));
    assert_eq!(document.sources().len(), 3);
}

#[test]
fn test_custom_code_extension() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "consts.py", "width = 12");
    write(
        dir.path(),
        "main.xml",
        r#"<Face><Import href="consts.py"/><Rect w="{width}"/></Face>"#,
    );

    let config = AppConfig::new(
        LoaderConfig::new(vec!["py".to_string()], 8),
        SymbolsConfig::default(),
        OutputConfig::default(),
    );
    let preprocessor = Preprocessor::new(config);
    let document = preprocessor
        .process_file(dir.path().join("main.xml"))
        .expect("document expands");
    let xml = preprocessor.render(&document).expect("document renders");

    assert_eq!(xml, r#"<Face><Rect w="12"/></Face>"#);
}

#[test]
fn test_process_str_resolves_against_base_dir() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "part.xml", "<Part/>");

    let document = Preprocessor::default()
        .process_str(r#"<Root><Import href="part.xml"/></Root>"#, dir.path())
        .expect("document expands");
    let tree = document.tree();
    assert_eq!(tree.tag(tree.children(tree.root())[0]), "Part");
}

#[test]
fn test_missing_start_file() {
    let dir = TempDir::new().expect("temp dir");
    let err = Preprocessor::default()
        .process_file(dir.path().join("absent.xml"))
        .expect_err("nothing to load");
    assert_eq!(code(&err), Some(ErrorCode::E001));
}

#[test]
fn test_self_import_is_a_cycle() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "main.xml", r#"<Root><Import href="main.xml"/></Root>"#);

    let err = Preprocessor::default()
        .process_file(dir.path().join("main.xml"))
        .expect_err("cycle");
    assert_eq!(code(&err), Some(ErrorCode::E003));
}

#[test]
fn test_import_depth_limit() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "a.xml", r#"<A><Import href="b.xml"/></A>"#);
    write(dir.path(), "b.xml", r#"<B><Import href="c.xml"/></B>"#);
    write(dir.path(), "c.xml", "<C/>");

    let config = AppConfig::new(
        LoaderConfig::new(vec!["defs".to_string()], 2),
        SymbolsConfig::default(),
        OutputConfig::default(),
    );
    let err = Preprocessor::new(config)
        .process_file(dir.path().join("a.xml"))
        .expect_err("too deep");
    assert_eq!(code(&err), Some(ErrorCode::E003));
}

#[test]
fn test_malformed_import_points_at_its_file() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "bad.xml", "<Bad>\n<Open>\n</Bad>");
    write(dir.path(), "main.xml", r#"<Root><Import href="bad.xml"/></Root>"#);

    let err = Preprocessor::default()
        .process_file(dir.path().join("main.xml"))
        .expect_err("malformed import");

    let TrellisError::Expand { err, sources } = err else {
        panic!("expected an expansion error");
    };
    assert_eq!(err.code(), Some(ErrorCode::E002));
    let origin = err.primary_origin().expect("error has a location");
    let file = sources
        .get(origin.source().expect("error is inside a file"))
        .expect("file is registered");
    assert!(file.path().ends_with("bad.xml"));
}
