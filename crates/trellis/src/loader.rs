//! Document loading and import splicing.
//!
//! The loader reads the start document and replaces every `<Import>` with
//! the content it names:
//!
//! - a markup file is loaded recursively and its root spliced in place (a
//!   `<Dummy>` root contributes its children)
//! - a code file (see [`LoaderConfig::code_extensions`]) becomes a
//!   `<Define>` holding the file text
//!
//! Paths are relative to the directory of the importing file. Files
//! currently being imported are kept on a stack of canonical paths, so an
//! import cycle is reported instead of looping.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info, trace};

use trellis_core::{Construct, NodeId, Origin, SourceId, SourceMap, Span, Tree, construct::attr};
use trellis_parser::{
    MarkupError,
    error::{Diagnostic, ErrorCode, Result},
    parse_markup,
};

use crate::config::LoaderConfig;

/// Where an `<Import>` was found, for error messages.
struct Importer<'a> {
    path: &'a Path,
    origin: Option<Origin>,
}

/// Reads documents and resolves their imports.
pub struct Loader<'a> {
    config: &'a LoaderConfig,
    sources: &'a mut SourceMap,
    stack: Vec<PathBuf>,
}

impl<'a> Loader<'a> {
    /// Create a loader that records every file it reads in `sources`.
    pub fn new(config: &'a LoaderConfig, sources: &'a mut SourceMap) -> Self {
        Self {
            config,
            sources,
            stack: Vec::new(),
        }
    }

    /// Load a document from disk with all imports resolved.
    ///
    /// # Errors
    ///
    /// - E001 when a file cannot be read
    /// - E002 when a file is not well-formed markup
    /// - E003 for an import cycle or imports nested too deeply
    /// - E004 for an `<Import>` without `href`
    pub fn load_file(&mut self, path: &Path) -> Result<Tree> {
        info!(path:% = path.display(); "Loading document");
        self.load_markup(path, None)
    }

    /// Load a document from text. Imports resolve relative to `base_dir`.
    ///
    /// # Errors
    ///
    /// The same as [`Loader::load_file`].
    pub fn load_source(&mut self, name: &str, text: &str, base_dir: &Path) -> Result<Tree> {
        info!(name; "Loading document from text");
        let source = self.sources.add(name, text);
        let mut tree = parse_document(text, source)?;
        self.resolve_imports(&mut tree, base_dir, Path::new(name))?;
        Ok(tree)
    }

    fn load_markup(&mut self, path: &Path, importer: Option<Importer<'_>>) -> Result<Tree> {
        let canonical = fs::canonicalize(path)
            .map_err(|err| not_found(path, importer.as_ref(), &err.to_string()))?;

        if let Some(position) = self.stack.iter().position(|open| *open == canonical) {
            let chain = self.stack[position..]
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(Diagnostic::error(format!(
                "`{}` imports itself",
                path.display()
            ))
            .with_code(ErrorCode::E003)
            .with_label(importer.and_then(|importer| importer.origin), "cyclic import")
            .with_help(format!("import chain: {chain}")));
        }

        if self.stack.len() >= self.config.max_import_depth() {
            return Err(Diagnostic::error(format!(
                "imports are nested more than {} levels deep",
                self.config.max_import_depth()
            ))
            .with_code(ErrorCode::E003)
            .with_label(importer.and_then(|importer| importer.origin), "import too deep"));
        }

        let text = fs::read_to_string(path)
            .map_err(|err| not_found(path, importer.as_ref(), &err.to_string()))?;
        let source = self.sources.add(path, text.as_str());
        debug!(path:% = path.display(), source:% = source; "Read markup file");

        let mut tree = parse_document(&text, source)?;

        let base_dir = path.parent().unwrap_or(Path::new(""));
        self.stack.push(canonical);
        let resolved = self.resolve_imports(&mut tree, base_dir, path);
        self.stack.pop();
        resolved?;

        Ok(tree)
    }

    fn resolve_imports(&mut self, tree: &mut Tree, base_dir: &Path, file: &Path) -> Result<()> {
        let imports: Vec<NodeId> = tree
            .subtree(tree.root())
            .into_iter()
            .filter(|&id| tree.construct(id) == Construct::Import)
            .collect();

        for import in imports {
            if !tree.is_attached(import) {
                continue;
            }

            let origin = tree.origin(import);
            let Some(href) = tree.attribute(import, attr::HREF).map(str::to_string) else {
                return Err(Diagnostic::error("import has no `href` attribute")
                    .with_code(ErrorCode::E004)
                    .with_label(origin, "missing `href`")
                    .with_help("name the file to import, relative to this document"));
            };

            let target = base_dir.join(&href);
            let importer = Importer { path: file, origin };
            debug!(href = href.as_str(); "Resolving import");

            let is_code = target
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| self.config.is_code_extension(extension));

            let replacement = if is_code {
                let contents = fs::read_to_string(&target)
                    .map_err(|err| not_found(&target, Some(&importer), &err.to_string()))?;
                self.sources.add(&target, contents.as_str());

                let define = tree.create_element("Define", origin);
                tree.set_text(define, Some(format!("\n{contents}\n")));
                define
            } else {
                let imported = self.load_markup(&target, Some(importer))?;
                tree.import_subtree(&imported, imported.root())
            };

            match tree.parent(import) {
                Some(parent) => {
                    let index = tree.detach(import).unwrap_or(0);
                    tree.splice(parent, index, replacement, false);
                }
                None => tree.set_root(replacement),
            }
        }

        trace!(tree:% = tree.outline(tree.root()); "Imports resolved");
        Ok(())
    }
}

fn parse_document(text: &str, source: SourceId) -> Result<Tree> {
    parse_markup(text, Some(source)).map_err(|err| malformed(&err, source))
}

fn malformed(err: &MarkupError, source: SourceId) -> Diagnostic {
    let origin = Origin::new(source, Span::new(err.offset()..err.offset()), err.line());
    Diagnostic::error(format!("malformed document: {}", err.message()))
        .with_code(ErrorCode::E002)
        .with_label(origin, err.message().to_string())
}

fn not_found(path: &Path, importer: Option<&Importer<'_>>, reason: &str) -> Diagnostic {
    match importer {
        Some(importer) => Diagnostic::error(format!(
            "cannot find `{}` imported by `{}`",
            path.display(),
            importer.path.display()
        ))
        .with_code(ErrorCode::E001)
        .with_label(importer.origin, "imported here")
        .with_help(reason.to_string()),
        None => Diagnostic::error(format!("cannot read `{}`", path.display()))
            .with_code(ErrorCode::E001)
            .with_help(reason.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).expect("write fixture");
        path
    }

    fn tags(tree: &Tree, id: NodeId) -> Vec<String> {
        tree.children(id)
            .iter()
            .map(|&child| tree.tag(child).to_string())
            .collect()
    }

    #[test]
    fn test_markup_import_keeps_sibling_order() {
        let dir = TempDir::new().expect("temp dir");
        write(&dir, "part.xml", "<Part><Inner/></Part>");
        let main = write(
            &dir,
            "main.xml",
            r#"<Root><A/><Import href="part.xml"/><B/></Root>"#,
        );

        let config = LoaderConfig::default();
        let mut sources = SourceMap::new();
        let tree = Loader::new(&config, &mut sources)
            .load_file(&main)
            .expect("load");

        assert_eq!(tags(&tree, tree.root()), ["A", "Part", "B"]);
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn test_dummy_root_contributes_children() {
        let dir = TempDir::new().expect("temp dir");
        write(&dir, "many.xml", "<Dummy><X/><Y/></Dummy>");
        let main = write(&dir, "main.xml", r#"<Root><Import href="many.xml"/></Root>"#);

        let config = LoaderConfig::default();
        let mut sources = SourceMap::new();
        let tree = Loader::new(&config, &mut sources)
            .load_file(&main)
            .expect("load");

        assert_eq!(tags(&tree, tree.root()), ["X", "Y"]);
    }

    #[test]
    fn test_code_import_becomes_define() {
        let dir = TempDir::new().expect("temp dir");
        write(&dir, "consts.defs", "size = 4");
        let main = write(&dir, "main.xml", r#"<Root><Import href="consts.defs"/></Root>"#);

        let config = LoaderConfig::default();
        let mut sources = SourceMap::new();
        let tree = Loader::new(&config, &mut sources)
            .load_file(&main)
            .expect("load");

        let define = tree.children(tree.root())[0];
        assert_eq!(tree.construct(define), Construct::Define);
        assert_eq!(tree.text(define), Some("\nsize = 4\n"));
    }

    #[test]
    fn test_nested_imports_resolve_relative_to_importer() {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir(dir.path().join("sub")).expect("create dir");
        write(&dir, "sub/leaf.xml", "<Leaf/>");
        write(&dir, "sub/mid.xml", r#"<Mid><Import href="leaf.xml"/></Mid>"#);
        let main = write(&dir, "main.xml", r#"<Root><Import href="sub/mid.xml"/></Root>"#);

        let config = LoaderConfig::default();
        let mut sources = SourceMap::new();
        let tree = Loader::new(&config, &mut sources)
            .load_file(&main)
            .expect("load");

        let mid = tree.children(tree.root())[0];
        assert_eq!(tags(&tree, mid), ["Leaf"]);
    }

    #[test]
    fn test_missing_import() {
        let dir = TempDir::new().expect("temp dir");
        let main = write(&dir, "main.xml", r#"<Root><Import href="gone.xml"/></Root>"#);

        let config = LoaderConfig::default();
        let mut sources = SourceMap::new();
        let err = Loader::new(&config, &mut sources)
            .load_file(&main)
            .expect_err("missing file");

        assert_eq!(err.code(), Some(ErrorCode::E001));
        assert!(err.message().contains("gone.xml"));
        assert!(err.message().contains("main.xml"));
    }

    #[test]
    fn test_import_cycle() {
        let dir = TempDir::new().expect("temp dir");
        write(&dir, "a.xml", r#"<A><Import href="b.xml"/></A>"#);
        write(&dir, "b.xml", r#"<B><Import href="a.xml"/></B>"#);
        let main = dir.path().join("a.xml");

        let config = LoaderConfig::default();
        let mut sources = SourceMap::new();
        let err = Loader::new(&config, &mut sources)
            .load_file(&main)
            .expect_err("cycle");

        assert_eq!(err.code(), Some(ErrorCode::E003));
    }

    #[test]
    fn test_malformed_markup() {
        let dir = TempDir::new().expect("temp dir");
        let main = write(&dir, "main.xml", "<Root>\n  <Open>\n</Root>");

        let config = LoaderConfig::default();
        let mut sources = SourceMap::new();
        let err = Loader::new(&config, &mut sources)
            .load_file(&main)
            .expect_err("malformed");

        assert_eq!(err.code(), Some(ErrorCode::E002));
        assert!(err.primary_origin().is_some());
    }

    #[test]
    fn test_import_without_href() {
        let config = LoaderConfig::default();
        let mut sources = SourceMap::new();
        let err = Loader::new(&config, &mut sources)
            .load_source("inline.xml", "<Root><Import/></Root>", Path::new("."))
            .expect_err("missing href");

        assert_eq!(err.code(), Some(ErrorCode::E004));
    }
}
