use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::tempdir;

use trellis_cli::Args;

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

/// Collects all .xml files from a directory
fn collect_xml_files(dir: PathBuf) -> Vec<PathBuf> {
    let mut files = if let Ok(entries) = fs::read_dir(&dir) {
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("xml")
            })
            .collect()
    } else {
        Vec::new()
    };

    // Sort for consistent test output
    files.sort();
    files
}

fn args_for(source: &Path, destination: &Path) -> Args {
    Args {
        source: source.to_string_lossy().to_string(),
        destination: destination.to_string_lossy().to_string(),
        overwrite: false,
        debug: false,
        config: None,
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_smoke_test_valid_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let demos = collect_xml_files(demos_dir());
    assert!(!demos.is_empty(), "No demos found in demos/");

    let mut failed = Vec::new();

    for demo in &demos {
        let file_name = demo.file_name().expect("demo has a file name");
        let output_path = temp_dir.path().join(file_name);

        match trellis_cli::run(&args_for(demo, &output_path)) {
            Ok(()) => {
                let xml = fs::read_to_string(&output_path).expect("output written");
                for construct in ["<Symbol", "<Use", "<Repeat", "<Define", "<If", "<Import"] {
                    if xml.contains(construct) {
                        failed.push((demo.clone(), format!("output still contains {construct}")));
                    }
                }
            }
            Err(e) => failed.push((demo.clone(), e.to_string())),
        }
    }

    if !failed.is_empty() {
        eprintln!("\nDemos that failed:");
        for (path, err) in &failed {
            eprintln!("  - {}: {}", path.display(), err);
        }
        panic!("{} demo(s) failed unexpectedly", failed.len());
    }
}

#[test]
fn e2e_smoke_test_error_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let demos = collect_xml_files(demos_dir().join("errors"));
    assert!(!demos.is_empty(), "No error demos found in demos/errors/");

    let mut unexpectedly_succeeded = Vec::new();

    for demo in &demos {
        let file_name = demo.file_name().expect("demo has a file name");
        let output_path = temp_dir.path().join(file_name);

        if trellis_cli::run(&args_for(demo, &output_path)).is_ok() {
            unexpectedly_succeeded.push(demo.clone());
        }
    }

    if !unexpectedly_succeeded.is_empty() {
        eprintln!("\nError demos that unexpectedly succeeded:");
        for path in &unexpectedly_succeeded {
            eprintln!("  - {}", path.display());
        }
        panic!(
            "{} error demo(s) succeeded unexpectedly",
            unexpectedly_succeeded.len()
        );
    }
}

#[test]
fn e2e_existing_destination_needs_overwrite() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let source = temp_dir.path().join("in.xml");
    let destination = temp_dir.path().join("out.xml");
    fs::write(&source, r#"<Root><Define>n = 3</Define><A n="{n}"/></Root>"#)
        .expect("write source");
    fs::write(&destination, "old").expect("write destination");

    let mut args = args_for(&source, &destination);
    assert!(trellis_cli::run(&args).is_err());
    assert_eq!(fs::read_to_string(&destination).expect("read"), "old");

    args.overwrite = true;
    trellis_cli::run(&args).expect("overwrite allowed");
    assert_eq!(
        fs::read_to_string(&destination).expect("read"),
        r#"<Root><A n="3"/></Root>"#
    );
}
