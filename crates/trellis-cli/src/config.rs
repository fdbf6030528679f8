//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, local directory, system directory).

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use trellis::{TrellisError, config::AppConfig};

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for TrellisError {
    fn from(err: ConfigError) -> Self {
        TrellisError::Config(err.to_string())
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (trellis/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed or holds invalid values
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, TrellisError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path:% = path.display(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("trellis/config.toml");
    if local_config.exists() {
        info!(path:% = local_config.display(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "trellis", "trellis") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path:% = system_config.display(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path:% = system_config.display(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

/// Load configuration from a TOML file
///
/// # Errors
///
/// Returns error if:
/// - File doesn't exist
/// - File cannot be read
/// - TOML parsing fails
/// - A value is out of range
fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, TrellisError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;
    let config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.loader().max_import_depth() == 0 {
        return Err(ConfigError::Validation(
            "loader.max_import_depth must be at least 1".to_string(),
        ));
    }
    if let Some(extension) = config
        .loader()
        .code_extensions()
        .iter()
        .find(|extension| extension.is_empty() || extension.starts_with('.'))
    {
        return Err(ConfigError::Validation(format!(
            "loader.code_extensions entry `{extension}` must be a bare extension such as \"defs\""
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;
    use trellis::config::DuplicateSymbols;

    use super::*;

    fn config_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(text.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_explicit_config() {
        let file = config_file(
            r#"
[loader]
code_extensions = ["defs", "py"]

[symbols]
duplicates = "error"

[output]
xml_declaration = true
"#,
        );

        let config = load_config(Some(file.path())).expect("config loads");
        assert!(config.loader().is_code_extension("py"));
        assert_eq!(config.loader().max_import_depth(), 64);
        assert_eq!(config.symbols().duplicates(), DuplicateSymbols::Error);
        assert!(config.output().xml_declaration());
        assert_eq!(config.output().strip_prefix(), "data-");
    }

    #[test]
    fn test_missing_explicit_config() {
        let err = load_config(Some("does/not/exist.toml")).expect_err("missing");
        assert!(matches!(err, TrellisError::Config(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let file = config_file("[symbols]\nduplicates = \"sometimes\"\n");
        let err = load_config(Some(file.path())).expect_err("bad value");
        assert!(err.to_string().contains("parse"), "{err}");
    }

    #[test]
    fn test_validation() {
        let file = config_file("[loader]\nmax_import_depth = 0\n");
        let err = load_config(Some(file.path())).expect_err("zero depth");
        assert!(err.to_string().contains("max_import_depth"), "{err}");

        let file = config_file("[loader]\ncode_extensions = [\".defs\"]\n");
        let err = load_config(Some(file.path())).expect_err("leading dot");
        assert!(err.to_string().contains(".defs"), "{err}");
    }
}
