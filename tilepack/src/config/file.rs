//! Configuration file handling for ~/.tilepack/config.ini.
//!
//! ```ini
//! [export]
//! output_dir = ~/maps/tiles
//! workers = 8
//! scheme = xyz
//! metadata = true
//! staging_dir = /var/tmp
//!
//! [logging]
//! file = ~/.tilepack/tilepack.log
//! ```
//!
//! Every key is optional. A missing file yields defaults.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::{ExportConfig, TileScheme};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[export]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSettings {
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub scheme: Option<TileScheme>,
    pub metadata: Option<bool>,
    /// Parent directory for per-run staging directories.
    pub staging_dir: Option<PathBuf>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoggingSettings {
    pub file: Option<PathBuf>,
}

/// Parsed user configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub export: ExportSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilepack/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Export settings from this file applied over the defaults.
    pub fn export_config(&self) -> ExportConfig {
        let mut config = ExportConfig::default();
        if let Some(dir) = &self.export.output_dir {
            config = config.with_output_dir(dir.clone());
        }
        if let Some(workers) = self.export.workers {
            config = config.with_workers(workers);
        }
        if let Some(scheme) = self.export.scheme {
            config = config.with_scheme(scheme);
        }
        if let Some(metadata) = self.export.metadata {
            config = config.with_metadata(metadata);
        }
        config
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [export] section
    if let Some(section) = ini.section(Some("export")) {
        if let Some(v) = section.get("output_dir") {
            let v = v.trim();
            if !v.is_empty() {
                config.export.output_dir = Some(expand_tilde(v));
            }
        }
        if let Some(v) = section.get("workers") {
            let workers: usize = v
                .trim()
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("export", "workers", v, "must be a positive integer"))?;
            config.export.workers = Some(workers);
        }
        if let Some(v) = section.get("scheme") {
            let scheme: TileScheme = v
                .parse()
                .map_err(|_| invalid("export", "scheme", v, "must be 'xyz' or 'tms'"))?;
            config.export.scheme = Some(scheme);
        }
        if let Some(v) = section.get("metadata") {
            config.export.metadata = Some(parse_bool(v).ok_or_else(|| {
                invalid("export", "metadata", v, "must be true/false, yes/no, on/off or 1/0")
            })?);
        }
        if let Some(v) = section.get("staging_dir") {
            let v = v.trim();
            if !v.is_empty() {
                config.export.staging_dir = Some(expand_tilde(v));
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = Some(expand_tilde(v));
            }
        }
    }

    Ok(config)
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Expand ~ to home directory in paths.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Get the path to the config directory (~/.tilepack).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilepack")
}

/// Get the path to the config file (~/.tilepack/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, contents).unwrap();
        (temp_dir, config_path)
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp_dir.path().join("nonexistent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_full_config() {
        let (_dir, path) = write_config(
            r#"
[export]
output_dir = /srv/tiles
workers = 6
scheme = tms
metadata = no
staging_dir = /var/tmp

[logging]
file = /var/log/tilepack.log
"#,
        );

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.export.output_dir, Some(PathBuf::from("/srv/tiles")));
        assert_eq!(config.export.workers, Some(6));
        assert_eq!(config.export.scheme, Some(TileScheme::Tms));
        assert_eq!(config.export.metadata, Some(false));
        assert_eq!(config.export.staging_dir, Some(PathBuf::from("/var/tmp")));
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/var/log/tilepack.log"))
        );

        let export = config.export_config();
        assert_eq!(export.output_dir, PathBuf::from("/srv/tiles"));
        assert_eq!(export.workers, 6);
        assert_eq!(export.scheme, TileScheme::Tms);
        assert!(!export.write_metadata);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let (_dir, path) = write_config("[export]\nworkers = 2\n");

        let export = ConfigFile::load_from(&path).unwrap().export_config();
        assert_eq!(export.workers, 2);
        assert_eq!(export.output_dir, PathBuf::from("tiles"));
        assert!(export.write_metadata);
    }

    #[test]
    fn test_invalid_workers() {
        let (_dir, path) = write_config("[export]\nworkers = 0\n");

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("export.workers"));
    }

    #[test]
    fn test_invalid_scheme() {
        let (_dir, path) = write_config("[export]\nscheme = wmts\n");

        match ConfigFile::load_from(&path) {
            Err(ConfigFileError::InvalidValue { key, value, .. }) => {
                assert_eq!(key, "scheme");
                assert_eq!(value, "wmts");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_bool() {
        let (_dir, path) = write_config("[export]\nmetadata = maybe\n");
        assert!(ConfigFile::load_from(&path).is_err());
    }

    #[test]
    fn test_parse_bool_values() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" on "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("Off"), Some(false));
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("test/path"));
        }

        assert_eq!(expand_tilde("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_config_file_path() {
        let path = config_file_path();
        assert!(path.ends_with(".tilepack/config.ini"));
    }
}
