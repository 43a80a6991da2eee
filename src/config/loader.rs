//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::LbConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LbConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Values given on the command line, applied over the file or defaults.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    /// Replaces the configured backends when non-empty.
    pub backends: Vec<String>,
    pub log_level: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut LbConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if !self.backends.is_empty() {
            config.backends = self.backends.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

/// Read `path` (or start from defaults), apply `overrides`, then validate
/// the merged result once.
pub fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> Result<LbConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => LbConfig::default(),
    };

    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse TOML without semantic validation.
pub fn parse_config(content: &str) -> Result<LbConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rr-proxy-{}-{}.toml", name, std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_valid_file() {
        let path = write_temp(
            "valid",
            r#"
            backends = ["http://127.0.0.1:3001"]

            [timeouts]
            connect_secs = 2
            "#,
        );

        let config = load_config(&path).unwrap();
        assert_eq!(config.backends, vec!["http://127.0.0.1:3001".to_string()]);
        assert_eq!(config.timeouts.connect_secs, 2);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_reports_validation_errors() {
        let path = write_temp("invalid", "backends = []\n");

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert_eq!(err.to_string(), "Validation failed: at least one backend is required");
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("backends = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_overrides_fix_file_before_validation() {
        let path = write_temp("overridden", "backends = []\n\n[listener]\nport = 0\n");
        let overrides = Overrides {
            port: Some(9000),
            backends: vec!["http://127.0.0.1:3001".into()],
            log_level: Some("debug".into()),
        };

        let config = resolve_config(Some(&path), &overrides).unwrap();
        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.backends, vec!["http://127.0.0.1:3001".to_string()]);
        assert_eq!(config.observability.log_level, "debug");
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_resolve_validates_merged_config() {
        let path = write_temp("still-invalid", "backends = []\n");

        let err = resolve_config(Some(&path), &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));

        let overrides = Overrides {
            backends: vec!["not a url".into()],
            ..Overrides::default()
        };
        let err = resolve_config(None, &overrides).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_resolve_without_file_uses_defaults() {
        let config = resolve_config(None, &Overrides::default()).unwrap();
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.backends.len(), 3);
    }
}
