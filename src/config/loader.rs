//! Settings loading from disk.
//!
//! The settings file is TOML. Top-level scalars form the root section and
//! top-level tables form named sections:
//!
//! ```toml
//! appDisable = false
//! allowedOrigins = ["10.0.0.1", "10.0.0.2"]
//!
//! [smtp]
//! server = "mail.example.com"
//! port = 587
//! ```
//!
//! Values are stored in their string form; arrays of scalars are joined
//! with `,` so they read back as delimited lists.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{ApplicationSettings, Settings};
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for settings loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unsupported value for '{key}': {reason}")]
    InvalidValue { key: String, reason: &'static str },

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

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<ApplicationSettings, ConfigError> {
    let content = fs::read_to_string(path)?;
    let settings = parse_settings(&content)?;

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    tracing::debug!(path = %path.display(), "Settings loaded");
    Ok(settings)
}

/// Parse settings from TOML text without validating them.
pub fn parse_settings(content: &str) -> Result<ApplicationSettings, ConfigError> {
    let table: toml::Table = toml::from_str(content)?;
    let mut settings = ApplicationSettings::new();

    for (key, value) in table {
        match value {
            toml::Value::Table(section) => {
                let target = settings.section_mut(Some(key.as_str()));
                fill_section(target, &key, section)?;
            }
            other => {
                let value = scalar_to_string(&key, &other)?;
                settings.root_mut().set_property(key, value);
            }
        }
    }

    Ok(settings)
}

fn fill_section(target: &mut Settings, section: &str, table: toml::Table) -> Result<(), ConfigError> {
    for (key, value) in table {
        if value.is_table() {
            return Err(ConfigError::InvalidValue {
                key: format!("{section}.{key}"),
                reason: "nested tables are not supported",
            });
        }
        let value = scalar_to_string(&key, &value)?;
        target.set_property(key, value);
    }
    Ok(())
}

fn scalar_to_string(key: &str, value: &toml::Value) -> Result<String, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Datetime(d) => Ok(d.to_string()),
        toml::Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| match item {
                    toml::Value::Array(_) | toml::Value::Table(_) => Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        reason: "arrays may only contain scalars",
                    }),
                    scalar => scalar_to_string(key, scalar),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(parts.join(","))
        }
        toml::Value::Table(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: "nested tables are not supported",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{KEY_ALLOWED_ORIGINS, KEY_APP_DISABLE};

    #[test]
    fn test_parse_root_and_sections() {
        let settings = parse_settings(
            r#"
            appDisable = true
            allowedOrigins = "1.2.3.4, 5.6.7.8"

            [smtp]
            server = "mail.local"
            port = 587
            "#,
        )
        .unwrap();

        assert_eq!(settings.root().get(KEY_APP_DISABLE), Some("true"));
        assert_eq!(settings.root().get(KEY_ALLOWED_ORIGINS), Some("1.2.3.4, 5.6.7.8"));

        let smtp = settings.get_section(Some("smtp")).unwrap();
        assert_eq!(smtp.get("server"), Some("mail.local"));
        assert_eq!(smtp.get("port"), Some("587"));
    }

    #[test]
    fn test_array_joined() {
        let settings = parse_settings(r#"allowedOrigins = ["10.0.0.1", "10.0.0.2"]"#).unwrap();
        assert_eq!(settings.root().get(KEY_ALLOWED_ORIGINS), Some("10.0.0.1,10.0.0.2"));
    }

    #[test]
    fn test_nested_table_rejected() {
        let err = parse_settings("[smtp.auth]\nuser = \"x\"").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, reason } => {
                assert_eq!(key, "smtp.auth");
                assert_eq!(reason, "nested tables are not supported");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_settings("appDisable = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_settings(Path::new("/nonexistent/webapp-settings.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
