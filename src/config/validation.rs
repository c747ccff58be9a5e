//! Settings validation.
//!
//! # Responsibilities
//! - Semantic checks on values the framework itself consumes
//! - Collect every problem instead of stopping at the first
//!
//! Runtime parsing stays lenient (an unknown `appDisable` value reads as
//! false); validation is where a settings file gets rejected.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::config::schema::{
    ApplicationSettings, KEY_ALLOWED_ORIGINS, KEY_APP_DISABLE, KEY_TRUSTED_PROXIES, SERVER_SECTION,
};

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted key, e.g. `smtp.port`.
    pub key: String,
    pub message: String,
}

impl ValidationError {
    fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Validate settings. Returns all errors found.
pub fn validate_settings(settings: &ApplicationSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let root = settings.root();

    if let Some(value) = root.get(KEY_APP_DISABLE) {
        let value = value.trim();
        if !value.eq_ignore_ascii_case("true") && !value.eq_ignore_ascii_case("false") {
            errors.push(ValidationError::new(KEY_APP_DISABLE, "expected true or false"));
        }
    }

    if let Some(origins) = root.get(KEY_ALLOWED_ORIGINS) {
        if origins.split(',').any(|origin| origin.trim().is_empty()) {
            errors.push(ValidationError::new(KEY_ALLOWED_ORIGINS, "empty origin entry"));
        }
    }

    if let Some(proxies) = root.get(KEY_TRUSTED_PROXIES) {
        let invalid = proxies
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .any(|entry| entry.parse::<IpAddr>().is_err());
        if invalid {
            errors.push(ValidationError::new(KEY_TRUSTED_PROXIES, "expected IP addresses"));
        }
    }

    if let Some(server) = settings.get_section(Some(SERVER_SECTION)) {
        if let Some(addr) = server.get("bindAddress") {
            if addr.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::new("server.bindAddress", "invalid socket address"));
            }
        }
        if let Some(secs) = server.get("requestTimeoutSecs") {
            if !matches!(secs.parse::<u64>(), Ok(n) if n > 0) {
                errors.push(ValidationError::new("server.requestTimeoutSecs", "expected a positive integer"));
            }
        }
    }

    if let Some(smtp) = settings.get_section(Some("smtp")) {
        if let Some(port) = smtp.get("port") {
            if port.parse::<u16>().is_err() {
                errors.push(ValidationError::new("smtp.port", "expected a port number"));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
