//! Settings schema definitions.
//!
//! Settings are plain string key/value pairs grouped into sections. The
//! root section (`None`) configures the application itself; named sections
//! belong to modules (`smtp`) or to the host (`server`, `admin`).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root key: disables the application (all requests get 503).
pub const KEY_APP_DISABLE: &str = "appDisable";

/// Root key: comma-delimited list of allowed origins, or `*` for any.
pub const KEY_ALLOWED_ORIGINS: &str = "allowedOrigins";

/// Root key: comma-delimited proxy IPs whose forwarding headers are trusted.
pub const KEY_TRUSTED_PROXIES: &str = "trustedProxies";

pub const DEFAULT_APP_DISABLED: bool = false;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "*";
pub const DEFAULT_TRUSTED_PROXIES: &str = "";

/// Section holding the HTTP host settings.
pub const SERVER_SECTION: &str = "server";

/// Section holding the admin API settings.
pub const ADMIN_SECTION: &str = "admin";

/// A single settings section: unique keys mapped to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Settings {
    properties: BTreeMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any previous value.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Set a property only if the key is not present yet.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.entry(key.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Get a property, falling back to `default` when absent.
    pub fn get_property<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Boolean lookup. Only `"true"` (any case) is true; anything else is false.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => value.trim().eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: &Settings) {
        for (key, value) in other.iter() {
            self.set_property(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (key, value) in iter {
            settings.set_property(key, value);
        }
        settings
    }
}

/// All settings of an application: the root section plus named sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationSettings {
    root: Settings,
    sections: BTreeMap<String, Settings>,
}

impl ApplicationSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the given section (`None` = root), or `None` if it does not exist.
    pub fn get_section(&self, name: Option<&str>) -> Option<&Settings> {
        match name {
            None => Some(&self.root),
            Some(name) => self.sections.get(name),
        }
    }

    /// Returns the given section, creating it if needed.
    pub fn section_mut(&mut self, name: Option<&str>) -> &mut Settings {
        match name {
            None => &mut self.root,
            Some(name) => self.sections.entry(name.to_string()).or_default(),
        }
    }

    pub fn root(&self) -> &Settings {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Settings {
        &mut self.root
    }

    /// Names of the named sections, sorted.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Overlay `overrides` on top of `self`, section by section.
    pub fn merge(&mut self, overrides: &ApplicationSettings) {
        self.root.merge(&overrides.root);
        for (name, section) in &overrides.sections {
            self.sections.entry(name.clone()).or_default().merge(section);
        }
    }

    /// Consume `self` as defaults and return them overlaid with `overrides`.
    pub fn merged_with(mut self, overrides: &ApplicationSettings) -> Self {
        self.merge(overrides);
        self
    }
}

/// Settings for the HTTP host, read from the `server` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Build from the `server` section. Unparsable numbers keep their default;
    /// [`crate::config::validation`] reports them when loading from disk.
    pub fn from_settings(settings: &ApplicationSettings) -> Self {
        let mut config = Self::default();
        let Some(section) = settings.get_section(Some(SERVER_SECTION)) else {
            return config;
        };

        if let Some(addr) = section.get("bindAddress") {
            config.bind_address = addr.to_string();
        }
        if let Some(secs) = section.get("requestTimeoutSecs").and_then(|v| v.parse().ok()) {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_fallback() {
        let mut settings = Settings::new();
        settings.set_property("a", "1");

        assert_eq!(settings.get_property("a", "x"), "1");
        assert_eq!(settings.get_property("b", "x"), "x");
    }

    #[test]
    fn test_set_default_keeps_existing() {
        let mut settings = Settings::new();
        settings.set_property("a", "1");
        settings.set_default("a", "2");
        settings.set_default("b", "3");

        assert_eq!(settings.get("a"), Some("1"));
        assert_eq!(settings.get("b"), Some("3"));
    }

    #[test]
    fn test_bool_parsing() {
        let settings: Settings = [("t", "TRUE"), ("f", "false"), ("junk", "yes")]
            .into_iter()
            .collect();

        assert!(settings.get_bool("t", false));
        assert!(!settings.get_bool("f", true));
        assert!(!settings.get_bool("junk", true));
        assert!(settings.get_bool("missing", true));
    }

    #[test]
    fn test_merge_overrides_defaults() {
        let mut defaults = ApplicationSettings::new();
        defaults.root_mut().set_property(KEY_APP_DISABLE, "false");
        defaults.root_mut().set_property(KEY_ALLOWED_ORIGINS, "*");
        defaults.section_mut(Some("smtp")).set_property("port", "25");

        let mut loaded = ApplicationSettings::new();
        loaded.root_mut().set_property(KEY_APP_DISABLE, "true");
        loaded.section_mut(Some("smtp")).set_property("server", "mail.local");
        loaded.section_mut(Some("extra")).set_property("k", "v");

        let merged = defaults.merged_with(&loaded);

        assert_eq!(merged.root().get(KEY_APP_DISABLE), Some("true"));
        assert_eq!(merged.root().get(KEY_ALLOWED_ORIGINS), Some("*"));
        let smtp = merged.get_section(Some("smtp")).unwrap();
        assert_eq!(smtp.get("port"), Some("25"));
        assert_eq!(smtp.get("server"), Some("mail.local"));
        assert!(merged.get_section(Some("extra")).is_some());
        assert!(merged.get_section(Some("missing")).is_none());
    }

    #[test]
    fn test_server_config_from_settings() {
        let mut settings = ApplicationSettings::new();
        assert_eq!(ServerConfig::from_settings(&settings), ServerConfig::default());

        let server = settings.section_mut(Some(SERVER_SECTION));
        server.set_property("bindAddress", "127.0.0.1:9000");
        server.set_property("requestTimeoutSecs", "5");

        let config = ServerConfig::from_settings(&settings);
        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }
}
