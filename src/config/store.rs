//! Process-wide configuration values.
//!
//! `ConfigStore` holds whatever the configuration block sets, plus the
//! internal bookkeeping keys `mode`, `target` and `layout`.

use crate::bindings::Bindings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Key under which the run mode is stored.
pub const MODE_KEY: &str = "mode";
/// Key under which the deployment target is stored.
pub const TARGET_KEY: &str = "target";
/// Key of the site-wide layout template.
pub const LAYOUT_KEY: &str = "layout";

/// How the builder is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Build,
    Server,
}

/// Who the output is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Production,
    Development,
}

impl Mode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Server => "server",
        }
    }
}

impl Target {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration values with canonical keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigStore {
    values: Bindings,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bindings(values: Bindings) -> Self {
        Self { values }
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: impl AsRef<str>) -> Option<&str> {
        self.values.get_str(key)
    }

    pub fn contains_key(&self, key: impl AsRef<str>) -> bool {
        self.values.contains_key(key)
    }

    /// Write `key` unconditionally.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key, value.into());
        self
    }

    /// Write `key` only if it is absent.
    pub fn set_default(&mut self, key: impl AsRef<str>, value: impl Into<Value>) -> &mut Self {
        if !self.values.contains_key(key.as_ref()) {
            self.values.insert(key, value.into());
        }
        self
    }

    pub fn bindings(&self) -> &Bindings {
        &self.values
    }

    pub fn mode(&self) -> Option<Mode> {
        self.get(MODE_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn target(&self) -> Option<Target> {
        self.get(TARGET_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set_mode(&mut self, mode: Mode) -> &mut Self {
        self.set(MODE_KEY, mode.as_str())
    }

    pub fn set_target(&mut self, target: Target) -> &mut Self {
        self.set(TARGET_KEY, target.as_str())
    }

    /// Site-wide layout, used by template pages that declare none.
    pub fn layout(&self) -> Option<&str> {
        self.get_str(LAYOUT_KEY).filter(|s| !s.is_empty())
    }

    pub fn is_server(&self) -> bool {
        self.mode() == Some(Mode::Server)
    }

    pub fn is_build(&self) -> bool {
        self.mode() == Some(Mode::Build)
    }

    pub fn is_production(&self) -> bool {
        self.target() == Some(Target::Production)
    }

    pub fn is_development(&self) -> bool {
        self.target() == Some(Target::Development)
    }

    /// URL prefix of the site root, always ending in `/`.
    pub fn http_prefix(&self) -> String {
        if self.is_server() && self.is_development() {
            return "/".to_owned();
        }
        with_trailing_slash(self.get_str("http_prefix").unwrap_or("/"))
    }

    /// URL prefix of the asset root, always ending in `/`.
    ///
    /// Falls back to [`Self::http_prefix`] when `asset_http_prefix` is unset.
    pub fn asset_http_prefix(&self) -> String {
        if self.is_server() && self.is_development() {
            return "/".to_owned();
        }
        match self.get_str("asset_http_prefix") {
            Some(prefix) => with_trailing_slash(prefix),
            None => self.http_prefix(),
        }
    }
}

fn with_trailing_slash(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_owned()
    } else {
        format!("{prefix}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_set_default() {
        let mut store = ConfigStore::new();
        store.set("thing1", "foo").set_default("thing1", "bar");
        store.set_default(":thing2", "bar");

        assert_eq!(store.get_str("thing1"), Some("foo"));
        assert_eq!(store.get_str(":thing2"), Some("bar"));
    }

    #[test]
    fn test_mode_and_target() {
        let mut store = ConfigStore::new();
        assert_eq!(store.mode(), None);
        assert!(!store.is_build());

        store.set_mode(Mode::Server).set_target(Target::Development);
        assert!(store.is_server());
        assert!(store.is_development());
        assert!(!store.is_production());
        assert_eq!(store.get(MODE_KEY), Some(&json!("server")));
    }

    #[test]
    fn test_http_prefix_in_dev_server_is_root() {
        let mut store = ConfigStore::new();
        store
            .set("http_prefix", "https://cdn.example.com/viz")
            .set_mode(Mode::Server)
            .set_target(Target::Development);
        assert_eq!(store.http_prefix(), "/");
        assert_eq!(store.asset_http_prefix(), "/");
    }

    #[test]
    fn test_http_prefix_gets_trailing_slash() {
        let mut store = ConfigStore::new();
        store
            .set("http_prefix", "https://example.com/viz")
            .set_mode(Mode::Build)
            .set_target(Target::Production);
        assert_eq!(store.http_prefix(), "https://example.com/viz/");
        // asset prefix falls back to the site prefix
        assert_eq!(store.asset_http_prefix(), "https://example.com/viz/");

        store.set("asset_http_prefix", "https://cdn.example.com");
        assert_eq!(store.asset_http_prefix(), "https://cdn.example.com/");
    }

    #[test]
    fn test_empty_layout_is_none() {
        let mut store = ConfigStore::new();
        assert_eq!(store.layout(), None);
        store.set(LAYOUT_KEY, "");
        assert_eq!(store.layout(), None);
        store.set(LAYOUT_KEY, "layout.html");
        assert_eq!(store.layout(), Some("layout.html"));
    }
}
