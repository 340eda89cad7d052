//! Sitemap entries.

use crate::bindings::Bindings;
use crate::config::ConfigError;
use anyhow::{Result, bail};
use serde_json::Value;
use std::sync::OnceLock;

/// Attribute names that select how a page is produced.
pub const SOURCE_KEYS: [&str; 3] = ["template", "json", "file"];

/// How a page's bytes are produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PageSource {
    /// Render a template (path relative to the project root).
    Template(String),
    /// Serialize a value as JSON.
    Json(Value),
    /// Copy a file verbatim (path relative to the project root).
    File(String),
}

impl PageSource {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Template(_) => "template",
            Self::Json(_) => "json",
            Self::File(_) => "file",
        }
    }
}

/// Layout selection for template pages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Layout {
    /// Use the site-wide `layout` config key, if any.
    #[default]
    Inherit,
    /// Explicitly render without a layout.
    Disabled,
    Template(String),
}

/// One output artifact of the site.
#[derive(Debug, Clone)]
pub struct Page {
    path: String,
    source: PageSource,
    layout: Layout,
    digest: bool,
    digest_path: OnceLock<String>,
    attrs: Bindings,
}

impl Page {
    fn with_source(path: impl Into<String>, source: PageSource) -> Self {
        let mut attrs = Bindings::new();
        let value = match &source {
            PageSource::Template(t) | PageSource::File(t) => Value::String(t.clone()),
            PageSource::Json(v) => v.clone(),
        };
        attrs.insert(source.kind(), value);
        Self {
            path: path.into(),
            source,
            layout: Layout::Inherit,
            digest: false,
            digest_path: OnceLock::new(),
            attrs,
        }
    }

    pub fn template(path: impl Into<String>, template: impl Into<String>) -> Self {
        Self::with_source(path, PageSource::Template(template.into()))
    }

    pub fn json(path: impl Into<String>, value: Value) -> Self {
        Self::with_source(path, PageSource::Json(value))
    }

    pub fn file(path: impl Into<String>, file: impl Into<String>) -> Self {
        Self::with_source(path, PageSource::File(file.into()))
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        let layout = layout.into();
        self.attrs.insert("layout", Value::String(layout.clone()));
        self.layout = Layout::Template(layout);
        self
    }

    pub fn with_digest(mut self, digest: bool) -> Self {
        self.attrs.insert("digest", Value::Bool(digest));
        self.digest = digest;
        self
    }

    /// Parse a page from its declared attributes.
    ///
    /// Exactly one of `template`, `json` or `file` must be present. Null and
    /// empty-string values count as absent. Every attribute is retained and
    /// visible to templates as `page.<name>`.
    pub fn from_attrs(path: impl Into<String>, attrs: Value) -> Result<Self, ConfigError> {
        let path = path.into();
        let Some(attrs) = Bindings::from_value(attrs) else {
            return Err(ConfigError::InvalidPage(path, "attributes must be a table".into()));
        };

        let present: Vec<&str> = SOURCE_KEYS
            .into_iter()
            .filter(|key| attrs.get(key).is_some_and(is_present))
            .collect();

        let source = match present.as_slice() {
            [] => return Err(ConfigError::MissingSource(path)),
            ["json"] => PageSource::Json(attrs.get("json").cloned().unwrap_or_default()),
            [key] => {
                let Some(value) = attrs.get_str(key) else {
                    return Err(ConfigError::InvalidPage(path, format!("'{key}' must be a path")));
                };
                if *key == "template" {
                    PageSource::Template(value.to_owned())
                } else {
                    PageSource::File(value.to_owned())
                }
            }
            many => return Err(ConfigError::AmbiguousSource(path, many.join(", "))),
        };

        let layout = match attrs.get("layout") {
            None => Layout::Inherit,
            Some(Value::Null | Value::Bool(false)) => Layout::Disabled,
            Some(Value::String(s)) if s.is_empty() => Layout::Disabled,
            Some(Value::String(s)) => Layout::Template(s.clone()),
            Some(_) => {
                return Err(ConfigError::InvalidPage(path, "'layout' must be a path".into()));
            }
        };

        let digest = match attrs.get("digest") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(ConfigError::InvalidPage(path, "'digest' must be a boolean".into()));
            }
        };

        Ok(Self {
            path,
            source,
            layout,
            digest,
            digest_path: OnceLock::new(),
            attrs,
        })
    }

    /// Sitemap key, also the undigested output path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> &PageSource {
        &self.source
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn is_digest(&self) -> bool {
        self.digest
    }

    pub fn attrs(&self) -> &Bindings {
        &self.attrs
    }

    /// Digested output path, set once the page has been built.
    pub fn digest_path(&self) -> Option<&str> {
        self.digest_path.get().map(String::as_str)
    }

    /// Record the digested output path. Write-once: recording a different
    /// path for an already digested page is an error.
    pub(crate) fn record_digest_path(&self, digest_path: String) -> Result<()> {
        match self.digest_path.get() {
            Some(existing) if *existing == digest_path => Ok(()),
            Some(existing) => bail!(
                "digest path for '{}' already recorded as '{existing}', refusing '{digest_path}'",
                self.path
            ),
            None => {
                // single-threaded build, nobody races us here
                let _ = self.digest_path.set(digest_path);
                Ok(())
            }
        }
    }

    /// Page as seen by templates.
    pub fn to_value(&self) -> Value {
        let mut value = self.attrs.clone();
        value.insert("path", Value::String(self.path.clone()));
        value.insert("digest", Value::Bool(self.digest));
        if let Some(digest_path) = self.digest_path() {
            value.insert("digest_path", Value::String(digest_path.to_owned()));
        }
        value.to_value()
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
