//! Project configuration: `vizbuilder.toml` and the runtime config store.
//!
//! # Sections
//!
//! | Section          | Purpose                                          |
//! |------------------|--------------------------------------------------|
//! | `[site]`         | Free-form values set on the config store         |
//! | `[serve]`        | Development server (interface, port, grace)      |
//! | `[pages."path"]` | Sitemap entries, same attributes as `add_page`   |
//! | `[data.name]`    | Inline data bags, same as `add_data`             |
//!
//! # Example
//!
//! ```toml
//! [site]
//! layout = "templates/layout.html"
//! http_prefix = "https://example.com/graphics/"
//!
//! [serve]
//! port = 3456
//!
//! [pages."index.html"]
//! template = "templates/index.html"
//! title = "Home"
//!
//! [data.colors]
//! primary = "#0c6"
//! ```
//!
//! The file is optional. It is the declarative form of the configuration
//! block and is applied before any programmatic block.

mod defaults;
mod error;
mod serve;
mod store;

pub use defaults::CONFIG_FILE;
pub use error::ConfigError;
pub use serve::ServeConfig;
pub use store::{ConfigStore, LAYOUT_KEY, MODE_KEY, Mode, TARGET_KEY, Target};

use crate::{cli::Cli, site::Site};
use anyhow::{Context, Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fs,
    net::IpAddr,
    path::{Path, PathBuf},
};

/// Root configuration structure representing vizbuilder.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project root directory (set after loading)
    #[serde(skip)]
    #[educe(Default = PathBuf::from("./"))]
    pub root: PathBuf,

    /// Values set on the config store
    #[serde(default)]
    pub site: BTreeMap<String, Value>,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Sitemap entries keyed by output path
    #[serde(default)]
    pub pages: BTreeMap<String, Value>,

    /// Inline data bags
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
}

impl ProjectConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: ProjectConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load `<root>/<file>` if it exists, otherwise start from defaults.
    pub fn load(root: &Path, file: &Path) -> Result<Self> {
        let path = root.join(file);
        let mut config = if path.is_file() {
            Self::from_path(&path)?
        } else {
            Self::default()
        };
        config.root = root.to_path_buf();
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        if let Some((interface, port)) = cli.serve_overrides() {
            Self::update_option(&mut self.serve.interface, interface);
            Self::update_option(&mut self.serve.port, port);
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.serve.interface.parse::<IpAddr>().is_err() {
            bail!(ConfigError::Validation(format!(
                "[serve.interface] `{}` is not an IP address",
                self.serve.interface
            )));
        }
        if self.serve.port == 0 {
            bail!(ConfigError::Validation("[serve.port] must not be 0".into()));
        }
        if let Some((path, _)) = self.pages.iter().find(|(path, _)| path.trim().is_empty()) {
            bail!(ConfigError::Validation(format!(
                "[pages] has an empty path `{path}`"
            )));
        }
        Ok(())
    }

    /// Apply the declarative sections to a site: `[site]`, then `[data]`,
    /// then `[pages]`.
    pub fn apply(&self, site: &mut Site) -> Result<(), ConfigError> {
        for (key, value) in &self.site {
            site.set(key, value.clone());
        }
        for (name, value) in &self.data {
            site.add_data(name, value.clone());
        }
        for (path, attrs) in &self.pages {
            site.add_page(path, attrs.clone())?;
        }
        Ok(())
    }
}
