//! The configuration context of a site.
//!
//! [`Site`] owns everything the configuration block populates: config values,
//! the sitemap, data bags, hooks and helpers. It is created explicitly and
//! passed to whatever needs it; there is no global instance.
//!
//! Every DSL method returns the site so calls chain:
//!
//! ```ignore
//! site.set("layout", "layout.html")
//!     .add_data("people", json!([{"name": "Ada"}]))
//!     .add_page("index.html", json!({"template": "index.html"}))?
//!     .after_load_data(|site| {
//!         site.set("loaded", true);
//!         Ok(())
//!     });
//! ```

mod helpers;
mod hooks;
mod page;
mod sitemap;

pub use helpers::{
    BUILTIN_FUNCTIONS, HelperArgs, HelperFn, HelperRegistry, HelperSet, HelperTarget, call_builtin,
};
pub use hooks::{AFTER_LOAD_DATA, Hook, HookRegistry};
pub use page::{Layout, Page, PageSource, SOURCE_KEYS};
pub use sitemap::Sitemap;

use crate::{
    bindings::Bindings,
    config::{ConfigError, ConfigStore},
    data::{DataStore, load_data_dir},
};
use anyhow::{Result, anyhow};
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Source of data bags, relative to the project root.
pub const DATA_DIR: &str = "data";
/// Pass-through assets, relative to the project root.
pub const PREBUILT_DIR: &str = "prebuild";
/// Output tree, relative to the project root.
pub const BUILD_DIR: &str = "build";

/// Config, sitemap, data, hooks and helpers of one project.
#[derive(Debug, Clone)]
pub struct Site {
    root: PathBuf,
    config: ConfigStore,
    sitemap: Arc<Sitemap>,
    data: DataStore,
    hooks: HookRegistry,
    helpers: HelperRegistry,
}

impl Site {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, Bindings::new())
    }

    /// Create a site with initial config values.
    pub fn with_config(root: impl Into<PathBuf>, config: Bindings) -> Self {
        Self {
            root: root.into(),
            config: ConfigStore::from_bindings(config),
            sitemap: Arc::new(Sitemap::new()),
            data: DataStore::new(),
            hooks: HookRegistry::default(),
            helpers: HelperRegistry::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    pub fn sitemap(&self) -> &Sitemap {
        &self.sitemap
    }

    /// Shared handle on the sitemap.
    ///
    /// Digest paths recorded through the handle are visible to the site.
    pub fn shared_sitemap(&self) -> Arc<Sitemap> {
        Arc::clone(&self.sitemap)
    }

    pub fn data(&self) -> &DataStore {
        &self.data
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn helper_registry(&self) -> &HelperRegistry {
        &self.helpers
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn prebuild_dir(&self) -> PathBuf {
        self.root.join(PREBUILT_DIR)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }

    /// Resolve a project-relative path. Absolute paths pass through.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    // ------------------------------------------------------------------------
    // Configuration DSL
    // ------------------------------------------------------------------------

    /// Insert or replace the sitemap entry at `path`.
    ///
    /// Fails unless `attrs` declares exactly one of `template`, `json`, `file`.
    pub fn add_page(&mut self, path: &str, attrs: Value) -> Result<&mut Self, ConfigError> {
        let page = Page::from_attrs(path, attrs)?;
        Arc::make_mut(&mut self.sitemap).insert(page);
        Ok(self)
    }

    /// Insert or replace an already constructed page.
    pub fn insert_page(&mut self, page: Page) -> &mut Self {
        Arc::make_mut(&mut self.sitemap).insert(page);
        self
    }

    /// Insert or replace a data bag.
    pub fn add_data(&mut self, key: &str, value: Value) -> &mut Self {
        self.data.insert(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.config.set(key, value);
        self
    }

    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.config.set_default(key, value);
        self
    }

    /// Append a callback to the hook list `name`.
    pub fn hook<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Site) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.register(name, Arc::new(f));
        self
    }

    /// Shorthand for `hook(AFTER_LOAD_DATA, f)`.
    pub fn after_load_data<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Site) -> Result<()> + Send + Sync + 'static,
    {
        self.hook(AFTER_LOAD_DATA, f)
    }

    /// Register a helper set for the configuration block and/or templates.
    pub fn helpers(&mut self, set: HelperSet, target: HelperTarget) -> Result<&mut Self, ConfigError> {
        self.helpers.register(set, target)?;
        Ok(self)
    }

    /// Call a config-side helper (or a built-in predicate) by name.
    pub fn call_helper(&self, name: &str, args: &HelperArgs) -> Result<Value> {
        if let Some(value) = call_builtin(&self.config, name) {
            return Ok(value);
        }
        let f = self
            .helpers
            .config_fn(name)
            .ok_or_else(|| anyhow!("no config helper named `{name}`"))?;
        f(&self.config, args)
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Run every hook registered under `name`, in registration order.
    ///
    /// Hooks registered while this runs wait for the next invocation.
    pub fn run_hook(&mut self, name: &str) -> Result<()> {
        for hook in self.hooks.get(name) {
            hook(self)?;
        }
        Ok(())
    }

    /// Load `data/` and merge it over the current data, then run the
    /// `after_load_data` hooks.
    ///
    /// Every hook re-runs on every reload, including hooks that already ran.
    pub fn reload_data(&mut self) -> Result<&mut Self> {
        let fresh = load_data_dir(&self.data_dir())?;
        self.data.merge(fresh);
        self.run_hook(AFTER_LOAD_DATA)?;
        Ok(self)
    }
}
