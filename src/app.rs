//! The builder entry points: configure, build, handle requests, serve.
//!
//! ```ignore
//! let mut app = VizBuilder::new("./").configure_with(|site| {
//!     site.set("layout", "templates/layout.html")
//!         .add_page("index.html", json!({"template": "templates/index.html"}))?;
//!     Ok(())
//! });
//! app.build(false)?;
//! ```

use crate::{
    bindings::Bindings,
    build::{BuildReport, build_site},
    config::{Mode, ProjectConfig, ServeConfig, Target},
    error::AppError,
    handler::RequestHandler,
    serve::{ServeOutcome, serve_site},
    site::{AFTER_LOAD_DATA, Site},
};
use anyhow::Result;
use std::{path::PathBuf, sync::Arc};

/// Programmatic configuration block.
pub type ConfigBlock = Box<dyn FnOnce(&mut Site) -> Result<()> + Send>;

/// A site plus the configuration that finalizes it.
pub struct VizBuilder {
    site: Site,
    project: Option<ProjectConfig>,
    block: Option<ConfigBlock>,
    configured: bool,
    failure: Option<AppError>,
}

impl std::fmt::Debug for VizBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VizBuilder")
            .field("configured", &self.configured)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

impl VizBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, Bindings::new())
    }

    /// Builder whose config starts with `config`.
    pub fn with_config(root: impl Into<PathBuf>, config: Bindings) -> Self {
        Self {
            site: Site::with_config(root, config),
            project: None,
            block: None,
            configured: false,
            failure: None,
        }
    }

    /// Builder driven by a project file.
    pub fn from_project(project: ProjectConfig) -> Self {
        let mut builder = Self::new(project.root.clone());
        builder.project = Some(project);
        builder
    }

    /// Set the configuration block, run once by [`Self::configure`] after
    /// the project file is applied.
    #[must_use]
    pub fn configure_with<F>(mut self, block: F) -> Self
    where
        F: FnOnce(&mut Site) -> Result<()> + Send + 'static,
    {
        self.block = Some(Box::new(block));
        self
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn site_mut(&mut self) -> &mut Site {
        &mut self.site
    }

    pub const fn is_configured(&self) -> bool {
        self.configured
    }

    /// Finalize configuration. Only the first call has any effect.
    ///
    /// Sets mode and target, loads `data/` (running the hooks registered so
    /// far), applies the project file and the configuration block, then runs
    /// the `after_load_data` hooks again so hooks the block added see the data.
    ///
    /// On failure the site is restored to its state before the call and every
    /// later call returns [`AppError::ConfigureFailed`].
    pub fn configure(&mut self, mode: Mode, target: Target) -> Result<&mut Self> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone().into());
        }
        if self.configured {
            return Ok(self);
        }

        let snapshot = self.site.clone();
        if let Err(err) = self.finalize(mode, target) {
            self.site = snapshot;
            self.failure = Some(AppError::ConfigureFailed(format!("{err:#}")));
            return Err(err);
        }

        self.configured = true;
        Ok(self)
    }

    fn finalize(&mut self, mode: Mode, target: Target) -> Result<()> {
        self.site.config_mut().set_mode(mode).set_target(target);
        self.site.reload_data()?;
        if let Some(project) = &self.project {
            project.apply(&mut self.site)?;
        }
        if let Some(block) = self.block.take() {
            block(&mut self.site)?;
        }
        self.site.run_hook(AFTER_LOAD_DATA)
    }

    /// Reload `data/` and re-run every `after_load_data` hook.
    pub fn reload_data(&mut self) -> Result<&mut Self> {
        self.site.reload_data()?;
        Ok(self)
    }

    /// Configure for a production build and write `build/`.
    pub fn build(&mut self, silent: bool) -> Result<BuildReport> {
        self.configure(Mode::Build, Target::Production)?;
        build_site(&mut self.site, silent)
    }

    /// Request handler over the configured site.
    pub fn handler(&self) -> Result<RequestHandler, AppError> {
        if !self.configured {
            return Err(AppError::NotConfigured);
        }
        Ok(RequestHandler::new(Arc::new(self.site.clone())))
    }

    /// Configure for development and serve until interrupted.
    pub fn serve(&mut self, config: &ServeConfig) -> Result<ServeOutcome> {
        self.configure(Mode::Server, Target::Development)?;
        let handler = self.handler()?;
        serve_site(&handler, config)
    }
}
