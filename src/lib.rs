//! Sitemap-driven static builder.
//!
//! A project declares a sitemap of pages (templates, JSON values or files),
//! data bags and config values. [`VizBuilder`] renders the sitemap into
//! `build/`, naming digest pages after the sha1 of their contents, or serves
//! it live with a reloading dev server.
//!
//! ```text
//! project/
//! ├── vizbuilder.toml   optional declarative configuration
//! ├── data/             *.json and *.yaml data bags
//! ├── prebuild/         pass-through assets, always digested
//! └── build/            output
//! ```

pub mod app;
pub mod bindings;
pub mod build;
pub mod cli;
pub mod config;
pub mod data;
pub mod digest;
pub mod error;
pub mod handler;
pub mod logger;
pub mod serve;
pub mod site;
pub mod supervisor;
pub mod template;
pub mod utils;

pub use app::VizBuilder;
pub use bindings::Bindings;
pub use build::BuildReport;
pub use config::{ConfigError, ConfigStore, Mode, ProjectConfig, Target};
pub use error::{AppError, ResolveError};
pub use handler::{RequestHandler, Response};
pub use site::{HelperSet, HelperTarget, Page, Site};
pub use template::TemplateContext;
