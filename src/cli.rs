//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::config::CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sitemap-driven static builder with a reloading dev server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long, default_value = "./")]
    pub root: PathBuf,

    /// Config file name, relative to the project root
    #[arg(short = 'C', long, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render every sitemap page into `build/`
    Build {
        /// Suppress progress output
        #[arg(short, long)]
        silent: bool,
    },

    /// Serve the site, rendering pages on request. Ctrl+C once reloads, twice exits
    Serve {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Interface and port overrides of the `serve` subcommand.
    pub fn serve_overrides(&self) -> Option<(Option<&String>, Option<&u16>)> {
        match &self.command {
            Commands::Serve { interface, port } => Some((interface.as_ref(), port.as_ref())),
            Commands::Build { .. } => None,
        }
    }
}
