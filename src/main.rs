//! vizbuilder - build or serve a sitemap-driven static site.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use vizbuilder::{
    VizBuilder,
    cli::{Cli, Commands},
    config::ProjectConfig,
    supervisor,
};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Build { silent } => {
            VizBuilder::from_project(config).build(*silent)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve { .. } => {
            let code = if supervisor::is_worker() {
                let serve = config.serve.clone();
                VizBuilder::from_project(config).serve(&serve)?.exit_code()
            } else {
                supervisor::supervise()?
            };
            Ok(exit_code(code))
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<ProjectConfig> {
    let mut config = ProjectConfig::load(&cli.root, &cli.config)?;
    config.update_with_cli(cli);
    config.validate()?;
    Ok(config)
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
