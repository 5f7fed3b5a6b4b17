//! Flashzel - build orchestrator for Flash/Flex projects
//!
//! Orchestrates:
//! 1. Project file loading
//! 2. Scope resolution and dependency expansion
//! 3. Configuration validation and output conflict detection
//! 4. Parallel compilation (using convenient-flex)

use clap::Parser;
use commands::build::BuildOptions;
use commands::{Cli, Commands};
use convenient_flex::ValidationOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flashzel=info,convenient_flex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let success = match cli.command {
        Commands::Validate {
            scope,
            packaging,
            strict,
            json,
        } => {
            let options = ValidationOptions {
                check_packaging: packaging,
                strict_dependency_types: strict,
            };
            commands::validate::execute(&cli.project, &scope, options, json).await?
        }
        Commands::Plan { scope, json } => commands::plan::execute(&cli.project, &scope, json).await?,
        Commands::Build {
            scope,
            jobs,
            rebuild,
            json,
        } => {
            let options = BuildOptions { jobs, rebuild, json };
            commands::build::execute(&cli.project, &scope, options).await?
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
