//! Flashzel command-line interface
//!
//! - `validate`: resolve a scope and report every configuration problem
//! - `plan`: show the compilation tasks a build would run
//! - `build`: validate, plan and compile

use clap::{Args, Parser, Subcommand};
use convenient_flex::{BuildPipeline, CompileScope, ConfigurationError, LocalFileSystem, Project, UnitKey, ValidationOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub mod build;
pub mod plan;
pub mod validate;

/// Flashzel - build orchestrator for Flash/Flex projects
#[derive(Parser)]
#[command(name = "flashzel")]
#[command(about = "Build orchestrator for Flash/Flex projects")]
#[command(version)]
pub struct Cli {
    /// Project file describing modules and build configurations
    #[arg(short, long, global = true, default_value = "flashzel.yaml")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report configuration problems of a scope
    Validate {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Also validate packaging options of applications
        #[arg(long)]
        packaging: bool,

        /// Reject dependencies whose output kind and linkage don't fit
        #[arg(long)]
        strict: bool,

        /// Print problems as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the compilation tasks for a scope
    Plan {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate and compile a scope
    Build {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Maximum parallel compilations (defaults to the project setting)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Full rebuild instead of incremental make
        #[arg(long)]
        rebuild: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// What to compile; with no flags, every Flash module of the project
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Build configuration as MODULE/UNIT (repeatable)
    #[arg(short, long = "unit", value_name = "MODULE/UNIT")]
    pub units: Vec<UnitKey>,

    /// Module name (repeatable)
    #[arg(short, long = "module", value_name = "NAME")]
    pub modules: Vec<String>,

    /// Run configuration name
    #[arg(short, long = "run", value_name = "NAME", conflicts_with_all = ["units", "modules"])]
    pub run: Option<String>,
}

impl ScopeArgs {
    pub fn to_scope(&self, project: &Project) -> Result<CompileScope, ConfigurationError> {
        if let Some(name) = &self.run {
            let run_configuration = project
                .find_run_configuration(name)
                .ok_or_else(|| ConfigurationError::UnknownRunConfiguration(name.clone()))?;
            return Ok(CompileScope::RunConfiguration(Arc::new(run_configuration.clone())));
        }

        if !self.units.is_empty() {
            return Ok(CompileScope::Units(self.units.clone()));
        }

        let modules = if self.modules.is_empty() {
            project
                .modules
                .iter()
                .filter(|module| module.is_flash())
                .map(|module| module.name.clone())
                .collect()
        } else {
            self.modules.clone()
        };
        Ok(CompileScope::Modules(modules))
    }
}

/// Load the project file and set up a pipeline over the local file system
pub async fn load_pipeline(
    path: &Path,
    options: ValidationOptions,
) -> Result<BuildPipeline, Box<dyn std::error::Error>> {
    info!("Loading project from {}", path.display());
    let project = Project::load(path).await?;
    let fs = Arc::new(LocalFileSystem::for_project(&project));
    Ok(BuildPipeline::new(project, fs).with_options(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use convenient_flex::{BcRunConfiguration, Module};

    fn project() -> Project {
        let mut project = Project::new("demo")
            .with_module(Module::new("A"))
            .with_module(Module::new("B"));
        project
            .run_configurations
            .push(BcRunConfiguration::new("Run A", "A", "Release"));
        project
    }

    #[test]
    fn test_cli_parses_scope_flags() {
        let cli = Cli::try_parse_from([
            "flashzel", "--project", "p.yaml", "build", "-u", "A/Release", "--unit", "B/Lib", "-j", "3",
        ])
        .unwrap();
        assert_eq!(cli.project, PathBuf::from("p.yaml"));
        match cli.command {
            Commands::Build { scope, jobs, rebuild, .. } => {
                assert_eq!(scope.units, vec![UnitKey::new("A", "Release"), UnitKey::new("B", "Lib")]);
                assert_eq!(jobs, Some(3));
                assert!(!rebuild);
            }
            _ => panic!("expected build command"),
        }

        assert!(Cli::try_parse_from(["flashzel", "plan", "--unit", "no-slash"]).is_err());
        assert!(Cli::try_parse_from(["flashzel", "plan", "--run", "Run A", "--module", "A"]).is_err());
    }

    #[test]
    fn test_scope_selection() {
        let project = project();

        let all = ScopeArgs::default().to_scope(&project).unwrap();
        assert!(matches!(all, CompileScope::Modules(ref names) if names == &["A", "B"]));

        let run = ScopeArgs {
            run: Some("Run A".to_string()),
            ..ScopeArgs::default()
        };
        let scope = run.to_scope(&project).unwrap();
        assert_eq!(scope.run_configuration().map(|rc| rc.name()), Some("Run A"));

        let missing = ScopeArgs {
            run: Some("Nope".to_string()),
            ..ScopeArgs::default()
        };
        assert_eq!(
            missing.to_scope(&project).unwrap_err(),
            ConfigurationError::UnknownRunConfiguration("Nope".to_string())
        );
    }

    #[tokio::test]
    async fn test_load_pipeline_from_project_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("flashzel.yaml");
        std::fs::write(
            &path,
            "name: demo\nmodules:\n  - name: A\n    build_units:\n      - name: Lib\n        nature: { output_type: library }\n",
        )
        .unwrap();

        let pipeline = load_pipeline(&path, ValidationOptions::default()).await.unwrap();
        let scope = ScopeArgs::default().to_scope(pipeline.project()).unwrap();
        let report = pipeline.validate(&scope).unwrap();

        let messages: Vec<String> = report.problems.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "A/Lib: Flex SDK not set",
                "A/Lib: Output file name not set",
                "A/Lib: Output file must have .swc extension",
                "A/Lib: Output folder not set",
            ]
        );
        assert!(load_pipeline(&dir.path().join("missing.yaml"), ValidationOptions::default()).await.is_err());
    }
}
