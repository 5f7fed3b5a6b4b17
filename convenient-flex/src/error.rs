//! Error types for resolution, project loading and the build pipeline

use crate::validate::ReportedProblem;
use thiserror::Error;

/// Errors that abort scope resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error(
        "Build configuration '{dependency_unit}' of module '{dependency_module}' does not exist \
         (dependency of build configuration '{owner_unit}' in module '{owner_module}')"
    )]
    MissingDependency {
        dependency_unit: String,
        dependency_module: String,
        owner_unit: String,
        owner_module: String,
    },

    #[error("Run configuration '{run_configuration}': {message}")]
    RunConfiguration {
        run_configuration: String,
        message: String,
    },

    #[error("Build configuration '{unit}' not found in module '{module}'")]
    UnknownUnit { module: String, unit: String },

    #[error("Run configuration '{0}' not found")]
    UnknownRunConfiguration(String),

    #[error(
        "Build configuration '{owner_unit}' ({owner_kind}) in module '{owner_module}' can't depend on \
         '{dependency_unit}' ({dependency_kind}) of module '{dependency_module}' with linkage '{linkage}'"
    )]
    IncompatibleDependency {
        owner_module: String,
        owner_unit: String,
        owner_kind: String,
        dependency_module: String,
        dependency_unit: String,
        dependency_kind: String,
        linkage: String,
    },
}

pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

/// Errors loading a project file
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Failed to read project file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse project file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Duplicate build configuration '{unit}' in module '{module}'")]
    DuplicateUnit { module: String, unit: String },
}

/// Errors raised by [`crate::BuildPipeline`]
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("{} configuration problem(s) found, compilation aborted", .0.len())]
    Validation(Vec<ReportedProblem>),
}
