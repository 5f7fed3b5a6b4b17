//! convenient-flex - build unit orchestration for Flash/Flex projects
//!
//! Takes a compile scope and drives it to compiled artifacts:
//!
//! 1. **Scope resolution**: [`resolve_scope`] turns explicit units, a run
//!    configuration or whole modules into a deduplicated unit set
//! 2. **Dependency expansion**: build-unit dependencies are added
//!    transitively; dangling edges abort with a [`ConfigurationError`]
//! 3. **Validation**: [`ConfigValidator`] reports every problem of every
//!    unit through a [`ProblemSink`]
//! 4. **Derived units**: runtime stylesheets become their own compilations
//! 5. **Output conflicts**: [`OutputConflictDetector`] flags units writing
//!    the same file
//! 6. **Resources**: [`resource_targets`] lists the modules and applications
//!    whose resource files accompany the build
//! 7. **Compilation**: [`CompilationOrchestrator`] runs tasks in dependency
//!    order with bounded concurrency
//!
//! ## Usage
//!
//! ```no_run
//! use convenient_flex::*;
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let project = Project::load("flashzel.yaml").await?;
//! let fs = Arc::new(LocalFileSystem::for_project(&project));
//! let config = OrchestratorConfig::from(&project.settings.compiler);
//! let pipeline = BuildPipeline::new(project, fs);
//!
//! let plan = pipeline.plan(&CompileScope::Modules(vec!["ModuleA".to_string()]))?;
//! let orchestrator = CompilationOrchestrator::new(config);
//! let report = pipeline.build(plan, &orchestrator, CancellationToken::new()).await;
//! println!("{}", report.format());
//! # Ok(())
//! # }
//! ```

pub mod config_file;
pub mod conflicts;
pub mod debug;
pub mod derived;
pub mod error;
pub mod expand;
pub mod fs;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod project;
pub mod resources;
pub mod scope;
pub mod settings;
pub mod validate;

pub use config_file::{ConfigFileInfo, actual_output_file_path};
pub use conflicts::OutputConflictDetector;
pub use debug::{debug_status, with_forced_debug_status};
pub use derived::derive_stylesheet_units;
pub use error::{ConfigurationError, ConfigurationResult, PipelineError, ProjectError};
pub use expand::{append_dependencies, build_dependencies};
pub use fs::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use model::{
    BuildUnit, CompilerOptions, DependencyEntry, DeviceKind, DevicePackaging, FileInPackage, LibraryDependency,
    LinkageType, Nature, OutputType, PackagingOptions, ResourceFilesMode, Sdk, SigningOptions, TargetPlatform,
    UnitDependency, UnitKey,
};
pub use orchestrator::{
    BuiltInCompiler, CancellationToken, CompilationOrchestrator, CompilationTask, CompileError, CompileOutput,
    CompileRequest, CompileResult, CompilerBackend, CompilerServer, CompilerStrategy, ExternalProcessCompiler,
    FailureReason, OrchestratorConfig, RunReport, TaskKey, TaskOutcome, UnitState, plan_tasks,
};
pub use pipeline::{BuildPipeline, BuildPlan, PlannedTask, ValidationReport};
pub use project::{Module, ModuleKind, Project};
pub use resources::{ResourceTargetKind, ResourceTargetScope, ResourceTargets, resource_targets};
pub use scope::{BcRunConfiguration, CompileScope, MobileRunTarget, ResolvedSet, ResolvedUnit, RunConfiguration, resolve_scope};
pub use settings::{AndroidPackageType, CompilerSettings, IosPackageType, PackagingParameters, ProjectSettings};
pub use validate::{
    ConfigValidator, FieldLocator, Problem, ProblemCategory, ProblemCollector, ProblemSink, ReportedProblem,
    ValidationOptions, check_dependencies, check_dependency_type,
};
