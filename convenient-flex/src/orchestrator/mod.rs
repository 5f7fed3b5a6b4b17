//! Compilation orchestration
//!
//! Turns a resolved unit set into [`CompilationTask`]s, schedules them in
//! dependency order and runs them with bounded concurrency through one of
//! two compiler strategies:
//!
//! - **built-in**: a persistent compiler server shared by all tasks
//! - **external process**: one `mxmlc`/`compc` invocation per task

pub mod backend;
pub mod builtin;
pub mod context;
pub mod external;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod state;
pub mod task;

pub use backend::{
    CancellationToken, CompileError, CompileOutput, CompileRequest, CompileResult, CompilerBackend,
    DependencyOutput,
};
pub use builtin::{BuiltInCompiler, CompilerServer};
pub use context::BuildStateCache;
pub use external::ExternalProcessCompiler;
pub use report::{CompilerStrategy, RunReport, TaskOutcome};
pub use runner::{CompilationOrchestrator, OrchestratorConfig};
pub use scheduler::{ReadyQueueScheduler, SchedulerStats};
pub use state::{FailureReason, UnitState};
pub use task::{CompilationTask, TaskDependency, TaskKey, common_sdk, plan_tasks};
