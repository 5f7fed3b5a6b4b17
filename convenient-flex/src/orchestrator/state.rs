//! Per-task lifecycle and failure reasons

use super::task::TaskKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compilation task state
///
/// `Pending → Scheduled → Running → Succeeded | Failed`; pending and
/// scheduled tasks may also go straight to `Failed` when a dependency
/// fails or the run is aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    /// Waiting for dependencies
    Pending,
    /// In the ready queue
    Scheduled,
    /// Compiling
    Running,
    Succeeded,
    Failed,
}

impl UnitState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitState::Succeeded | UnitState::Failed)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitState::Pending => write!(f, "⏳ Pending"),
            UnitState::Scheduled => write!(f, "📋 Scheduled"),
            UnitState::Running => write!(f, "▶️  Running"),
            UnitState::Succeeded => write!(f, "✅ Succeeded"),
            UnitState::Failed => write!(f, "❌ Failed"),
        }
    }
}

/// Why a task ended up `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The compiler rejected the unit
    Compile { message: String },
    /// Not started because `dependency` failed with `cause`
    DependencyFailed {
        dependency: TaskKey,
        cause: Box<FailureReason>,
    },
    /// The run was aborted by a compiler infrastructure failure
    Infrastructure { message: String },
    /// The run was cancelled by the caller
    Cancelled,
    /// Sibling dependencies form a cycle, the task can never start
    DependencyCycle,
}

impl FailureReason {
    /// True if the task itself was compiled and failed
    pub fn is_own_failure(&self) -> bool {
        matches!(self, FailureReason::Compile { .. })
    }

    /// The reason of the task that triggered this failure
    pub fn root_cause(&self) -> &FailureReason {
        match self {
            FailureReason::DependencyFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Compile { message } => write!(f, "compilation failed: {}", message),
            FailureReason::DependencyFailed { dependency, cause } => {
                write!(f, "skipped, dependency {} failed ({})", dependency, cause)
            }
            FailureReason::Infrastructure { message } => write!(f, "aborted: {}", message),
            FailureReason::Cancelled => write!(f, "cancelled"),
            FailureReason::DependencyCycle => write!(f, "dependency cycle"),
        }
    }
}
