//! Result of one orchestration run

use super::state::{FailureReason, UnitState};
use super::task::TaskKey;
use serde::Serialize;
use std::fmt;

/// How tasks were compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilerStrategy {
    /// Persistent compiler server shared by all tasks
    BuiltIn,
    /// One mxmlc/compc process per task
    ExternalProcess,
}

impl fmt::Display for CompilerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerStrategy::BuiltIn => write!(f, "built-in compiler"),
            CompilerStrategy::ExternalProcess => write!(f, "mxmlc/compc"),
        }
    }
}

/// Final state of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub key: TaskKey,
    pub state: UnitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    pub output_path: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == UnitState::Succeeded
    }
}

/// Per-task outcomes plus the aggregate result
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub strategy: CompilerStrategy,
    /// Informational messages (strategy choice, fallbacks)
    pub notes: Vec<String>,
    /// Outcomes in task key order
    pub outcomes: Vec<TaskOutcome>,
    /// RFC 3339 start time
    pub started_at: String,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::succeeded)
    }

    pub fn outcome(&self, key: &TaskKey) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|outcome| &outcome.key == key)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Tasks that failed on their own, as opposed to being skipped or aborted
    pub fn triggering_failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|outcome| {
            outcome
                .failure
                .as_ref()
                .is_some_and(FailureReason::is_own_failure)
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Format report as human-readable string
    pub fn format(&self) -> String {
        let mut out = format!(
            "Compilation Summary ({}):\n  Total: {} tasks\n  Succeeded: {}\n  Failed: {}\n  Duration: {} ms\n",
            self.strategy,
            self.outcomes.len(),
            self.succeeded(),
            self.failed(),
            self.duration_ms
        );
        for note in &self.notes {
            out.push_str(&format!("  Note: {}\n", note));
        }
        for outcome in &self.outcomes {
            match &outcome.failure {
                Some(reason) => out.push_str(&format!("  {} {}: {}\n", outcome.state, outcome.key, reason)),
                None => out.push_str(&format!("  {} {} -> {}\n", outcome.state, outcome.key, outcome.output_path)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport {
            strategy: CompilerStrategy::ExternalProcess,
            notes: vec!["Using mxmlc/compc".to_string()],
            outcomes: vec![
                TaskOutcome {
                    key: TaskKey::unit("A", "App"),
                    state: UnitState::Failed,
                    failure: Some(FailureReason::DependencyFailed {
                        dependency: TaskKey::unit("B", "Lib"),
                        cause: Box::new(FailureReason::Compile {
                            message: "syntax error".to_string(),
                        }),
                    }),
                    output_path: "/out/a.swf".to_string(),
                    duration_ms: 0,
                    messages: Vec::new(),
                },
                TaskOutcome {
                    key: TaskKey::unit("B", "Lib"),
                    state: UnitState::Failed,
                    failure: Some(FailureReason::Compile {
                        message: "syntax error".to_string(),
                    }),
                    output_path: "/out/lib.swc".to_string(),
                    duration_ms: 12,
                    messages: Vec::new(),
                },
            ],
            started_at: "2026-10-18T10:00:00+00:00".to_string(),
            duration_ms: 15,
        }
    }

    #[test]
    fn test_triggering_failure_is_distinguishable() {
        let report = report();
        assert!(!report.success());
        assert_eq!(report.failed(), 2);

        let triggering: Vec<_> = report.triggering_failures().map(|o| o.key.to_string()).collect();
        assert_eq!(triggering, vec!["B/Lib"]);
    }

    #[test]
    fn test_report_formats() {
        let report = report();
        let text = report.format();
        assert!(text.contains("Compilation Summary (mxmlc/compc)"));
        assert!(text.contains("A/App: skipped, dependency B/Lib failed"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["strategy"], "external_process");
        assert_eq!(json["outcomes"][0]["failure"]["kind"], "dependency_failed");
        assert_eq!(json["outcomes"][0]["failure"]["dependency"]["unit"], "Lib");
        assert_eq!(json["outcomes"][1]["state"], "failed");
    }
}
