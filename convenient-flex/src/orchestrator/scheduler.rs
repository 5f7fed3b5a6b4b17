//! Ready-queue scheduler for compilation tasks
//!
//! A task enters the ready queue only when all its sibling dependencies have
//! succeeded. Among ready tasks, the one blocking the most transitive
//! dependents goes first; ties go to the smaller key.

use super::state::{FailureReason, UnitState};
use super::task::{CompilationTask, TaskKey};
use convenient_graph::DependencyGraph;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use tracing::{debug, warn};

/// Scheduled task with priority
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReadyTask {
    dependent_count: usize,
    key: TaskKey,
}

impl Ord for ReadyTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Most blockers first, then smallest key
        self.dependent_count
            .cmp(&other.dependent_count)
            .then_with(|| Reverse(&self.key).cmp(&Reverse(&other.key)))
    }
}

impl PartialOrd for ReadyTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct ReadyQueueScheduler {
    graph: DependencyGraph<TaskKey>,
    states: BTreeMap<TaskKey, UnitState>,
    failures: BTreeMap<TaskKey, FailureReason>,
    dependent_counts: BTreeMap<TaskKey, usize>,
    ready_queue: BinaryHeap<ReadyTask>,
}

impl ReadyQueueScheduler {
    /// Build the schedule; tasks behind a dependency cycle fail immediately.
    pub fn new(tasks: &[CompilationTask]) -> Self {
        let mut graph = DependencyGraph::new();
        for task in tasks {
            let _ = graph.add_node(task.key.clone());
        }
        for task in tasks {
            for dep in &task.dependencies {
                // Dependencies outside the run never block
                if graph.add_edge(&dep.key, &task.key).is_err() {
                    debug!("{} waits for nothing on {} (not in this run)", task.key, dep.key);
                }
            }
        }

        let dependent_counts = graph
            .nodes()
            .map(|key| {
                let count = graph.transitive_dependents(key).map(|d| d.len()).unwrap_or(0);
                (key.clone(), count)
            })
            .collect();

        let states = graph
            .nodes()
            .map(|key| (key.clone(), UnitState::Pending))
            .collect();

        let mut scheduler = Self {
            graph,
            states,
            failures: BTreeMap::new(),
            dependent_counts,
            ready_queue: BinaryHeap::new(),
        };

        for key in scheduler.graph.blocked_nodes() {
            warn!("{} can never start: dependency cycle", key);
            scheduler.fail(&key, FailureReason::DependencyCycle);
        }

        let roots: Vec<TaskKey> = scheduler.graph.roots().into_iter().cloned().collect();
        for key in roots {
            scheduler.schedule(key);
        }

        scheduler
    }

    fn schedule(&mut self, key: TaskKey) {
        if let Some(state) = self.states.get_mut(&key) {
            if *state == UnitState::Pending {
                *state = UnitState::Scheduled;
                let dependent_count = self.dependent_counts.get(&key).copied().unwrap_or(0);
                self.ready_queue.push(ReadyTask { dependent_count, key });
            }
        }
    }

    fn fail(&mut self, key: &TaskKey, reason: FailureReason) {
        if let Some(state) = self.states.get_mut(key) {
            *state = UnitState::Failed;
            let _ = self.failures.insert(key.clone(), reason);
        }
    }

    /// Take the highest priority ready task and mark it running
    pub fn start_next(&mut self) -> Option<TaskKey> {
        while let Some(ready) = self.ready_queue.pop() {
            if let Some(state) = self.states.get_mut(&ready.key) {
                if *state == UnitState::Scheduled {
                    *state = UnitState::Running;
                    return Some(ready.key);
                }
            }
        }
        None
    }

    /// Mark a task succeeded; dependents whose dependencies all succeeded become ready
    pub fn mark_succeeded(&mut self, key: &TaskKey) {
        if let Some(state) = self.states.get_mut(key) {
            *state = UnitState::Succeeded;
        }

        let dependents: Vec<TaskKey> = self
            .graph
            .dependents(key)
            .map(|d| d.iter().cloned().collect())
            .unwrap_or_default();

        for dependent in dependents {
            let all_succeeded = self.graph.dependencies(&dependent).is_ok_and(|deps| {
                deps.iter()
                    .all(|dep| self.states.get(dep) == Some(&UnitState::Succeeded))
            });
            if all_succeeded {
                self.schedule(dependent);
            }
        }
    }

    /// Mark a task failed and every not yet started transitive dependent
    /// failed with the same cause. Returns the dependents that were skipped.
    pub fn mark_failed(&mut self, key: &TaskKey, reason: FailureReason) -> Vec<TaskKey> {
        let dependents = self.graph.transitive_dependents(key).unwrap_or_default();
        let mut skipped = Vec::new();

        for dependent in dependents {
            if matches!(
                self.states.get(&dependent),
                Some(UnitState::Pending | UnitState::Scheduled)
            ) {
                self.fail(
                    &dependent,
                    FailureReason::DependencyFailed {
                        dependency: key.clone(),
                        cause: Box::new(reason.clone()),
                    },
                );
                skipped.push(dependent);
            }
        }

        self.fail(key, reason);
        skipped
    }

    /// Fail every task that hasn't started; running tasks are left alone.
    pub fn abort(&mut self, reason: &FailureReason) -> Vec<TaskKey> {
        self.ready_queue.clear();
        let waiting: Vec<TaskKey> = self
            .states
            .iter()
            .filter(|(_, state)| matches!(state, UnitState::Pending | UnitState::Scheduled))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &waiting {
            self.fail(key, reason.clone());
        }
        waiting
    }

    pub fn state(&self, key: &TaskKey) -> Option<UnitState> {
        self.states.get(key).copied()
    }

    pub fn failure(&self, key: &TaskKey) -> Option<&FailureReason> {
        self.failures.get(key)
    }

    /// Every task reached `Succeeded` or `Failed`
    pub fn is_finished(&self) -> bool {
        self.states.values().all(|state| state.is_terminal())
    }

    /// Nothing is running and nothing can start
    pub fn is_stalled(&self) -> bool {
        self.ready_queue.is_empty() && !self.states.values().any(|s| *s == UnitState::Running)
    }

    pub fn stats(&self) -> SchedulerStats {
        let mut stats = SchedulerStats {
            total_tasks: self.states.len(),
            ..SchedulerStats::default()
        };
        for state in self.states.values() {
            match state {
                UnitState::Pending => stats.pending += 1,
                UnitState::Scheduled => stats.ready += 1,
                UnitState::Running => stats.running += 1,
                UnitState::Succeeded => stats.succeeded += 1,
                UnitState::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

/// Scheduler statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub total_tasks: usize,
    pub pending: usize,
    pub ready: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl SchedulerStats {
    pub fn completion_percent(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            ((self.succeeded + self.failed) as f64 / self.total_tasks as f64) * 100.0
        }
    }

    pub fn parallelism_utilization(&self, max_parallel: usize) -> f64 {
        if max_parallel == 0 {
            0.0
        } else {
            (self.running as f64 / max_parallel as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildUnit, LinkageType, Nature};
    use crate::orchestrator::task::TaskDependency;
    use std::sync::Arc;

    fn task(name: &str, deps: &[&str]) -> CompilationTask {
        CompilationTask {
            key: TaskKey::unit("M", name),
            unit: Arc::new(BuildUnit::new(name, Nature::default())),
            output_path: format!("/out/{}.swf", name),
            dependencies: deps
                .iter()
                .map(|dep| TaskDependency {
                    key: TaskKey::unit("M", *dep),
                    linkage: LinkageType::Merged,
                })
                .collect(),
        }
    }

    fn key(name: &str) -> TaskKey {
        TaskKey::unit("M", name)
    }

    #[test]
    fn test_ready_tasks_follow_dependencies() {
        // core <- lib <- app, core <- other
        let tasks = vec![
            task("app", &["lib"]),
            task("core", &[]),
            task("lib", &["core"]),
            task("other", &["core"]),
        ];
        let mut scheduler = ReadyQueueScheduler::new(&tasks);

        assert_eq!(scheduler.start_next(), Some(key("core")));
        assert_eq!(scheduler.start_next(), None);

        scheduler.mark_succeeded(&key("core"));
        // lib blocks app, so it goes before other
        assert_eq!(scheduler.start_next(), Some(key("lib")));
        assert_eq!(scheduler.start_next(), Some(key("other")));
        assert_eq!(scheduler.state(&key("app")), Some(UnitState::Pending));

        scheduler.mark_succeeded(&key("lib"));
        scheduler.mark_succeeded(&key("other"));
        assert_eq!(scheduler.start_next(), Some(key("app")));
        scheduler.mark_succeeded(&key("app"));

        assert!(scheduler.is_finished());
        assert_eq!(scheduler.stats().succeeded, 4);
        assert!((scheduler.stats().completion_percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failure_propagates_original_cause() {
        let tasks = vec![task("app", &["lib"]), task("lib", &["core"]), task("core", &[]), task("solo", &[])];
        let mut scheduler = ReadyQueueScheduler::new(&tasks);

        assert_eq!(scheduler.start_next(), Some(key("core")));
        let reason = FailureReason::Compile {
            message: "boom".to_string(),
        };
        let skipped = scheduler.mark_failed(&key("core"), reason.clone());
        assert_eq!(skipped, vec![key("app"), key("lib")]);

        for name in ["app", "lib"] {
            assert_eq!(
                scheduler.failure(&key(name)),
                Some(&FailureReason::DependencyFailed {
                    dependency: key("core"),
                    cause: Box::new(reason.clone()),
                })
            );
        }

        // Independent subtree still runs
        assert_eq!(scheduler.start_next(), Some(key("solo")));
        scheduler.mark_succeeded(&key("solo"));
        assert!(scheduler.is_finished());
    }

    #[test]
    fn test_abort_leaves_running_tasks_alone() {
        let tasks = vec![task("a", &[]), task("b", &[]), task("c", &["a"])];
        let mut scheduler = ReadyQueueScheduler::new(&tasks);

        assert_eq!(scheduler.start_next(), Some(key("a")));
        let reason = FailureReason::Infrastructure {
            message: "server died".to_string(),
        };
        let aborted = scheduler.abort(&reason);
        assert_eq!(aborted, vec![key("b"), key("c")]);
        assert_eq!(scheduler.state(&key("a")), Some(UnitState::Running));
        assert_eq!(scheduler.start_next(), None);

        scheduler.mark_succeeded(&key("a"));
        assert!(scheduler.is_finished());
        assert_eq!(scheduler.failure(&key("b")), Some(&reason));
    }

    #[test]
    fn test_cycle_members_fail_up_front() {
        let tasks = vec![task("x", &["y"]), task("y", &["x"]), task("z", &["x"]), task("free", &[])];
        let mut scheduler = ReadyQueueScheduler::new(&tasks);

        for name in ["x", "y", "z"] {
            assert_eq!(scheduler.failure(&key(name)), Some(&FailureReason::DependencyCycle));
        }
        assert_eq!(scheduler.start_next(), Some(key("free")));
        scheduler.mark_succeeded(&key("free"));
        assert!(scheduler.is_finished());
    }

    #[test]
    fn test_dependencies_outside_the_run_are_ignored() {
        let tasks = vec![task("app", &["elsewhere"])];
        let mut scheduler = ReadyQueueScheduler::new(&tasks);
        assert_eq!(scheduler.start_next(), Some(key("app")));
    }
}
