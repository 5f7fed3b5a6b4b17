//! Parallel compilation of planned tasks
//!
//! N workers share one ready-queue scheduler behind a mutex. A worker takes
//! the next ready task, compiles it without holding the lock, records the
//! result and wakes the others.

use super::backend::{CancellationToken, CompileError, CompileOutput, CompileRequest, CompilerBackend, DependencyOutput};
use super::builtin::BuiltInCompiler;
use super::context::BuildStateCache;
use super::external::ExternalProcessCompiler;
use super::report::{CompilerStrategy, RunReport, TaskOutcome};
use super::scheduler::ReadyQueueScheduler;
use super::state::{FailureReason, UnitState};
use super::task::{CompilationTask, TaskKey, common_sdk};
use crate::settings::CompilerSettings;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrently running compilations
    pub max_parallel: usize,
    /// Prefer the persistent compiler server
    pub use_built_in_compiler: bool,
    /// Incremental make; false requests a clean build
    pub make: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel: num_cpus::get(),
            use_built_in_compiler: false,
            make: true,
        }
    }
}

impl From<&CompilerSettings> for OrchestratorConfig {
    fn from(settings: &CompilerSettings) -> Self {
        Self {
            max_parallel: settings.max_parallel_compilations,
            use_built_in_compiler: settings.use_built_in_compiler,
            make: true,
        }
    }
}

/// Runs compilation tasks with bounded concurrency in dependency order
pub struct CompilationOrchestrator {
    config: OrchestratorConfig,
    built_in: Option<Arc<BuiltInCompiler>>,
    external: Arc<dyn CompilerBackend>,
    /// Held for a whole run: one run at a time owns the compiler session
    context: Mutex<BuildStateCache>,
}

impl CompilationOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            built_in: None,
            external: Arc::new(ExternalProcessCompiler::new()),
            context: Mutex::new(BuildStateCache::new()),
        }
    }

    /// Enable the built-in strategy with an embedder-provided server
    pub fn with_built_in(mut self, compiler: Arc<BuiltInCompiler>) -> Self {
        self.built_in = Some(compiler);
        self
    }

    /// Replace the per-task process backend
    pub fn with_external_backend(mut self, backend: Arc<dyn CompilerBackend>) -> Self {
        self.external = backend;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Tear down the compiler server session, if any
    pub async fn stop_session(&self) {
        if let Some(built_in) = &self.built_in {
            built_in.stop_session().await;
        }
    }

    /// Tasks that will be fully rebuilt on their next compilation
    pub async fn dirty_tasks(&self) -> Vec<TaskKey> {
        self.context.lock().await.dirty_tasks().cloned().collect()
    }

    pub async fn run(&self, tasks: Vec<CompilationTask>, cancel: CancellationToken) -> RunReport {
        let mut cache = self.context.lock().await;
        let started_at = chrono::Utc::now().to_rfc3339();
        let start = Instant::now();
        let mut notes = Vec::new();

        if !self.config.make {
            info!("Clean build: stopping compiler session and marking all tasks dirty");
            self.stop_session().await;
            cache.reset();
            for task in &tasks {
                cache.mark_dirty(task.key.clone());
            }
        }

        let sdk = common_sdk(&tasks).cloned();
        let (strategy, backend) = self.select_strategy(&tasks, &mut notes).await;
        let max_parallel = self.config.max_parallel.max(1);
        let note = format!("Using {}, up to {} parallel compilation(s)", strategy, max_parallel);
        info!("{}", note);
        notes.push(note);

        let tasks: BTreeMap<TaskKey, Arc<CompilationTask>> = tasks
            .into_iter()
            .map(|task| (task.key.clone(), Arc::new(task)))
            .collect();

        let mut state = RunState {
            scheduler: ReadyQueueScheduler::new(&tasks.values().map(|t| (**t).clone()).collect::<Vec<_>>()),
            records: BTreeMap::new(),
            outputs: HashMap::new(),
            cache: std::mem::take(&mut *cache),
        };

        if strategy == CompilerStrategy::BuiltIn {
            if let (Some(built_in), Some(sdk)) = (&self.built_in, sdk) {
                if let Err(e) = built_in.start_if_needed(&sdk).await {
                    error!("Failed to start compiler server: {}", e);
                    let _ = state.scheduler.abort(&infrastructure_reason(&e));
                }
            }
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            notify: Notify::new(),
            cancel,
            backend,
            tasks,
        });

        let workers = max_parallel.min(shared.tasks.len());
        let mut set = JoinSet::new();
        for id in 0..workers {
            let _ = set.spawn(worker(id, Arc::clone(&shared)));
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!("Compilation worker stopped unexpectedly: {}", e);
            }
        }

        if strategy == CompilerStrategy::BuiltIn {
            if let Some(built_in) = &self.built_in {
                let active = built_in.active_compilations();
                if active != 0 {
                    error!("{} compilation(s) are not finished", active);
                }
            }
        }

        let mut state = shared.state.lock().await;
        let unfinished: Vec<TaskKey> = shared
            .tasks
            .keys()
            .filter(|key| !state.scheduler.state(key).is_some_and(UnitState::is_terminal))
            .cloned()
            .collect();
        for key in unfinished {
            let _ = state.scheduler.mark_failed(
                &key,
                FailureReason::Infrastructure {
                    message: "compilation worker stopped unexpectedly".to_string(),
                },
            );
        }

        let outcomes = shared
            .tasks
            .values()
            .map(|task| {
                let record = state.records.remove(&task.key).unwrap_or_default();
                TaskOutcome {
                    key: task.key.clone(),
                    state: state.scheduler.state(&task.key).unwrap_or(UnitState::Failed),
                    failure: state.scheduler.failure(&task.key).cloned(),
                    output_path: task.output_path.clone(),
                    duration_ms: duration_ms(record.duration),
                    messages: record.messages,
                }
            })
            .collect();

        *cache = std::mem::take(&mut state.cache);

        let report = RunReport {
            strategy,
            notes,
            outcomes,
            started_at,
            duration_ms: duration_ms(start.elapsed()),
        };
        info!(
            "Compilation finished: {} succeeded, {} failed in {} ms",
            report.succeeded(),
            report.failed(),
            report.duration_ms
        );
        report
    }

    async fn select_strategy(
        &self,
        tasks: &[CompilationTask],
        notes: &mut Vec<String>,
    ) -> (CompilerStrategy, Arc<dyn CompilerBackend>) {
        if !self.config.use_built_in_compiler {
            return (CompilerStrategy::ExternalProcess, Arc::clone(&self.external));
        }

        let Some(built_in) = &self.built_in else {
            let note = "Built-in compiler is not available, using mxmlc/compc".to_string();
            warn!("{}", note);
            notes.push(note);
            return (CompilerStrategy::ExternalProcess, Arc::clone(&self.external));
        };

        if !tasks.is_empty() && common_sdk(tasks).is_none() {
            built_in.stop_session().await;
            let note = "Can't use built-in compiler: build configurations use different SDKs, using mxmlc/compc"
                .to_string();
            info!("{}", note);
            notes.push(note);
            return (CompilerStrategy::ExternalProcess, Arc::clone(&self.external));
        }

        let backend: Arc<dyn CompilerBackend> = built_in.clone();
        (CompilerStrategy::BuiltIn, backend)
    }
}

fn infrastructure_reason(error: &CompileError) -> FailureReason {
    FailureReason::Infrastructure {
        message: error.to_string(),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Default)]
struct TaskRecord {
    duration: Duration,
    messages: Vec<String>,
}

struct RunState {
    scheduler: ReadyQueueScheduler,
    records: BTreeMap<TaskKey, TaskRecord>,
    outputs: HashMap<TaskKey, CompileOutput>,
    cache: BuildStateCache,
}

impl RunState {
    fn request_for(&self, task: &Arc<CompilationTask>, cancel: &CancellationToken) -> CompileRequest {
        let dependencies = task
            .dependencies
            .iter()
            .filter_map(|dep| {
                self.outputs.get(&dep.key).map(|output| DependencyOutput {
                    key: dep.key.clone(),
                    linkage: dep.linkage,
                    output_path: output.output_path.clone(),
                })
            })
            .collect();

        CompileRequest {
            task: Arc::clone(task),
            dependencies,
            full_rebuild: self.cache.is_dirty(&task.key),
            cancel: cancel.clone(),
        }
    }

    fn abort(&mut self, reason: &FailureReason) {
        let aborted = self.scheduler.abort(reason);
        if !aborted.is_empty() {
            warn!("Aborting {} task(s): {}", aborted.len(), reason);
        }
    }

    fn record(&mut self, key: &TaskKey, result: Result<CompileOutput, CompileError>, duration: Duration) {
        match result {
            Ok(output) => {
                info!("✅ {} compiled in {:?}", key, duration);
                let _ = self.records.insert(
                    key.clone(),
                    TaskRecord {
                        duration,
                        messages: output.messages.clone(),
                    },
                );
                let _ = self.outputs.insert(key.clone(), output);
                self.cache.clear(key);
                self.scheduler.mark_succeeded(key);
            }
            Err(CompileError::Compilation(message)) => {
                error!("❌ {} failed: {}", key, message);
                let _ = self.records.insert(key.clone(), TaskRecord { duration, messages: Vec::new() });
                self.cache.mark_dirty(key.clone());
                let skipped = self
                    .scheduler
                    .mark_failed(key, FailureReason::Compile { message });
                for dependent in skipped {
                    debug!("Skipping {}: dependency {} failed", dependent, key);
                }
            }
            Err(e @ CompileError::Infrastructure(_)) => {
                error!("❌ {} aborted the run: {}", key, e);
                let _ = self.records.insert(key.clone(), TaskRecord { duration, messages: Vec::new() });
                self.cache.mark_dirty(key.clone());
                let reason = infrastructure_reason(&e);
                let _ = self.scheduler.mark_failed(key, reason.clone());
                self.abort(&reason);
            }
            Err(CompileError::Cancelled) => {
                warn!("{} cancelled", key);
                let _ = self.records.insert(key.clone(), TaskRecord { duration, messages: Vec::new() });
                self.cache.mark_dirty(key.clone());
                let _ = self.scheduler.mark_failed(key, FailureReason::Cancelled);
                self.abort(&FailureReason::Cancelled);
            }
        }
    }
}

struct Shared {
    state: Mutex<RunState>,
    notify: Notify,
    cancel: CancellationToken,
    backend: Arc<dyn CompilerBackend>,
    tasks: BTreeMap<TaskKey, Arc<CompilationTask>>,
}

async fn worker(id: usize, shared: Arc<Shared>) {
    loop {
        // Registered before the state check so no wake-up is lost
        let notified = shared.notify.notified();

        let request = {
            let mut state = shared.state.lock().await;
            if shared.cancel.is_cancelled() {
                state.abort(&FailureReason::Cancelled);
            }
            if state.scheduler.is_finished() {
                break;
            }
            match state.scheduler.start_next() {
                Some(key) => shared
                    .tasks
                    .get(&key)
                    .map(|task| state.request_for(task, &shared.cancel)),
                None if state.scheduler.is_stalled() => break,
                None => None,
            }
        };

        let Some(request) = request else {
            if shared.cancel.is_cancelled() {
                notified.await;
            } else {
                tokio::select! {
                    () = notified => {}
                    () = shared.cancel.cancelled() => {
                        shared.state.lock().await.abort(&FailureReason::Cancelled);
                        shared.notify.notify_waiters();
                    }
                }
            }
            continue;
        };

        let key = request.task.key.clone();
        debug!("Worker {} compiling {} ({})", id, key, shared.backend.name());
        let started = Instant::now();
        let result = shared.backend.compile(request).await;

        shared.state.lock().await.record(&key, result, started.elapsed());
        shared.notify.notify_waiters();
    }

    shared.notify.notify_waiters();
    debug!("Worker {} done", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_config_from_settings() {
        let settings = CompilerSettings {
            use_built_in_compiler: true,
            max_parallel_compilations: 3,
        };
        let config = OrchestratorConfig::from(&settings);
        assert_eq!(config.max_parallel, 3);
        assert!(config.use_built_in_compiler);
        assert!(config.make);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_empty_run_succeeds() {
        let orchestrator = CompilationOrchestrator::new(OrchestratorConfig::default());
        let report = orchestrator.run(Vec::new(), CancellationToken::new()).await;
        assert!(report.success());
        assert!(report.outcomes.is_empty());
        assert_eq!(report.strategy, CompilerStrategy::ExternalProcess);
        assert!(logs_contain("Using mxmlc/compc"));
    }

    #[tokio::test]
    async fn test_built_in_without_server_falls_back() {
        let orchestrator = CompilationOrchestrator::new(OrchestratorConfig {
            max_parallel: 1,
            use_built_in_compiler: true,
            make: true,
        });
        let report = orchestrator.run(Vec::new(), CancellationToken::new()).await;
        assert_eq!(report.strategy, CompilerStrategy::ExternalProcess);
        assert!(report.notes[0].contains("not available"));
    }
}
