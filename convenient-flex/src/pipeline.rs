//! Build pipeline: resolve → validate → derive → conflicts → orchestrate
//!
//! Validation never stops at the first problem. A plan is only produced for
//! a scope with no problems at all; everything after that is the
//! orchestrator's business.

use crate::conflicts::OutputConflictDetector;
use crate::error::{ConfigurationResult, PipelineError};
use crate::fs::FileSystem;
use crate::model::{DeviceKind, OutputType, TargetPlatform};
use crate::orchestrator::{CancellationToken, CompilationOrchestrator, CompilationTask, RunReport, plan_tasks};
use crate::project::Project;
use crate::resources::{ResourceTargets, resource_targets};
use crate::scope::{CompileScope, MobileRunTarget, ResolvedSet, resolve_scope};
use crate::validate::{ConfigValidator, ProblemCollector, ProblemSink, ReportedProblem, ValidationOptions, check_dependencies};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything known about a scope after validation
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub units: ResolvedSet,
    /// Tasks including derived stylesheet tasks, in key order
    pub tasks: Vec<CompilationTask>,
    pub problems: Vec<ReportedProblem>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn format(&self) -> String {
        let mut out = format!(
            "Validation Summary:\n  Build configurations: {}\n  Compilation tasks: {}\n  Problems: {}\n",
            self.units.len(),
            self.tasks.len(),
            self.problems.len()
        );
        for problem in &self.problems {
            out.push_str(&format!("  ⚠️  {}\n", problem));
        }
        out
    }
}

/// Validated tasks ready to run
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub tasks: Vec<CompilationTask>,
    /// Resource copying that accompanies the compilations
    pub resources: ResourceTargets,
}

/// Serializable view of one planned task
#[derive(Debug, Clone, Serialize)]
pub struct PlannedTask {
    pub key: String,
    pub output_type: OutputType,
    pub output_path: String,
    pub dependencies: Vec<String>,
}

impl BuildPlan {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn planned_tasks(&self) -> Vec<PlannedTask> {
        self.tasks
            .iter()
            .map(|task| PlannedTask {
                key: task.key.to_string(),
                output_type: task.unit.output_type(),
                output_path: task.output_path.clone(),
                dependencies: task.dependencies.iter().map(|dep| dep.key.to_string()).collect(),
            })
            .collect()
    }

    pub fn format(&self) -> String {
        let mut out = format!("Build Plan: {} task(s)\n", self.tasks.len());
        for task in &self.tasks {
            out.push_str(&format!("  • {} -> {}\n", task.key, task.output_path));
            for dep in &task.dependencies {
                out.push_str(&format!("      after {} ({})\n", dep.key, dep.linkage.short_text()));
            }
        }
        if !self.resources.is_empty() {
            out.push_str("Resource files:\n");
            for (module, units) in &self.resources.units_by_module {
                out.push_str(&format!("  • {}: {}\n", module, units.join(", ")));
            }
        }
        out
    }
}

pub struct BuildPipeline {
    project: Project,
    fs: Arc<dyn FileSystem>,
    options: ValidationOptions,
}

impl BuildPipeline {
    pub fn new(project: Project, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            project,
            fs,
            options: ValidationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn resolve(&self, scope: &CompileScope) -> ConfigurationResult<ResolvedSet> {
        resolve_scope(&self.project, scope)
    }

    /// Resolve the scope and collect every problem of every unit in it
    pub fn validate(&self, scope: &CompileScope) -> ConfigurationResult<ValidationReport> {
        let units = self.resolve(scope)?;
        let validator = ConfigValidator::new(self.fs.as_ref());
        let mut collector = ProblemCollector::new();

        for resolved in units.iter() {
            if self.options.strict_dependency_types {
                check_dependencies(&self.project, &resolved.key.module, &resolved.unit)?;
            }
            validator.check_configuration(
                &resolved.key.module,
                &resolved.unit,
                self.options.check_packaging,
                &mut collector,
            );
        }

        self.check_run_target_packaging(scope, &units, &validator, &mut collector);

        let tasks = plan_tasks(
            &self.project,
            &units,
            &self.project.settings.packaging,
            self.fs.as_ref(),
        );
        let derived = tasks.iter().filter(|task| task.is_derived()).count();
        if derived > 0 {
            info!("Derived {} stylesheet compilation(s)", derived);
        }

        let mut detector = OutputConflictDetector::new(self.fs.is_case_sensitive());
        for task in &tasks {
            let _ = detector.check(&task.key.unit_key(), &task.output_path, &mut collector);
        }

        let problems = collector.into_problems();
        if problems.is_empty() {
            info!("Validated {} build configuration(s): no problems", units.len());
        } else {
            warn!(
                "Validated {} build configuration(s): {} problem(s)",
                units.len(),
                problems.len()
            );
        }

        Ok(ValidationReport { units, tasks, problems })
    }

    /// Android packaging of a unit launched on an Android device is
    /// validated even when packaging checks are off or Android packaging is
    /// disabled.
    fn check_run_target_packaging(
        &self,
        scope: &CompileScope,
        units: &ResolvedSet,
        validator: &ConfigValidator<'_>,
        sink: &mut dyn ProblemSink,
    ) {
        let Some(run_configuration) = scope.run_configuration() else {
            return;
        };
        if run_configuration.mobile_run_target() != Some(MobileRunTarget::AndroidDevice) {
            return;
        }
        let Ok(key) = run_configuration.check_and_get_unit(&self.project) else {
            return;
        };
        let Some(resolved) = units.get(&key) else {
            return;
        };

        let unit = &resolved.unit;
        if unit.target_platform() != TargetPlatform::Mobile || unit.output_type() != OutputType::Application {
            return;
        }
        if let Some(options) = unit.packaging_options(DeviceKind::Android) {
            // Already covered by the packaging checks
            if self.options.check_packaging && options.enabled {
                return;
            }
            debug!("Checking Android packaging of {} for device launch", key);
            validator.check_device_packaging(&key.module, &unit.name, options, sink);
        }
    }

    /// Validate and plan; any problem blocks the plan
    pub fn plan(&self, scope: &CompileScope) -> Result<BuildPlan, PipelineError> {
        let report = self.validate(scope)?;
        if !report.is_clean() {
            return Err(PipelineError::Validation(report.problems));
        }
        info!("Planned {} compilation task(s)", report.tasks.len());
        let resources = resource_targets(&report.units);
        Ok(BuildPlan {
            tasks: report.tasks,
            resources,
        })
    }

    pub async fn build(
        &self,
        plan: BuildPlan,
        orchestrator: &CompilationOrchestrator,
        cancel: CancellationToken,
    ) -> RunReport {
        orchestrator.run(plan.tasks, cancel).await
    }
}
