//! Compilation tasks planned from a resolved unit set

use crate::config_file::actual_output_file_path;
use crate::debug::with_forced_debug_status;
use crate::derived::derive_stylesheet_units;
use crate::expand::build_dependencies;
use crate::fs::FileSystem;
use crate::model::{BuildUnit, LinkageType, Sdk, UnitKey};
use crate::project::Project;
use crate::scope::ResolvedSet;
use crate::settings::PackagingParameters;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Identity of a compilation: the unit, plus the stylesheet for derived tasks
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub module: String,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

impl TaskKey {
    pub fn unit(module: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            unit: unit.into(),
            artifact: None,
        }
    }

    pub fn derived(key: &UnitKey, artifact: impl Into<String>) -> Self {
        Self {
            module: key.module.clone(),
            unit: key.unit.clone(),
            artifact: Some(artifact.into()),
        }
    }

    pub fn unit_key(&self) -> UnitKey {
        UnitKey::new(&self.module, &self.unit)
    }
}

impl From<&UnitKey> for TaskKey {
    fn from(key: &UnitKey) -> Self {
        TaskKey::unit(&key.module, &key.unit)
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.artifact {
            Some(artifact) => write!(f, "{}/{} [{}]", self.module, self.unit, artifact),
            None => write!(f, "{}/{}", self.module, self.unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDependency {
    pub key: TaskKey,
    pub linkage: LinkageType,
}

/// One compiler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationTask {
    pub key: TaskKey,
    pub unit: Arc<BuildUnit>,
    /// Where the compiler writes the artifact
    pub output_path: String,
    /// Sibling tasks that must succeed first
    pub dependencies: Vec<TaskDependency>,
}

impl CompilationTask {
    pub fn sdk(&self) -> Option<&Sdk> {
        self.unit.sdk.as_ref()
    }

    pub fn is_derived(&self) -> bool {
        self.key.artifact.is_some()
    }
}

/// Tasks for every unit of `set`, followed by its stylesheet tasks.
///
/// Explicitly requested units compile as debug-forced copies. A task waits
/// only for dependencies present in the same run; stylesheet tasks wait for
/// the same ones as their parent.
pub fn plan_tasks(
    project: &Project,
    set: &ResolvedSet,
    params: &PackagingParameters,
    fs: &dyn FileSystem,
) -> Vec<CompilationTask> {
    let mut tasks = Vec::new();

    for resolved in set.iter() {
        let unit = if resolved.force_debug_status {
            Arc::new(with_forced_debug_status(&resolved.unit, params))
        } else {
            Arc::clone(&resolved.unit)
        };

        let dependencies: Vec<TaskDependency> = build_dependencies(project, &resolved.unit)
            .into_iter()
            .filter(|(key, _)| set.contains(key))
            .map(|(key, linkage)| TaskDependency {
                key: TaskKey::from(&key),
                linkage,
            })
            .collect();

        for css_unit in derive_stylesheet_units(&unit, fs) {
            tasks.push(CompilationTask {
                key: TaskKey::derived(&resolved.key, css_unit.main_class.clone()),
                output_path: actual_output_file_path(&css_unit, fs),
                unit: Arc::new(css_unit),
                dependencies: dependencies.clone(),
            });
        }

        debug!("Planned {} with {} dependencies", resolved.key, dependencies.len());
        tasks.push(CompilationTask {
            key: TaskKey::from(&resolved.key),
            output_path: actual_output_file_path(&unit, fs),
            unit,
            dependencies,
        });
    }

    tasks.sort_by(|a, b| a.key.cmp(&b.key));
    tasks
}

/// The SDK shared by all tasks, if there is exactly one
pub fn common_sdk(tasks: &[CompilationTask]) -> Option<&Sdk> {
    let first = tasks.first()?.sdk()?;
    tasks
        .iter()
        .all(|task| task.sdk() == Some(first))
        .then_some(first)
}
