//! Compile scopes and their resolution into a dependency-closed unit set

use crate::error::{ConfigurationError, ConfigurationResult};
use crate::expand::append_dependencies;
use crate::model::{BuildUnit, UnitKey};
use crate::project::Project;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a mobile run configuration launches the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobileRunTarget {
    Emulator,
    AndroidDevice,
    IosSimulator,
    IosDevice,
}

/// A runnable configuration bound to one build unit
pub trait RunConfiguration: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Resolve the bound unit, or explain why it cannot be resolved
    fn check_and_get_unit(&self, project: &Project) -> Result<UnitKey, String>;

    fn mobile_run_target(&self) -> Option<MobileRunTarget> {
        None
    }
}

/// Run configuration naming a module and a build unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BcRunConfiguration {
    pub name: String,

    #[serde(default)]
    pub module: String,

    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub mobile_run_target: Option<MobileRunTarget>,
}

impl BcRunConfiguration {
    pub fn new(name: impl Into<String>, module: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            unit: unit.into(),
            mobile_run_target: None,
        }
    }
}

impl RunConfiguration for BcRunConfiguration {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_and_get_unit(&self, project: &Project) -> Result<UnitKey, String> {
        if self.module.is_empty() || self.unit.is_empty() {
            return Err("Module and build configuration not set".to_string());
        }

        let module = project
            .find_module(&self.module)
            .ok_or_else(|| format!("Module '{}' not found", self.module))?;

        if !module.is_flash() {
            return Err(format!("Module '{}' is not a Flash module", self.module));
        }

        module
            .find_unit(&self.unit)
            .map(|unit| UnitKey::new(&module.name, &unit.name))
            .ok_or_else(|| {
                format!(
                    "Build configuration '{}' not found in module '{}'",
                    self.unit, self.module
                )
            })
    }

    fn mobile_run_target(&self) -> Option<MobileRunTarget> {
        self.mobile_run_target
    }
}

/// What the caller asked to compile
#[derive(Debug, Clone)]
pub enum CompileScope {
    /// Exactly these units (plus their dependencies)
    Units(Vec<UnitKey>),
    /// The unit a run configuration is bound to (plus its dependencies)
    RunConfiguration(Arc<dyn RunConfiguration>),
    /// Every non-skipped unit of these modules
    Modules(Vec<String>),
}

impl CompileScope {
    pub fn run_configuration(&self) -> Option<&dyn RunConfiguration> {
        match self {
            CompileScope::RunConfiguration(rc) => Some(rc.as_ref()),
            _ => None,
        }
    }
}

/// One member of a resolved set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUnit {
    pub key: UnitKey,
    pub unit: Arc<BuildUnit>,
    /// Explicitly requested; compiled with a decided debug flag
    pub force_debug_status: bool,
}

/// Deduplicated units selected for one run, keyed by (module, unit)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSet {
    units: BTreeMap<UnitKey, ResolvedUnit>,
}

impl ResolvedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit; returns false if it was already present
    pub fn insert(&mut self, module: &str, unit: &BuildUnit) -> bool {
        let key = UnitKey::new(module, &unit.name);
        if self.units.contains_key(&key) {
            return false;
        }
        let _ = self.units.insert(
            key.clone(),
            ResolvedUnit {
                key,
                unit: Arc::new(unit.clone()),
                force_debug_status: false,
            },
        );
        true
    }

    fn mark_force_debug_status(&mut self, key: &UnitKey) {
        if let Some(resolved) = self.units.get_mut(key) {
            resolved.force_debug_status = true;
        }
    }

    pub fn contains(&self, key: &UnitKey) -> bool {
        self.units.contains_key(key)
    }

    pub fn get(&self, key: &UnitKey) -> Option<&ResolvedUnit> {
        self.units.get(key)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &UnitKey> {
        self.units.keys()
    }

    /// Units in key order
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedUnit> {
        self.units.values()
    }
}

/// Turn a compile scope into the set of units to build
pub fn resolve_scope(project: &Project, scope: &CompileScope) -> ConfigurationResult<ResolvedSet> {
    let mut set = ResolvedSet::new();

    match scope {
        CompileScope::Units(keys) => {
            for key in keys {
                let unit = project.find_unit_by_key(key).ok_or_else(|| {
                    ConfigurationError::UnknownUnit {
                        module: key.module.clone(),
                        unit: key.unit.clone(),
                    }
                })?;

                if unit.skip_compile {
                    debug!("Skipping {} (skip compile)", key);
                    continue;
                }

                let _ = set.insert(&key.module, unit);
                set.mark_force_debug_status(key);
                append_dependencies(project, &mut set, &key.module, unit)?;
            }
        }
        CompileScope::RunConfiguration(rc) => {
            let key = rc.check_and_get_unit(project).map_err(|message| {
                ConfigurationError::RunConfiguration {
                    run_configuration: rc.name().to_string(),
                    message,
                }
            })?;

            let unit = project.find_unit_by_key(&key).ok_or_else(|| {
                ConfigurationError::RunConfiguration {
                    run_configuration: rc.name().to_string(),
                    message: format!("Build configuration '{}' not found", key),
                }
            })?;

            if unit.skip_compile {
                debug!("Run configuration '{}' is bound to skipped {}", rc.name(), key);
            } else {
                let _ = set.insert(&key.module, unit);
                append_dependencies(project, &mut set, &key.module, unit)?;
            }
        }
        CompileScope::Modules(names) => {
            for name in names {
                let Some(module) = project.find_module(name) else {
                    debug!("Module '{}' not in project, ignored", name);
                    continue;
                };
                if !module.is_flash() {
                    continue;
                }
                for unit in module.units.iter().filter(|unit| !unit.skip_compile) {
                    if set.insert(&module.name, unit) {
                        append_dependencies(project, &mut set, &module.name, unit)?;
                    }
                }
            }
        }
    }

    info!("Resolved {} build configuration(s) to compile", set.len());
    Ok(set)
}
