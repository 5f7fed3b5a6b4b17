//! Transitive closure over build-unit dependencies

use crate::error::{ConfigurationError, ConfigurationResult};
use crate::model::{BuildUnit, LinkageType, UnitKey};
use crate::project::Project;
use crate::scope::ResolvedSet;
use tracing::debug;

/// Add every compile-time dependency of `unit` to `set`, recursively.
///
/// Edges loaded at runtime are ignored. Skipped targets are neither added
/// nor walked. A target is walked only the first time it is inserted, so a
/// dependency cycle terminates without an error.
pub fn append_dependencies(
    project: &Project,
    set: &mut ResolvedSet,
    module: &str,
    unit: &BuildUnit,
) -> ConfigurationResult<()> {
    for dep in unit.unit_dependencies() {
        if dep.linkage == LinkageType::LoadInRuntime {
            continue;
        }

        let target = project
            .find_unit(&dep.module, &dep.unit)
            .ok_or_else(|| ConfigurationError::MissingDependency {
                dependency_unit: dep.unit.clone(),
                dependency_module: dep.module.clone(),
                owner_unit: unit.name.clone(),
                owner_module: module.to_string(),
            })?;

        if target.skip_compile {
            continue;
        }

        if set.insert(&dep.module, target) {
            debug!("Added dependency {} of {}/{}", dep.key(), module, unit.name);
            append_dependencies(project, set, &dep.module, target)?;
        }
    }
    Ok(())
}

/// Build-unit dependencies a compilation of `unit` waits for: existing,
/// not skipped and not loaded at runtime, in declaration order.
pub fn build_dependencies(project: &Project, unit: &BuildUnit) -> Vec<(UnitKey, LinkageType)> {
    unit.unit_dependencies()
        .filter(|dep| dep.linkage != LinkageType::LoadInRuntime)
        .filter(|dep| {
            project
                .find_unit(&dep.module, &dep.unit)
                .is_some_and(|target| !target.skip_compile)
        })
        .map(|dep| (dep.key(), dep.linkage))
        .collect()
}
