//! Resource copying targets of a resolved unit set
//!
//! Resource files are copied per module, once for production sources and
//! once for test sources, next to the compiled output of every application
//! that asks for them.

use crate::model::ResourceFilesMode;
use crate::scope::ResolvedSet;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTargetKind {
    Production,
    Test,
}

/// Modules whose resources of one kind are in scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceTargetScope {
    pub kind: ResourceTargetKind,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceTargets {
    /// Production then test, both over the modules of every resolved unit
    pub scopes: Vec<ResourceTargetScope>,
    /// Per module, the units that copy resource files to their output
    pub units_by_module: BTreeMap<String, Vec<String>>,
}

impl ResourceTargets {
    pub fn is_empty(&self) -> bool {
        self.units_by_module.is_empty()
    }

    /// Units of `module` that copy resource files
    pub fn units(&self, module: &str) -> &[String] {
        self.units_by_module.get(module).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Resource targets for `set`.
///
/// A unit copies resources when it is compiled, is an application and its
/// resource files mode is not `none`. Derived stylesheet units never do.
pub fn resource_targets(set: &ResolvedSet) -> ResourceTargets {
    let modules: Vec<String> = set
        .iter()
        .map(|resolved| resolved.key.module.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut units_by_module: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for resolved in set.iter() {
        let unit = &resolved.unit;
        if unit.skip_compile
            || !unit.can_have_resource_files()
            || unit.compiler_options.resource_files_mode == ResourceFilesMode::None
        {
            continue;
        }
        debug!("{} copies resource files", resolved.key);
        units_by_module
            .entry(resolved.key.module.clone())
            .or_default()
            .push(unit.name.clone());
    }

    let scopes = [ResourceTargetKind::Production, ResourceTargetKind::Test]
        .into_iter()
        .map(|kind| ResourceTargetScope {
            kind,
            modules: modules.clone(),
        })
        .collect();

    ResourceTargets { scopes, units_by_module }
}
