//! Project catalog: modules, their build units and run configurations
//!
//! Loaded from a YAML project file:
//!
//! ```yaml
//! name: demo
//! modules:
//!   - name: ModuleA
//!     source_roots: [/work/a/src]
//!     build_units:
//!       - name: Release
//!         nature: { target_platform: web, output_type: application }
//!         main_class: Main
//!         output_file_name: a.swf
//!         output_folder: /work/out
//! run_configurations:
//!   - name: Run A
//!     module: ModuleA
//!     unit: Release
//! ```

use crate::error::ProjectError;
use crate::model::{BuildUnit, UnitKey};
use crate::scope::BcRunConfiguration;
use crate::settings::ProjectSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Module kind; only flash modules own build units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    #[default]
    Flash,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,

    #[serde(default)]
    pub kind: ModuleKind,

    #[serde(default)]
    pub source_roots: Vec<String>,

    #[serde(default)]
    pub content_roots: Vec<String>,

    #[serde(default, rename = "build_units")]
    pub units: Vec<BuildUnit>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModuleKind::Flash,
            source_roots: Vec::new(),
            content_roots: Vec::new(),
            units: Vec::new(),
        }
    }

    pub fn with_unit(mut self, unit: BuildUnit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn is_flash(&self) -> bool {
        self.kind == ModuleKind::Flash
    }

    pub fn find_unit(&self, name: &str) -> Option<&BuildUnit> {
        self.units.iter().find(|unit| unit.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub modules: Vec<Module>,

    #[serde(default)]
    pub run_configurations: Vec<BcRunConfiguration>,

    #[serde(default)]
    pub settings: ProjectSettings,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    /// Load a project file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        debug!("Loading project file {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProjectError::Io {
                path: path.display().to_string(),
                source,
            })?;

        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ProjectError> {
        let project: Project = serde_yaml::from_str(yaml)?;
        project.check_unique_units()?;
        Ok(project)
    }

    fn check_unique_units(&self) -> Result<(), ProjectError> {
        for module in &self.modules {
            let mut seen = HashSet::new();
            for unit in &module.units {
                if !seen.insert(unit.name.as_str()) {
                    return Err(ProjectError::DuplicateUnit {
                        module: module.name.clone(),
                        unit: unit.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn find_module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.name == name)
    }

    pub fn find_unit(&self, module: &str, unit: &str) -> Option<&BuildUnit> {
        self.find_module(module)?.find_unit(unit)
    }

    pub fn find_unit_by_key(&self, key: &UnitKey) -> Option<&BuildUnit> {
        self.find_unit(&key.module, &key.unit)
    }

    pub fn find_run_configuration(&self, name: &str) -> Option<&BcRunConfiguration> {
        self.run_configurations.iter().find(|rc| rc.name == name)
    }

    /// All source roots of all modules
    pub fn source_roots(&self) -> impl Iterator<Item = &str> {
        self.modules
            .iter()
            .flat_map(|module| module.source_roots.iter().map(String::as_str))
    }

    /// All content roots of all modules
    pub fn content_roots(&self) -> impl Iterator<Item = &str> {
        self.modules
            .iter()
            .flat_map(|module| module.content_roots.iter().map(String::as_str))
    }

    /// Every unit of every module, keyed
    pub fn units(&self) -> impl Iterator<Item = (UnitKey, &BuildUnit)> {
        self.modules.iter().flat_map(|module| {
            module
                .units
                .iter()
                .map(move |unit| (UnitKey::new(&module.name, &unit.name), unit))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DependencyEntry, OutputType, TargetPlatform};

    const PROJECT: &str = r#"
name: demo
modules:
  - name: ModuleA
    source_roots: [/work/a/src]
    build_units:
      - name: Release
        nature: { target_platform: web, output_type: application }
        main_class: Main
        output_file_name: a.swf
        output_folder: /work/out
        dependencies:
          - kind: build_unit
            module: ModuleB
            unit: Lib
            linkage: merged
  - name: ModuleB
    build_units:
      - name: Lib
        nature: { output_type: library }
  - name: Docs
    kind: other
run_configurations:
  - name: Run A
    module: ModuleA
    unit: Release
settings:
  compiler:
    max_parallel_compilations: 3
"#;

    #[test]
    fn test_parse_project() {
        let project = Project::from_yaml_str(PROJECT).unwrap();
        assert_eq!(project.name, "demo");
        assert_eq!(project.modules.len(), 3);
        assert!(!project.find_module("Docs").unwrap().is_flash());

        let release = project.find_unit("ModuleA", "Release").unwrap();
        assert_eq!(release.target_platform(), TargetPlatform::Web);
        assert!(matches!(release.dependencies[0], DependencyEntry::BuildUnit(_)));

        let lib = project.find_unit("ModuleB", "Lib").unwrap();
        assert_eq!(lib.output_type(), OutputType::Library);
        assert!(project.find_unit("ModuleB", "Missing").is_none());

        assert!(project.find_run_configuration("Run A").is_some());
        assert_eq!(project.settings.compiler.max_parallel_compilations, 3);
        assert_eq!(project.units().count(), 2);
    }

    #[test]
    fn test_duplicate_units_rejected() {
        let yaml = r#"
modules:
  - name: M
    build_units:
      - name: U
      - name: U
"#;
        assert!(matches!(
            Project::from_yaml_str(yaml),
            Err(ProjectError::DuplicateUnit { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("project.yaml");
        std::fs::write(&path, PROJECT).unwrap();

        let project = Project::load(&path).await.unwrap();
        assert_eq!(project.modules.len(), 3);

        let missing = Project::load(dir.path().join("missing.yaml")).await;
        assert!(matches!(missing, Err(ProjectError::Io { .. })));
    }
}
