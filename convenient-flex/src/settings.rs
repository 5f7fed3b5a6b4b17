//! Project level settings read from the `settings` section of a project file

use serde::{Deserialize, Serialize};

/// Android package flavour selected for running/packaging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AndroidPackageType {
    #[default]
    Release,
    DebugOverUsb,
    DebugOverNetwork,
}

/// iOS package flavour selected for running/packaging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IosPackageType {
    #[default]
    Test,
    DebugOverNetwork,
    AdHoc,
    AppStore,
}

/// Package types that decide the debug flag of mobile applications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingParameters {
    #[serde(default)]
    pub android_package_type: AndroidPackageType,

    #[serde(default)]
    pub ios_package_type: IosPackageType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Prefer the persistent compiler server over one process per unit
    #[serde(default)]
    pub use_built_in_compiler: bool,

    #[serde(default = "default_parallelism")]
    pub max_parallel_compilations: usize,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            use_built_in_compiler: false,
            max_parallel_compilations: default_parallelism(),
        }
    }
}

fn default_parallelism() -> usize {
    num_cpus::get()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(default)]
    pub compiler: CompilerSettings,

    #[serde(default)]
    pub packaging: PackagingParameters,
}
