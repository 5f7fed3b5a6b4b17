//! Build unit data model
//!
//! A build unit is one compilable configuration of a module: where it runs,
//! what it produces, how it is compiled and what it depends on. Units are
//! plain values; every "modified" unit produced during a run is a fresh copy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform a build unit targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    /// Browser Flash player
    #[default]
    Web,
    /// AIR desktop runtime
    Desktop,
    /// AIR mobile runtime (Android, iOS)
    Mobile,
}

/// Kind of artifact a build unit produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    /// Runnable application (.swf)
    #[default]
    Application,
    /// Library (.swc)
    Library,
    /// Module loaded by an application at runtime (.swf)
    RuntimeLoadedModule,
}

impl OutputType {
    /// Name shown to users
    pub fn presentable_text(self) -> &'static str {
        match self {
            OutputType::Application => "Application",
            OutputType::Library => "Library",
            OutputType::RuntimeLoadedModule => "Runtime-loaded module",
        }
    }

    /// Required output file extension, lower case and without the dot
    pub fn output_extension(self) -> &'static str {
        match self {
            OutputType::Library => "swc",
            OutputType::Application | OutputType::RuntimeLoadedModule => "swf",
        }
    }
}

/// Platform + output kind of a build unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nature {
    /// Target platform
    #[serde(default)]
    pub target_platform: TargetPlatform,

    /// Pure ActionScript project (no Flex framework)
    #[serde(default)]
    pub pure_as: bool,

    /// Output kind
    #[serde(default)]
    pub output_type: OutputType,
}

impl Nature {
    pub fn new(target_platform: TargetPlatform, output_type: OutputType) -> Self {
        Self {
            target_platform,
            pure_as: false,
            output_type,
        }
    }

    pub fn is_app(&self) -> bool {
        self.output_type == OutputType::Application
    }

    pub fn is_lib(&self) -> bool {
        self.output_type == OutputType::Library
    }

    pub fn is_web_platform(&self) -> bool {
        self.target_platform == TargetPlatform::Web
    }

    pub fn is_desktop_platform(&self) -> bool {
        self.target_platform == TargetPlatform::Desktop
    }

    pub fn is_mobile_platform(&self) -> bool {
        self.target_platform == TargetPlatform::Mobile
    }
}

/// How a dependency's output is combined with the depending unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkageType {
    /// Framework default linkage
    #[default]
    Default,
    /// Classes merged into the output
    Merged,
    /// Runtime shared library
    Rsl,
    /// Referenced, not compiled in
    External,
    /// Whole library included
    Include,
    /// Loaded at runtime, no compile-time relation
    LoadInRuntime,
    /// Only used by tests
    Test,
}

impl LinkageType {
    /// Linkages allowed for a library dependency
    pub const SWC_LINKAGES: [LinkageType; 4] = [
        LinkageType::Merged,
        LinkageType::Rsl,
        LinkageType::External,
        LinkageType::Include,
    ];

    pub fn short_text(self) -> &'static str {
        match self {
            LinkageType::Default => "Default",
            LinkageType::Merged => "Merged",
            LinkageType::Rsl => "RSL",
            LinkageType::External => "External",
            LinkageType::Include => "Include",
            LinkageType::LoadInRuntime => "Loaded at runtime",
            LinkageType::Test => "Test",
        }
    }
}

/// Edge to another build unit, addressed by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDependency {
    pub module: String,
    pub unit: String,
    #[serde(default)]
    pub linkage: LinkageType,
}

impl UnitDependency {
    pub fn new(module: impl Into<String>, unit: impl Into<String>, linkage: LinkageType) -> Self {
        Self {
            module: module.into(),
            unit: unit.into(),
            linkage,
        }
    }

    pub fn key(&self) -> UnitKey {
        UnitKey::new(&self.module, &self.unit)
    }
}

/// Edge to a prebuilt library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDependency {
    pub name: String,
    #[serde(default)]
    pub linkage: LinkageType,
}

/// One entry of a unit's ordered dependency list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DependencyEntry {
    /// Another build unit of the project
    BuildUnit(UnitDependency),
    /// A library (module or project level)
    Library(LibraryDependency),
}

impl DependencyEntry {
    pub fn linkage(&self) -> LinkageType {
        match self {
            DependencyEntry::BuildUnit(dep) => dep.linkage,
            DependencyEntry::Library(dep) => dep.linkage,
        }
    }
}

/// Which resource files are copied to the output folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFilesMode {
    None,
    #[default]
    All,
    ResourcePatterns,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Extra command line options passed verbatim to the compiler
    #[serde(default)]
    pub additional_options: String,

    /// Flex config XML merged into the generated configuration (empty = none)
    #[serde(default)]
    pub additional_config_file: String,

    /// Files compiled into a library as-is
    #[serde(default)]
    pub files_to_include_in_swc: Vec<String>,

    #[serde(default)]
    pub resource_files_mode: ResourceFilesMode,
}

/// Device a packaging options record applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Desktop,
    Android,
    Ios,
}

impl DeviceKind {
    pub fn display_name(self) -> &'static str {
        match self {
            DeviceKind::Desktop => "Desktop",
            DeviceKind::Android => "Android",
            DeviceKind::Ios => "iOS",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Device specific part of the packaging options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DevicePackaging {
    Desktop,
    Android,
    Ios {
        #[serde(default)]
        provisioning_profile_path: String,
    },
}

impl DevicePackaging {
    pub fn kind(&self) -> DeviceKind {
        match self {
            DevicePackaging::Desktop => DeviceKind::Desktop,
            DevicePackaging::Android => DeviceKind::Android,
            DevicePackaging::Ios { .. } => DeviceKind::Ios,
        }
    }
}

/// Source file and its location inside the package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInPackage {
    pub file_path: String,
    pub path_in_package: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningOptions {
    /// Sign with a temporary certificate (never available for iOS)
    #[serde(default = "default_true")]
    pub use_temp_certificate: bool,

    #[serde(default)]
    pub keystore_path: String,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            use_temp_certificate: true,
            keystore_path: String::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// AIR packaging options: a record shared by all devices plus a device payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingOptions {
    /// Only meaningful for mobile devices; desktop options always apply
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub use_generated_descriptor: bool,

    #[serde(default)]
    pub custom_descriptor_path: String,

    #[serde(default)]
    pub package_file_name: String,

    #[serde(default)]
    pub files_to_package: Vec<FileInPackage>,

    #[serde(default)]
    pub signing: SigningOptions,

    pub device: DevicePackaging,
}

impl PackagingOptions {
    pub fn new(device: DevicePackaging) -> Self {
        Self {
            enabled: true,
            use_generated_descriptor: true,
            custom_descriptor_path: String::new(),
            package_file_name: String::new(),
            files_to_package: Vec::new(),
            signing: SigningOptions::default(),
            device,
        }
    }

    pub fn device_kind(&self) -> DeviceKind {
        self.device.kind()
    }
}

/// Flex/AIR SDK a unit compiles against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sdk {
    pub name: String,
    /// SDK home directory; compilers live in `<home>/bin`
    pub home: String,
    #[serde(default)]
    pub version: String,
}

/// One buildable configuration of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildUnit {
    pub name: String,

    #[serde(default)]
    pub nature: Nature,

    #[serde(default)]
    pub main_class: String,

    #[serde(default)]
    pub output_file_name: String,

    #[serde(default)]
    pub output_folder: String,

    #[serde(default)]
    pub use_html_wrapper: bool,

    #[serde(default)]
    pub wrapper_template_path: String,

    /// Runtime stylesheets compiled into their own .swf files
    #[serde(default)]
    pub css_files_to_compile: Vec<String>,

    #[serde(default)]
    pub skip_compile: bool,

    #[serde(default)]
    pub sdk: Option<Sdk>,

    #[serde(default)]
    pub compiler_options: CompilerOptions,

    #[serde(default)]
    pub packaging: Vec<PackagingOptions>,

    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,

    /// Set on copies made only for one compilation (derived units)
    #[serde(skip)]
    pub temp_for_compilation: bool,
}

impl BuildUnit {
    /// A unit with the given name and nature and every other field empty.
    pub fn new(name: impl Into<String>, nature: Nature) -> Self {
        Self {
            name: name.into(),
            nature,
            main_class: String::new(),
            output_file_name: String::new(),
            output_folder: String::new(),
            use_html_wrapper: false,
            wrapper_template_path: String::new(),
            css_files_to_compile: Vec::new(),
            skip_compile: false,
            sdk: None,
            compiler_options: CompilerOptions::default(),
            packaging: Vec::new(),
            dependencies: Vec::new(),
            temp_for_compilation: false,
        }
    }

    pub fn output_type(&self) -> OutputType {
        self.nature.output_type
    }

    pub fn target_platform(&self) -> TargetPlatform {
        self.nature.target_platform
    }

    /// Packaging options for a device, if the unit declares them
    pub fn packaging_options(&self, device: DeviceKind) -> Option<&PackagingOptions> {
        self.packaging.iter().find(|p| p.device_kind() == device)
    }

    /// Runtime stylesheets need the Flex framework and a .swf output
    pub fn can_have_runtime_stylesheets(&self) -> bool {
        !self.nature.pure_as && !self.nature.is_lib()
    }

    /// Only applications copy resource files next to their output
    pub fn can_have_resource_files(&self) -> bool {
        self.nature.is_app()
    }

    /// Edges to other build units, in declaration order
    pub fn unit_dependencies(&self) -> impl Iterator<Item = &UnitDependency> {
        self.dependencies.iter().filter_map(|entry| match entry {
            DependencyEntry::BuildUnit(dep) => Some(dep),
            DependencyEntry::Library(_) => None,
        })
    }

    /// Output path from the unit's own fields
    pub fn output_file_path(&self) -> String {
        if self.output_folder.is_empty() {
            return self.output_file_name.clone();
        }
        format!(
            "{}/{}",
            self.output_folder.trim_end_matches(['/', '\\']),
            self.output_file_name
        )
    }

    /// Copy used for a single compilation; never persisted, never derived from.
    pub fn temporary_copy_for_compilation(&self) -> BuildUnit {
        BuildUnit {
            temp_for_compilation: true,
            ..self.clone()
        }
    }
}

/// Identity of a build unit within a project: module name + unit name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub module: String,
    pub unit: String,
}

impl UnitKey {
    pub fn new(module: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            unit: unit.into(),
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.module, self.unit)
    }
}

impl FromStr for UnitKey {
    type Err = String;

    /// Parses `module/unit`; the unit name may itself contain slashes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((module, unit)) if !module.is_empty() && !unit.is_empty() => {
                Ok(UnitKey::new(module, unit))
            }
            _ => Err(format!("expected MODULE/UNIT, got '{}'", s)),
        }
    }
}
