//! Build unit configuration checks
//!
//! Every rule runs independently and reports through a [`ProblemSink`];
//! nothing here stops at the first problem. Problems carry a
//! [`FieldLocator`] so a front end can point at the offending setting.

use crate::config_file::ConfigFileInfo;
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::fs::FileSystem;
use crate::model::{BuildUnit, DeviceKind, DevicePackaging, LinkageType, OutputType, PackagingOptions, TargetPlatform};
use crate::project::Project;
use serde::Serialize;
use std::fmt;

/// Name of the file an HTML wrapper template folder must contain
pub const HTML_WRAPPER_TEMPLATE_FILE_NAME: &str = "index.template.html";

/// Settings page a problem belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCategory {
    Dependencies,
    CompilerOptions,
    GeneralOption,
    PackagingOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackagingField {
    CustomDescriptor,
    PackageFileName,
    FilesToPackage,
    ProvisioningProfile,
    Keystore,
}

/// The setting a problem points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLocator {
    Sdk,
    AdditionalConfigFile,
    FilesToIncludeInSwc,
    MainClass,
    OutputFileName,
    OutputFolder,
    HtmlTemplatePath,
    RuntimeStyleSheets,
    Packaging {
        device: DeviceKind,
        field: PackagingField,
    },
}

/// One configuration defect of one build unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub unit: String,
    pub category: ProblemCategory,
    pub message: String,
    pub location: FieldLocator,
}

impl Problem {
    pub fn dependencies(unit: &str, message: impl Into<String>, location: FieldLocator) -> Self {
        Self::new(unit, ProblemCategory::Dependencies, message, location)
    }

    pub fn compiler_options(unit: &str, message: impl Into<String>, location: FieldLocator) -> Self {
        Self::new(unit, ProblemCategory::CompilerOptions, message, location)
    }

    pub fn general_option(unit: &str, message: impl Into<String>, location: FieldLocator) -> Self {
        Self::new(unit, ProblemCategory::GeneralOption, message, location)
    }

    pub fn packaging(unit: &str, device: DeviceKind, message: impl Into<String>, field: PackagingField) -> Self {
        Self::new(
            unit,
            ProblemCategory::PackagingOptions,
            message,
            FieldLocator::Packaging { device, field },
        )
    }

    fn new(unit: &str, category: ProblemCategory, message: impl Into<String>, location: FieldLocator) -> Self {
        Self {
            unit: unit.to_string(),
            category,
            message: message.into(),
            location,
        }
    }
}

/// A problem together with the module owning the unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedProblem {
    pub module: String,
    pub unit: String,
    pub problem: Problem,
}

impl fmt::Display for ReportedProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.module, self.unit, self.problem.message)
    }
}

/// Receives problems as they are found
pub trait ProblemSink {
    fn report(&mut self, module: &str, unit: &str, problem: Problem);
}

/// Sink keeping every problem in report order
#[derive(Debug, Clone, Default)]
pub struct ProblemCollector {
    problems: Vec<ReportedProblem>,
}

impl ProblemCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problems(&self) -> &[ReportedProblem] {
        &self.problems
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn into_problems(self) -> Vec<ReportedProblem> {
        self.problems
    }
}

impl ProblemSink for ProblemCollector {
    fn report(&mut self, module: &str, unit: &str, problem: Problem) {
        self.problems.push(ReportedProblem {
            module: module.to_string(),
            unit: unit.to_string(),
            problem,
        });
    }
}

/// Which optional checks run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Validate packaging options of application units
    pub check_packaging: bool,
    /// Reject dependencies whose output kind and linkage don't fit together
    pub strict_dependency_types: bool,
}

pub struct ConfigValidator<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> ConfigValidator<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Problems of one unit, packaging not included
    pub fn validate(&self, module: &str, unit: &BuildUnit) -> Vec<Problem> {
        let mut collector = ProblemCollector::new();
        self.check_configuration(module, unit, false, &mut collector);
        collector
            .into_problems()
            .into_iter()
            .map(|reported| reported.problem)
            .collect()
    }

    pub fn check_configuration(
        &self,
        module: &str,
        unit: &BuildUnit,
        check_packaging: bool,
        sink: &mut dyn ProblemSink,
    ) {
        let name = unit.name.as_str();
        let mut report = |problem: Problem| sink.report(module, name, problem);
        let nature = unit.nature;

        if unit.sdk.is_none() {
            report(Problem::dependencies(name, "Flex SDK not set", FieldLocator::Sdk));
        }

        let mut info = ConfigFileInfo::default();
        let config_path = &unit.compiler_options.additional_config_file;
        if !config_path.is_empty() {
            if !self.fs.is_file(config_path) {
                report(Problem::compiler_options(
                    name,
                    format!("Additional compiler configuration file not found: {}", config_path),
                    FieldLocator::AdditionalConfigFile,
                ));
            }
            if !unit.temp_for_compilation {
                info = ConfigFileInfo::read(config_path, self.fs);
            }
        }

        if !nature.is_lib() && info.main_class(self.fs).is_none() && unit.main_class.is_empty() {
            report(Problem::general_option(name, "Main class not set", FieldLocator::MainClass));
        }

        if !info.declares_output() {
            if unit.output_file_name.is_empty() {
                report(Problem::general_option(
                    name,
                    "Output file name not set",
                    FieldLocator::OutputFileName,
                ));
            }

            let extension = nature.output_type.output_extension();
            if !unit
                .output_file_name
                .to_lowercase()
                .ends_with(&format!(".{}", extension))
            {
                report(Problem::general_option(
                    name,
                    format!("Output file must have .{} extension", extension),
                    FieldLocator::OutputFileName,
                ));
            }

            if unit.output_folder.is_empty() {
                report(Problem::general_option(name, "Output folder not set", FieldLocator::OutputFolder));
            } else if !is_absolute_path(&unit.output_folder) {
                report(Problem::general_option(
                    name,
                    format!("Output folder path is not absolute: {}", unit.output_folder),
                    FieldLocator::OutputFolder,
                ));
            }
        }

        if nature.is_web_platform() && nature.is_app() && unit.use_html_wrapper {
            let template_dir = &unit.wrapper_template_path;
            if template_dir.is_empty() {
                report(Problem::general_option(
                    name,
                    "HTML template folder not set",
                    FieldLocator::HtmlTemplatePath,
                ));
            } else if !self.fs.is_dir(template_dir) {
                report(Problem::general_option(
                    name,
                    format!("HTML template folder not found: {}", template_dir),
                    FieldLocator::HtmlTemplatePath,
                ));
            } else {
                let template = format!(
                    "{}/{}",
                    template_dir.trim_end_matches('/'),
                    HTML_WRAPPER_TEMPLATE_FILE_NAME
                );
                if !self.fs.exists(&template) {
                    report(Problem::general_option(
                        name,
                        format!(
                            "{} not found in HTML template folder {}",
                            HTML_WRAPPER_TEMPLATE_FILE_NAME, template_dir
                        ),
                        FieldLocator::HtmlTemplatePath,
                    ));
                }
            }
        }

        if unit.can_have_runtime_stylesheets() {
            for css in &unit.css_files_to_compile {
                if !css.to_lowercase().ends_with(".css") {
                    report(Problem::general_option(
                        name,
                        format!("Runtime stylesheet is not a .css file: {}", css),
                        FieldLocator::RuntimeStyleSheets,
                    ));
                } else if !self.fs.exists(css) {
                    report(Problem::general_option(
                        name,
                        format!(
                            "Runtime stylesheet of build configuration '{}' in module '{}' not found: {}",
                            name, module, css
                        ),
                        FieldLocator::RuntimeStyleSheets,
                    ));
                }
            }
        }

        if nature.is_lib() {
            for path in &unit.compiler_options.files_to_include_in_swc {
                if !self.fs.exists(path) {
                    report(Problem::compiler_options(
                        name,
                        format!("File to include in SWC not found: {}", path),
                        FieldLocator::FilesToIncludeInSwc,
                    ));
                }
            }
        }

        if check_packaging {
            self.check_packaging_options(module, unit, sink);
        }
    }

    /// Packaging checks of an application unit, dispatched on its platform
    pub fn check_packaging_options(&self, module: &str, unit: &BuildUnit, sink: &mut dyn ProblemSink) {
        if unit.output_type() != OutputType::Application {
            return;
        }

        match unit.target_platform() {
            TargetPlatform::Desktop => {
                if let Some(options) = unit.packaging_options(DeviceKind::Desktop) {
                    self.check_device_packaging(module, &unit.name, options, sink);
                }
            }
            TargetPlatform::Mobile => {
                for device in [DeviceKind::Android, DeviceKind::Ios] {
                    if let Some(options) = unit.packaging_options(device).filter(|o| o.enabled) {
                        self.check_device_packaging(module, &unit.name, options, sink);
                    }
                }
            }
            TargetPlatform::Web => {}
        }
    }

    /// Rules for one packaging options record
    pub fn check_device_packaging(
        &self,
        module: &str,
        unit: &str,
        options: &PackagingOptions,
        sink: &mut dyn ProblemSink,
    ) {
        let device = options.device_kind();
        let mut report = |message: String, field: PackagingField| {
            sink.report(module, unit, Problem::packaging(unit, device, message, field));
        };

        if !options.use_generated_descriptor {
            let descriptor = &options.custom_descriptor_path;
            if descriptor.is_empty() {
                report(
                    format!("{}: custom application descriptor not set", device),
                    PackagingField::CustomDescriptor,
                );
            } else if !self.fs.is_file(descriptor) {
                report(
                    format!("{}: custom application descriptor not found: {}", device, descriptor),
                    PackagingField::CustomDescriptor,
                );
            }
        }

        if options.package_file_name.is_empty() {
            report(format!("{}: package file name not set", device), PackagingField::PackageFileName);
        }

        for entry in &options.files_to_package {
            let full_path = &entry.file_path;
            let rel_path = entry.path_in_package.strip_prefix('/').unwrap_or(&entry.path_in_package);

            if full_path.is_empty() {
                report(
                    format!("{}: empty file name in files to package", device),
                    PackagingField::FilesToPackage,
                );
                continue;
            }

            let exists = self.fs.exists(full_path);
            if !exists {
                report(
                    format!("{}: file to package not found: {}", device, full_path),
                    PackagingField::FilesToPackage,
                );
            }

            if rel_path.is_empty() {
                report(
                    format!("{}: empty relative path in package for {}", device, full_path),
                    PackagingField::FilesToPackage,
                );
            }

            if exists && self.fs.is_dir(full_path) && !full_path.ends_with(&format!("/{}", rel_path)) {
                report(
                    format!(
                        "{}: relative path in package '{}' does not match folder {}",
                        device, rel_path, full_path
                    ),
                    PackagingField::FilesToPackage,
                );
            }
        }

        if let DevicePackaging::Ios { provisioning_profile_path } = &options.device {
            if provisioning_profile_path.is_empty() {
                report(
                    "iOS: provisioning profile not set".to_string(),
                    PackagingField::ProvisioningProfile,
                );
            } else if !self.fs.is_file(provisioning_profile_path) {
                report(
                    format!("iOS: provisioning profile not found: {}", provisioning_profile_path),
                    PackagingField::ProvisioningProfile,
                );
            }
        }

        let temp_certificate = device != DeviceKind::Ios && options.signing.use_temp_certificate;
        if !temp_certificate {
            let keystore = &options.signing.keystore_path;
            if keystore.is_empty() {
                report(format!("{}: keystore file not set", device), PackagingField::Keystore);
            } else if !self.fs.is_file(keystore) {
                report(
                    format!("{}: keystore file not found: {}", device, keystore),
                    PackagingField::Keystore,
                );
            }
        }
    }
}

/// Whether `unit` may depend on `dependency` with `linkage`
///
/// Applications are never dependencies; runtime-loaded modules only for
/// applications loading them at runtime; libraries only with a SWC linkage.
pub fn check_dependency_type(unit: &BuildUnit, dependency: &BuildUnit, linkage: LinkageType) -> bool {
    match dependency.output_type() {
        OutputType::Application => false,
        OutputType::RuntimeLoadedModule => {
            unit.output_type() == OutputType::Application && linkage == LinkageType::LoadInRuntime
        }
        OutputType::Library => LinkageType::SWC_LINKAGES.contains(&linkage),
    }
}

/// Fail on the first dangling or incompatible build-unit dependency of `unit`
pub fn check_dependencies(project: &Project, module: &str, unit: &BuildUnit) -> ConfigurationResult<()> {
    for dep in unit.unit_dependencies() {
        let target = project
            .find_unit(&dep.module, &dep.unit)
            .ok_or_else(|| ConfigurationError::MissingDependency {
                dependency_unit: dep.unit.clone(),
                dependency_module: dep.module.clone(),
                owner_unit: unit.name.clone(),
                owner_module: module.to_string(),
            })?;

        if !check_dependency_type(unit, target, dep.linkage) {
            return Err(ConfigurationError::IncompatibleDependency {
                owner_module: module.to_string(),
                owner_unit: unit.name.clone(),
                owner_kind: unit.output_type().presentable_text().to_string(),
                dependency_module: dep.module.clone(),
                dependency_unit: dep.unit.clone(),
                dependency_kind: target.output_type().presentable_text().to_string(),
                linkage: dep.linkage.short_text().to_string(),
            });
        }
    }
    Ok(())
}

/// Unix absolute, UNC or drive-letter path
fn is_absolute_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && matches!(bytes[2], b'/' | b'\\'))
}
