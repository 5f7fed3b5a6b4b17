//! Additional compiler configuration files
//!
//! A unit may point at a Flex config XML that the compiler merges into its
//! generated configuration. Two things in it matter before compilation: the
//! main class (last `file-specs/path-element`) and the output path.

use crate::fs::{FileSystem, parent_path, relative_path};
use crate::model::BuildUnit;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Default, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename = "flex-config")]
struct FlexConfig {
    #[serde(rename = "file-specs")]
    file_specs: Option<FileSpecs>,
    output: Option<String>,
}

#[derive(Default, Debug, Serialize, Deserialize, PartialEq)]
struct FileSpecs {
    #[serde(rename = "path-element", default)]
    path_element: Vec<String>,
}

/// What an additional config file declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFileInfo {
    /// Path of the main source file, if declared
    pub main_class_path: Option<String>,
    pub output_file_name: Option<String>,
    pub output_folder: Option<String>,
}

impl ConfigFileInfo {
    pub fn parse(xml: &str) -> Result<Self, quick_xml::DeError> {
        let config: FlexConfig = quick_xml::de::from_str(xml)?;

        let main_class_path = config
            .file_specs
            .and_then(|specs| specs.path_element.into_iter().last())
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty());

        let (output_folder, output_file_name) = match config.output.as_deref().map(str::trim) {
            Some(output) if !output.is_empty() => {
                let name = Path::new(output)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                (parent_path(output).filter(|p| !p.is_empty()), name)
            }
            _ => (None, None),
        };

        Ok(Self {
            main_class_path,
            output_file_name,
            output_folder,
        })
    }

    /// Read and parse a config file; unreadable or malformed files count as empty.
    pub fn read(path: &str, fs: &dyn FileSystem) -> Self {
        let content = match fs.read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Cannot read config file {}: {}", path, e);
                return Self::default();
            }
        };

        Self::parse(&content).unwrap_or_else(|e| {
            debug!("Cannot parse config file {}: {}", path, e);
            Self::default()
        })
    }

    /// Config info for a unit: empty for temporary units and units without a config file
    pub fn for_unit(unit: &BuildUnit, fs: &dyn FileSystem) -> Self {
        let path = &unit.compiler_options.additional_config_file;
        if unit.temp_for_compilation || path.is_empty() || !fs.is_file(path) {
            return Self::default();
        }
        Self::read(path, fs)
    }

    /// Fully qualified main class, relative to the source root of the declared file
    pub fn main_class(&self, fs: &dyn FileSystem) -> Option<String> {
        let path = self.main_class_path.as_deref()?;
        let without_ext = Path::new(path).with_extension("");
        let without_ext = without_ext.to_string_lossy();

        let qualified = fs
            .find_source_root(path)
            .and_then(|root| relative_path(&without_ext, &root))
            .filter(|rel| !rel.is_empty())
            .map(|rel| rel.replace('/', "."));

        qualified.or_else(|| {
            Path::new(path)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
    }

    /// Whether the file fixes the output path, overriding the unit's own fields
    pub fn declares_output(&self) -> bool {
        self.output_file_name.is_some() || self.output_folder.is_some()
    }
}

/// Output path of a unit, honouring an `output` declared in its config file
pub fn actual_output_file_path(unit: &BuildUnit, fs: &dyn FileSystem) -> String {
    let info = ConfigFileInfo::for_unit(unit, fs);
    if !info.declares_output() {
        return unit.output_file_path();
    }

    let name = info
        .output_file_name
        .unwrap_or_else(|| unit.output_file_name.clone());
    match info.output_folder {
        Some(folder) => format!("{}/{}", folder.trim_end_matches('/'), name),
        None => {
            let mut copy = unit.clone();
            copy.output_file_name = name;
            copy.output_file_path()
        }
    }
}
