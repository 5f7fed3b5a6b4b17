//! Runtime stylesheet units
//!
//! Each runtime stylesheet of an application compiles into its own .swf
//! through a temporary copy of the owning unit.

use crate::config_file::actual_output_file_path;
use crate::fs::{FileSystem, parent_path, relative_path};
use crate::model::{BuildUnit, ResourceFilesMode};
use std::path::Path;
use tracing::debug;

/// Temporary units compiling the existing runtime stylesheets of `unit`.
///
/// Temporary units never derive, so derivation is at most one level deep.
pub fn derive_stylesheet_units(unit: &BuildUnit, fs: &dyn FileSystem) -> Vec<BuildUnit> {
    if unit.temp_for_compilation || !unit.can_have_runtime_stylesheets() {
        return Vec::new();
    }

    let mut derived = Vec::new();
    for css in &unit.css_files_to_compile {
        if !fs.exists(css) {
            continue;
        }

        let stem = Path::new(css)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut css_unit = unit.temporary_copy_for_compilation();
        css_unit.main_class = css.clone();
        css_unit.output_file_name = format!("{}.swf", stem);
        css_unit.css_files_to_compile.clear();
        css_unit.compiler_options.resource_files_mode = ResourceFilesMode::None;

        let relative = fs.find_source_root(css).and_then(|root| {
            parent_path(css).and_then(|dir| relative_path(&dir, &root))
        });
        if let Some(relative) = relative.filter(|rel| !rel.is_empty()) {
            let folder = parent_path(&actual_output_file_path(unit, fs)).unwrap_or_default();
            css_unit.output_folder = format!("{}/{}", folder, relative);
        }

        debug!(
            "Runtime stylesheet {} of {} compiles to {}",
            css,
            unit.name,
            css_unit.output_file_path()
        );
        derived.push(css_unit);
    }
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::model::{Nature, OutputType, TargetPlatform};

    fn app_with_css(css: &[&str]) -> BuildUnit {
        let mut unit = BuildUnit::new("App", Nature::new(TargetPlatform::Web, OutputType::Application));
        unit.main_class = "Main".to_string();
        unit.output_file_name = "app.swf".to_string();
        unit.output_folder = "/out".to_string();
        unit.css_files_to_compile = css.iter().map(|s| s.to_string()).collect();
        unit
    }

    #[test]
    fn test_derived_unit_preserves_source_layout() {
        let fs = MemoryFileSystem::new()
            .with_source_root("/work/src")
            .with_file("/work/src/theme/app.css", "");
        let parent = app_with_css(&["/work/src/theme/app.css"]);

        let derived = derive_stylesheet_units(&parent, &fs);
        assert_eq!(derived.len(), 1);

        let css = &derived[0];
        assert_eq!(css.main_class, "/work/src/theme/app.css");
        assert_eq!(css.output_file_name, "app.swf");
        assert_eq!(css.output_folder, "/out/theme");
        assert!(css.css_files_to_compile.is_empty());
        assert_eq!(css.compiler_options.resource_files_mode, ResourceFilesMode::None);
        assert!(css.temp_for_compilation);
        assert_eq!(css.dependencies, parent.dependencies);
    }

    #[test]
    fn test_stylesheet_at_root_or_outside_roots_keeps_parent_folder() {
        let fs = MemoryFileSystem::new()
            .with_source_root("/work/src")
            .with_file("/work/src/top.css", "")
            .with_file("/elsewhere/skin.css", "");
        let parent = app_with_css(&["/work/src/top.css", "/elsewhere/skin.css", "/work/src/missing.css"]);

        let derived = derive_stylesheet_units(&parent, &fs);
        assert_eq!(derived.len(), 2);
        assert!(derived.iter().all(|unit| unit.output_folder == "/out"));
        assert_eq!(derived[1].output_file_name, "skin.swf");
    }

    #[test]
    fn test_no_derivation_from_temporary_or_library_units() {
        let fs = MemoryFileSystem::new().with_file("/work/src/a.css", "");
        let parent = app_with_css(&["/work/src/a.css"]);

        let derived = derive_stylesheet_units(&parent, &fs);
        assert!(derive_stylesheet_units(&derived[0], &fs).is_empty());
        assert!(derive_stylesheet_units(&parent.temporary_copy_for_compilation(), &fs).is_empty());

        let mut lib = parent.clone();
        lib.nature.output_type = OutputType::Library;
        assert!(derive_stylesheet_units(&lib, &fs).is_empty());
    }
}
