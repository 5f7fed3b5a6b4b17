//! End-to-end pipeline scenarios on a YAML project and an in-memory file system

use convenient_flex::*;
use std::sync::Arc;

const PROJECT: &str = r#"
name: scenario
modules:
  - name: ModuleA
    source_roots: [/work/a/src]
    build_units:
      - name: Release
        nature: { target_platform: web, output_type: application }
        main_class: Main
        output_file_name: a.swf
        output_folder: /out
        css_files_to_compile: [/work/a/src/theme/app.css]
        sdk: { name: Flex 4.6, home: /sdk/flex }
        dependencies:
          - kind: build_unit
            module: ModuleB
            unit: Lib
            linkage: merged
          - kind: library
            name: framework
  - name: ModuleB
    source_roots: [/work/b/src]
    build_units:
      - name: Lib
        nature: { target_platform: web, output_type: library }
        output_file_name: b.swf
        output_folder: /out
        sdk: { name: Flex 4.6, home: /sdk/flex }
      - name: Skipped
        nature: { output_type: library }
        skip_compile: true
run_configurations:
  - name: Run A
    module: ModuleA
    unit: Release
"#;

fn fs() -> Arc<MemoryFileSystem> {
    Arc::new(
        MemoryFileSystem::new()
            .with_source_root("/work/a/src")
            .with_source_root("/work/b/src")
            .with_file("/work/a/src/theme/app.css", "Button { color: red; }"),
    )
}

fn pipeline() -> BuildPipeline {
    let project = Project::from_yaml_str(PROJECT).unwrap();
    BuildPipeline::new(project, fs())
}

fn keys(set: &ResolvedSet) -> Vec<String> {
    set.keys().map(|key| key.to_string()).collect()
}

#[test]
fn test_app_scope_pulls_in_library_and_flags_its_extension() {
    let pipeline = pipeline();
    let scope = CompileScope::Units(vec!["ModuleA/Release".parse().unwrap()]);

    let report = pipeline.validate(&scope).unwrap();
    assert_eq!(keys(&report.units), vec!["ModuleA/Release", "ModuleB/Lib"]);

    let messages: Vec<String> = report.problems.iter().map(|p| p.to_string()).collect();
    assert_eq!(messages, vec!["ModuleB/Lib: Output file must have .swc extension"]);
    assert_eq!(report.problems[0].problem.location, FieldLocator::OutputFileName);

    match pipeline.plan(&scope) {
        Err(PipelineError::Validation(problems)) => assert_eq!(problems.len(), 1),
        other => panic!("expected validation failure, got {:?}", other.map(|p| p.len())),
    }
}

#[test]
fn test_runtime_dependency_is_not_expanded() {
    let yaml = PROJECT.replace("linkage: merged", "linkage: load_in_runtime");
    let pipeline = BuildPipeline::new(Project::from_yaml_str(&yaml).unwrap(), fs());

    let app_only = pipeline
        .resolve(&CompileScope::Units(vec![UnitKey::new("ModuleA", "Release")]))
        .unwrap();
    assert_eq!(keys(&app_only), vec!["ModuleA/Release"]);

    // Still compiled when requested on its own
    let both = pipeline
        .resolve(&CompileScope::Units(vec![
            UnitKey::new("ModuleA", "Release"),
            UnitKey::new("ModuleB", "Lib"),
        ]))
        .unwrap();
    assert_eq!(keys(&both), vec!["ModuleA/Release", "ModuleB/Lib"]);
}

#[test]
fn test_dangling_dependency_aborts_before_validation() {
    let yaml = PROJECT.replace("unit: Lib\n            linkage", "unit: Missing\n            linkage");
    let pipeline = BuildPipeline::new(Project::from_yaml_str(&yaml).unwrap(), fs());

    let error = pipeline
        .plan(&CompileScope::Modules(vec!["ModuleA".to_string()]))
        .unwrap_err();
    assert!(matches!(
        error,
        PipelineError::Configuration(ConfigurationError::MissingDependency { .. })
    ));

    let error = pipeline
        .plan(&CompileScope::Units(vec![UnitKey::new("ModuleA", "Release")]))
        .unwrap_err();
    match error {
        PipelineError::Configuration(ConfigurationError::MissingDependency {
            dependency_unit,
            dependency_module,
            owner_unit,
            owner_module,
        }) => {
            assert_eq!(dependency_unit, "Missing");
            assert_eq!(dependency_module, "ModuleB");
            assert_eq!(owner_unit, "Release");
            assert_eq!(owner_module, "ModuleA");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_resolution_is_idempotent_and_closed() {
    let pipeline = pipeline();
    let scope = CompileScope::RunConfiguration(Arc::new(BcRunConfiguration::new("Run A", "ModuleA", "Release")));

    let first = pipeline.resolve(&scope).unwrap();
    let second = pipeline.resolve(&scope).unwrap();
    assert_eq!(first, second);

    for resolved in first.iter() {
        for (dep, _) in build_dependencies(pipeline.project(), &resolved.unit) {
            assert!(first.contains(&dep), "{} missing from resolved set", dep);
        }
    }
}

#[test]
fn test_clean_scope_plans_stylesheet_task() {
    let yaml = PROJECT.replace("output_file_name: b.swf", "output_file_name: b.swc");
    let pipeline = BuildPipeline::new(Project::from_yaml_str(&yaml).unwrap(), fs());

    let plan = pipeline
        .plan(&CompileScope::Units(vec![UnitKey::new("ModuleA", "Release")]))
        .unwrap();

    let planned = plan.planned_tasks();
    let summary: Vec<(&str, &str)> = planned
        .iter()
        .map(|task| (task.key.as_str(), task.output_path.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("ModuleA/Release", "/out/a.swf"),
            ("ModuleA/Release [/work/a/src/theme/app.css]", "/out/theme/app.swf"),
            ("ModuleB/Lib", "/out/b.swc"),
        ]
    );
    assert_eq!(planned[0].dependencies, vec!["ModuleB/Lib"]);
    assert_eq!(planned[1].dependencies, vec!["ModuleB/Lib"]);

    // The explicitly requested unit is compiled with a decided debug flag
    let app = &plan.tasks[0];
    assert_eq!(app.unit.compiler_options.additional_options, "-debug=false");
    assert_eq!(plan.tasks[2].unit.compiler_options.additional_options, "");

    // Only the application copies resources; the stylesheet task never does
    assert_eq!(plan.resources.units("ModuleA"), ["Release".to_string()]);
    assert!(plan.resources.units("ModuleB").is_empty());
    for scope in &plan.resources.scopes {
        assert_eq!(scope.modules, vec!["ModuleA", "ModuleB"]);
    }
    assert!(plan.format().contains("  • ModuleA: Release"));
}

#[test]
fn test_module_scope_pulls_in_dependency_modules() {
    let pipeline = BuildPipeline::new(Project::from_yaml_str(PROJECT).unwrap(), fs());

    let set = pipeline
        .resolve(&CompileScope::Modules(vec!["ModuleA".to_string()]))
        .unwrap();
    assert_eq!(keys(&set), vec!["ModuleA/Release", "ModuleB/Lib"]);
    for resolved in set.iter() {
        for (dep, _) in build_dependencies(pipeline.project(), &resolved.unit) {
            assert!(set.contains(&dep), "{} missing from resolved set", dep);
        }
    }
}

#[test]
fn test_shared_output_paths_conflict() {
    let yaml = PROJECT
        .replace("output_file_name: b.swf", "output_file_name: A.SWF")
        .replace("output_type: library }\n        output_file_name", "output_type: application }\n        main_class: Lib\n        output_file_name");
    let project = Project::from_yaml_str(&yaml).unwrap();

    let insensitive = BuildPipeline::new(
        project.clone(),
        Arc::new(
            MemoryFileSystem::new()
                .with_file("/work/a/src/theme/app.css", "")
                .case_insensitive(),
        ),
    );
    let scope = CompileScope::Modules(vec!["ModuleA".to_string(), "ModuleB".to_string()]);
    let report = insensitive.validate(&scope).unwrap();
    let conflicts: Vec<String> = report.problems.iter().map(|p| p.to_string()).collect();
    assert_eq!(
        conflicts,
        vec!["ModuleB/Lib: Build configuration 'Release' of module 'ModuleA' has the same output file: /out/A.SWF"]
    );

    let sensitive = BuildPipeline::new(project, fs());
    assert!(sensitive.validate(&scope).unwrap().is_clean());
}

#[test]
fn test_demo_project_run_configuration() {
    let project = Project::from_yaml_str(include_str!("../../demos/flashzel.yaml")).unwrap();
    assert_eq!(project.settings.packaging.android_package_type, AndroidPackageType::DebugOverUsb);

    let run = project.find_run_configuration("Shop on phone").unwrap().clone();
    assert_eq!(run.mobile_run_target, Some(MobileRunTarget::AndroidDevice));

    let pipeline = BuildPipeline::new(project, Arc::new(MemoryFileSystem::new()));
    let report = pipeline.validate(&CompileScope::RunConfiguration(Arc::new(run))).unwrap();
    assert_eq!(keys(&report.units), vec!["Core/Lib", "Shop/Phone"]);

    // Only the missing library include is a problem; packaging is valid
    let messages: Vec<String> = report.problems.iter().map(|p| p.to_string()).collect();
    assert_eq!(
        messages,
        vec!["Core/Lib: File to include in SWC not found: /work/shop/core/assets/config.xml"]
    );

    let phone_options = |report: &ValidationReport| {
        report
            .tasks
            .iter()
            .find(|task| task.key == TaskKey::unit("Shop", "Phone"))
            .map(|task| task.unit.compiler_options.additional_options.clone())
            .unwrap()
    };
    // Run configurations compile the unit as configured
    assert_eq!(phone_options(&report), "");

    // Requested explicitly, Android debug-over-USB packaging decides the debug flag
    let explicit = pipeline
        .validate(&CompileScope::Units(vec![UnitKey::new("Shop", "Phone")]))
        .unwrap();
    assert_eq!(phone_options(&explicit), "-debug=true");
}
