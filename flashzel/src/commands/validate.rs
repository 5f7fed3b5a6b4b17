//! Validate command: every configuration problem of a scope

use super::{ScopeArgs, load_pipeline};
use convenient_flex::ValidationOptions;
use std::path::Path;

/// Returns false when problems were found
pub async fn execute(
    project: &Path,
    scope: &ScopeArgs,
    options: ValidationOptions,
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let pipeline = load_pipeline(project, options).await?;
    let scope = scope.to_scope(pipeline.project())?;
    let report = pipeline.validate(&scope)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.problems)?);
    } else {
        print!("{}", report.format());
        if report.is_clean() {
            println!("\n✅ No problems found");
        } else {
            println!("\n❌ {} problem(s) found", report.problems.len());
        }
    }

    Ok(report.is_clean())
}
