//! Plan command: the compilation tasks a build would run

use super::{ScopeArgs, load_pipeline};
use convenient_flex::{PipelineError, ValidationOptions};
use std::path::Path;

/// Returns false when validation blocks the plan
pub async fn execute(project: &Path, scope: &ScopeArgs, json: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let pipeline = load_pipeline(project, ValidationOptions::default()).await?;
    let scope = scope.to_scope(pipeline.project())?;

    let plan = match pipeline.plan(&scope) {
        Ok(plan) => plan,
        Err(PipelineError::Validation(problems)) => {
            eprintln!("❌ Cannot plan - {} configuration problem(s):", problems.len());
            for problem in &problems {
                eprintln!("  • {}", problem);
            }
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan.planned_tasks())?);
    } else {
        print!("{}", plan.format());
    }
    Ok(true)
}
