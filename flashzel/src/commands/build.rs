//! Build command: validate, plan and compile a scope
//!
//! Ctrl-C cancels the run; running compiler processes are killed and
//! not yet started units are reported as cancelled.

use super::{ScopeArgs, load_pipeline};
use convenient_flex::{CancellationToken, CompilationOrchestrator, OrchestratorConfig, PipelineError, ValidationOptions};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

pub struct BuildOptions {
    pub jobs: Option<usize>,
    pub rebuild: bool,
    pub json: bool,
}

/// Returns false when validation blocks the build or a unit fails
pub async fn execute(
    project: &Path,
    scope: &ScopeArgs,
    options: BuildOptions,
) -> Result<bool, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let pipeline = load_pipeline(project, ValidationOptions::default()).await?;
    let scope = scope.to_scope(pipeline.project())?;

    let plan = match pipeline.plan(&scope) {
        Ok(plan) => plan,
        Err(PipelineError::Validation(problems)) => {
            eprintln!("❌ Build aborted - {} configuration problem(s):", problems.len());
            for problem in &problems {
                eprintln!("  • {}", problem);
            }
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    let mut config = OrchestratorConfig::from(&pipeline.project().settings.compiler);
    if let Some(jobs) = options.jobs {
        config.max_parallel = jobs;
    }
    config.make = !options.rebuild;

    if !options.json {
        println!("🔨 Compiling {} task(s), up to {} in parallel", plan.len(), config.max_parallel);
    }

    let orchestrator = CompilationOrchestrator::new(config);
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling build");
                cancel.cancel();
            }
        })
    };

    let report = pipeline.build(plan, &orchestrator, cancel).await;
    interrupt.abort();
    orchestrator.stop_session().await;

    if options.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.format());
        if report.success() {
            println!("\n✅ Build succeeded in {:.2}s", start.elapsed().as_secs_f64());
        } else {
            println!("\n❌ Build failed");
        }
    }

    info!("Build finished in {:?}", start.elapsed());
    Ok(report.success())
}
