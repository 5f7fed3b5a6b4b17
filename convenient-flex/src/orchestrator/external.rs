//! One compiler process per task (`mxmlc` / `compc` from the unit's SDK)

use super::backend::{CompileError, CompileOutput, CompileRequest, CompileResult, CompilerBackend};
use crate::model::{LinkageType, OutputType};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs the SDK command line compilers.
///
/// With a launcher configured, the launcher is executed instead and gets the
/// compiler path followed by the compiler arguments.
#[derive(Debug, Clone, Default)]
pub struct ExternalProcessCompiler {
    launcher: Option<(String, Vec<String>)>,
}

impl ExternalProcessCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_launcher(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            launcher: Some((program.into(), args)),
        }
    }

    /// Compiler executable for a request
    pub fn compiler_path(request: &CompileRequest) -> CompileResult<String> {
        let task = &request.task;
        let sdk = task
            .sdk()
            .ok_or_else(|| CompileError::Compilation(format!("Flex SDK not set for {}", task.key)))?;

        let tool = match task.unit.output_type() {
            OutputType::Library => "compc",
            OutputType::Application | OutputType::RuntimeLoadedModule => "mxmlc",
        };
        Ok(format!("{}/bin/{}", sdk.home.trim_end_matches('/'), tool))
    }

    /// Compiler arguments for a request
    pub fn compiler_arguments(request: &CompileRequest) -> Vec<String> {
        let unit = &request.task.unit;
        let mut args = vec![format!("-output={}", request.task.output_path)];

        if !unit.compiler_options.additional_config_file.is_empty() {
            args.push(format!("-load-config+={}", unit.compiler_options.additional_config_file));
        }

        for dep in &request.dependencies {
            let option = match dep.linkage {
                LinkageType::External | LinkageType::Rsl => "external-library-path",
                LinkageType::Include => "include-libraries",
                _ => "library-path",
            };
            args.push(format!("-{}+={}", option, dep.output_path));
        }

        if !request.full_rebuild {
            args.push("-incremental=true".to_string());
        }

        args.extend(
            unit.compiler_options
                .additional_options
                .split_whitespace()
                .map(str::to_string),
        );

        if unit.nature.is_lib() {
            for file in &unit.compiler_options.files_to_include_in_swc {
                args.push(format!("-include-file+={}", file));
            }
        } else if !unit.main_class.is_empty() {
            args.push("--".to_string());
            args.push(unit.main_class.clone());
        }

        args
    }
}

#[async_trait]
impl CompilerBackend for ExternalProcessCompiler {
    fn name(&self) -> &str {
        "external-process"
    }

    async fn compile(&self, request: CompileRequest) -> CompileResult<CompileOutput> {
        let compiler = Self::compiler_path(&request)?;
        let args = Self::compiler_arguments(&request);

        let mut command = match &self.launcher {
            Some((program, launcher_args)) => {
                let mut command = Command::new(program);
                let _ = command.args(launcher_args).arg(&compiler);
                command
            }
            None => Command::new(&compiler),
        };
        let _ = command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running {} {}", compiler, args.join(" "));
        let child = command.spawn().map_err(|e| {
            CompileError::Infrastructure(format!("Failed to start {}: {}", compiler, e))
        })?;

        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|e| {
                CompileError::Infrastructure(format!("Failed to wait for {}: {}", compiler, e))
            })?,
            () = request.cancel.cancelled() => {
                warn!("Killing compiler for {}", request.task.key);
                return Err(CompileError::Cancelled);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let message = if stderr.trim().is_empty() {
                format!("{} exited with {}", compiler, output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(CompileError::Compilation(message));
        }

        Ok(CompileOutput {
            output_path: request.task.output_path.clone(),
            messages: stdout
                .lines()
                .chain(stderr.lines())
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildUnit, Nature, Sdk, TargetPlatform};
    use crate::orchestrator::backend::{CancellationToken, DependencyOutput};
    use crate::orchestrator::task::{CompilationTask, TaskKey};
    use std::sync::Arc;

    fn request(output_type: OutputType) -> CompileRequest {
        let mut unit = BuildUnit::new("App", Nature::new(TargetPlatform::Web, output_type));
        unit.sdk = Some(Sdk {
            name: "4.6".to_string(),
            home: "/sdk/flex/".to_string(),
            version: String::new(),
        });
        unit.main_class = "com.example.Main".to_string();
        unit.compiler_options.additional_options = "-locale=en_US -debug=false".to_string();

        CompileRequest {
            task: Arc::new(CompilationTask {
                key: TaskKey::unit("A", "App"),
                unit: Arc::new(unit),
                output_path: "/out/app.swf".to_string(),
                dependencies: Vec::new(),
            }),
            dependencies: vec![
                DependencyOutput {
                    key: TaskKey::unit("B", "Lib"),
                    linkage: LinkageType::Merged,
                    output_path: "/out/lib.swc".to_string(),
                },
                DependencyOutput {
                    key: TaskKey::unit("C", "Rsl"),
                    linkage: LinkageType::Rsl,
                    output_path: "/out/rsl.swc".to_string(),
                },
            ],
            full_rebuild: true,
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn test_compiler_selection() {
        assert_eq!(
            ExternalProcessCompiler::compiler_path(&request(OutputType::Application)).unwrap(),
            "/sdk/flex/bin/mxmlc"
        );
        assert_eq!(
            ExternalProcessCompiler::compiler_path(&request(OutputType::RuntimeLoadedModule)).unwrap(),
            "/sdk/flex/bin/mxmlc"
        );
        assert_eq!(
            ExternalProcessCompiler::compiler_path(&request(OutputType::Library)).unwrap(),
            "/sdk/flex/bin/compc"
        );
    }

    #[test]
    fn test_compiler_arguments() {
        let args = ExternalProcessCompiler::compiler_arguments(&request(OutputType::Application));
        assert_eq!(
            args,
            vec![
                "-output=/out/app.swf",
                "-library-path+=/out/lib.swc",
                "-external-library-path+=/out/rsl.swc",
                "-locale=en_US",
                "-debug=false",
                "--",
                "com.example.Main",
            ]
        );
    }
}
