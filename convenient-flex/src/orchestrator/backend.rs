//! Compiler backend abstraction
//!
//! The orchestrator hands each ready task to a [`CompilerBackend`]. Two
//! strategies exist: the persistent compiler server ([`super::BuiltInCompiler`])
//! and one external process per task ([`super::ExternalProcessCompiler`]).

use super::task::{CompilationTask, TaskKey};
use crate::model::LinkageType;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Errors returned by compiler backends
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The unit itself doesn't compile; only it and its dependents fail
    #[error("Compilation failed: {0}")]
    Compilation(String),

    /// The compiler can't run at all; the whole run is aborted
    #[error("Compiler infrastructure failure: {0}")]
    Infrastructure(String),

    #[error("Compilation cancelled")]
    Cancelled,
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Cooperative cancellation shared by the orchestrator and its backends
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        let _ = self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// Output of a dependency the task links against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOutput {
    pub key: TaskKey,
    pub linkage: LinkageType,
    pub output_path: String,
}

/// Everything a backend needs to compile one task
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub task: Arc<CompilationTask>,
    pub dependencies: Vec<DependencyOutput>,
    /// Clean build: no incremental compiler state may be reused
    pub full_rebuild: bool,
    pub cancel: CancellationToken,
}

/// Result of a successful compilation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
    pub output_path: String,
    /// Compiler messages (warnings, statistics)
    pub messages: Vec<String>,
}

#[async_trait]
pub trait CompilerBackend: Send + Sync {
    /// Strategy name shown in reports
    fn name(&self) -> &str;

    async fn compile(&self, request: CompileRequest) -> CompileResult<CompileOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancellation_token() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(token.is_cancelled());

        // Already cancelled: resolves immediately
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .unwrap();
    }
}
