//! Persistent compiler server strategy
//!
//! The server protocol lives outside this crate; embedders supply a
//! [`CompilerServer`]. [`BuiltInCompiler`] owns the single session,
//! starts it lazily for one SDK and stops it on request.

use super::backend::{CompileError, CompileOutput, CompileRequest, CompileResult, CompilerBackend};
use crate::model::Sdk;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Connection to a persistent compiler process
#[async_trait]
pub trait CompilerServer: Send + Sync {
    /// Launch the server for `sdk`; failures are infrastructure errors
    async fn start(&self, sdk: &Sdk) -> CompileResult<()>;

    async fn compile(&self, request: &CompileRequest) -> CompileResult<CompileOutput>;

    async fn stop(&self);

    /// Compilations started and not yet finished
    fn active_compilations(&self) -> usize;
}

pub struct BuiltInCompiler {
    server: Arc<dyn CompilerServer>,
    /// SDK of the running session
    session: Mutex<Option<Sdk>>,
}

impl BuiltInCompiler {
    pub fn new(server: Arc<dyn CompilerServer>) -> Self {
        Self {
            server,
            session: Mutex::new(None),
        }
    }

    /// Ensure a session for `sdk` is running, restarting one for another SDK
    pub async fn start_if_needed(&self, sdk: &Sdk) -> CompileResult<()> {
        let mut session = self.session.lock().await;
        match session.as_ref() {
            Some(running) if running == sdk => return Ok(()),
            Some(running) => {
                info!("Restarting compiler server: SDK {} replaces {}", sdk.name, running.name);
                self.server.stop().await;
                *session = None;
            }
            None => {}
        }

        info!("Starting compiler server for SDK {}", sdk.name);
        self.server.start(sdk).await?;
        *session = Some(sdk.clone());
        Ok(())
    }

    pub async fn stop_session(&self) {
        let mut session = self.session.lock().await;
        if let Some(sdk) = session.take() {
            debug!("Stopping compiler server for SDK {}", sdk.name);
            self.server.stop().await;
        }
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub fn active_compilations(&self) -> usize {
        self.server.active_compilations()
    }
}

#[async_trait]
impl CompilerBackend for BuiltInCompiler {
    fn name(&self) -> &str {
        "built-in"
    }

    async fn compile(&self, request: CompileRequest) -> CompileResult<CompileOutput> {
        if !self.is_running().await {
            return Err(CompileError::Infrastructure(
                "compiler server session not started".to_string(),
            ));
        }
        if request.cancel.is_cancelled() {
            return Err(CompileError::Cancelled);
        }

        tokio::select! {
            result = self.server.compile(&request) => result,
            () = request.cancel.cancelled() => Err(CompileError::Cancelled),
        }
    }
}
