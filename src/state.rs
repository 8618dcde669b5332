use crate::artifacts::VerifiedArtifacts;
use crate::config::ServerConfig;
use crate::dev::DevServer;
use crate::mode::ServerMode;
use std::sync::Arc;
use tokio::sync::watch;

/// What answers non-API requests. Chosen once at startup.
#[derive(Clone)]
pub enum Pipeline {
    /// Serve the verified output root.
    Production(VerifiedArtifacts),
    /// Hand requests to the live dev server.
    Development(Arc<dyn DevServer>),
}

impl Pipeline {
    pub fn mode(&self) -> ServerMode {
        match self {
            Pipeline::Production(_) => ServerMode::Production,
            Pipeline::Development(_) => ServerMode::Development,
        }
    }
}

/// Shared application state. Built once, read-only afterward.
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    pub pipeline: Pipeline,

    /// Fired by the error boundary when fail-fast is enabled
    pub shutdown: ShutdownTrigger,
}

impl ServerState {
    pub fn new(config: ServerConfig, pipeline: Pipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            shutdown: ShutdownTrigger::default(),
        }
    }

    pub fn mode(&self) -> ServerMode {
        self.pipeline.mode()
    }
}

/// One-shot signal asking the server to stop because a request failed.
#[derive(Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownTrigger {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`ShutdownTrigger::trigger`] has been called.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|fired| *fired).await;
    }
}
