use crate::admission::{AdmissionDecision, AdmissionOrchestrator};
use crate::config::{ConfigError, PipelineConfig};
use crate::routing::RouteRequest;
use crate::tracking::{
    spawn_session, DriverId, SessionSummary, SubscriberTransport, TrackingClient, TrackingError,
    TrackingHub,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Errors raised while running or stopping the system.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    /// A background task panicked or was cancelled.
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

/// The running donation pipeline.
///
/// `PipelineSystem` is responsible for:
/// - **Lifecycle Management**: Starting the tracking hub and stopping it together with every
///   open session
/// - **Admission**: Running submissions on the blocking pool so image scoring and routing never
///   stall the async runtime
/// - **Session Management**: Spawning one receive loop per tracking connection
///
/// # Example
///
/// ```ignore
/// let mut system = PipelineSystem::new(PipelineConfig::default())?;
///
/// let decision = system.submit(photo_bytes, request).await?;
/// system.open_session("D1", transport);
///
/// system.shutdown().await?;
/// ```
pub struct PipelineSystem {
    orchestrator: Arc<AdmissionOrchestrator>,

    /// Client for the tracking hub
    tracking: TrackingClient,

    /// Hub task handle (used for graceful shutdown)
    hub: JoinHandle<()>,

    /// Open session tasks
    sessions: Vec<JoinHandle<Result<SessionSummary, TrackingError>>>,
}

impl PipelineSystem {
    /// Validates `config`, then starts the tracking hub.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let orchestrator = Arc::new(AdmissionOrchestrator::from_config(&config));

        let (hub, tracking) = TrackingHub::new(config.tracking);
        let hub = tokio::spawn(hub.run());
        info!("Pipeline started");

        Ok(Self {
            orchestrator,
            tracking,
            hub,
            sessions: Vec::new(),
        })
    }

    pub fn orchestrator(&self) -> &AdmissionOrchestrator {
        &self.orchestrator
    }

    pub fn tracking(&self) -> &TrackingClient {
        &self.tracking
    }

    /// Admits one donation on the blocking pool.
    pub async fn submit(
        &self,
        image_bytes: Vec<u8>,
        request: RouteRequest,
    ) -> Result<AdmissionDecision, SystemError> {
        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::task::spawn_blocking(move || orchestrator.admit(&image_bytes, &request))
            .await
            .map_err(|e| SystemError::TaskFailed(e.to_string()))
    }

    /// Spawns the receive loop for a new tracking connection.
    pub fn open_session(
        &mut self,
        driver_id: impl Into<DriverId>,
        transport: Arc<dyn SubscriberTransport>,
    ) {
        self.sessions.retain(|session| !session.is_finished());
        self.sessions.push(spawn_session(self.tracking.clone(), driver_id, transport));
    }

    /// Gracefully shuts down the entire system.
    ///
    /// 1. Asks the hub to close every subscriber and stop; sessions observe the closure and end
    /// 2. Waits for all session tasks
    /// 3. Waits for the hub task
    ///
    /// Returns the summaries of the sessions that ended cleanly.
    pub async fn shutdown(self) -> Result<Vec<SessionSummary>, SystemError> {
        info!("Shutting down pipeline...");

        let closed = self.tracking.shutdown().await?;
        info!(closed, "Subscribers closed");

        let mut summaries = Vec::with_capacity(self.sessions.len());
        for session in self.sessions {
            match session.await {
                Ok(Ok(summary)) => summaries.push(summary),
                Ok(Err(e)) => warn!(error = %e, "Session ended with error"),
                Err(e) => {
                    error!("Session task failed: {:?}", e);
                    return Err(SystemError::TaskFailed(e.to_string()));
                }
            }
        }

        if let Err(e) = self.hub.await {
            error!("Hub task failed: {:?}", e);
            return Err(SystemError::TaskFailed(e.to_string()));
        }

        info!("Pipeline shutdown complete.");
        Ok(summaries)
    }
}
