//! Runtime orchestration and lifecycle management.
//!
//! - [`PipelineSystem`] - starts the tracking hub, owns the admission orchestrator, and shuts
//!   everything down in order.
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure.

pub mod pipeline_system;
pub mod tracing;

pub use pipeline_system::*;
pub use tracing::*;
