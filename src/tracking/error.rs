//! Error types for live tracking.

use std::time::Duration;
use thiserror::Error;

/// Failure of one subscriber connection.
///
/// Never surfaces to a broadcaster: the failing subscriber is evicted instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The peer refused or aborted the connect handshake.
    #[error("Handshake refused: {0}")]
    HandshakeRefused(String),

    /// The connection is already closed.
    #[error("Connection closed")]
    Closed,

    /// A send did not complete within the configured timeout.
    #[error("Send timed out after {0:?}")]
    Timeout(Duration),

    /// The subscriber's outbound queue is full.
    #[error("Outbound queue full")]
    Backlogged,

    /// Any other I/O failure reported by the transport.
    #[error("Transport I/O error: {0}")]
    Io(String),
}

/// Errors returned by [`TrackingClient`](super::TrackingClient) operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrackingError {
    /// The hub task has stopped and no longer accepts requests.
    #[error("Tracking hub closed")]
    HubClosed,

    /// The hub dropped the reply channel before answering.
    #[error("Tracking hub dropped response channel")]
    HubDropped,

    /// The subscriber's handshake failed, so it was never registered.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
