use super::TransportError;
use async_trait::async_trait;
use std::fmt::Debug;

/// A bidirectional text stream to one subscriber (e.g. a WebSocket).
///
/// Implementations must allow `send_text` and `receive_text` to run at the same time from
/// different tasks, since deliveries and the receive loop are independent.
#[async_trait]
pub trait SubscriberTransport: Debug + Send + Sync + 'static {
    /// Completes the connect handshake.
    async fn accept(&self) -> Result<(), TransportError>;

    /// Sends one outbound message.
    async fn send_text(&self, message: &str) -> Result<(), TransportError>;

    /// Waits for the next inbound message. `Ok(None)` means the peer closed the connection.
    async fn receive_text(&self) -> Result<Option<String>, TransportError>;

    /// Closes the connection. Calling it twice is harmless.
    async fn close(&self) {}
}
