//! Per-subscriber delivery queue.
//!
//! Each registered subscriber gets a bounded queue and one task draining it. Messages reach a
//! subscriber in the order they were queued, and a slow connection only ever holds up its own
//! queue.

use super::{Delivery, SubscriberId, SubscriberTransport, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Drains `queue` into `transport`, one send at a time, each bounded by `limit`.
///
/// After the first failure the remaining queued messages fail with the same error without
/// touching the transport again. Returns once every sender of the queue is gone.
pub(crate) async fn run_outbox(
    id: SubscriberId,
    transport: Arc<dyn SubscriberTransport>,
    mut queue: mpsc::Receiver<Delivery>,
    limit: Duration,
) {
    let mut failure: Option<TransportError> = None;
    while let Some(Delivery { message, respond_to }) = queue.recv().await {
        let outcome = match &failure {
            Some(error) => Err(error.clone()),
            None => match tokio::time::timeout(limit, transport.send_text(&message)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(limit)),
            },
        };
        if let Err(error) = &outcome {
            failure.get_or_insert_with(|| error.clone());
        }
        let _ = respond_to.send(outcome);
    }
    debug!(subscriber = %id, failed = failure.is_some(), "Outbox closed");
}
