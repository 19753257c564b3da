use super::{
    BroadcastReport, DriverId, PositionReport, SubscriberId, SubscriberTransport, TrackingClient,
    TrackingError, TransportError,
};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, instrument, warn};

/// Why a session's receive loop stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    /// The peer closed the connection.
    PeerClosed,
    /// Reading from the transport failed.
    TransportFailed(TransportError),
    /// The hub removed the subscriber (failed delivery or shutdown).
    Evicted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub subscriber: SubscriberId,
    /// Inbound payloads relayed as broadcasts.
    pub relayed: usize,
    pub end: SessionEnd,
}

/// Receive loop of one tracking connection.
///
/// Registers the connection under `driver_id`, then relays every inbound payload as a broadcast
/// for that driver. Each report is queued for all recipients before the next payload is read,
/// which keeps reports from one sender in order, but the loop never waits for the sends
/// themselves: deliveries settle in the background. When the transport closes the subscriber is
/// disconnected before returning, so no registry entry outlives its connection.
#[instrument(skip(client, transport))]
pub async fn run_session(
    client: TrackingClient,
    driver_id: DriverId,
    transport: Arc<dyn SubscriberTransport>,
) -> Result<SessionSummary, TrackingError> {
    let handle = client.connect(&driver_id, Arc::clone(&transport)).await?;
    let mut relayed = 0;
    let mut settling = JoinSet::new();

    let end = loop {
        tokio::select! {
            biased;
            _ = handle.closed() => break SessionEnd::Evicted,
            Some(settled) = settling.join_next(), if !settling.is_empty() => log_settled(settled),
            inbound = transport.receive_text() => match inbound {
                Ok(Some(payload)) => {
                    let report = PositionReport::new(driver_id.clone(), payload);
                    let pending = client.dispatch(&report).await?;
                    settling.spawn(pending.settle());
                    relayed += 1;
                }
                Ok(None) => break SessionEnd::PeerClosed,
                Err(error) => {
                    warn!(%error, "Receive failed");
                    break SessionEnd::TransportFailed(error);
                }
            },
        }
    };

    if end != SessionEnd::Evicted {
        client.disconnect(&handle).await?;
    }
    while let Some(settled) = settling.join_next().await {
        log_settled(settled);
    }
    info!(subscriber = %handle.id(), relayed, ?end, "Session ended");
    Ok(SessionSummary {
        subscriber: handle.id(),
        relayed,
        end,
    })
}

fn log_settled(settled: Result<Result<BroadcastReport, TrackingError>, JoinError>) {
    match settled {
        Ok(Ok(report)) => debug!(
            delivered = report.delivered,
            evicted = report.evicted,
            "Report settled"
        ),
        Ok(Err(error)) => warn!(%error, "Report not settled"),
        Err(error) => warn!(%error, "Settle task failed"),
    }
}

/// Runs [`run_session`] as its own task.
pub fn spawn_session(
    client: TrackingClient,
    driver_id: impl Into<DriverId>,
    transport: Arc<dyn SubscriberTransport>,
) -> JoinHandle<Result<SessionSummary, TrackingError>> {
    tokio::spawn(run_session(client, driver_id.into(), transport))
}
