use super::{
    BroadcastReport, Delivery, HubRequest, PositionReport, Recipient, Response, SubscriberId,
    SubscriberState, SubscriberTransport, SubscriptionHandle, TrackingError, TransportError,
};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

/// Cloneable handle for talking to a [`TrackingHub`](super::TrackingHub).
///
/// All registry changes are sent to the hub as messages. Messages to subscribers go straight
/// into each subscriber's own queue.
#[derive(Debug, Clone)]
pub struct TrackingClient {
    sender: mpsc::Sender<HubRequest>,
}

impl TrackingClient {
    pub(crate) fn new(sender: mpsc::Sender<HubRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> HubRequest,
    ) -> Result<T, TrackingError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| TrackingError::HubClosed)?;
        response.await.map_err(|_| TrackingError::HubDropped)
    }

    /// Performs the handshake on `transport` and, only if it succeeds, registers it under
    /// `driver_id`.
    #[instrument(skip(self, transport))]
    pub async fn connect(
        &self,
        driver_id: &str,
        transport: Arc<dyn SubscriberTransport>,
    ) -> Result<SubscriptionHandle, TrackingError> {
        let (state, state_rx) = watch::channel(SubscriberState::Connecting);
        if let Err(error) = transport.accept().await {
            state.send_replace(SubscriberState::Closed);
            warn!(%error, "Handshake failed");
            return Err(error.into());
        }

        let id = self
            .request(|respond_to| HubRequest::Register {
                driver_id: driver_id.to_string(),
                transport,
                state,
                respond_to,
            })
            .await?;
        debug!(subscriber = %id, "Connected");
        Ok(SubscriptionHandle::new(id, driver_id.to_string(), state_rx))
    }

    /// Unregisters the subscriber and closes its transport.
    ///
    /// Returns `false` when it was already closed; calling this twice is harmless.
    #[instrument(skip(self, handle), fields(subscriber = %handle.id()))]
    pub async fn disconnect(&self, handle: &SubscriptionHandle) -> Result<bool, TrackingError> {
        self.remove(handle.id()).await
    }

    async fn remove(&self, id: SubscriberId) -> Result<bool, TrackingError> {
        let transport = self.request(|respond_to| HubRequest::Remove { id, respond_to }).await?;
        match transport {
            Some(transport) => {
                transport.close().await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Sends `"Driver {driver_id} is at: {payload}"` to every subscriber of `driver_id`.
    ///
    /// Failing subscribers are evicted; they never turn into an error here. The only errors are
    /// hub communication failures.
    pub async fn broadcast(
        &self,
        driver_id: &str,
        payload: &str,
    ) -> Result<BroadcastReport, TrackingError> {
        self.publish(&PositionReport::new(driver_id, payload)).await
    }

    /// Queues one report for its recipients and waits until every delivery has settled.
    pub async fn publish(&self, report: &PositionReport) -> Result<BroadcastReport, TrackingError> {
        self.dispatch(report).await?.settle().await
    }

    /// Queues one report for its recipients without waiting for the sends.
    ///
    /// Reports queued one after another reach each subscriber in that order. A subscriber whose
    /// queue is full or already closed gets an immediate failure, settled like any other.
    #[instrument(skip(self, report), fields(driver_id = %report.driver_id))]
    pub async fn dispatch(
        &self,
        report: &PositionReport,
    ) -> Result<PendingBroadcast, TrackingError> {
        let recipients = self
            .request(|respond_to| HubRequest::Recipients {
                driver_id: report.driver_id.clone(),
                respond_to,
            })
            .await?;
        if recipients.is_empty() {
            debug!("No subscribers");
        }

        let message: Arc<str> = Arc::from(report.render());
        let mut outcomes = Vec::with_capacity(recipients.len());
        for Recipient { id, outbox } in recipients {
            let (respond_to, outcome) = oneshot::channel();
            let delivery = Delivery {
                message: Arc::clone(&message),
                respond_to,
            };
            if let Err(refused) = outbox.try_send(delivery) {
                let (error, delivery) = match refused {
                    TrySendError::Full(delivery) => (TransportError::Backlogged, delivery),
                    TrySendError::Closed(delivery) => (TransportError::Closed, delivery),
                };
                let _ = delivery.respond_to.send(Err(error));
            }
            outcomes.push((id, outcome));
        }

        Ok(PendingBroadcast {
            client: self.clone(),
            outcomes,
        })
    }

    pub async fn subscriber_count(&self, driver_id: &str) -> Result<usize, TrackingError> {
        self.request(|respond_to| HubRequest::Count {
            driver_id: Some(driver_id.to_string()),
            respond_to,
        })
        .await
    }

    pub async fn total_subscribers(&self) -> Result<usize, TrackingError> {
        self.request(|respond_to| HubRequest::Count { driver_id: None, respond_to }).await
    }

    /// Closes every subscriber and stops the hub. Returns the number of subscribers closed.
    pub async fn shutdown(&self) -> Result<usize, TrackingError> {
        self.request(|respond_to| HubRequest::Shutdown { respond_to }).await
    }
}

/// A report queued for its recipients whose sends may still be in flight.
#[derive(Debug)]
#[must_use = "settle the broadcast to evict failed subscribers"]
pub struct PendingBroadcast {
    client: TrackingClient,
    outcomes: Vec<(SubscriberId, oneshot::Receiver<Result<(), TransportError>>)>,
}

impl PendingBroadcast {
    /// Number of subscribers the report was queued for.
    pub fn recipients(&self) -> usize {
        self.outcomes.len()
    }

    /// Waits for every delivery and evicts the subscribers whose send failed.
    ///
    /// A subscriber only counts as evicted when this call removed it. One that was disconnected
    /// while its send was in flight is neither delivered nor evicted.
    pub async fn settle(self) -> Result<BroadcastReport, TrackingError> {
        let mut summary = BroadcastReport::default();
        for (id, outcome) in self.outcomes {
            let error = match outcome.await {
                Ok(Ok(())) => {
                    summary.delivered += 1;
                    continue;
                }
                Ok(Err(error)) => error,
                // The queue went away with the subscriber.
                Err(_) => TransportError::Closed,
            };
            match self.client.remove(id).await {
                Ok(true) => {
                    warn!(subscriber = %id, %error, "Delivery failed, evicted");
                    summary.evicted += 1;
                }
                Ok(false) => debug!(subscriber = %id, %error, "Delivery failed after disconnect"),
                Err(e) => warn!(subscriber = %id, error = %e, "Eviction failed"),
            }
        }

        info!(delivered = summary.delivered, evicted = summary.evicted, "Broadcast");
        Ok(summary)
    }
}
