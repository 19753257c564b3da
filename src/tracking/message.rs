//! Requests understood by the tracking hub and the values exchanged with it.

use super::{SubscriberTransport, TransportError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Identifier of the driver a connection is tracking.
pub type DriverId = String;

/// Type alias for the one-shot reply channel used by the hub.
pub type Response<T> = oneshot::Sender<T>;

/// Registry key of one subscriber, unique for the lifetime of a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

/// Lifecycle of a subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubscriberState {
    Connecting,
    Open,
    Closed,
}

/// Returned by a successful connect; identifies the registration.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: SubscriberId,
    driver_id: DriverId,
    state: watch::Receiver<SubscriberState>,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        id: SubscriberId,
        driver_id: DriverId,
        state: watch::Receiver<SubscriberState>,
    ) -> Self {
        Self { id, driver_id, state }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn driver_id(&self) -> &str {
        &self.driver_id
    }

    pub fn state(&self) -> SubscriberState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == SubscriberState::Open
    }

    /// Resolves once the subscriber is closed, whoever closed it. Also resolves if the hub is
    /// gone.
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s == SubscriberState::Closed).await;
    }
}

/// One position update from a driver. The payload format belongs to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionReport {
    pub driver_id: DriverId,
    pub payload: String,
}

impl PositionReport {
    pub fn new(driver_id: impl Into<DriverId>, payload: impl Into<String>) -> Self {
        Self {
            driver_id: driver_id.into(),
            payload: payload.into(),
        }
    }

    /// Outbound text sent to subscribers.
    pub fn render(&self) -> String {
        format!("Driver {} is at: {}", self.driver_id, self.payload)
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Subscribers that received the message.
    pub delivered: usize,
    /// Subscribers removed because delivery failed.
    pub evicted: usize,
}

/// One rendered message queued for a subscriber. The outcome of the send is reported back on
/// `respond_to`.
#[derive(Debug)]
pub struct Delivery {
    pub message: Arc<str>,
    pub respond_to: Response<Result<(), TransportError>>,
}

/// A registered subscriber handed out for delivery: its id and the sending side of its queue.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: SubscriberId,
    pub outbox: mpsc::Sender<Delivery>,
}

/// Internal message type sent to the hub.
///
/// Every variant carries a `respond_to` channel; the hub answers each request exactly once.
#[derive(Debug)]
pub enum HubRequest {
    /// Adds an already accepted connection under `driver_id`.
    Register {
        driver_id: DriverId,
        transport: Arc<dyn SubscriberTransport>,
        state: watch::Sender<SubscriberState>,
        respond_to: Response<SubscriberId>,
    },
    /// Removes a subscriber. Replies with its transport if it was still registered.
    Remove {
        id: SubscriberId,
        respond_to: Response<Option<Arc<dyn SubscriberTransport>>>,
    },
    /// Lists the subscribers a broadcast for `driver_id` must reach.
    Recipients {
        driver_id: DriverId,
        respond_to: Response<Vec<Recipient>>,
    },
    /// Number of subscribers for one driver, or for all drivers when `None`.
    Count {
        driver_id: Option<DriverId>,
        respond_to: Response<usize>,
    },
    /// Closes every subscriber and stops the hub. Replies with the number closed.
    Shutdown { respond_to: Response<usize> },
}
