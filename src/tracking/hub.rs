//! # Tracking Hub
//!
//! The server half of live tracking. The hub owns the subscriber registry and processes
//! [`HubRequest`] messages sequentially, so the registry is never shared and never locked.

use super::outbox::run_outbox;
use super::{
    Delivery, DriverId, HubRequest, Recipient, SubscriberId, SubscriberState, SubscriberTransport,
    TrackingClient,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Which subscribers a position report reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastScope {
    /// Only subscribers registered under the reporting driver.
    #[default]
    PerDriver,
    /// Every open subscriber, regardless of driver.
    AllSubscribers,
}

/// Tunables of the tracking hub.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Capacity of the request channel. Clients wait when it is full.
    pub channel_capacity: usize,
    /// Upper bound on a single delivery; slower subscribers are evicted.
    pub send_timeout_ms: u64,
    /// Messages that may wait in one subscriber's queue. A full queue evicts the subscriber.
    pub outbox_capacity: usize,
    pub scope: BroadcastScope,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 32,
            send_timeout_ms: 2_000,
            outbox_capacity: 64,
            scope: BroadcastScope::PerDriver,
        }
    }
}

impl HubConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

struct Subscriber {
    driver_id: DriverId,
    transport: Arc<dyn SubscriberTransport>,
    outbox: mpsc::Sender<Delivery>,
    state: watch::Sender<SubscriberState>,
}

/// The actor that owns the subscriber registry.
///
/// Membership is kept twice: `subscribers` maps each id to its connection, `drivers` maps each
/// driver to the set of ids registered under it. Both are updated together in `register` and
/// `remove`.
pub struct TrackingHub {
    receiver: mpsc::Receiver<HubRequest>,
    subscribers: HashMap<SubscriberId, Subscriber>,
    drivers: HashMap<DriverId, HashSet<SubscriberId>>,
    scope: BroadcastScope,
    send_timeout: Duration,
    outbox_capacity: usize,
    next_id: u64,
}

impl TrackingHub {
    /// Creates a hub and the client used to talk to it.
    ///
    /// The hub does nothing until [`run`](Self::run) is spawned.
    pub fn new(config: HubConfig) -> (Self, TrackingClient) {
        let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
        let hub = Self {
            receiver,
            subscribers: HashMap::new(),
            drivers: HashMap::new(),
            scope: config.scope,
            send_timeout: config.send_timeout(),
            outbox_capacity: config.outbox_capacity.max(1),
            next_id: 1,
        };
        (hub, TrackingClient::new(sender))
    }

    /// Runs the hub's event loop until every client is dropped or a shutdown is requested.
    pub async fn run(mut self) {
        info!(scope = ?self.scope, "Tracking hub started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                HubRequest::Register { driver_id, transport, state, respond_to } => {
                    let id = self.register(driver_id, transport, state);
                    if respond_to.send(id).is_err() {
                        // The connecting caller went away before learning its id.
                        warn!(subscriber = %id, "Registration abandoned");
                        if let Some(transport) = self.remove(id) {
                            close_in_background(transport);
                        }
                    }
                }
                HubRequest::Remove { id, respond_to } => {
                    let transport = self.remove(id);
                    if transport.is_none() {
                        debug!(subscriber = %id, "Already removed");
                    }
                    let _ = respond_to.send(transport);
                }
                HubRequest::Recipients { driver_id, respond_to } => {
                    let recipients = self.recipients(&driver_id);
                    debug!(%driver_id, recipients = recipients.len(), "Recipients");
                    let _ = respond_to.send(recipients);
                }
                HubRequest::Count { driver_id, respond_to } => {
                    let count = match driver_id {
                        Some(driver_id) => self.drivers.get(&driver_id).map_or(0, HashSet::len),
                        None => self.subscribers.len(),
                    };
                    let _ = respond_to.send(count);
                }
                HubRequest::Shutdown { respond_to } => {
                    let closed = self.close_all();
                    let _ = respond_to.send(closed);
                    break;
                }
            }
        }

        let closed = self.close_all();
        info!(closed, "Tracking hub shutdown");
    }

    fn register(
        &mut self,
        driver_id: DriverId,
        transport: Arc<dyn SubscriberTransport>,
        state: watch::Sender<SubscriberState>,
    ) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;

        let (outbox, queue) = mpsc::channel(self.outbox_capacity);
        tokio::spawn(run_outbox(id, Arc::clone(&transport), queue, self.send_timeout));

        state.send_replace(SubscriberState::Open);
        self.drivers.entry(driver_id.clone()).or_default().insert(id);
        info!(
            %driver_id,
            subscriber = %id,
            size = self.subscribers.len() + 1,
            "Subscriber registered"
        );
        self.subscribers.insert(
            id,
            Subscriber {
                driver_id,
                transport,
                outbox,
                state,
            },
        );
        id
    }

    fn remove(&mut self, id: SubscriberId) -> Option<Arc<dyn SubscriberTransport>> {
        let subscriber = self.subscribers.remove(&id)?;
        if let Some(ids) = self.drivers.get_mut(&subscriber.driver_id) {
            ids.remove(&id);
            if ids.is_empty() {
                self.drivers.remove(&subscriber.driver_id);
            }
        }
        subscriber.state.send_replace(SubscriberState::Closed);
        info!(
            driver_id = %subscriber.driver_id,
            subscriber = %id,
            size = self.subscribers.len(),
            "Subscriber removed"
        );
        Some(subscriber.transport)
    }

    fn recipients(&self, driver_id: &str) -> Vec<Recipient> {
        let recipient = |id: &SubscriberId| {
            self.subscribers.get(id).map(|subscriber| Recipient {
                id: *id,
                outbox: subscriber.outbox.clone(),
            })
        };
        match self.scope {
            BroadcastScope::PerDriver => self
                .drivers
                .get(driver_id)
                .into_iter()
                .flatten()
                .filter_map(recipient)
                .collect(),
            BroadcastScope::AllSubscribers => {
                self.subscribers.keys().filter_map(recipient).collect()
            }
        }
    }

    /// Closes and forgets every subscriber. Transports are closed in the background so the hub
    /// never waits on a peer.
    fn close_all(&mut self) -> usize {
        let ids: Vec<SubscriberId> = self.subscribers.keys().copied().collect();
        for id in &ids {
            if let Some(transport) = self.remove(*id) {
                close_in_background(transport);
            }
        }
        ids.len()
    }
}

fn close_in_background(transport: Arc<dyn SubscriberTransport>) {
    tokio::spawn(async move { transport.close().await });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::mock::ChannelTransport;
    use crate::tracking::TrackingError;

    #[tokio::test]
    async fn test_register_and_remove() {
        let (hub, client) = TrackingHub::new(HubConfig::default());
        tokio::spawn(hub.run());

        let (transport, _peer) = ChannelTransport::pair();
        let handle = client.connect("D1", transport).await.unwrap();
        assert_eq!(handle.state(), SubscriberState::Open);
        assert_eq!(handle.driver_id(), "D1");
        assert_eq!(client.subscriber_count("D1").await.unwrap(), 1);
        assert_eq!(client.subscriber_count("D2").await.unwrap(), 0);

        assert!(client.disconnect(&handle).await.unwrap());
        assert_eq!(handle.state(), SubscriberState::Closed);
        assert_eq!(client.subscriber_count("D1").await.unwrap(), 0);

        // Second disconnect is a no-op.
        assert!(!client.disconnect(&handle).await.unwrap());
        assert_eq!(client.total_subscribers().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let (hub, client) = TrackingHub::new(HubConfig::default());
        tokio::spawn(hub.run());

        let (a, _pa) = ChannelTransport::pair();
        let (b, _pb) = ChannelTransport::pair();
        let first = client.connect("D1", a).await.unwrap();
        let second = client.connect("D1", b).await.unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(client.subscriber_count("D1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_all_subscribers_scope() {
        let config = HubConfig { scope: BroadcastScope::AllSubscribers, ..Default::default() };
        let (hub, client) = TrackingHub::new(config);
        tokio::spawn(hub.run());

        let (a, mut peer_a) = ChannelTransport::pair();
        let (b, mut peer_b) = ChannelTransport::pair();
        client.connect("D1", a).await.unwrap();
        client.connect("D2", b).await.unwrap();

        let report = client.broadcast("D1", "1,2").await.unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(peer_a.recv().await.as_deref(), Some("Driver D1 is at: 1,2"));
        assert_eq!(peer_b.recv().await.as_deref(), Some("Driver D1 is at: 1,2"));
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscribers() {
        let (hub, client) = TrackingHub::new(HubConfig::default());
        let hub_task = tokio::spawn(hub.run());

        let (transport, _peer) = ChannelTransport::pair();
        let handle = client.connect("D1", transport.clone()).await.unwrap();

        assert_eq!(client.shutdown().await.unwrap(), 1);
        hub_task.await.unwrap();
        assert_eq!(handle.state(), SubscriberState::Closed);
        assert_eq!(client.subscriber_count("D1").await, Err(TrackingError::HubClosed));
    }

    #[tokio::test]
    async fn test_abandoned_registration_closes_transport() {
        let (hub, client) = TrackingHub::new(HubConfig::default());
        let (transport, _peer) = ChannelTransport::pair();

        // The hub is not running yet, so the connect gives up while its request is queued.
        let connect = client.connect("D1", transport.clone());
        let gave_up = tokio::time::timeout(Duration::from_millis(20), connect).await;
        assert!(gave_up.is_err());

        tokio::spawn(hub.run());
        while !transport.is_closed() {
            tokio::task::yield_now().await;
        }
        assert_eq!(client.subscriber_count("D1").await.unwrap(), 0);
    }
}
