//! # In-Memory Transport
//!
//! [`ChannelTransport`] implements [`SubscriberTransport`] over unbounded channels. The other end
//! is a [`MockPeer`], which plays the remote client: it pushes inbound payloads and reads what the
//! hub delivered.
//!
//! [`MockBehaviour`] switches on the failure modes that are hard to reproduce with a real
//! socket: refused handshakes, failing sends and slow sends. Sends can also start failing after
//! the connection is registered via [`ChannelTransport::set_failing`].
//!
//! ```rust,ignore
//! let (transport, mut peer) = ChannelTransport::pair();
//! let handle = client.connect("D1", transport).await?;
//! client.broadcast("D1", "37.1,-122.4").await?;
//! assert_eq!(peer.recv().await.as_deref(), Some("Driver D1 is at: 37.1,-122.4"));
//! ```

use super::{SubscriberTransport, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};

/// Failure modes of a [`ChannelTransport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBehaviour {
    pub refuse_handshake: bool,
    pub fail_sends: bool,
    /// Delay applied before every send completes.
    pub latency: Duration,
}

#[derive(Debug)]
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<String>,
    inbound: Mutex<mpsc::UnboundedReceiver<String>>,
    refuse_handshake: bool,
    latency: Duration,
    failing: AtomicBool,
    closed: watch::Sender<bool>,
}

impl ChannelTransport {
    /// A well-behaved transport and its peer.
    pub fn pair() -> (Arc<Self>, MockPeer) {
        Self::pair_with(MockBehaviour::default())
    }

    pub fn pair_with(behaviour: MockBehaviour) -> (Arc<Self>, MockPeer) {
        let (outbound, from_transport) = mpsc::unbounded_channel();
        let (to_transport, inbound) = mpsc::unbounded_channel();
        let transport = Self {
            outbound,
            inbound: Mutex::new(inbound),
            refuse_handshake: behaviour.refuse_handshake,
            latency: behaviour.latency,
            failing: AtomicBool::new(behaviour.fail_sends),
            closed: watch::Sender::new(false),
        };
        let peer = MockPeer {
            to_transport: Some(to_transport),
            from_transport,
        };
        (Arc::new(transport), peer)
    }

    /// Makes every following send fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[async_trait]
impl SubscriberTransport for ChannelTransport {
    async fn accept(&self) -> Result<(), TransportError> {
        if self.refuse_handshake {
            return Err(TransportError::HandshakeRefused("peer rejected upgrade".into()));
        }
        Ok(())
    }

    async fn send_text(&self, message: &str) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Io("simulated send failure".into()));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.outbound
            .send(message.to_string())
            .map_err(|_| TransportError::Closed)
    }

    async fn receive_text(&self) -> Result<Option<String>, TransportError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return Ok(None);
        }
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            _ = closed.wait_for(|closed| *closed) => Ok(None),
            message = inbound.recv() => Ok(message),
        }
    }

    async fn close(&self) {
        self.closed.send_replace(true);
    }
}

/// The remote end of a [`ChannelTransport`].
#[derive(Debug)]
pub struct MockPeer {
    to_transport: Option<mpsc::UnboundedSender<String>>,
    from_transport: mpsc::UnboundedReceiver<String>,
}

impl MockPeer {
    /// Sends an inbound payload, as a driver app would. Returns `false` after a hang-up.
    pub fn push(&self, payload: impl Into<String>) -> bool {
        self.to_transport
            .as_ref()
            .is_some_and(|sender| sender.send(payload.into()).is_ok())
    }

    /// Next message delivered to this peer. `None` once the transport is dropped.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_transport.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.from_transport.try_recv().ok()
    }

    /// Everything delivered so far.
    pub fn drain(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Closes the inbound direction; the transport's receive loop sees end of stream.
    pub fn hang_up(&mut self) {
        self.to_transport = None;
    }
}
