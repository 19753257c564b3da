//! Live position fan-out.
//!
//! The tracking hub keeps a registry of subscriber connections keyed by driver and forwards every
//! position report to the subscribers of that driver.
//!
//! # Actor Layout
//!
//! The registry is owned by a single [`TrackingHub`] task. Nothing else can touch it: callers hold
//! a cheap, cloneable [`TrackingClient`] that sends [`HubRequest`] messages over an `mpsc`
//! channel and awaits a `oneshot` reply. Because the hub processes one request at a time the
//! registry needs no lock.
//!
//! Delivery itself happens *outside* the hub loop. Every subscriber owns a bounded outbound
//! queue drained by its own task, with each send bounded by the configured timeout. A broadcast
//! asks the hub for a snapshot of the recipients and pushes the rendered message into their
//! queues; [`PendingBroadcast::settle`] then collects the outcomes and evicts every subscriber
//! whose delivery did not go through. A slow connection only delays its own queue, never
//! registry operations or other subscribers.
//!
//! # Subscriber Lifecycle
//!
//! ```text
//! Connecting --handshake ok--> Open --disconnect / send failure--> Closed
//!      \--handshake failed------------------------------------------^
//! ```
//!
//! The state is observable through [`SubscriptionHandle::state`].
//!
//! # Sessions
//!
//! [`run_session`] is the receive loop of one connection: it registers the connection,
//! relays every inbound payload as a broadcast for its driver, and disconnects when the
//! transport closes or the hub evicts it. Reports are queued in arrival order and settled in
//! the background. Each session runs in its own task.

pub mod client;
pub mod error;
pub mod hub;
pub mod message;
pub mod mock;
mod outbox;
pub mod session;
pub mod transport;

pub use client::*;
pub use error::*;
pub use hub::*;
pub use message::*;
pub use session::*;
pub use transport::*;
