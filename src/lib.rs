//! # Food Rescue
//!
//! > **Donation admission, delivery routing and live driver tracking.**
//!
//! Restaurants submit a photo of surplus food together with the shelters it should go to. The
//! pipeline checks the photo, plans the delivery route, and streams the driver's position to
//! everyone following the delivery.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Pure Core, Thin Shell
//! Everything here takes plain values (bytes, stops, payload strings) and returns plain values.
//! HTTP handlers, upload parsing and WebSocket upgrades live outside the crate and talk to it
//! through [`tracking::SubscriberTransport`] and the functions below.
//!
//! ### Actor-Owned Registry
//! The only shared mutable state, the map of live subscribers, is owned by one
//! [`TrackingHub`](tracking::TrackingHub) task. Everyone else holds a
//! [`TrackingClient`](tracking::TrackingClient) and sends messages. No locks, no raw shared
//! maps.
//!
//! ### Failures Become Values
//! A malformed photo, an unroutable request or a dead subscriber connection never crashes
//! anything. Each is turned into a typed outcome: a rejected
//! [`AdmissionDecision`](admission::AdmissionDecision) or an eviction counted in a
//! [`BroadcastReport`](tracking::BroadcastReport).
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Gate ([`quality`])
//! Mean brightness and Laplacian sharpness of the photo, compared to a
//! [`QualityPolicy`](quality::QualityPolicy).
//!
//! ### 2. The Planner ([`routing`])
//! Cheapest-arc construction plus 2-opt over a pluggable [`ArcCost`](routing::ArcCost) model,
//! with soft time windows.
//!
//! ### 3. The Decision ([`admission`])
//! [`AdmissionOrchestrator`](admission::AdmissionOrchestrator) runs the gate and, only on a pass,
//! the planner.
//!
//! ### 4. The Fan-out ([`tracking`])
//! Hub actor, client, per-connection sessions and an in-memory transport for tests.
//!
//! ### 5. The Runtime ([`lifecycle`], [`config`])
//! [`PipelineSystem`](lifecycle::PipelineSystem) wires it all together from a
//! [`PipelineConfig`](config::PipelineConfig).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs
//! RUST_LOG=info cargo run
//!
//! # Run the tests
//! cargo test
//! ```

pub mod admission;
pub mod config;
pub mod lifecycle;
pub mod quality;
pub mod routing;
pub mod tracking;
