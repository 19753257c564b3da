//! # Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging with the `tracing` crate.
//!
//! The compact format hides the module prefix (`with_target(false)`); every event carries its
//! context as structured fields instead (`driver_id`, `subscriber`, `cost`, ...).
//!
//! ## Usage Examples
//!
//! ```bash
//! # Decisions, registrations and broadcast summaries
//! RUST_LOG=info cargo run
//!
//! # Also per-sample scores, recipient snapshots and 2-opt progress
//! RUST_LOG=debug cargo run
//!
//! # Only the tracking hub
//! RUST_LOG=food_rescue::tracking=debug cargo run
//! ```
//!
//! ## Workflow Trace Example
//!
//! **With `RUST_LOG=info`**:
//!
//! ```text
//! INFO Tracking hub started scope=PerDriver
//! INFO Pipeline started
//! INFO admit: Quality verdict passed=true brightness=150 blur=...
//! INFO admit: Route planned stops=3 cost=... late=0 round_trip=false
//! INFO admit: Donation accepted route="Restaurant -> ..." cost=...
//! INFO Subscriber registered driver_id=D1 subscriber=sub_1 size=1
//! INFO run_session:publish: Broadcast delivered=3 evicted=0
//! ```

/// Initializes the tracing subscriber.
///
/// Filtering is controlled by the `RUST_LOG` environment variable.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
