//! Donation admission: quality gate first, routing only for donations that pass.

pub mod decision;
pub mod orchestrator;

pub use decision::*;
pub use orchestrator::*;
