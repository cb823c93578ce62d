//! Selects the best-matching payment rule for a medical billing event and
//! computes the professional's fee.
//!
//! The [`engine`] module is the pure core; [`config`], [`telemetry`] and
//! [`error`] carry the surrounding service plumbing.

pub mod config;
pub mod engine;
pub mod error;
pub mod telemetry;

pub use engine::{audit_conflicts, evaluate, DecisionResult, PaymentEngine};
