//! Floodgate: in-process admission control and load shedding.
//!
//! Bounds concurrent handler execution on a capacity-constrained server:
//! a general slot pool, a smaller sub-pool for expensive ("heavy")
//! operations, two FIFO wait queues serviced in strict precedence order,
//! and typed denials the HTTP layer turns into retry-after responses.
//!
//! The HTTP layer calls [`AdmissionGate::acquire`] before running a
//! handler and [`AdmissionGate::release`] unconditionally afterward.
//! Capacity exhaustion is always a value, never an error.

pub mod config;
pub mod gate;
pub mod policy;

pub use config::{ConfigError, GateConfig};
pub use gate::controller::AdmissionGate;
pub use gate::decision::{AdmissionDecision, DenyReason};
pub use gate::stats::GateStats;
pub use policy::{PathClass, PathPolicy};
