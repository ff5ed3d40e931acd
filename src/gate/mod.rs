//! The admission gate: slot pools, wait queues, and typed decisions.

pub mod controller;
pub mod decision;
pub mod stats;

pub(crate) mod waiter;
