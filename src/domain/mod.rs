//! Value types and ports for the payment workflow.
//!
//! Nothing in here performs I/O; adapters for the ports live in
//! `crate::infrastructure`.

pub mod money;
pub mod payment;
pub mod phone;
pub mod pool;
pub mod ports;
