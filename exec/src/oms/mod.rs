//! Order management for simulated submissions
//!
//! Tracks which assets have a latency-delayed order outstanding.

pub mod inflight;

pub use inflight::{InFlightGuard, InFlightRegistry};
