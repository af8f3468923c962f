//! Domain logic for the invoke bridge.
//!
//! Holds the immutable configuration values resolved at startup and the
//! per-request invocation orchestrator that drives the external interpreter.
//! Nothing in this crate knows about HTTP.

pub mod duration;
pub mod error;
pub mod invocation;
