//! lanwatch-monitor: Device presence monitor for a local network segment.
//!
//! Periodically dumps the platform neighbor table, reconciles it into a
//! stable device set keyed by hardware id, raises alerts for new untrusted
//! devices, pushes every snapshot to connected observers, and drives the
//! best-effort disconnect workflow on operator request.

pub mod api;
pub mod config;
pub mod engine;
pub mod enforce;
pub mod error;
pub mod hub;
pub mod neighbor;
pub mod normalize;
pub mod platform;
pub mod reconcile;
pub mod resolve;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;
