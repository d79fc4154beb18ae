//! lanwatch-core: Shared types for the lanwatch presence monitor.
//!
//! This crate provides the foundational types used across all lanwatch components:
//! - `HardwareId`, the canonical link-layer identity of a device
//! - `Device` and `DeviceClass`, one observed endpoint per discovery cycle
//! - `PushEvent`, the envelope pushed to real-time observers

pub mod events;
pub mod types;

pub use events::PushEvent;
pub use types::{Device, DeviceClass, HardwareId, UNKNOWN_NAME};
