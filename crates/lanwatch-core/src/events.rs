//! Event types pushed to real-time observers.
//!
//! Every event is a full-state snapshot, never a delta, so an observer that
//! misses one simply waits for the next.

use serde::{Deserialize, Serialize};

use crate::types::{Device, HardwareId};

/// Wire envelope: `{"type": "devices", "data": [...]}` or
/// `{"type": "whitelist", "data": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum PushEvent {
    /// The complete device set of the latest discovery cycle.
    Devices(Vec<Device>),
    /// The complete persisted whitelist.
    Whitelist(Vec<HardwareId>),
}

impl PushEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Devices(_) => "devices",
            Self::Whitelist(_) => "whitelist",
        }
    }
}
