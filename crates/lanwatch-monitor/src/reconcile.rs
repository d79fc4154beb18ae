//! Presence reconciliation: which devices are new and untrusted this cycle.
//!
//! Only the immediately preceding cycle is remembered. A device that drops
//! out of the neighbor table for one cycle is new again when it returns.

use std::collections::HashSet;

use lanwatch_core::{Device, HardwareId};

/// Receives one call per newly observed untrusted device.
pub trait AlertSink: Send + Sync {
    fn new_device(&self, device: &Device);
}

/// Alert sink that emits a structured warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn new_device(&self, device: &Device) {
        tracing::warn!(
            ip = %device.address,
            mac = %device.hardware_id,
            name = %device.display_name,
            class = ?device.class,
            "New untrusted device detected"
        );
    }
}

#[derive(Debug, Default)]
pub struct PresenceReconciler {
    snapshot: HashSet<HardwareId>,
}

impl PresenceReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hardware ids seen in the last completed cycle.
    pub fn snapshot(&self) -> &HashSet<HardwareId> {
        &self.snapshot
    }

    /// Compare a completed cycle against the previous one and adopt it as the
    /// new baseline. Returns the new untrusted devices in cycle order.
    pub fn reconcile(&mut self, devices: &[Device]) -> Vec<Device> {
        let new_untrusted: Vec<Device> = devices
            .iter()
            .filter(|d| !d.trusted && !self.snapshot.contains(&d.hardware_id))
            .cloned()
            .collect();

        self.snapshot = devices.iter().map(|d| d.hardware_id.clone()).collect();
        new_untrusted
    }
}
