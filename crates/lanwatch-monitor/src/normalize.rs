//! Identity normalization: turn raw neighbor entries into a clean,
//! deduplicated, classified observation list.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use lanwatch_core::{DeviceClass, HardwareId};

use crate::neighbor::{self, NeighborEntry};

/// Locally administered prefixes typical of phone hotspots and tethering.
pub const HOTSPOT_PREFIXES: [&str; 3] = ["02:00:00", "02:1a:11", "02:50:f1"];

/// IPv4 multicast mapping, IPv6 multicast mapping, broadcast class.
const NOISE_PREFIXES: [&str; 3] = ["01:00:5e", "33:33", "ff:ff"];

/// A validated neighbor, ready to be resolved into a `Device`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub address: Ipv4Addr,
    pub hardware_id: HardwareId,
    pub class: DeviceClass,
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    scope: Option<Ipv4Net>,
}

impl Normalizer {
    /// `scope`, when set, drops neighbors outside that network.
    pub fn new(scope: Option<Ipv4Net>) -> Self {
        Self { scope }
    }

    /// Parse and normalize a raw neighbor table dump.
    pub fn normalize_dump(&self, dump: &str) -> Vec<Observation> {
        self.normalize(neighbor::parse_neighbor_table(dump))
    }

    /// Filter noise, dedupe by hardware id (first occurrence wins), classify.
    pub fn normalize(&self, entries: Vec<NeighborEntry>) -> Vec<Observation> {
        let mut seen: HashSet<HardwareId> = HashSet::new();

        entries
            .into_iter()
            .filter(|e| !is_noise(e))
            .filter(|e| self.scope.map_or(true, |net| net.contains(&e.address)))
            .filter(|e| seen.insert(e.hardware_id.clone()))
            .map(|e| Observation {
                class: classify(&e.hardware_id),
                address: e.address,
                hardware_id: e.hardware_id,
            })
            .collect()
    }
}

/// Broadcast, multicast, and reserved entries that never denote a device.
pub fn is_noise(entry: &NeighborEntry) -> bool {
    entry.address.is_multicast()
        || entry.address.octets()[3] == 255
        || entry.hardware_id.is_broadcast()
        || NOISE_PREFIXES.iter().any(|p| entry.hardware_id.has_prefix(p))
}

pub fn classify(hardware_id: &HardwareId) -> DeviceClass {
    if HOTSPOT_PREFIXES.iter().any(|p| hardware_id.has_prefix(p)) {
        DeviceClass::Hotspot
    } else {
        DeviceClass::Regular
    }
}
