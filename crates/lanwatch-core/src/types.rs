//! Core domain types for device presence tracking.
//!
//! The JSON shape of `Device` is the wire contract consumed by the UI:
//! `{ip, mac, name, type, lastSeen, whitelisted}`.

use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name used when reverse resolution yields nothing.
pub const UNKNOWN_NAME: &str = "Unknown";

// ── Hardware identity ─────────────────────────────────────────────

/// Link-layer identifier of a network interface, in canonical form
/// (lowercase hex, colon separated). This is the durable device key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HardwareId(String);

impl HardwareId {
    /// Canonicalize an arbitrary operator-supplied id without validating its shape.
    ///
    /// Every character that is neither a hex digit nor `:` becomes `:`. When the
    /// result is six octets, single-digit octets are zero-padded.
    pub fn canonicalize(raw: &str) -> Self {
        let id: String = raw
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_hexdigit() || c == ':' {
                    c.to_ascii_lowercase()
                } else {
                    ':'
                }
            })
            .collect();

        match six_octets(&id, &[':']) {
            Some(octets) => Self(pad_octets(&octets)),
            None => Self(id),
        }
    }

    /// Parse a six-octet id written as `aa:bb:cc:dd:ee:ff`, `AA-BB-CC-DD-EE-FF`,
    /// or with the leading zeros BSD `arp` omits (`0:1a:2b:c:4d:5e`).
    pub fn parse(raw: &str) -> Option<Self> {
        let octets = six_octets(raw, &[':', '-'])?;
        Some(Self(pad_octets(&octets).to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The all-ones broadcast id.
    pub fn is_broadcast(&self) -> bool {
        self.0 == "ff:ff:ff:ff:ff:ff"
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

/// Split on `separators` into exactly six octets of one or two hex digits.
fn six_octets<'a>(raw: &'a str, separators: &[char]) -> Option<Vec<&'a str>> {
    let octets: Vec<&str> = raw.split(separators).collect();
    let well_formed = octets.len() == 6
        && octets
            .iter()
            .all(|o| (1..=2).contains(&o.len()) && o.chars().all(|c| c.is_ascii_hexdigit()));
    well_formed.then_some(octets)
}

fn pad_octets(octets: &[&str]) -> String {
    octets
        .iter()
        .map(|o| format!("{o:0>2}"))
        .collect::<Vec<_>>()
        .join(":")
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Device ────────────────────────────────────────────────────────

/// Heuristic device classification derived from the hardware id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Regular,
    /// Locally administered id of the kind handed out by phone hotspots.
    Hotspot,
}

/// One physical endpoint observed during a discovery cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Network-layer address; may change between cycles.
    #[serde(rename = "ip")]
    pub address: Ipv4Addr,
    #[serde(rename = "mac")]
    pub hardware_id: HardwareId,
    /// Reverse-resolved name, or [`UNKNOWN_NAME`].
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "type")]
    pub class: DeviceClass,
    /// Start time of the cycle that produced this record.
    pub last_seen: DateTime<Utc>,
    /// Whether the hardware id was whitelisted when the cycle merged it.
    #[serde(rename = "whitelisted")]
    pub trusted: bool,
}
