//! Neighbor table text parsing.
//!
//! Accepts the three layouts the supported platforms print:
//!
//! ```text
//!   192.168.1.1           aa-bb-cc-dd-ee-ff     dynamic        (Windows arp -a)
//! 192.168.1.1 dev wlan0 lladdr aa:bb:cc:dd:ee:ff REACHABLE     (ip neigh show)
//! ? (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet] (BSD arp -an)
//! ```
//!
//! A line yields an entry when it holds an IPv4 address followed by a
//! six-octet hardware id. Anything else is skipped.

use std::net::Ipv4Addr;

use lanwatch_core::HardwareId;

/// One raw (address, hardware id) pair from the neighbor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    pub address: Ipv4Addr,
    pub hardware_id: HardwareId,
}

/// Parse every usable line of a neighbor table dump, in order.
pub fn parse_neighbor_table(dump: &str) -> Vec<NeighborEntry> {
    dump.lines()
        .filter_map(|line| {
            let entry = parse_line(line);
            if entry.is_none() && !line.trim().is_empty() {
                tracing::trace!(line, "Skipping unparsable neighbor line");
            }
            entry
        })
        .collect()
}

fn parse_line(line: &str) -> Option<NeighborEntry> {
    let mut tokens = line
        .split_whitespace()
        .map(|t| t.trim_matches(|c| c == '(' || c == ')'));

    let address = tokens.by_ref().find_map(|t| t.parse::<Ipv4Addr>().ok())?;
    let hardware_id = tokens.find_map(HardwareId::parse)?;

    Some(NeighborEntry {
        address,
        hardware_id,
    })
}
