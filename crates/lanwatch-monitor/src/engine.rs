//! Discovery engine: one neighbor-table dump turned into a device set.
//!
//! dump → parse → normalize → resolve names (concurrently) → merge trust.
//! The engine owns no state between cycles.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use lanwatch_core::{Device, HardwareId};
use lanwatch_whitelist::Whitelist;

use crate::error::{MonitorError, Result};
use crate::normalize::Normalizer;
use crate::platform::{Platform, PlatformError};
use crate::resolve::NameResolver;

pub struct DiscoveryEngine {
    platform: Arc<dyn Platform>,
    normalizer: Normalizer,
    resolver: NameResolver,
    whitelist: Whitelist,
    dump_timeout: Duration,
}

impl DiscoveryEngine {
    pub fn new(
        platform: Arc<dyn Platform>,
        normalizer: Normalizer,
        resolver: NameResolver,
        whitelist: Whitelist,
        dump_timeout: Duration,
    ) -> Self {
        Self {
            platform,
            normalizer,
            resolver,
            whitelist,
            dump_timeout,
        }
    }

    /// Run one discovery cycle.
    ///
    /// Fails only when the neighbor-table dump fails or times out; per-line
    /// parse problems and lookup failures are absorbed.
    pub async fn run_cycle(&self) -> Result<Vec<Device>> {
        let started = Utc::now();

        let dump = tokio::time::timeout(self.dump_timeout, self.platform.neighbor_table())
            .await
            .map_err(|_| {
                MonitorError::DiscoveryFailed(PlatformError::Timeout {
                    program: "neighbor table dump".to_string(),
                    timeout_ms: self.dump_timeout.as_millis() as u64,
                })
            })?
            .map_err(MonitorError::DiscoveryFailed)?;

        let observations = self.normalizer.normalize_dump(&dump);
        let names = join_all(
            observations
                .iter()
                .map(|o| self.resolver.resolve(o.address)),
        )
        .await;

        let trusted: HashSet<HardwareId> = self.whitelist.snapshot().into_iter().collect();

        let devices: Vec<Device> = observations
            .into_iter()
            .zip(names)
            .map(|(o, name)| Device {
                trusted: trusted.contains(&o.hardware_id),
                address: o.address,
                hardware_id: o.hardware_id,
                display_name: name,
                class: o.class,
                last_seen: started,
            })
            .collect();

        tracing::debug!(devices = devices.len(), "Discovery pipeline complete");
        Ok(devices)
    }
}
