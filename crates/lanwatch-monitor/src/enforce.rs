//! Best-effort disconnect workflow.
//!
//! A fixed, strictly ordered sequence of mitigation steps. Every step runs
//! regardless of how the previous one ended; failures are logged and
//! recorded in the report but never stop the sequence or fail it. The
//! overall result is a completion acknowledgement, not a verified block.
//! Revoking trust goes through the whitelist, which notifies observers.

use std::net::Ipv4Addr;
use std::sync::Arc;

use lanwatch_core::HardwareId;
use lanwatch_whitelist::Whitelist;
use serde::Serialize;

use crate::error::{MonitorError, Result};
use crate::platform::{AdminCommand, Platform, PlatformError};

pub const COMPLETION_MESSAGE: &str = "Device disconnected successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnforcementStep {
    RemoveNeighborEntry,
    BlockAddress,
    DisableInterface,
    EnableInterface,
    RevokeTrust,
}

impl EnforcementStep {
    pub const SEQUENCE: [Self; 5] = [
        Self::RemoveNeighborEntry,
        Self::BlockAddress,
        Self::DisableInterface,
        Self::EnableInterface,
        Self::RevokeTrust,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: EnforcementStep,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response envelope of a completed sequence.
#[derive(Debug, Clone, Serialize)]
pub struct EnforcementReport {
    pub success: bool,
    pub message: String,
    pub steps: Vec<StepOutcome>,
}

/// A validated disconnect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementTarget {
    pub address: Ipv4Addr,
    pub hardware_id: HardwareId,
}

impl EnforcementTarget {
    /// Validate raw request fields. Missing or blank fields are rejected.
    pub fn from_request(ip: Option<&str>, mac: Option<&str>) -> Result<Self> {
        let ip = ip.map(str::trim).filter(|s| !s.is_empty());
        let mac = mac.map(str::trim).filter(|s| !s.is_empty());

        let (Some(ip), Some(mac)) = (ip, mac) else {
            return Err(MonitorError::Validation(
                "IP and MAC address required".to_string(),
            ));
        };

        let address = ip
            .parse::<Ipv4Addr>()
            .map_err(|_| MonitorError::Validation(format!("Invalid IP address: {ip}")))?;

        Ok(Self {
            address,
            hardware_id: HardwareId::canonicalize(mac),
        })
    }
}

pub struct Enforcer {
    platform: Arc<dyn Platform>,
    whitelist: Whitelist,
    interface: Option<String>,
}

impl Enforcer {
    /// `interface` overrides detection of the interface to bounce.
    pub fn new(
        platform: Arc<dyn Platform>,
        whitelist: Whitelist,
        interface: Option<String>,
    ) -> Self {
        Self {
            platform,
            whitelist,
            interface,
        }
    }

    /// Run every step in order and report how each one went.
    pub async fn disconnect(&self, target: &EnforcementTarget) -> EnforcementReport {
        tracing::info!(
            ip = %target.address,
            mac = %target.hardware_id,
            "Starting disconnect sequence"
        );

        // Resolved once, shared by both interface steps.
        let mut interface: Option<std::result::Result<String, PlatformError>> = None;
        let mut steps = Vec::with_capacity(EnforcementStep::SEQUENCE.len());

        for step in EnforcementStep::SEQUENCE {
            let result = self.execute(step, target, &mut interface).await;

            match &result {
                Ok(()) => tracing::info!(step = ?step, ip = %target.address, "Enforcement step done"),
                Err(e) => tracing::warn!(
                    step = ?step,
                    ip = %target.address,
                    error = %e,
                    "Enforcement step failed, continuing"
                ),
            }

            steps.push(StepOutcome {
                step,
                ok: result.is_ok(),
                error: result.err(),
            });
        }

        let failed = steps.iter().filter(|s| !s.ok).count();
        tracing::info!(
            ip = %target.address,
            mac = %target.hardware_id,
            failed_steps = failed,
            "Disconnect sequence finished"
        );

        EnforcementReport {
            success: true,
            message: COMPLETION_MESSAGE.to_string(),
            steps,
        }
    }

    async fn execute(
        &self,
        step: EnforcementStep,
        target: &EnforcementTarget,
        interface: &mut Option<std::result::Result<String, PlatformError>>,
    ) -> std::result::Result<(), String> {
        let command = match step {
            EnforcementStep::RemoveNeighborEntry => AdminCommand::RemoveNeighbor {
                address: target.address,
            },
            EnforcementStep::BlockAddress => AdminCommand::BlockAddress {
                address: target.address,
                hardware_id: target.hardware_id.clone(),
            },
            EnforcementStep::DisableInterface | EnforcementStep::EnableInterface => {
                if interface.is_none() {
                    *interface = Some(self.resolve_interface().await);
                }
                let name = match interface {
                    Some(Ok(name)) => name.clone(),
                    Some(Err(e)) => return Err(e.to_string()),
                    None => return Err(PlatformError::NoInterface.to_string()),
                };
                AdminCommand::SetInterface {
                    interface: name,
                    enabled: step == EnforcementStep::EnableInterface,
                }
            }
            EnforcementStep::RevokeTrust => return self.revoke_trust(&target.hardware_id).await,
        };

        self.platform
            .run_admin(&command)
            .await
            .map_err(|e| e.to_string())
    }

    async fn resolve_interface(&self) -> std::result::Result<String, PlatformError> {
        match &self.interface {
            Some(name) => Ok(name.clone()),
            None => self.platform.active_interface().await,
        }
    }

    /// The file rewrite runs on the blocking pool.
    async fn revoke_trust(&self, id: &HardwareId) -> std::result::Result<(), String> {
        let whitelist = self.whitelist.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || whitelist.remove(&id))
            .await
            .map_err(|e| e.to_string())?
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
