//! Platform command adapter.
//!
//! Everything the monitor needs from the host OS goes through the
//! [`Platform`] trait: dumping the neighbor table, reverse lookups,
//! administrative commands for the disconnect workflow, and the hotspot
//! passthroughs. [`SystemPlatform`] implements it by running the native
//! tools as child processes via `tokio::process::Command`.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use lanwatch_core::HardwareId;
use tokio::process::Command;

/// Errors raised by platform commands.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlatformError {
    #[error("Failed to run {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} exited with code {code}: {stderr}")]
    Failed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("{program} timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u64 },

    #[error("No active network interface found")]
    NoInterface,

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

/// An administrative command issued by the disconnect workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Drop the address from the neighbor table.
    RemoveNeighbor { address: Ipv4Addr },
    /// Add a firewall rule rejecting inbound traffic from the address.
    BlockAddress {
        address: Ipv4Addr,
        hardware_id: HardwareId,
    },
    /// Administratively bring an interface down or up.
    SetInterface { interface: String, enabled: bool },
}

/// Host OS operations the monitor depends on.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Dump the current neighbor (ARP) table as text.
    async fn neighbor_table(&self) -> Result<String, PlatformError>;

    /// Run a reverse lookup for `address` and return the raw resolver output.
    async fn reverse_lookup(&self, address: Ipv4Addr) -> Result<String, PlatformError>;

    /// Name of the active non-loopback interface.
    async fn active_interface(&self) -> Result<String, PlatformError>;

    /// Execute one administrative command.
    async fn run_admin(&self, command: &AdminCommand) -> Result<(), PlatformError>;

    async fn hotspot_status(&self) -> Result<bool, PlatformError>;

    async fn start_hotspot(&self) -> Result<(), PlatformError>;
}

/// Which family of native tools to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// `arp`, `nslookup`, `netsh`.
    Windows,
    /// iproute2, iptables, NetworkManager.
    Linux,
    /// BSD `arp`, `route`, `ifconfig`, `pfctl`.
    Bsd,
}

impl Flavor {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(any(target_os = "linux", target_os = "android")) {
            Self::Linux
        } else {
            Self::Bsd
        }
    }
}

/// A program plus its argument vector. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl CommandLine {
    fn new(program: &'static str, args: &[&str]) -> Self {
        Self {
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Platform adapter backed by the native command-line tools.
pub struct SystemPlatform {
    flavor: Flavor,
    command_timeout: Duration,
}

impl SystemPlatform {
    pub fn new(command_timeout: Duration) -> Self {
        Self::with_flavor(Flavor::current(), command_timeout)
    }

    pub fn with_flavor(flavor: Flavor, command_timeout: Duration) -> Self {
        Self {
            flavor,
            command_timeout,
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn neighbor_table_command(&self) -> CommandLine {
        match self.flavor {
            Flavor::Windows => CommandLine::new("arp", &["-a"]),
            Flavor::Linux => CommandLine::new("ip", &["-4", "neigh", "show"]),
            Flavor::Bsd => CommandLine::new("arp", &["-an"]),
        }
    }

    pub fn admin_command(&self, command: &AdminCommand) -> CommandLine {
        match (self.flavor, command) {
            (Flavor::Linux, AdminCommand::RemoveNeighbor { address }) => {
                CommandLine::new("ip", &["neigh", "flush", "to"]).arg(address.to_string())
            }
            (_, AdminCommand::RemoveNeighbor { address }) => {
                CommandLine::new("arp", &["-d"]).arg(address.to_string())
            }
            (
                Flavor::Windows,
                AdminCommand::BlockAddress {
                    address,
                    hardware_id,
                },
            ) => CommandLine::new("netsh", &["advfirewall", "firewall", "add", "rule"])
                .arg(format!("name=Block {hardware_id}"))
                .arg("dir=in")
                .arg("action=block")
                .arg(format!("remoteip={address}")),
            (
                Flavor::Linux,
                AdminCommand::BlockAddress {
                    address,
                    hardware_id,
                },
            ) => CommandLine::new("iptables", &["-I", "INPUT", "-s"])
                .arg(address.to_string())
                .arg("-m")
                .arg("comment")
                .arg("--comment")
                .arg(format!("Block {hardware_id}"))
                .arg("-j")
                .arg("DROP"),
            (Flavor::Bsd, AdminCommand::BlockAddress { address, .. }) => {
                CommandLine::new("pfctl", &["-t", "lanwatch_blocked", "-T", "add"])
                    .arg(address.to_string())
            }
            (Flavor::Windows, AdminCommand::SetInterface { interface, enabled }) => {
                CommandLine::new("netsh", &["interface", "ipv4", "set", "interface"])
                    .arg(interface.clone())
                    .arg(if *enabled { "admin=enable" } else { "admin=disable" })
            }
            (Flavor::Linux, AdminCommand::SetInterface { interface, enabled }) => {
                CommandLine::new("ip", &["link", "set", "dev"])
                    .arg(interface.clone())
                    .arg(if *enabled { "up" } else { "down" })
            }
            (Flavor::Bsd, AdminCommand::SetInterface { interface, enabled }) => {
                CommandLine::new("ifconfig", &[])
                    .arg(interface.clone())
                    .arg(if *enabled { "up" } else { "down" })
            }
        }
    }

    /// Run a command under the configured timeout and return its stdout.
    ///
    /// The child is killed if the timeout elapses or the future is dropped.
    async fn run(&self, command: &CommandLine, timeout: Duration) -> Result<String, PlatformError> {
        tracing::debug!(program = command.program, args = ?command.args, "Running platform command");

        let child = Command::new(command.program)
            .args(&command.args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, child)
            .await
            .map_err(|_| PlatformError::Timeout {
                program: command.program.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })?
            .map_err(|e| PlatformError::Spawn {
                program: command.program.to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(PlatformError::Failed {
                program: command.program.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Platform for SystemPlatform {
    async fn neighbor_table(&self) -> Result<String, PlatformError> {
        self.run(&self.neighbor_table_command(), self.command_timeout)
            .await
    }

    async fn reverse_lookup(&self, address: Ipv4Addr) -> Result<String, PlatformError> {
        let command = CommandLine::new("nslookup", &[]).arg(address.to_string());
        self.run(&command, self.command_timeout).await
    }

    async fn active_interface(&self) -> Result<String, PlatformError> {
        match self.flavor {
            Flavor::Windows => {
                let command =
                    CommandLine::new("netsh", &["interface", "ipv4", "show", "interfaces"]);
                let out = self.run(&command, self.command_timeout).await?;
                parse_netsh_interfaces(&out).ok_or(PlatformError::NoInterface)
            }
            Flavor::Linux => {
                let command = CommandLine::new("ip", &["route", "show", "default"]);
                let out = self.run(&command, self.command_timeout).await?;
                parse_default_route_device(&out).ok_or(PlatformError::NoInterface)
            }
            Flavor::Bsd => {
                let command = CommandLine::new("route", &["-n", "get", "default"]);
                let out = self.run(&command, self.command_timeout).await?;
                parse_route_get_interface(&out).ok_or(PlatformError::NoInterface)
            }
        }
    }

    async fn run_admin(&self, command: &AdminCommand) -> Result<(), PlatformError> {
        self.run(&self.admin_command(command), self.command_timeout)
            .await
            .map(|_| ())
    }

    async fn hotspot_status(&self) -> Result<bool, PlatformError> {
        match self.flavor {
            Flavor::Windows => {
                let command = CommandLine::new("netsh", &["wlan", "show", "hostednetwork"]);
                let out = self.run(&command, self.command_timeout).await?;
                Ok(hosted_network_started(&out))
            }
            Flavor::Linux => {
                let command =
                    CommandLine::new("nmcli", &["-t", "-f", "NAME", "connection", "show", "--active"]);
                let out = self.run(&command, self.command_timeout).await?;
                Ok(out.lines().any(|l| l.trim() == "Hotspot"))
            }
            Flavor::Bsd => Err(PlatformError::Unsupported("hotspot status")),
        }
    }

    async fn start_hotspot(&self) -> Result<(), PlatformError> {
        let command = match self.flavor {
            Flavor::Windows => CommandLine::new("netsh", &["wlan", "start", "hostednetwork"]),
            Flavor::Linux => CommandLine::new("nmcli", &["device", "wifi", "hotspot"]),
            Flavor::Bsd => return Err(PlatformError::Unsupported("hotspot")),
        };
        self.run(&command, self.command_timeout).await.map(|_| ())
    }
}

/// Index of the first connected, non-loopback row of
/// `netsh interface ipv4 show interfaces`.
fn parse_netsh_interfaces(out: &str) -> Option<String> {
    out.lines()
        .filter(|l| l.contains("Connected") && !l.contains("Loopback"))
        .find_map(|l| {
            let idx = l.split_whitespace().next()?;
            idx.chars().all(|c| c.is_ascii_digit()).then(|| idx.to_string())
        })
}

/// `default via 192.168.1.1 dev wlan0 proto dhcp ...` → `wlan0`.
fn parse_default_route_device(out: &str) -> Option<String> {
    out.lines().find_map(|l| {
        let mut tokens = l.split_whitespace();
        tokens.find(|t| *t == "dev")?;
        tokens.next().map(str::to_string)
    })
}

/// `interface: en0` line of `route -n get default`.
fn parse_route_get_interface(out: &str) -> Option<String> {
    out.lines().find_map(|l| {
        l.trim()
            .strip_prefix("interface:")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    })
}

/// Whether `netsh wlan show hostednetwork` reports the network as started.
fn hosted_network_started(out: &str) -> bool {
    out.lines().any(|l| {
        let mut parts = l.splitn(2, ':');
        let key = parts.next().unwrap_or_default().trim();
        let value = parts.next().unwrap_or_default().trim();
        key == "Status" && value == "Started"
    })
}
