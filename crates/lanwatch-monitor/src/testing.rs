//! Scriptable in-memory `Platform` for unit tests.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::platform::{AdminCommand, Platform, PlatformError};

#[derive(Default)]
pub struct StubPlatform {
    dump: Mutex<Option<String>>,
    dump_delay: Duration,
    names: HashMap<Ipv4Addr, String>,
    lookup_delay: Duration,
    interface: Option<String>,
    fail_admin: bool,
    admin_calls: Mutex<Vec<AdminCommand>>,
    dump_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubPlatform {
    pub fn with_dump(self, dump: &str) -> Self {
        self.set_dump(Some(dump));
        self
    }

    pub fn with_dump_delay(mut self, delay: Duration) -> Self {
        self.dump_delay = delay;
        self
    }

    pub fn with_name(mut self, ip: &str, name: &str) -> Self {
        self.names.insert(ip.parse().unwrap(), name.to_string());
        self
    }

    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    pub fn with_interface(mut self, interface: &str) -> Self {
        self.interface = Some(interface.to_string());
        self
    }

    pub fn failing_admin(mut self) -> Self {
        self.fail_admin = true;
        self
    }

    /// `None` makes the next dumps fail.
    pub fn set_dump(&self, dump: Option<&str>) {
        *self.dump.lock() = dump.map(str::to_string);
    }

    pub fn admin_calls(&self) -> Vec<AdminCommand> {
        self.admin_calls.lock().clone()
    }

    pub fn dump_calls(&self) -> usize {
        self.dump_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn failed(program: &str) -> PlatformError {
    PlatformError::Failed {
        program: program.to_string(),
        code: 1,
        stderr: "stubbed failure".to_string(),
    }
}

#[async_trait]
impl Platform for StubPlatform {
    async fn neighbor_table(&self) -> Result<String, PlatformError> {
        self.dump_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.dump_delay.is_zero() {
            tokio::time::sleep(self.dump_delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.dump.lock().clone().ok_or_else(|| failed("arp"))
    }

    async fn reverse_lookup(&self, address: Ipv4Addr) -> Result<String, PlatformError> {
        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        self.names
            .get(&address)
            .map(|name| format!("Name:    {name}\nAddress:  {address}\n"))
            .ok_or_else(|| failed("nslookup"))
    }

    async fn active_interface(&self) -> Result<String, PlatformError> {
        self.interface.clone().ok_or(PlatformError::NoInterface)
    }

    async fn run_admin(&self, command: &AdminCommand) -> Result<(), PlatformError> {
        self.admin_calls.lock().push(command.clone());
        if self.fail_admin {
            return Err(failed("admin"));
        }
        Ok(())
    }

    async fn hotspot_status(&self) -> Result<bool, PlatformError> {
        Ok(false)
    }

    async fn start_hotspot(&self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("hotspot"))
    }
}
