//! Discovery scheduling.
//!
//! Cycles run on a fixed period and on demand, but never overlap. A request
//! that arrives while a cycle is in flight joins that cycle and receives its
//! outcome instead of starting another one. The cycle itself runs in its own
//! task, so a caller that goes away mid-cycle cannot abort it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lanwatch_core::{Device, PushEvent};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use crate::engine::DiscoveryEngine;
use crate::error::MonitorError;
use crate::hub::BroadcastHub;
use crate::reconcile::{AlertSink, PresenceReconciler};

/// Outcome shared by every caller that awaited the same cycle.
pub type CycleOutcome = Result<Arc<Vec<Device>>, Arc<MonitorError>>;

type InFlight = watch::Receiver<Option<CycleOutcome>>;

/// Single-flight discovery driver. Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct ScanScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    engine: DiscoveryEngine,
    reconciler: Mutex<PresenceReconciler>,
    hub: BroadcastHub,
    alerts: Arc<dyn AlertSink>,
    period: Duration,
    in_flight: Mutex<Option<InFlight>>,
}

/// Clears the in-flight slot even if the cycle task panics.
struct InFlightGuard(Arc<SchedulerInner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.lock().take();
    }
}

impl ScanScheduler {
    pub fn new(
        engine: DiscoveryEngine,
        hub: BroadcastHub,
        alerts: Arc<dyn AlertSink>,
        period: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                engine,
                reconciler: Mutex::new(PresenceReconciler::new()),
                hub,
                alerts,
                period,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Run a discovery cycle now, or join the one already running.
    pub async fn scan_now(&self) -> CycleOutcome {
        let mut outcome = {
            let mut in_flight = self.inner.in_flight.lock();
            match in_flight.as_ref() {
                Some(rx) => {
                    tracing::debug!("Joining in-flight discovery cycle");
                    rx.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    *in_flight = Some(rx.clone());

                    let guard = InFlightGuard(self.inner.clone());
                    tokio::spawn(async move {
                        let result = guard.0.run_cycle().await;
                        drop(guard);
                        let _ = tx.send(Some(result));
                    });
                    rx
                }
            }
        };

        let result = match outcome.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        result.unwrap_or_else(|| Err(Arc::new(MonitorError::CycleAborted)))
    }

    /// Drive scheduled cycles forever. Failures are logged and the next tick
    /// retries; there is no immediate retry.
    pub async fn run(&self) {
        let mut ticker = interval(self.inner.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.inner.period.as_secs_f64(),
            "Scheduler started"
        );

        loop {
            ticker.tick().await;
            tracing::debug!("Scheduled discovery triggered");
            // Errors were already logged by the cycle itself.
            let _ = self.scan_now().await;
        }
    }
}

impl SchedulerInner {
    /// Execute one cycle: discover → reconcile → alert → publish.
    async fn run_cycle(&self) -> CycleOutcome {
        let cycle_id = Uuid::new_v4();
        let start = Instant::now();
        tracing::debug!(cycle_id = %cycle_id, "Discovery cycle started");

        let devices = match self.engine.run_cycle().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::error!(
                    cycle_id = %cycle_id,
                    error = %e,
                    "Discovery cycle failed, keeping previous snapshot"
                );
                return Err(Arc::new(e));
            }
        };

        let new_untrusted = self.reconciler.lock().reconcile(&devices);
        for device in &new_untrusted {
            self.alerts.new_device(device);
        }

        let observers = self.hub.publish(PushEvent::Devices(devices.clone()));

        tracing::info!(
            cycle_id = %cycle_id,
            devices = devices.len(),
            new_untrusted = new_untrusted.len(),
            observers,
            duration_ms = start.elapsed().as_millis() as u64,
            "Discovery cycle complete"
        );

        Ok(Arc::new(devices))
    }
}
