//! Service lifecycle around the transport worker

use anyhow::{Context, Result};
use hwmon_core::HardwareProvider;
use hwmon_serial::Connector;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::worker::{TransportWorker, WorkerEvent};

/// How long `stop` waits for the worker before giving up on it
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5000;

/// Outcome of stopping the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Worker finished within the timeout
    Joined,
    /// Worker did not finish in time and was aborted
    Unresponsive,
}

/// Owns the worker task and its shutdown signal
pub struct MonitorService {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
    events: broadcast::Receiver<WorkerEvent>,
    shutdown_timeout: Duration,
}

impl MonitorService {
    /// Start the worker on the current tokio runtime.
    ///
    /// Fails only if there is no runtime to run the worker on.
    pub fn start<P, C>(worker: TransportWorker<P, C>, shutdown_timeout: Duration) -> Result<Self>
    where
        P: HardwareProvider + 'static,
        C: Connector + 'static,
    {
        tokio::runtime::Handle::try_current().context("No async runtime available for the monitor worker")?;

        let (shutdown, rx) = watch::channel(false);
        let events = worker.subscribe();
        let handle = worker.spawn(rx);

        info!("Hardware monitoring service started");
        Ok(Self {
            shutdown,
            handle,
            events,
            shutdown_timeout,
        })
    }

    /// Worker events received since start
    pub fn events(&mut self) -> &mut broadcast::Receiver<WorkerEvent> {
        &mut self.events
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal shutdown and wait for the worker, bounded by the shutdown timeout
    pub async fn stop(self) -> StopOutcome {
        let Self {
            shutdown,
            mut handle,
            shutdown_timeout,
            ..
        } = self;

        let _ = shutdown.send(true);

        match tokio::time::timeout(shutdown_timeout, &mut handle).await {
            Ok(Ok(())) => {
                info!("Hardware monitoring service stopped");
                StopOutcome::Joined
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Monitor worker ended abnormally");
                StopOutcome::Joined
            }
            Err(_) => {
                warn!(
                    timeout_ms = shutdown_timeout.as_millis() as u64,
                    "Monitor worker did not stop in time, aborting"
                );
                handle.abort();
                StopOutcome::Unresponsive
            }
        }
    }
}
