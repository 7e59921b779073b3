//! Transport worker: keeps the device link alive and streams one frame per interval
//!
//! ```text
//! Stopped -> Connecting -> Active <-> Retrying -> ... -> Stopped
//! ```
//!
//! Any failure while connecting or during a cycle (refresh, walk, format,
//! write) closes the link and moves to `Retrying`, which waits the backoff
//! delay before connecting again. Shutdown is observed only in the two timed
//! waits, and both wake up immediately on it. Opens and cycles run to
//! completion on the blocking pool.

use hwmon_core::{collect, render, FrameError, HardwareProvider, ProviderError, SensorId, SensorRegistry};
use hwmon_serial::{Connector, SerialLink, SerialSettings, TransportError};
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Delay between frames
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Delay before reconnecting after a failure
pub const DEFAULT_BACKOFF_MS: u64 = 3000;

#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Cycle panicked: {0}")]
    Panicked(String),
}

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Stopped,
    Connecting,
    Active,
    Retrying,
}

/// Events published by the worker
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    StateChanged(WorkerState),
    FrameSent { bytes: usize },
    CycleFailed { reason: String },
}

/// Worker timing and port settings
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub serial: SerialSettings,
    pub interval: Duration,
    pub backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

/// Single-owner worker driving the provider and the serial link.
///
/// Provider, connector and link are moved onto the blocking pool for each
/// refresh/write or open and handed back afterwards, so slow hardware or a
/// stuck port never holds a runtime thread. A slot is only empty while its
/// blocking call runs.
pub struct TransportWorker<P, C: Connector> {
    config: WorkerConfig,
    registry: Arc<SensorRegistry>,
    wanted: Arc<BTreeSet<SensorId>>,
    provider: Option<P>,
    connector: Option<C>,
    link: Option<C::Link>,
    state: WorkerState,
    events: broadcast::Sender<WorkerEvent>,
}

impl<P, C> TransportWorker<P, C>
where
    P: HardwareProvider + 'static,
    C: Connector + 'static,
{
    pub fn new(config: WorkerConfig, registry: SensorRegistry, provider: P, connector: C) -> Self {
        let (events, _) = broadcast::channel(100);
        let wanted = registry.required_ids();
        for role in registry.unset_roles() {
            warn!(role = %role, "No sensor configured for role");
        }
        Self {
            config,
            registry: Arc::new(registry),
            wanted: Arc::new(wanted),
            provider: Some(provider),
            connector: Some(connector),
            link: None,
            state: WorkerState::Stopped,
            events,
        }
    }

    /// Subscribe to worker events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn set_state(&mut self, state: WorkerState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "Worker state change");
            self.state = state;
            let _ = self.events.send(WorkerEvent::StateChanged(state));
        }
    }

    fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            if link.is_open() {
                link.close();
            }
        }
    }

    /// Open the port on the blocking pool.
    ///
    /// Returns `None` if the connector was lost with its task.
    async fn connect(&mut self) -> Option<Result<C::Link, TransportError>> {
        let mut connector = self.connector.take()?;
        let settings = self.config.serial.clone();

        let task = tokio::task::spawn_blocking(move || {
            let result = catch_unwind(AssertUnwindSafe(|| connector.open(&settings))).unwrap_or_else(|payload| {
                Err(TransportError::PortUnavailable {
                    port: settings.port.clone(),
                    reason: panic_message(payload),
                })
            });
            (connector, result)
        });

        match task.await {
            Ok((connector, result)) => {
                self.connector = Some(connector);
                Some(result)
            }
            Err(e) => {
                error!(error = %e, "Serial open task failed");
                None
            }
        }
    }

    /// Refresh, walk, format and write one frame on the blocking pool.
    ///
    /// Returns `None` if the provider was lost with its task.
    async fn cycle(&mut self) -> Option<Result<usize, CycleError>> {
        let mut provider = self.provider.take()?;
        let mut link = self.link.take();
        let registry = Arc::clone(&self.registry);
        let wanted = Arc::clone(&self.wanted);
        let port = self.config.serial.port.clone();

        let task = tokio::task::spawn_blocking(move || {
            let result = catch_unwind(AssertUnwindSafe(|| {
                run_cycle(&mut provider, link.as_mut(), &registry, &wanted, &port)
            }))
            .unwrap_or_else(|payload| Err(CycleError::Panicked(panic_message(payload))));
            (provider, link, result)
        });

        match task.await {
            Ok((provider, link, result)) => {
                self.provider = Some(provider);
                self.link = link;
                Some(result)
            }
            Err(e) => {
                error!(error = %e, "Monitoring cycle task failed");
                None
            }
        }
    }

    /// Run until `shutdown` becomes true or its sender is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            port = %self.config.serial.port,
            interval_ms = self.config.interval.as_millis() as u64,
            sensors = self.wanted.len(),
            "Transport worker started"
        );
        self.set_state(WorkerState::Connecting);

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.state {
                WorkerState::Connecting => match self.connect().await {
                    Some(Ok(link)) => {
                        info!(port = %self.config.serial.port, "Connected to display device");
                        self.link = Some(link);
                        self.set_state(WorkerState::Active);
                    }
                    Some(Err(e)) => {
                        warn!(
                            port = %self.config.serial.port,
                            error = %e,
                            backoff_ms = self.config.backoff.as_millis() as u64,
                            "Failed to open serial port"
                        );
                        self.set_state(WorkerState::Retrying);
                    }
                    None => break,
                },
                WorkerState::Active => match self.cycle().await {
                    Some(Ok(bytes)) => {
                        let _ = self.events.send(WorkerEvent::FrameSent { bytes });
                        if wait_or_shutdown(self.config.interval, &mut shutdown).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(
                            error = %e,
                            backoff_ms = self.config.backoff.as_millis() as u64,
                            "Monitoring cycle failed"
                        );
                        let _ = self.events.send(WorkerEvent::CycleFailed { reason: e.to_string() });
                        self.close_link();
                        self.set_state(WorkerState::Retrying);
                    }
                    None => break,
                },
                WorkerState::Retrying => {
                    if wait_or_shutdown(self.config.backoff, &mut shutdown).await {
                        break;
                    }
                    self.set_state(WorkerState::Connecting);
                }
                WorkerState::Stopped => break,
            }
        }

        info!("Transport worker stopping");
        self.close_link();
        if let Some(mut provider) = self.provider.take() {
            provider.close();
        }
        self.set_state(WorkerState::Stopped);
    }

    /// Spawn the worker on the current tokio runtime
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

fn run_cycle<P, L>(
    provider: &mut P,
    link: Option<&mut L>,
    registry: &SensorRegistry,
    wanted: &BTreeSet<SensorId>,
    port: &str,
) -> Result<usize, CycleError>
where
    P: HardwareProvider,
    L: SerialLink,
{
    let tree = provider.refresh()?;
    let snapshot = collect(tree.roots(), wanted);
    let frame = render(&snapshot, registry)?;

    let link = link.ok_or(TransportError::Closed)?;
    link.write_frame(frame.as_bytes())?;

    debug!(port = %port, frame = %frame.echo(), "Sent frame");
    Ok(frame.len())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Sleep for `duration`. Returns true if shutdown was requested meanwhile.
async fn wait_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}
