//! hwmon-link monitor - sensor acquisition and display streaming
//!
//! This crate provides:
//! - `SysinfoProvider`, the live hardware tree (CPU, memory, thermal, NVIDIA GPUs)
//! - `TransportWorker`, the connect/stream/retry state machine
//! - `MonitorService`, start/stop around the worker task

#[cfg(feature = "nvidia")]
mod nvidia;
pub mod provider;
pub mod service;
pub mod worker;

pub use provider::{build_tree, GpuReading, Readings, SysinfoProvider, SETTLE_INTERVAL};
pub use service::{MonitorService, StopOutcome, DEFAULT_SHUTDOWN_TIMEOUT_MS};
pub use worker::{
    CycleError, TransportWorker, WorkerConfig, WorkerEvent, WorkerState, DEFAULT_BACKOFF_MS, DEFAULT_INTERVAL_MS,
};
