//! hwmon-link core - sensor tree, role registry, and wire frames
//!
//! This crate is free of I/O and provides:
//! - Hardware tree types and the `HardwareProvider` trait implemented by live providers
//! - The role -> sensor registry built from configuration
//! - Tree traversal producing per-cycle snapshots and diagnostic listings
//! - The fixed-layout text frame sent to the display device

pub mod frame;
pub mod registry;
pub mod sensor;
pub mod walker;

pub use frame::{render, tail, Frame, FrameError, LINE_ENDING};
pub use registry::{RegistryError, Role, SensorRegistry, TextParts};
pub use sensor::{HardwareNode, HardwareProvider, HardwareTree, ProviderError, Sensor, SensorId, SensorKind};
pub use walker::{
    collect, list_all_sensors, list_configured_sensors, render_digits, visit_nodes, visit_sensors,
    SensorListing, Snapshot,
};
