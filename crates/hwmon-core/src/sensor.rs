//! Hardware tree types exposed by a sensor provider

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Hardware provider unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to refresh hardware sensors: {0}")]
    Refresh(String),
}

/// Provider-defined sensor identifier (e.g. "/cpu/0/load/0")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorId(pub String);

impl SensorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for SensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SensorId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SensorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What a sensor measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Utilization in percent
    Load,
    /// Temperature in degrees Celsius
    Temperature,
    /// Amount of data in GiB
    Data,
}

impl SensorKind {
    /// Path segment used when building sensor identifiers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Temperature => "temperature",
            Self::Data => "data",
        }
    }
}

/// A single sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub name: String,
    pub kind: SensorKind,
    /// Current value, `None` when the metric is unavailable
    pub value: Option<f32>,
}

impl Sensor {
    pub fn new(id: impl Into<SensorId>, name: impl Into<String>, kind: SensorKind, value: Option<f32>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            value,
        }
    }

    /// Value if it is a usable number (NaN and infinities are treated as unavailable)
    pub fn reading(&self) -> Option<f32> {
        self.value.filter(|v| v.is_finite())
    }
}

/// A hardware component with its sensors and sub-hardware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareNode {
    /// Identifier prefix shared by this node's sensors (e.g. "/cpu/0")
    pub id: String,
    pub name: String,
    pub sensors: Vec<Sensor>,
    pub children: Vec<HardwareNode>,
}

impl HardwareNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sensors: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Build the identifier of the `index`-th sensor of `kind` on this node
    pub fn sensor_id(&self, kind: SensorKind, index: usize) -> SensorId {
        SensorId(format!("{}/{}/{}", self.id, kind.as_str(), index))
    }

    /// Append a sensor whose identifier is derived from this node
    pub fn push_sensor(&mut self, kind: SensorKind, index: usize, name: impl Into<String>, value: Option<f32>) {
        let id = self.sensor_id(kind, index);
        self.sensors.push(Sensor::new(id, name, kind, value));
    }

    pub fn with_sensor(mut self, sensor: Sensor) -> Self {
        self.sensors.push(sensor);
        self
    }

    pub fn with_child(mut self, child: HardwareNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Immutable view of the hardware tree taken after a refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareTree {
    roots: Vec<HardwareNode>,
}

impl HardwareTree {
    pub fn new(roots: Vec<HardwareNode>) -> Self {
        Self { roots }
    }

    /// Top-level hardware nodes
    pub fn roots(&self) -> &[HardwareNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Source of live hardware readings.
///
/// Opening happens in the implementor's constructor. Every call to
/// [`refresh`](HardwareProvider::refresh) updates all sensor values and
/// returns a fresh tree; callers never read values without refreshing first.
pub trait HardwareProvider: Send {
    /// Update live values and return the current tree
    fn refresh(&mut self) -> Result<HardwareTree, ProviderError>;

    /// Release provider resources
    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_id_from_node() {
        let node = HardwareNode::new("/cpu/0", "CPU");
        assert_eq!(node.sensor_id(SensorKind::Load, 0).as_str(), "/cpu/0/load/0");
        assert_eq!(
            node.sensor_id(SensorKind::Temperature, 3).as_str(),
            "/cpu/0/temperature/3"
        );
    }

    #[test]
    fn test_reading_filters_nan() {
        let ok = Sensor::new("/ram/load/0", "Memory", SensorKind::Load, Some(42.5));
        let nan = Sensor::new("/ram/load/0", "Memory", SensorKind::Load, Some(f32::NAN));
        let missing = Sensor::new("/ram/load/0", "Memory", SensorKind::Load, None);
        assert_eq!(ok.reading(), Some(42.5));
        assert_eq!(nan.reading(), None);
        assert_eq!(missing.reading(), None);
    }

    #[test]
    fn test_empty_sensor_id() {
        assert!(SensorId::new("").is_empty());
        assert!(SensorId::new("  ").is_empty());
        assert!(!SensorId::new("/gpu-nvidia/0/load/0").is_empty());
    }
}
