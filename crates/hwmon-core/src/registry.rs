//! Operator-supplied mapping from telemetry roles to sensor identifiers

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::sensor::SensorId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No sensor configured for role {0}")]
    Unset(Role),
}

/// One of the eight telemetry channels sent to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    CpuLoad,
    CpuTemp,
    MemLoad,
    MemValue,
    Gpu1Load,
    Gpu1Temp,
    Gpu2Load,
    Gpu2Temp,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::CpuLoad,
        Role::CpuTemp,
        Role::MemLoad,
        Role::MemValue,
        Role::Gpu1Load,
        Role::Gpu1Temp,
        Role::Gpu2Load,
        Role::Gpu2Temp,
    ];

    /// Roles rendered inside a TXT line with a prefix and suffix
    pub const TEXT: [Role; 4] = [Role::CpuTemp, Role::MemValue, Role::Gpu1Temp, Role::Gpu2Temp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CpuLoad => "cpu-load",
            Self::CpuTemp => "cpu-temp",
            Self::MemLoad => "mem-load",
            Self::MemValue => "mem-value",
            Self::Gpu1Load => "gpu1-load",
            Self::Gpu1Temp => "gpu1-temp",
            Self::Gpu2Load => "gpu2-load",
            Self::Gpu2Temp => "gpu2-temp",
        }
    }

    pub fn is_text(&self) -> bool {
        Self::TEXT.contains(self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text surrounding a value on a TXT line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextParts {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
}

impl TextParts {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }
}

/// Immutable role -> sensor mapping built once at startup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorRegistry {
    ids: BTreeMap<Role, SensorId>,
    text: BTreeMap<Role, TextParts>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a role to a sensor. Empty identifiers leave the role unset.
    pub fn with_sensor(mut self, role: Role, id: impl Into<SensorId>) -> Self {
        let id = id.into();
        if id.is_empty() {
            self.ids.remove(&role);
        } else {
            self.ids.insert(role, id);
        }
        self
    }

    /// Set the prefix/suffix for a TXT role. Ignored for numeric roles.
    pub fn with_text(mut self, role: Role, parts: TextParts) -> Self {
        if role.is_text() {
            self.text.insert(role, parts);
        }
        self
    }

    pub fn resolve(&self, role: Role) -> Result<&SensorId, RegistryError> {
        self.ids.get(&role).ok_or(RegistryError::Unset(role))
    }

    /// Distinct identifiers the tree walker has to look for
    pub fn required_ids(&self) -> BTreeSet<SensorId> {
        self.ids.values().cloned().collect()
    }

    /// Prefix/suffix for a TXT role, `None` for numeric roles or when unset
    pub fn text_parts(&self, role: Role) -> Option<&TextParts> {
        self.text.get(&role)
    }

    /// Roles that have no sensor configured
    pub fn unset_roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| !self.ids.contains_key(role))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_unset_role() {
        let registry = SensorRegistry::new().with_sensor(Role::CpuLoad, "/cpu/0/load/0");
        assert_eq!(registry.resolve(Role::CpuLoad).unwrap().as_str(), "/cpu/0/load/0");
        assert_eq!(
            registry.resolve(Role::Gpu2Temp),
            Err(RegistryError::Unset(Role::Gpu2Temp))
        );
    }

    #[test]
    fn test_required_ids_are_distinct() {
        // Both GPU slots pointing at the same card
        let registry = SensorRegistry::new()
            .with_sensor(Role::Gpu1Load, "/gpu-nvidia/0/load/0")
            .with_sensor(Role::Gpu2Load, "/gpu-nvidia/0/load/0")
            .with_sensor(Role::CpuLoad, "/cpu/0/load/0")
            .with_sensor(Role::MemLoad, "");

        let ids = registry.required_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&SensorId::new("/cpu/0/load/0")));
        assert!(registry.resolve(Role::MemLoad).is_err());
    }

    #[test]
    fn test_text_parts_only_for_text_roles() {
        let registry = SensorRegistry::new()
            .with_text(Role::CpuTemp, TextParts::new("CPU ", "C"))
            .with_text(Role::CpuLoad, TextParts::new("ignored", ""));

        assert_eq!(registry.text_parts(Role::CpuTemp), Some(&TextParts::new("CPU ", "C")));
        assert_eq!(registry.text_parts(Role::CpuLoad), None);
        assert_eq!(registry.text_parts(Role::MemValue), None);
    }

    #[test]
    fn test_unset_roles() {
        let registry = SensorRegistry::new().with_sensor(Role::CpuLoad, "a");
        let unset = registry.unset_roles();
        assert_eq!(unset.len(), 7);
        assert!(!unset.contains(&Role::CpuLoad));
    }
}
