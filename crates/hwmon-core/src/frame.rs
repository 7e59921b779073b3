//! Wire frame rendering for the display device
//!
//! A frame is eight CRLF-terminated lines. The first four carry the full
//! three-digit value of a load channel; the last four embed the last two
//! digits of a temperature/value channel between operator-defined text.

use thiserror::Error;
use tracing::warn;

use crate::registry::{RegistryError, Role, SensorRegistry};
use crate::walker::Snapshot;

/// Line terminator expected by the device
pub const LINE_ENDING: &str = "\r\n";

/// Width of the digit slot inside TXT lines
pub const TEXT_SLOT_WIDTH: usize = 2;

const NUMERIC_LINES: [(&str, Role); 4] = [
    ("CPU", Role::CpuLoad),
    ("MEM", Role::MemLoad),
    ("GPU1", Role::Gpu1Load),
    ("GPU2", Role::Gpu2Load),
];

const TEXT_LINES: [(&str, Role); 4] = [
    ("CPUTXT", Role::CpuTemp),
    ("MEMTXT", Role::MemValue),
    ("GPU1TXT", Role::Gpu1Temp),
    ("GPU2TXT", Role::Gpu2Temp),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Sensor for role {0} not found in current readings")]
    MissingSensor(Role),
    #[error("No sensor configured for role {0}")]
    Unconfigured(Role),
    #[error("Value {value:?} for role {role} is too short for a text slot")]
    ValueTooShort { role: Role, value: String },
}

impl From<RegistryError> for FrameError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unset(role) => FrameError::Unconfigured(role),
        }
    }
}

/// Drop the leading character of a rendered value.
///
/// `"045"` becomes `"45"`; a four-digit `"1234"` becomes `"234"`.
/// Returns `None` for strings shorter than two characters.
pub fn tail(digits: &str) -> Option<&str> {
    let mut chars = digits.char_indices();
    chars.next()?;
    let (start, _) = chars.next()?;
    Some(&digits[start..])
}

/// One cycle's payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Single-line form for logs, lines separated by " | "
    pub fn echo(&self) -> String {
        self.0.trim_end_matches(LINE_ENDING).replace(LINE_ENDING, " | ")
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn lookup<'a>(snapshot: &'a Snapshot, registry: &SensorRegistry, role: Role) -> Result<&'a str, FrameError> {
    let id = registry.resolve(role)?;
    snapshot.get(id).ok_or(FrameError::MissingSensor(role))
}

/// Render a frame from a snapshot. Fails without output if any role is missing.
pub fn render(snapshot: &Snapshot, registry: &SensorRegistry) -> Result<Frame, FrameError> {
    let mut out = String::with_capacity(128);

    for (label, role) in NUMERIC_LINES {
        let value = lookup(snapshot, registry, role)?;
        out.push_str(label);
        out.push(':');
        out.push_str(value);
        out.push_str(LINE_ENDING);
    }

    for (label, role) in TEXT_LINES {
        let value = lookup(snapshot, registry, role)?;
        let digits = tail(value).ok_or_else(|| FrameError::ValueTooShort {
            role,
            value: value.to_string(),
        })?;
        if digits.len() > TEXT_SLOT_WIDTH {
            warn!(role = %role, value = %value, "Value overflows the two-digit text slot");
        }
        let parts = registry.text_parts(role);
        out.push_str(label);
        out.push(':');
        out.push_str(parts.map(|p| p.prefix.as_str()).unwrap_or_default());
        out.push_str(digits);
        out.push_str(parts.map(|p| p.suffix.as_str()).unwrap_or_default());
        out.push_str(LINE_ENDING);
    }

    Ok(Frame(out))
}
