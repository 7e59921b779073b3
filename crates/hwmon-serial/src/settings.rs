//! Serial line settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::transport::TransportError;

/// Default read/write timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    #[default]
    #[serde(alias = "None")]
    None,
    #[serde(alias = "Odd")]
    Odd,
    #[serde(alias = "Even")]
    Even,
    #[serde(alias = "Mark")]
    Mark,
    #[serde(alias = "Space")]
    Space,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    #[serde(alias = "None")]
    None,
    #[default]
    #[serde(alias = "One")]
    One,
    #[serde(alias = "Two")]
    Two,
    #[serde(alias = "OnePointFive")]
    OnePointFive,
}

/// Everything needed to open the device port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Port name ("COM3", "/dev/ttyUSB0")
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "COM1".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl SerialSettings {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Self::default()
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Check that the port can be opened with these line settings
    pub fn validate(&self) -> Result<(), TransportError> {
        self.serial_data_bits()?;
        self.serial_parity()?;
        self.serial_stop_bits()?;
        Ok(())
    }

    pub(crate) fn serial_data_bits(&self) -> Result<serialport::DataBits, TransportError> {
        match self.data_bits {
            5 => Ok(serialport::DataBits::Five),
            6 => Ok(serialport::DataBits::Six),
            7 => Ok(serialport::DataBits::Seven),
            8 => Ok(serialport::DataBits::Eight),
            other => Err(TransportError::Unsupported(format!("{} data bits", other))),
        }
    }

    pub(crate) fn serial_parity(&self) -> Result<serialport::Parity, TransportError> {
        match self.parity {
            Parity::None => Ok(serialport::Parity::None),
            Parity::Odd => Ok(serialport::Parity::Odd),
            Parity::Even => Ok(serialport::Parity::Even),
            other => Err(TransportError::Unsupported(format!("{:?} parity", other))),
        }
    }

    pub(crate) fn serial_stop_bits(&self) -> Result<serialport::StopBits, TransportError> {
        match self.stop_bits {
            StopBits::One => Ok(serialport::StopBits::One),
            StopBits::Two => Ok(serialport::StopBits::Two),
            other => Err(TransportError::Unsupported(format!("{:?} stop bits", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SerialSettings::default();
        assert_eq!(settings.port, "COM1");
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.write_timeout(), Duration::from_millis(1000));
    }

    #[test]
    fn test_supported_line_settings() {
        let mut settings = SerialSettings::new("/dev/ttyUSB0", 115200);
        settings.parity = Parity::Even;
        settings.stop_bits = StopBits::Two;
        settings.data_bits = 7;
        assert_eq!(settings.serial_parity().unwrap(), serialport::Parity::Even);
        assert_eq!(settings.serial_stop_bits().unwrap(), serialport::StopBits::Two);
        assert_eq!(settings.serial_data_bits().unwrap(), serialport::DataBits::Seven);
    }

    #[test]
    fn test_unsupported_line_settings() {
        let mut settings = SerialSettings::default();
        settings.parity = Parity::Mark;
        settings.stop_bits = StopBits::OnePointFive;
        settings.data_bits = 9;
        assert!(matches!(settings.serial_parity(), Err(TransportError::Unsupported(_))));
        assert!(matches!(settings.serial_stop_bits(), Err(TransportError::Unsupported(_))));
        assert!(matches!(settings.serial_data_bits(), Err(TransportError::Unsupported(_))));
    }

    #[test]
    fn test_validate() {
        assert!(SerialSettings::default().validate().is_ok());

        for parity in [Parity::Mark, Parity::Space] {
            let settings = SerialSettings {
                parity,
                ..SerialSettings::default()
            };
            assert!(matches!(settings.validate(), Err(TransportError::Unsupported(_))));
        }
        for stop_bits in [StopBits::None, StopBits::OnePointFive] {
            let settings = SerialSettings {
                stop_bits,
                ..SerialSettings::default()
            };
            assert!(matches!(settings.validate(), Err(TransportError::Unsupported(_))));
        }
    }
}
