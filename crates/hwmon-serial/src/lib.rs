//! hwmon-link serial - write-only transport to the display device
//!
//! The link is opened lazily by the monitor worker and closed on any fault.
//! `Connector`/`SerialLink` are traits so the worker can be driven by
//! scripted links in tests.

pub mod settings;
pub mod transport;

pub use settings::{Parity, SerialSettings, StopBits, DEFAULT_TIMEOUT_MS};
pub use transport::{Connector, SerialLink, SerialPortConnector, SerialPortLink, TransportError};
