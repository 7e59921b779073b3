//! Serial link to the display device

use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, trace};

use crate::settings::SerialSettings;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Serial port {port} unavailable: {reason}")]
    PortUnavailable { port: String, reason: String },
    #[error("Unsupported serial setting: {0}")]
    Unsupported(String),
    #[error("Write timed out")]
    IoTimeout,
    #[error("Serial I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serial link is closed")]
    Closed,
}

/// An open, write-only channel to the device
pub trait SerialLink: Send {
    /// Write the whole buffer
    fn write_frame(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Close the channel. Closing twice is a no-op.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Opens links with the given settings
pub trait Connector: Send {
    type Link: SerialLink + 'static;

    fn open(&mut self, settings: &SerialSettings) -> Result<Self::Link, TransportError>;
}

/// Connector backed by the `serialport` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortConnector;

impl Connector for SerialPortConnector {
    type Link = SerialPortLink;

    fn open(&mut self, settings: &SerialSettings) -> Result<SerialPortLink, TransportError> {
        let builder = serialport::new(settings.port.as_str(), settings.baud_rate)
            .data_bits(settings.serial_data_bits()?)
            .parity(settings.serial_parity()?)
            .stop_bits(settings.serial_stop_bits()?)
            .flow_control(serialport::FlowControl::None)
            // The device is never read from, so only the write timeout applies
            .timeout(settings.write_timeout());

        let port = builder.open().map_err(|e| TransportError::PortUnavailable {
            port: settings.port.clone(),
            reason: e.description,
        })?;

        debug!(
            port = %settings.port,
            baud = settings.baud_rate,
            data_bits = settings.data_bits,
            parity = ?settings.parity,
            stop_bits = ?settings.stop_bits,
            "Serial port opened"
        );

        Ok(SerialPortLink {
            name: settings.port.clone(),
            port: Some(port),
        })
    }
}

/// Open serial port handle
pub struct SerialPortLink {
    name: String,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialLink for SerialPortLink {
    fn write_frame(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;

        trace!(port = %self.name, len = data.len(), "Writing frame");

        port.write_all(data).map_err(map_io_error)?;
        port.flush().map_err(map_io_error)?;
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the handle closes the OS port
        if self.port.take().is_some() {
            debug!(port = %self.name, "Serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialPortLink {
    fn drop(&mut self) {
        self.close();
    }
}

fn map_io_error(err: io::Error) -> TransportError {
    if err.kind() == io::ErrorKind::TimedOut {
        TransportError::IoTimeout
    } else {
        TransportError::Io(err)
    }
}
