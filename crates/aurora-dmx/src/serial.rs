//! DMX512 over a serial port (USB-DMX adapters)
//!
//! DMX512 line settings are 8 data bits, no parity, two stop bits. The
//! break before each frame is driven through the port's break control.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::Write;
use std::time::Duration;
use tracing::debug;

use crate::error::TransportError;
use crate::link::SerialLink;

/// Baud rate the port is opened at before `configure_baud`
pub const DMX_BAUD: u32 = 250_000;

const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// A [`SerialLink`] on a real serial device (e.g. `/dev/ttyUSB0`)
pub struct SerialPortLink {
    path: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortLink {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            port: None,
        }
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port
            .as_mut()
            .ok_or_else(|| TransportError::Unavailable(format!("{} is not open", self.path)))
    }
}

impl std::fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortLink")
            .field("path", &self.path)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialLink for SerialPortLink {
    fn name(&self) -> &str {
        &self.path
    }

    fn open(&mut self) -> Result<(), TransportError> {
        let port = serialport::new(self.path.as_str(), DMX_BAUD)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::Two)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|e| TransportError::Unavailable(format!("{}: {}", self.path, e)))?;

        debug!("Opened serial port {}", self.path);
        self.port = Some(port);
        Ok(())
    }

    fn configure_baud(&mut self, rate: u32) -> Result<(), TransportError> {
        self.port()?.set_baud_rate(rate)?;
        Ok(())
    }

    fn assert_break(&mut self) -> Result<(), TransportError> {
        self.port()?.set_break()?;
        Ok(())
    }

    fn clear_break(&mut self) -> Result<(), TransportError> {
        self.port()?.clear_break()?;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        self.port = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_device_is_unavailable() {
        let mut link = SerialPortLink::new("/dev/aurora-no-such-port");
        assert!(link.line_control());
        assert!(matches!(link.open(), Err(TransportError::Unavailable(_))));
    }

    #[test]
    fn test_line_control_requires_open() {
        let mut link = SerialPortLink::new("/dev/aurora-no-such-port");
        assert!(matches!(
            link.configure_baud(DMX_BAUD),
            Err(TransportError::Unavailable(_))
        ));
        assert!(matches!(link.assert_break(), Err(TransportError::Unavailable(_))));
        assert!(link.write(&[0; 513]).is_err());
    }
}
