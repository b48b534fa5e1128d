use std::io;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::error::ConnectError;
use crate::link::{LinkConfig, PortOpener, Transport};

/// Opens `dev` at 8N1, no flow control.
pub fn open_port(dev: &str, config: &LinkConfig) -> Result<Box<dyn SerialPort>, ConnectError> {
    serialport::new(dev, config.baud)
        .timeout(config.timeout)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open()
        .map_err(|e| ConnectError::from_serial(dev, e))
}

/// Host-visible serial devices. Enumeration failures read as "none".
pub fn list_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            debug!(error = %e, "port enumeration failed");
            Vec::new()
        }
    }
}

impl Transport for Box<dyn SerialPort> {
    fn bytes_available(&self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn clear_buffers(&self) -> io::Result<()> {
        self.clear(ClearBuffer::All)?;
        Ok(())
    }
}

/// The real serial ports of this host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortOpener for SystemPorts {
    fn list(&self) -> Vec<String> {
        list_ports()
    }

    fn open(&self, port: &str, config: &LinkConfig) -> Result<Box<dyn Transport>, ConnectError> {
        let port = open_port(port, config)?;
        Ok(Box::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectErrorKind;

    #[test]
    fn missing_device_fails_to_open() {
        let err = SystemPorts
            .open("/dev/esp32-link-does-not-exist", &LinkConfig::default())
            .err()
            .unwrap();
        assert_ne!(err.kind, ConnectErrorKind::Busy);
        assert_eq!(err.port, "/dev/esp32-link-does-not-exist");
    }

    #[test]
    fn listing_never_fails() {
        // Whatever the host has, this must not panic.
        let _ = list_ports();
    }
}
