use std::io;
use std::time::Duration;

use crate::error::ConnectError;

#[cfg(test)]
pub mod loopback;

pub const DEFAULT_BAUD: u32 = 115_200;

/// Serial parameters and loop timing for one session.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub baud: u32,
    /// Read/write timeout on the port itself.
    pub timeout: Duration,
    /// Pause after open so the board can finish its reset.
    pub settle: Duration,
    /// Sleep between reader polls.
    pub poll_interval: Duration,
    /// Sleep after a failed read before polling again.
    pub error_backoff: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            timeout: Duration::from_secs(1),
            settle: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// Byte stream to the device.
pub trait Transport: io::Read + io::Write + Send {
    /// Bytes waiting in the input buffer; must not block.
    fn bytes_available(&self) -> io::Result<usize>;
    /// Drop anything still queued in either direction.
    fn clear_buffers(&self) -> io::Result<()>;
}

/// Enumerates and opens ports. The seam between the session and the OS.
pub trait PortOpener {
    fn list(&self) -> Vec<String>;
    fn open(&self, port: &str, config: &LinkConfig) -> Result<Box<dyn Transport>, ConnectError>;
}
