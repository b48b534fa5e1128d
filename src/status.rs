use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::proto::InboundMessage;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting(String),
    Connected(String),
    Failed(String),
    /// Last `SYSTEM:` note from the board.
    Device(String),
    ReadFault(String),
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => f.write_str("Disconnected"),
            ConnectionStatus::Connecting(port) => write!(f, "Connecting to {port}"),
            ConnectionStatus::Connected(port) => write!(f, "Connected to {port}"),
            ConnectionStatus::Failed(reason) => write!(f, "Connection failed: {reason}"),
            ConnectionStatus::Device(note) => write!(f, "ESP32: {note}"),
            ConnectionStatus::ReadFault(reason) => write!(f, "Read error: {reason}"),
        }
    }
}

/// Status shared between the session and its reader thread.
#[derive(Debug, Clone, Default)]
pub struct StatusCell(Arc<Mutex<ConnectionStatus>>);

impl StatusCell {
    pub fn get(&self) -> ConnectionStatus {
        self.0.lock().clone()
    }

    pub fn set(&self, status: ConnectionStatus) {
        *self.0.lock() = status;
    }
}

/// What the console shows about the board: LED colour and last payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub led: String,
    pub last_data: String,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            led: "red".to_string(),
            last_data: "No data received".to_string(),
        }
    }
}

impl DeviceState {
    /// Folds one message in. Returns true if anything changed.
    pub fn apply(&mut self, msg: &InboundMessage) -> bool {
        let (slot, value) = match msg {
            InboundMessage::LedStatus(c) => (&mut self.led, c.clone()),
            InboundMessage::Data(v) => (&mut self.last_data, v.clone()),
            InboundMessage::Ack(v) => (&mut self.last_data, format!("ACK: {v}")),
            InboundMessage::SystemNote(_) | InboundMessage::Unrecognized(_) => return false,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }
}
