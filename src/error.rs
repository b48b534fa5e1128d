use std::io;

use thiserror::Error;

/// Why a port could not be brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectErrorKind {
    NotFound,
    PermissionDenied,
    Busy,
    Timeout,
    Other,
}

#[derive(Debug, Error)]
#[error("{port}: {reason}")]
pub struct ConnectError {
    pub kind: ConnectErrorKind,
    pub port: String,
    pub reason: String,
}

impl ConnectError {
    pub fn new(kind: ConnectErrorKind, port: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            port: port.into(),
            reason: reason.into(),
        }
    }

    pub fn from_serial(port: &str, err: serialport::Error) -> Self {
        let kind = match err.kind() {
            serialport::ErrorKind::NoDevice => ConnectErrorKind::NotFound,
            serialport::ErrorKind::Io(io_kind) => kind_of(io_kind),
            _ => ConnectErrorKind::Other,
        };
        Self::new(kind, port, err.to_string())
    }

    pub fn from_io(port: &str, err: &io::Error) -> Self {
        Self::new(kind_of(err.kind()), port, err.to_string())
    }
}

fn kind_of(kind: io::ErrorKind) -> ConnectErrorKind {
    match kind {
        io::ErrorKind::NotFound => ConnectErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ConnectErrorKind::PermissionDenied,
        io::ErrorKind::ResourceBusy | io::ErrorKind::AddrInUse => ConnectErrorKind::Busy,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ConnectErrorKind::Timeout,
        _ => ConnectErrorKind::Other,
    }
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("not connected")]
    NotConnected,
    #[error("payload must not contain line breaks")]
    InvalidPayload,
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not connected")]
    NotConnected,
    #[error("reader already running for this connection")]
    AlreadyRunning,
    #[error("failed to spawn reader thread: {0}")]
    Spawn(#[source] io::Error),
}
