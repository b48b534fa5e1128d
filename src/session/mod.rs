//! Lifecycle of one serial session: open, read in the background, send,
//! and shut down without reads after close.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ConnectError, SendError, SessionError};
use crate::link::{LinkConfig, PortOpener, Transport};
use crate::port::SystemPorts;
use crate::proto::{InboundMessage, OutboundCommand};
use crate::status::{ConnectionStatus, StatusCell};

mod reader;

use reader::ReadLoop;

/// Names one connection. Goes stale once that connection is stopped or replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    generation: u64,
    port: String,
}

impl ConnectionHandle {
    pub fn port(&self) -> &str {
        &self.port
    }
}

/// Observer for a running reader.
#[derive(Debug, Clone)]
pub struct ReaderHandle {
    running: Arc<AtomicBool>,
}

impl ReaderHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Receipt for a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub payload: String,
    pub bytes: usize,
}

impl fmt::Display for Sent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sent: {}", self.payload)
    }
}

struct Reader {
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

struct Connection {
    generation: u64,
    port: String,
    transport: Arc<Mutex<Box<dyn Transport>>>,
    reader: Option<Reader>,
}

impl Connection {
    /// Stops the reader and waits for it before the transport goes away.
    fn close(mut self) {
        if let Some(reader) = self.reader.take() {
            reader.running.store(false, Ordering::Release);
            if reader.thread.join().is_err() {
                warn!(port = %self.port, "reader thread panicked");
            }
        }
        debug!(port = %self.port, "closing port");
    }
}

/// Owns at most one open port, its reader thread, and the inbound queue.
pub struct SessionManager<O: PortOpener = SystemPorts> {
    opener: O,
    config: LinkConfig,
    status: StatusCell,
    inbound_tx: Sender<InboundMessage>,
    inbound_rx: Receiver<InboundMessage>,
    generation: u64,
    active: Option<Connection>,
}

impl SessionManager<SystemPorts> {
    pub fn new(config: LinkConfig) -> Self {
        Self::with_opener(SystemPorts, config)
    }
}

impl<O: PortOpener> SessionManager<O> {
    pub fn with_opener(opener: O, config: LinkConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel();
        Self {
            opener,
            config,
            status: StatusCell::default(),
            inbound_tx,
            inbound_rx,
            generation: 0,
            active: None,
        }
    }

    pub fn list_ports(&self) -> Vec<String> {
        self.opener.list()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    pub fn is_connected(&self, handle: &ConnectionHandle) -> bool {
        self.connection(handle).is_some()
    }

    /// Opens `port`, replacing any connection already held.
    ///
    /// Blocks for the settle interval, then discards whatever the board
    /// printed while it was resetting.
    pub fn connect(&mut self, port: &str) -> Result<ConnectionHandle, ConnectError> {
        self.teardown();
        self.status.set(ConnectionStatus::Connecting(port.to_string()));
        info!(port, baud = self.config.baud, "opening serial port");

        let transport = match self.open_settled(port) {
            Ok(t) => t,
            Err(e) => {
                warn!(port, kind = ?e.kind, reason = %e.reason, "connect failed");
                self.status.set(ConnectionStatus::Failed(e.to_string()));
                return Err(e);
            }
        };

        self.generation += 1;
        self.active = Some(Connection {
            generation: self.generation,
            port: port.to_string(),
            transport: Arc::new(Mutex::new(transport)),
            reader: None,
        });
        self.status.set(ConnectionStatus::Connected(port.to_string()));
        info!(port, "connected");
        Ok(ConnectionHandle {
            generation: self.generation,
            port: port.to_string(),
        })
    }

    fn open_settled(&self, port: &str) -> Result<Box<dyn Transport>, ConnectError> {
        let transport = self.opener.open(port, &self.config)?;
        if !self.config.settle.is_zero() {
            thread::sleep(self.config.settle);
        }
        transport
            .clear_buffers()
            .map_err(|e| ConnectError::from_io(port, &e))?;
        Ok(transport)
    }

    /// Spawns the reader for `handle`'s connection. One per connection.
    pub fn start(&mut self, handle: &ConnectionHandle) -> Result<ReaderHandle, SessionError> {
        let conn = match self.active.as_mut() {
            Some(c) if c.generation == handle.generation => c,
            _ => return Err(SessionError::NotConnected),
        };
        if conn.reader.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let running = Arc::new(AtomicBool::new(true));
        let read_loop = ReadLoop {
            transport: Arc::clone(&conn.transport),
            running: Arc::clone(&running),
            inbound: self.inbound_tx.clone(),
            status: self.status.clone(),
            poll_interval: self.config.poll_interval,
            error_backoff: self.config.error_backoff,
        };
        let thread = thread::Builder::new()
            .name(format!("reader {}", conn.port))
            .spawn(move || read_loop.run())
            .map_err(SessionError::Spawn)?;

        conn.reader = Some(Reader {
            running: Arc::clone(&running),
            thread,
        });
        info!(port = %conn.port, "reader started");
        Ok(ReaderHandle { running })
    }

    /// Writes `DATA:<payload>\n` once. No retry.
    pub fn send(&self, handle: &ConnectionHandle, payload: &str) -> Result<Sent, SendError> {
        let conn = self.connection(handle).ok_or(SendError::NotConnected)?;
        if payload.contains(['\n', '\r']) {
            return Err(SendError::InvalidPayload);
        }

        let line = OutboundCommand::data(payload).encode();
        {
            let mut port = conn.transport.lock();
            port.write_all(line.as_bytes()).map_err(SendError::Write)?;
            port.flush().map_err(SendError::Write)?;
        }
        debug!(port = %conn.port, payload, "sent");
        Ok(Sent {
            payload: payload.to_string(),
            bytes: line.len(),
        })
    }

    /// Ends the session behind `handle`. The reader notices within one poll
    /// interval (or one port timeout if a read is in flight) and is joined
    /// before the port is closed. Stale handles are ignored.
    pub fn stop(&mut self, handle: &ConnectionHandle) {
        if !self.is_connected(handle) {
            debug!(port = %handle.port, "stop on inactive handle ignored");
            return;
        }
        self.teardown();
        info!(port = %handle.port, "disconnected");
    }

    /// The reader is joined first, so nothing from the old session can be
    /// queued after the drain.
    fn teardown(&mut self) {
        if let Some(conn) = self.active.take() {
            conn.close();
            let stale = self.inbound_rx.try_iter().count();
            if stale > 0 {
                debug!(stale, "dropped messages from closed session");
            }
            self.status.set(ConnectionStatus::Disconnected);
        }
    }

    fn connection(&self, handle: &ConnectionHandle) -> Option<&Connection> {
        self.active
            .as_ref()
            .filter(|c| c.generation == handle.generation)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<InboundMessage> {
        self.inbound_rx.recv_timeout(timeout).ok()
    }

    /// Everything queued right now, oldest first.
    pub fn drain(&self) -> Vec<InboundMessage> {
        self.inbound_rx.try_iter().collect()
    }
}

impl<O: PortOpener> Drop for SessionManager<O> {
    fn drop(&mut self) {
        self.teardown();
    }
}
