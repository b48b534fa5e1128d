use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::link::Transport;
use crate::proto::{InboundMessage, LineAssembler, decode_line};
use crate::status::{ConnectionStatus, StatusCell};

const READ_CHUNK: usize = 256;

/// Background poll loop for one connection. Runs until `running` is cleared.
pub(super) struct ReadLoop {
    pub transport: Arc<Mutex<Box<dyn Transport>>>,
    pub running: Arc<AtomicBool>,
    pub inbound: Sender<InboundMessage>,
    pub status: StatusCell,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
}

impl ReadLoop {
    pub fn run(self) {
        let mut lines = LineAssembler::new();
        let mut buf = [0u8; READ_CHUNK];
        debug!("reader started");

        while self.running.load(Ordering::Acquire) {
            match self.poll(&mut buf) {
                Ok(0) => {}
                Ok(n) => {
                    for raw in lines.push(&buf[..n]) {
                        if !self.deliver(&raw) {
                            debug!("reader exiting mid-batch");
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "serial read failed");
                    self.status.set(ConnectionStatus::ReadFault(e.to_string()));
                    thread::sleep(self.error_backoff);
                    continue;
                }
            }
            thread::sleep(self.poll_interval);
        }
        debug!("reader stopped");
    }

    /// Reads whatever is already buffered. Never waits for data that isn't there.
    fn poll(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut port = self.transport.lock();
        let available = port.bytes_available()?;
        if available == 0 {
            return Ok(0);
        }
        let want = available.min(buf.len());
        match port.read(&mut buf[..want]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Returns false once the loop must stop.
    fn deliver(&self, raw: &[u8]) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        let line = match decode_line(raw) {
            Ok(line) => line,
            Err(e) => {
                // Garbage on the wire (baud mismatch, boot noise) is not fatal.
                debug!(error = %e, "dropping line");
                return true;
            }
        };
        if line.is_empty() {
            return true;
        }
        let msg = InboundMessage::classify(line);
        debug!(%msg, "received");
        if let InboundMessage::SystemNote(note) = &msg {
            self.status.set(ConnectionStatus::Device(note.clone()));
        }
        self.inbound.send(msg).is_ok()
    }
}
