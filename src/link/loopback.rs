//! In-memory port used by tests in place of a board.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{LinkConfig, PortOpener, Transport};
use crate::error::{ConnectError, ConnectErrorKind};

#[derive(Debug, Default)]
struct Wire {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    read_faults: usize,
    write_fault: bool,
    clears: usize,
}

#[derive(Clone, Default)]
pub struct LoopbackOpener {
    ports: Vec<String>,
    wire: Arc<Mutex<Wire>>,
    live: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
}

impl LoopbackOpener {
    pub fn with_ports(ports: &[&str]) -> Self {
        Self {
            ports: ports.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Bytes as if the board had sent them.
    pub fn feed(&self, bytes: &[u8]) {
        self.wire.lock().incoming.extend(bytes);
    }

    pub fn pending(&self) -> usize {
        self.wire.lock().incoming.len()
    }

    pub fn written(&self) -> Vec<u8> {
        self.wire.lock().written.clone()
    }

    pub fn clears(&self) -> usize {
        self.wire.lock().clears
    }

    pub fn fail_reads(&self, n: usize) {
        self.wire.lock().read_faults = n;
    }

    pub fn fail_writes(&self) {
        self.wire.lock().write_fault = true;
    }

    /// Transports currently open.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl PortOpener for LoopbackOpener {
    fn list(&self) -> Vec<String> {
        self.ports.clone()
    }

    fn open(&self, port: &str, _config: &LinkConfig) -> Result<Box<dyn Transport>, ConnectError> {
        if !self.ports.iter().any(|p| p == port) {
            return Err(ConnectError::new(
                ConnectErrorKind::NotFound,
                port,
                "no such device",
            ));
        }
        self.live.fetch_add(1, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(LoopbackPort {
            wire: Arc::clone(&self.wire),
            live: Arc::clone(&self.live),
        }))
    }
}

struct LoopbackPort {
    wire: Arc<Mutex<Wire>>,
    live: Arc<AtomicUsize>,
}

impl Drop for LoopbackPort {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl io::Read for LoopbackPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut wire = self.wire.lock();
        let n = buf.len().min(wire.incoming.len());
        for (slot, b) in buf.iter_mut().zip(wire.incoming.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }
}

impl io::Write for LoopbackPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut wire = self.wire.lock();
        if wire.write_fault {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        wire.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for LoopbackPort {
    fn bytes_available(&self) -> io::Result<usize> {
        let mut wire = self.wire.lock();
        if wire.read_faults > 0 {
            wire.read_faults -= 1;
            return Err(io::Error::other("injected read fault"));
        }
        Ok(wire.incoming.len())
    }

    fn clear_buffers(&self) -> io::Result<()> {
        let mut wire = self.wire.lock();
        wire.incoming.clear();
        wire.clears += 1;
        Ok(())
    }
}
