use std::time::{Duration, Instant};

use tracing::info;

use crate::proto::InboundMessage;

/// Per-tag message counts for the monitor.
#[derive(Debug, Clone)]
pub struct Stats {
    pub led: u64,
    pub data: u64,
    pub ack: u64,
    pub system: u64,
    pub unrecognized: u64,
    t0: Instant,
    last: Instant,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            led: 0,
            data: 0,
            ack: 0,
            system: 0,
            unrecognized: 0,
            t0: Instant::now(),
            last: Instant::now(),
        }
    }

    pub fn record(&mut self, msg: &InboundMessage) {
        let slot = match msg {
            InboundMessage::LedStatus(_) => &mut self.led,
            InboundMessage::Data(_) => &mut self.data,
            InboundMessage::Ack(_) => &mut self.ack,
            InboundMessage::SystemNote(_) => &mut self.system,
            InboundMessage::Unrecognized(_) => &mut self.unrecognized,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u64 {
        self.led + self.data + self.ack + self.system + self.unrecognized
    }

    /// Logs a summary if `every` has passed since the last one.
    pub fn maybe_log(&mut self, every: Duration) {
        if self.last.elapsed() >= every {
            self.log();
            self.last = Instant::now();
        }
    }

    pub fn log(&self) {
        info!(
            total = self.total(),
            led = self.led,
            data = self.data,
            ack = self.ack,
            system = self.system,
            unrecognized = self.unrecognized,
            elapsed_s = self.t0.elapsed().as_secs(),
            "message counts"
        );
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
