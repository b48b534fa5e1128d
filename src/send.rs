use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::cli::SendOpts;
use crate::link::PortOpener;
use crate::monitor::open_session;
use crate::proto::{InboundMessage, OutboundCommand};
use crate::session::SessionManager;

pub fn run(opts: SendOpts) -> Result<()> {
    let (mut session, handle, _reader) = open_session(&opts.ser)?;
    let cmd = match opts.payload {
        Some(p) => OutboundCommand::data(p),
        None => OutboundCommand::random_data(),
    };

    let sent = session
        .send(&handle, cmd.payload())
        .with_context(|| format!("sending to {}", handle.port()))?;
    debug!(bytes = sent.bytes, "write complete");
    println!("{sent}");

    if opts.wait_ms > 0 {
        let within = Duration::from_millis(opts.wait_ms);
        match wait_for_ack(&session, within) {
            Some(ack) if ack == cmd.payload() => println!("ACK: {ack}"),
            Some(ack) => warn!(sent = cmd.payload(), ack = %ack, "ACK does not match payload"),
            None => warn!(wait_ms = opts.wait_ms, "no ACK from board"),
        }
    }

    session.stop(&handle);
    Ok(())
}

/// First `ACK:` value to arrive within `within`. Other messages are skipped.
pub fn wait_for_ack<O: PortOpener>(session: &SessionManager<O>, within: Duration) -> Option<String> {
    let deadline = Instant::now() + within;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return None;
        }
        match session.recv_timeout(left)? {
            InboundMessage::Ack(v) => return Some(v),
            other => debug!(msg = %other, "skipping while waiting for ACK"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkConfig;
    use crate::link::loopback::LoopbackOpener;

    fn session() -> (SessionManager<LoopbackOpener>, LoopbackOpener) {
        let opener = LoopbackOpener::with_ports(&["loop0"]);
        let config = LinkConfig {
            settle: Duration::ZERO,
            poll_interval: Duration::from_millis(2),
            ..LinkConfig::default()
        };
        (SessionManager::with_opener(opener.clone(), config), opener)
    }

    #[test]
    fn ack_after_other_traffic() {
        let (mut session, opener) = session();
        let handle = session.connect("loop0").unwrap();
        session.start(&handle).unwrap();

        session.send(&handle, "11010010").unwrap();
        assert_eq!(opener.written(), b"DATA:11010010\n");
        opener.feed(b"LED_STATUS:green\nACK:11010010\n");

        assert_eq!(
            wait_for_ack(&session, Duration::from_secs(2)).as_deref(),
            Some("11010010")
        );
    }

    #[test]
    fn no_ack_times_out() {
        let (mut session, _opener) = session();
        let handle = session.connect("loop0").unwrap();
        session.start(&handle).unwrap();

        let t0 = Instant::now();
        assert_eq!(wait_for_ack(&session, Duration::from_millis(50)), None);
        assert!(t0.elapsed() >= Duration::from_millis(50));
    }
}
