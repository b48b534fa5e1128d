use anyhow::{Context, Result};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::info;

use crate::cli::{MonitorOpts, SerialOpts};
use crate::link::PortOpener;
use crate::proto::InboundMessage;
use crate::session::{ConnectionHandle, ReaderHandle, SessionManager};
use crate::stats::Stats;
use crate::status::DeviceState;

/// How long one wait on the inbound queue may block before status is rechecked.
const TICK: Duration = Duration::from_millis(200);

pub fn run(opts: MonitorOpts) -> Result<()> {
    let (mut session, handle, _reader) = open_session(&opts.ser)?;
    info!(port = handle.port(), "monitoring");

    let deadline = match opts.duration {
        Some(s) => {
            let run_for = seconds("--duration", s.max(0.0))?;
            let end = Instant::now()
                .checked_add(run_for)
                .with_context(|| format!("--duration {s} is too far in the future"))?;
            Some(end)
        }
        None => None,
    };
    let stats_every = if opts.stats > 0.0 {
        Some(seconds("--stats", opts.stats)?)
    } else {
        None
    };

    let stats = watch(&session, deadline, stats_every, &mut io::stdout().lock())?;
    stats.log();
    session.stop(&handle);
    Ok(())
}

/// Seconds from the command line as a `Duration`; rejects NaN, infinity and
/// anything too large to represent.
fn seconds(flag: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("{flag} {secs} is not a usable duration"))
}

/// Connects to the port named by `ser` and starts its reader.
pub fn open_session(
    ser: &SerialOpts,
) -> Result<(SessionManager, ConnectionHandle, ReaderHandle)> {
    let mut session = SessionManager::new(ser.link_config());
    let port = ser.resolve_port(&session.list_ports())?;
    let handle = session
        .connect(&port)
        .with_context(|| format!("connecting to {port}"))?;
    let reader = session
        .start(&handle)
        .with_context(|| format!("starting reader on {port}"))?;
    Ok((session, handle, reader))
}

/// Prints messages and status changes until `deadline` (forever if `None`).
pub fn watch<O: PortOpener>(
    session: &SessionManager<O>,
    deadline: Option<Instant>,
    stats_every: Option<Duration>,
    out: &mut impl Write,
) -> Result<Stats> {
    let mut device = DeviceState::default();
    let mut stats = Stats::new();
    let mut last_status = session.status();
    writeln!(out, "status: {last_status}")?;

    while deadline.is_none_or(|d| Instant::now() < d) {
        if let Some(msg) = session.recv_timeout(TICK) {
            stats.record(&msg);
            if let Some(line) = render(&msg, &mut device) {
                writeln!(out, "{line}")?;
            }
        }
        let status = session.status();
        if status != last_status {
            writeln!(out, "status: {status}")?;
            last_status = status;
        }
        if let Some(every) = stats_every {
            stats.maybe_log(every);
        }
    }
    Ok(stats)
}

/// Folds `msg` into `device` and returns the line to show, if any.
/// `SYSTEM:` notes surface through the status line instead.
pub fn render(msg: &InboundMessage, device: &mut DeviceState) -> Option<String> {
    device.apply(msg);
    match msg {
        InboundMessage::LedStatus(_) => Some(format!("led: {}", device.led.to_uppercase())),
        InboundMessage::Data(_) | InboundMessage::Ack(_) => {
            Some(format!("last data: {}", device.last_data))
        }
        InboundMessage::SystemNote(_) => None,
        InboundMessage::Unrecognized(line) => Some(format!("? {line}")),
    }
}
