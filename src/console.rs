use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::ConsoleOpts;
use crate::monitor::{open_session, render};
use crate::proto::OutboundCommand;
use crate::status::DeviceState;

const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Send(OutboundCommand),
    Status,
    Quit,
}

/// One stdin line: an empty line sends a random byte, `/status` and `/quit`
/// are local, anything else is sent verbatim as the DATA payload.
pub fn parse_input(line: &str) -> Input {
    match line.trim() {
        "" => Input::Send(OutboundCommand::random_data()),
        "/status" => Input::Status,
        "/quit" | "/exit" => Input::Quit,
        payload => Input::Send(OutboundCommand::data(payload)),
    }
}

pub fn run(opts: ConsoleOpts) -> Result<()> {
    let (mut session, handle, reader) = open_session(&opts.ser)?;
    info!(port = handle.port(), "console ready; empty line sends a random byte, /quit exits");

    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut device = DeviceState::default();
    let mut last_status = session.status();
    let mut out = io::stdout().lock();
    writeln!(out, "status: {last_status}")?;

    loop {
        for msg in session.drain() {
            if let Some(line) = render(&msg, &mut device) {
                writeln!(out, "{line}")?;
            }
        }
        let status = session.status();
        if status != last_status {
            writeln!(out, "status: {status}")?;
            last_status = status;
        }

        let input = match line_rx.recv_timeout(TICK) {
            Ok(line) => parse_input(&line),
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => Input::Quit,
        };
        match input {
            Input::Send(cmd) => match session.send(&handle, cmd.payload()) {
                Ok(sent) => writeln!(out, "{sent}")?,
                Err(e) => warn!(error = %e, "send failed"),
            },
            Input::Status => writeln!(
                out,
                "status: {last_status} | reader: {} | led: {} | last data: {}",
                if reader.is_running() { "running" } else { "stopped" },
                device.led.to_uppercase(),
                device.last_data
            )?,
            Input::Quit => break,
        }
    }

    session.stop(&handle);
    writeln!(out, "status: {}", session.status())?;
    Ok(())
}
