use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::link::{DEFAULT_BAUD, LinkConfig};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "esp32-link",
    about = "Serial session manager for ESP32 boards speaking TAG:value lines"
)]
pub struct Cli {
    /// Verbose logging (RUST_LOG overrides)
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// List serial ports visible to this host
    Ports,
    /// Connect and print everything the board sends
    Monitor(MonitorOpts),
    /// Send one DATA payload and wait for its ACK
    Send(SendOpts),
    /// Interactive: stdin lines go out as DATA, board lines are printed
    Console(ConsoleOpts),
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path (defaults to the first detected port)
    #[arg(long)]
    pub dev: Option<String>,
    /// Baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,
    /// Port read/write timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub timeout_ms: u64,
    /// Wait after opening, for the board to finish its reset
    #[arg(long, default_value_t = 2000)]
    pub settle_ms: u64,
    /// Reader poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,
}

impl SerialOpts {
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            baud: self.baud,
            timeout: Duration::from_millis(self.timeout_ms),
            settle: Duration::from_millis(self.settle_ms),
            poll_interval: Duration::from_millis(self.poll_ms),
            ..LinkConfig::default()
        }
    }

    /// `--dev` if given, else the first port the host reports.
    pub fn resolve_port(&self, available: &[String]) -> anyhow::Result<String> {
        if let Some(dev) = &self.dev {
            return Ok(dev.clone());
        }
        match available.first() {
            Some(port) => Ok(port.clone()),
            None => bail!("no serial ports detected; pass --dev"),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct MonitorOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Stop after this many seconds (runs until killed by default)
    #[arg(long)]
    pub duration: Option<f64>,
    /// Message count log interval in seconds (0 = off)
    #[arg(long, default_value_t = 10.0)]
    pub stats: f64,
}

#[derive(Args, Debug, Clone)]
pub struct SendOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Payload to send; a random 8-bit binary string if omitted
    #[arg(long)]
    pub payload: Option<String>,
    /// How long to wait for the ACK in milliseconds (0 = don't wait)
    #[arg(long, default_value_t = 2000)]
    pub wait_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ConsoleOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_board_settings() {
        let cli = Cli::try_parse_from(["esp32-link", "monitor", "--dev", "COM8"]).unwrap();
        let Cmd::Monitor(opts) = cli.cmd else {
            panic!("expected monitor");
        };
        let cfg = opts.ser.link_config();
        assert_eq!(cfg.baud, 115_200);
        assert_eq!(cfg.timeout, Duration::from_secs(1));
        assert_eq!(cfg.settle, Duration::from_secs(2));
        assert_eq!(cfg.poll_interval, Duration::from_millis(100));
        assert_eq!(opts.duration, None);
    }

    #[test]
    fn send_flags() {
        let cli = Cli::try_parse_from([
            "esp32-link",
            "--debug",
            "send",
            "--payload",
            "11010010",
            "--wait-ms",
            "0",
            "--settle-ms",
            "0",
        ])
        .unwrap();
        assert!(cli.debug);
        let Cmd::Send(opts) = cli.cmd else {
            panic!("expected send");
        };
        assert_eq!(opts.payload.as_deref(), Some("11010010"));
        assert_eq!(opts.wait_ms, 0);
        assert_eq!(opts.ser.link_config().settle, Duration::ZERO);
    }

    #[test]
    fn resolve_port_prefers_dev_then_first_listed() {
        let mut ser = SerialOpts {
            dev: None,
            baud: DEFAULT_BAUD,
            timeout_ms: 1000,
            settle_ms: 2000,
            poll_ms: 100,
        };
        let ports = vec!["/dev/ttyUSB0".to_string(), "/dev/ttyUSB1".to_string()];
        assert_eq!(ser.resolve_port(&ports).unwrap(), "/dev/ttyUSB0");
        assert!(ser.resolve_port(&[]).is_err());

        ser.dev = Some("COM8".into());
        assert_eq!(ser.resolve_port(&[]).unwrap(), "COM8");
    }
}
