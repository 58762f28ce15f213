//! Command-line interface for fsedump.
//!
//! Provides commands for watching the live device, replaying captures, and
//! listing the event table.

use clap::{Parser, Subcommand};
use fsedump_protocol::PidWidth;
use std::path::PathBuf;

/// fsedump - decode and print Darwin /dev/fsevents records
#[derive(Debug, Parser)]
#[command(name = "fsedump")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "FSEDUMP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "FSEDUMP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Process id width in record headers, in bytes (4 or 8)
    #[arg(long, global = true, value_parser = parse_pid_width)]
    pub pid_width: Option<PidWidth>,

    /// Discard records split across reads instead of reassembling them
    #[arg(long, global = true)]
    pub no_carry_over: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clone the fsevents device and print events until interrupted
    Watch {
        /// Override device path
        #[arg(short, long)]
        device: Option<PathBuf>,

        /// Kernel event queue depth for the cloned descriptor
        #[arg(short, long)]
        queue_depth: Option<i32>,

        /// Also write the raw byte stream to this file
        #[arg(long)]
        capture: Option<PathBuf>,
    },

    /// Decode a raw capture written by `watch --capture`
    Replay {
        /// Capture file
        file: PathBuf,
    },

    /// List known event types
    Events,
}

fn parse_pid_width(value: &str) -> Result<PidWidth, String> {
    let bytes: u8 = value.parse().map_err(|e| format!("{e}"))?;
    PidWidth::try_from(bytes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_watch() {
        let cli = Cli::parse_from(["fsedump", "watch"]);
        assert!(matches!(cli.command, Command::Watch { .. }));
        assert!(!cli.no_carry_over);
        assert_eq!(cli.pid_width, None);
    }

    #[test]
    fn test_cli_parse_watch_with_options() {
        let cli = Cli::parse_from([
            "fsedump",
            "watch",
            "--device",
            "/tmp/fsevents",
            "--queue-depth",
            "512",
            "--capture",
            "/tmp/session.bin",
        ]);
        match cli.command {
            Command::Watch {
                device,
                queue_depth,
                capture,
            } => {
                assert_eq!(device, Some(PathBuf::from("/tmp/fsevents")));
                assert_eq!(queue_depth, Some(512));
                assert_eq!(capture, Some(PathBuf::from("/tmp/session.bin")));
            }
            _ => panic!("expected Watch command"),
        }
    }

    #[test]
    fn test_cli_parse_replay_with_globals() {
        let cli = Cli::parse_from([
            "fsedump",
            "replay",
            "/tmp/session.bin",
            "--pid-width",
            "8",
            "--no-carry-over",
        ]);
        match cli.command {
            Command::Replay { file } => assert_eq!(file, PathBuf::from("/tmp/session.bin")),
            _ => panic!("expected Replay command"),
        }
        assert_eq!(cli.pid_width, Some(PidWidth::Eight));
        assert!(cli.no_carry_over);
    }

    #[test]
    fn test_cli_rejects_bad_pid_width() {
        let result = Cli::try_parse_from(["fsedump", "events", "--pid-width", "3"]);
        assert!(result.is_err());
    }
}
