use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::operator::DEFAULT_FALLBACK_CARRIER;
use crate::profile::{self, PROFILES};

/// Primary application configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Serial port of the modem
    pub modem: ModemConfig,

    /// Poll loop configuration
    pub monitor: MonitorConfig,

    /// Output configuration
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModemConfig {
    /// Path to the AT command port
    pub device: PathBuf,

    pub baud: u32,

    /// How long to wait for `OK`/`ERROR` after a command
    pub command_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Index into the vendor command profiles
    pub profile: usize,

    /// Pause between poll cycles
    pub poll_interval: Duration,

    /// Carrier name for network codes missing from the table
    pub fallback_carrier: String,

    /// Whether to run one cycle and exit
    pub run_once: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Print snapshots as JSON instead of text
    pub json: bool,
}

impl Config {
    /// Create a new config from CLI arguments
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if profile::by_index(cli.profile).is_none() {
            return Err(ConfigError::UnknownProfile {
                index: cli.profile,
                count: PROFILES.len(),
            });
        }
        if cli.poll_interval == 0 {
            return Err(ConfigError::ZeroDuration("poll interval"));
        }
        if cli.command_timeout == 0 {
            return Err(ConfigError::ZeroDuration("command timeout"));
        }

        let modem = ModemConfig {
            device: PathBuf::from(&cli.device),
            baud: cli.baud,
            command_timeout: Duration::from_millis(cli.command_timeout),
        };

        let monitor = MonitorConfig {
            profile: cli.profile,
            poll_interval: Duration::from_secs(cli.poll_interval),
            fallback_carrier: cli.fallback_carrier.clone(),
            run_once: cli.run_once,
        };

        let output = OutputConfig { json: cli.json };

        Ok(Self {
            modem,
            monitor,
            output,
        })
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[arg(
        short = 'd',
        long = "device",
        env = "CELLMON_DEVICE",
        default_value = "/dev/ttyUSB2",
        help = "Path to the modem AT command port"
    )]
    pub device: String,

    #[arg(long = "baud", default_value = "115200", help = "Serial baud rate")]
    pub baud: u32,

    #[arg(
        short = 'p',
        long = "profile",
        env = "CELLMON_PROFILE",
        default_value = "0",
        help = "Vendor command profile index, see --list-profiles"
    )]
    pub profile: usize,

    #[arg(
        long = "poll-interval",
        default_value = "1",
        help = "Time between poll cycles in seconds"
    )]
    pub poll_interval: u64,

    #[arg(
        long = "command-timeout",
        default_value = "1500",
        help = "Time to wait for a command reply in milliseconds"
    )]
    pub command_timeout: u64,

    #[arg(
        long = "fallback-carrier",
        default_value = DEFAULT_FALLBACK_CARRIER,
        help = "Carrier name shown for network codes missing from the table"
    )]
    pub fallback_carrier: String,

    #[arg(
        long = "run-once",
        help = "Run one poll cycle, print the snapshot and exit",
        default_value = "false"
    )]
    pub run_once: bool,

    #[arg(long = "json", help = "Print snapshots as JSON")]
    pub json: bool,

    #[arg(long = "list-profiles", help = "Print the command profiles and exit")]
    pub list_profiles: bool,
}
