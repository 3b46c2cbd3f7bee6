//! # Host Configuration
//!
//! Runtime settings come from three layers, later ones winning:
//! built-in defaults, an optional JSON file (`--config`), and command-line
//! flags.

use crate::runtime::HostRuntimeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Host runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostRuntimeConfig {
    /// Tick rate in ticks per second
    pub hz: u32,
    /// Stop after this many ticks (0 = run forever)
    pub ticks: u64,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Ticks between heartbeat lines (0 = once per second)
    pub heartbeat_every: u64,
}

impl Default for HostRuntimeConfig {
    fn default() -> Self {
        Self {
            hz: 60,
            ticks: 0,
            log_level: "info".to_string(),
            heartbeat_every: 0,
        }
    }
}

impl HostRuntimeConfig {
    /// Loads a configuration from a JSON file
    ///
    /// Fields missing from the file keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HostRuntimeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| HostRuntimeError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Checks that the settings can drive a runtime
    pub fn validate(&self) -> Result<(), HostRuntimeError> {
        if self.hz == 0 {
            return Err(HostRuntimeError::InvalidConfig(
                "hz must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Ticks between heartbeat lines, resolving the "once per second" default
    pub fn heartbeat_interval(&self) -> u64 {
        if self.heartbeat_every == 0 {
            u64::from(self.hz.max(1))
        } else {
            self.heartbeat_every
        }
    }
}

/// What the command line asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Run with the given configuration
    Run(HostRuntimeConfig),
    /// Print usage and exit
    Help,
}

/// Parses command-line arguments (including the program name)
pub fn parse_args(args: &[String]) -> Result<CliAction, String> {
    let mut config = None;
    let mut overrides: Vec<(&str, &str)> = Vec::new();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(CliAction::Help),
            flag @ ("--config" | "-c" | "--hz" | "--ticks" | "--log-level" | "--heartbeat") => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| format!("Missing value for {}", flag))?;
                if matches!(flag, "--config" | "-c") {
                    config = Some(value.as_str());
                } else {
                    overrides.push((flag, value.as_str()));
                }
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    // The file is the base layer no matter where --config appeared.
    let mut config = match config {
        Some(path) => HostRuntimeConfig::from_file(path).map_err(|e| e.to_string())?,
        None => HostRuntimeConfig::default(),
    };

    for (flag, value) in overrides {
        match flag {
            "--hz" => {
                config.hz = value
                    .parse()
                    .map_err(|_| format!("Invalid hz value: {}", value))?;
            }
            "--ticks" => {
                config.ticks = value
                    .parse()
                    .map_err(|_| format!("Invalid ticks value: {}", value))?;
            }
            "--heartbeat" => {
                config.heartbeat_every = value
                    .parse()
                    .map_err(|_| format!("Invalid heartbeat value: {}", value))?;
            }
            _ => config.log_level = value.to_string(),
        }
    }

    Ok(CliAction::Run(config))
}

/// Prints command-line usage to stderr
pub fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      JSON configuration file");
    eprintln!("  --hz <N>                 Tick rate (default 60)");
    eprintln!("  --ticks <N>              Stop after N ticks (0 = run forever)");
    eprintln!("  --heartbeat <N>          Ticks between heartbeats (0 = once per second)");
    eprintln!("  --log-level <FILTER>     Log filter when RUST_LOG is unset (default info)");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --hz 100 --ticks 500", program);
    eprintln!("  {} --config spark.json --log-level debug", program);
}
