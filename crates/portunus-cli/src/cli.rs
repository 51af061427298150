//! Command line interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use portunus_core::SystemConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "portunus", version, about = "Door access endpoint on simulated hardware")]
pub struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "PORTUNUS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log line format (logs go to stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Where report records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportTarget {
    /// One JSON document per line on stdout.
    #[default]
    Stdout,
    /// Through the logger.
    Log,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the endpoint against simulated hardware.
    Run {
        /// Scenario file to replay. The built-in demo is used when omitted.
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Shut down once the scenario has played instead of waiting for
        /// Ctrl-C.
        #[arg(long)]
        exit_after_scenario: bool,

        #[arg(long, value_enum, default_value_t = ReportTarget::Stdout)]
        reports: ReportTarget,
    },

    /// Print the effective configuration as TOML.
    Config,
}

impl Default for Command {
    fn default() -> Self {
        Command::Run {
            scenario: None,
            exit_after_scenario: false,
            reports: ReportTarget::Stdout,
        }
    }
}

/// Settings that override the configuration file.
#[derive(Debug, Default, clap::Args)]
pub struct Overrides {
    /// Module identifier reported to the remote service.
    #[arg(long, global = true)]
    pub module_id: Option<String>,

    /// Strike unlock duration in milliseconds.
    #[arg(long, global = true)]
    pub unlock_ms: Option<u32>,

    /// Heartbeat interval in milliseconds.
    #[arg(long, global = true)]
    pub heartbeat_ms: Option<u64>,

    /// Do not monitor the door sensor.
    #[arg(long, global = true)]
    pub no_door_sensor: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut SystemConfig) {
        if let Some(id) = &self.module_id {
            config.reporting.module_id = id.clone();
        }
        if let Some(ms) = self.unlock_ms {
            config.policy.unlock_duration_ms = ms;
        }
        if let Some(ms) = self.heartbeat_ms {
            config.reporting.heartbeat_interval_ms = ms;
        }
        if self.no_door_sensor {
            config.door.enabled = false;
        }
    }
}

impl Cli {
    /// Configuration file (or defaults) with command line overrides applied.
    pub fn resolve_config(&self) -> Result<SystemConfig> {
        let mut config = match &self.config {
            Some(path) => SystemConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => SystemConfig::default(),
        };
        self.overrides.apply(&mut config);
        config.validate().context("Invalid configuration after overrides")?;
        Ok(config)
    }
}
