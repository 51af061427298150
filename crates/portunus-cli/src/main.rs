//! `portunus`: runs the door access endpoint on simulated hardware.

use anyhow::{Context, Result};
use clap::Parser;
use portunus_cli::Endpoint;
use portunus_cli::cli::{Cli, Command, LogFormat, ReportTarget};
use portunus_cli::scenario::Scenario;
use portunus_system::{JsonLinesSink, LogSink, ReportSink};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for report records.
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = cli.resolve_config()?;

    match cli.command.unwrap_or_default() {
        Command::Config => {
            let text = toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{text}");
            Ok(())
        }
        Command::Run {
            scenario,
            exit_after_scenario,
            reports,
        } => {
            let scenario = match scenario {
                Some(path) => Scenario::load(&path)?,
                None => Scenario::demo()?,
            };
            let sink: Arc<dyn ReportSink> = match reports {
                ReportTarget::Stdout => Arc::new(JsonLinesSink::new(std::io::stdout())),
                ReportTarget::Log => Arc::new(LogSink),
            };

            info!(
                module_id = %config.reporting.module_id,
                steps = scenario.steps.len(),
                "Starting simulated endpoint"
            );
            Endpoint::assemble(config, sink)?
                .run(scenario, exit_after_scenario)
                .await
        }
    }
}
