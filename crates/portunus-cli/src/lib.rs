//! Assembly of the `portunus` binary: the full endpoint wired to simulated
//! hardware and driven by a scenario.

pub mod cli;
pub mod pins;
pub mod scenario;

use anyhow::{Context, Result};
use pins::LoggedPin;
use portunus_core::SystemConfig;
use portunus_hardware::ThreadDelay;
use portunus_hardware::mock::{MockConnectivity, MockDoorSensor};
use portunus_rfid::{Mfrc522, SimulatedMfrc522};
use portunus_system::modules::{
    CardReader, ConnectivityMonitor, DoorSensorMonitor, DoorStrike, Reporter, StatusLed,
};
use portunus_system::{ReportSink, Runtime};
use scenario::{Scenario, Stimuli};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Grace period after the last scenario step so pending relocks and
/// blinks can finish before an automatic shutdown.
const SETTLE: Duration = Duration::from_secs(4);

/// Runtime with every module registered against simulated devices.
pub struct Endpoint {
    pub runtime: Runtime,
    pub stimuli: Stimuli,
    pub strike: Arc<LoggedPin>,
    pub led: Arc<LoggedPin>,
}

impl Endpoint {
    pub fn assemble(config: SystemConfig, sink: Arc<dyn ReportSink>) -> Result<Self> {
        let (chip, reader) = SimulatedMfrc522::new();
        let link = MockConnectivity::new();
        let door = MockDoorSensor::new();
        let strike = Arc::new(LoggedPin::new("strike"));
        let led = Arc::new(LoggedPin::new("status_led"));

        let mut runtime = Runtime::new(config);
        runtime.register(Box::new(DoorStrike::new(strike.clone())))?;
        runtime.register(Box::new(StatusLed::new(led.clone())))?;
        runtime.register(Box::new(DoorSensorMonitor::new(Arc::new(door.clone()))))?;
        runtime.register(Box::new(CardReader::new(Mfrc522::new(chip, ThreadDelay))))?;
        runtime.register(Box::new(ConnectivityMonitor::new(Arc::new(link.clone()))))?;
        runtime.register(Box::new(Reporter::new(sink, Arc::new(link.clone()))))?;

        Ok(Self {
            runtime,
            stimuli: Stimuli { reader, link, door },
            strike,
            led,
        })
    }

    /// Start, play `scenario`, then either shut down after it settles or
    /// wait for Ctrl-C.
    pub async fn run(mut self, scenario: Scenario, exit_after_scenario: bool) -> Result<()> {
        self.runtime
            .start()
            .await
            .context("System bring-up failed")?;

        let stimuli = self.stimuli.clone();
        let script = async move {
            scenario.play(&stimuli).await;
            tokio::time::sleep(SETTLE).await;
        };

        if exit_after_scenario {
            tokio::select! {
                _ = script => info!("Scenario settled"),
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for Ctrl-C")?;
                    info!("Interrupted");
                }
            }
        } else {
            let script = tokio::spawn(script);
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            info!("Interrupted");
            script.abort();
        }

        self.runtime.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portunus_core::EventKind;
    use portunus_system::MemorySink;

    #[tokio::test]
    async fn test_endpoint_admits_card_from_scenario() {
        let mut config = SystemConfig::default();
        config.policy.unlock_duration_ms = 200;
        config.connectivity.poll_interval_ms = 20;

        let sink = MemorySink::new();
        let endpoint = Endpoint::assemble(config, Arc::new(sink.clone())).unwrap();
        let strike = Arc::clone(&endpoint.strike);
        let scenario = Scenario::from_toml_str(
            r#"
            [[step]]
            at_ms = 0
            action = "connect"
            rssi = -50

            [[step]]
            at_ms = 300
            action = "present"
            uid = "04:A3:2B:11"
            "#,
        )
        .unwrap();

        endpoint.run(scenario, true).await.unwrap();

        let kinds: Vec<EventKind> = sink.events().iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&EventKind::CardScanned));
        assert!(kinds.contains(&EventKind::AccessRequest));
        assert!(!strike.level());
    }
}
