//! Scripted stimuli for the simulated hardware.
//!
//! A scenario is a list of timed steps, loaded from TOML:
//!
//! ```toml
//! [[step]]
//! at_ms = 500
//! action = "connect"
//! rssi = -58
//!
//! [[step]]
//! at_ms = 1500
//! action = "present"
//! uid = "04:A3:2B:11"
//! ```

use anyhow::{Context, Result};
use portunus_core::Uid;
use portunus_hardware::mock::{MockConnectivity, MockDoorSensor};
use portunus_rfid::SimHandle;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// One stimulus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Connect { rssi: i32 },
    Disconnect,
    /// Place a card in the reader field.
    Present {
        #[serde(deserialize_with = "uid_from_text")]
        uid: Uid,
    },
    /// Take the card away.
    Remove,
    DoorOpen,
    DoorClose,
}

fn uid_from_text<'de, D>(deserializer: D) -> std::result::Result<Uid, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Step {
    /// Offset from the start of the scenario.
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Scenario {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// Handles to the simulated devices a scenario drives.
#[derive(Debug, Clone)]
pub struct Stimuli {
    pub reader: SimHandle,
    pub link: MockConnectivity,
    pub door: MockDoorSensor,
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut scenario: Scenario = toml::from_str(text).context("Malformed scenario")?;
        scenario.steps.sort_by_key(|s| s.at_ms);
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Built-in script shipped with the binary.
    pub fn demo() -> Result<Self> {
        Self::from_toml_str(include_str!("../scenarios/demo.toml"))
    }

    /// Time of the last step.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.steps.last().map_or(0, |s| s.at_ms))
    }

    /// Apply every step at its offset.
    pub async fn play(&self, stimuli: &Stimuli) {
        let start = Instant::now();
        for step in &self.steps {
            tokio::time::sleep_until(start + Duration::from_millis(step.at_ms)).await;
            info!(at_ms = step.at_ms, action = ?step.action, "Scenario step");
            stimuli.apply(&step.action);
        }
        info!("Scenario finished");
    }
}

impl Stimuli {
    pub fn apply(&self, action: &Action) {
        match action {
            Action::Connect { rssi } => self.link.connect(*rssi),
            Action::Disconnect => self.link.disconnect(),
            Action::Present { uid } => self.reader.present_card(*uid),
            Action::Remove => self.reader.remove_card(),
            Action::DoorOpen => self.door.set_open(true),
            Action::DoorClose => self.door.set_open(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portunus_hardware::{Connectivity, DoorSensor};
    use portunus_rfid::SimulatedMfrc522;

    #[test]
    fn test_demo_parses_in_order() {
        let demo = Scenario::demo().unwrap();
        assert!(!demo.steps.is_empty());
        assert!(demo.steps.windows(2).all(|w| w[0].at_ms <= w[1].at_ms));
        assert!(
            demo.steps
                .iter()
                .any(|s| matches!(s.action, Action::Present { .. }))
        );
    }

    #[test]
    fn test_steps_are_sorted_and_uids_checked() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[step]]
            at_ms = 900
            action = "door_open"

            [[step]]
            at_ms = 100
            action = "present"
            uid = "04:52:9C:1A:7F:33:80"
            "#,
        )
        .unwrap();
        assert_eq!(scenario.steps[0].at_ms, 100);
        assert_eq!(scenario.duration(), Duration::from_millis(900));

        let bad = Scenario::from_toml_str(
            r#"
            [[step]]
            at_ms = 0
            action = "present"
            uid = "04:A3"
            "#,
        );
        assert!(bad.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_drives_devices_on_schedule() {
        let (_chip, reader) = SimulatedMfrc522::new();
        let stimuli = Stimuli {
            reader: reader.clone(),
            link: MockConnectivity::new(),
            door: MockDoorSensor::new(),
        };
        let scenario = Scenario::from_toml_str(
            r#"
            [[step]]
            at_ms = 200
            action = "connect"
            rssi = -50

            [[step]]
            at_ms = 400
            action = "door_open"
            "#,
        )
        .unwrap();

        let start = Instant::now();
        scenario.play(&stimuli).await;

        assert_eq!(start.elapsed(), Duration::from_millis(400));
        assert!(stimuli.link.is_connected());
        assert!(stimuli.door.door_sensor_level());
    }
}
