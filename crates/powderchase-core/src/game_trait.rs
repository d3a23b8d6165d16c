use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::events::DeathCause;
use crate::input::InputSignal;
use crate::snapshot::SnapshotError;

/// Core trait that every Powderchase game mode implements.
///
/// The driver owns timing, input polling, rendering, audio and persistence;
/// the mode only advances its own simulation and reports what happened.
pub trait GameMode {
    /// Mode metadata for the mode selection menu.
    fn metadata(&self) -> ModeMetadata;

    /// Called once at run start. Resets all run state.
    fn init(&mut self, config: &RunConfig);

    /// Advance the simulation by one tick. `dt` is already clamped by the driver.
    fn update(&mut self, dt: f32, input: &InputSignal) -> Vec<GameEvent>;

    /// Serialize the full world snapshot (render view and determinism checks).
    fn serialize_state(&self) -> Result<Vec<u8>, SnapshotError>;

    /// Replace the world with a previously serialized snapshot.
    fn apply_state(&mut self, state: &[u8]) -> Result<(), SnapshotError>;

    /// Simulation tick rate in Hz the driver should aim for.
    fn tick_rate(&self) -> f32 {
        60.0
    }

    /// Freeze the simulation (menu overlay, focus loss).
    fn pause(&mut self);

    /// Resume after a pause.
    fn resume(&mut self);

    /// Whether the run reached a terminal state.
    fn is_run_over(&self) -> bool;

    /// Summary of the run so far (final once `is_run_over` is true).
    fn run_result(&self) -> RunResult;
}

/// Mode metadata for the selection menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeMetadata {
    pub name: String,
    pub description: String,
}

/// Configuration for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub seed: u64,
    pub custom: HashMap<String, serde_json::Value>,
}

impl RunConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            custom: HashMap::new(),
        }
    }

    /// Read a numeric custom value, ignoring missing or non-numeric entries.
    pub fn custom_f32(&self, key: &str) -> Option<f32> {
        self.custom
            .get(key)
            .and_then(|v| v.as_f64())
            .filter(|v| v.is_finite())
            .map(|v| v as f32)
    }
}

/// Events emitted by a mode during update. Consumed by UI and audio layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ScoreUpdate { score: u64 },
    TrickLanded { name: String, points: u64 },
    GrindCompleted { name: String, points: u64 },
    ChainCompleted { length: u32, bonus: u64 },
    NearMiss { points: u64 },
    CollectiblePicked { big: bool, points: u64 },
    Crashed,
    BeastAwakened,
    BeastLunged,
    LodgeEntered,
    LodgeExited,
    RunOver { cause: DeathCause },
}

/// Summary of a run, used for personal-best bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub score: u64,
    pub distance: f32,
    pub best_combo: u32,
    pub cause: Option<DeathCause>,
}

/// Generates the boilerplate `GameMode` methods shared by all modes:
/// `serialize_state`, `apply_state`, `pause`, `resume`, `is_run_over`.
///
/// Requires the implementing struct to have `state: $StateType` and `paused: bool`
/// fields, and `$StateType` to have an `outcome: Option<DeathCause>` field.
#[macro_export]
macro_rules! game_mode_boilerplate {
    (state_type: $StateType:ty) => {
        fn serialize_state(&self) -> Result<Vec<u8>, $crate::snapshot::SnapshotError> {
            $crate::snapshot::encode_snapshot(&self.state)
        }

        fn apply_state(&mut self, state: &[u8]) -> Result<(), $crate::snapshot::SnapshotError> {
            self.state = $crate::snapshot::decode_snapshot::<$StateType>(state)?;
            Ok(())
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn resume(&mut self) {
            self.paused = false;
        }

        fn is_run_over(&self) -> bool {
            self.state.outcome.is_some()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_f32_reads_numbers_only() {
        let mut config = RunConfig::with_seed(7);
        config
            .custom
            .insert("screen_width".to_string(), serde_json::json!(1280));
        config
            .custom
            .insert("mode".to_string(), serde_json::json!("night"));
        assert_eq!(config.custom_f32("screen_width"), Some(1280.0));
        assert_eq!(config.custom_f32("mode"), None);
        assert_eq!(config.custom_f32("missing"), None);
    }

    #[test]
    fn game_event_roundtrips_through_messagepack() {
        let event = GameEvent::TrickLanded {
            name: "Backflip".to_string(),
            points: 480,
        };
        let bytes = rmp_serde::to_vec(&event).unwrap();
        let back: GameEvent = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(event, back);
    }
}
