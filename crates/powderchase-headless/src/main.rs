mod autopilot;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use powderchase_core::game_trait::{GameEvent, GameMode, RunConfig};
use powderchase_core::persistence::PersonalBests;
use powderchase_core::time::FixedStepClock;
use powderchase_freeride::Freeride;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let seed: u64 = env_parse("POWDERCHASE_SEED").unwrap_or(1);
    let max_seconds: f32 = env_parse("POWDERCHASE_MAX_SECONDS").unwrap_or(600.0);
    let bests_path = std::env::var("POWDERCHASE_BESTS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("powderchase-bests.json"));

    tracing::info!(seed, max_seconds, "Powderchase headless starting");

    let mut bests = PersonalBests::load_or_default(&read_pairs(&bests_path));
    let mut mode = Freeride::new();
    mode.init(&RunConfig::with_seed(seed));

    let mut clock = FixedStepClock::default();
    let mut simulated = 0.0;
    let mut frame: u64 = 0;
    let mut lodge_visits = 0;

    'frames: while simulated < max_seconds {
        let steps = clock.advance(frame_time(frame));
        frame += 1;
        for _ in 0..steps {
            if mode.in_lodge() {
                let purchases = autopilot::shopping_list(lodge_visits);
                lodge_visits += 1;
                mode.leave_lodge(&purchases);
            }
            let input = autopilot::steer(&mode.view());
            for event in mode.update(clock.step(), &input) {
                log_event(&event);
            }
            simulated += clock.step();
            if mode.is_run_over() {
                break 'frames;
            }
        }
    }

    let result = mode.run_result();
    let records = bests.record(&result);
    tracing::info!(
        score = result.score,
        distance = result.distance,
        best_combo = result.best_combo,
        cause = result.cause.map(|c| c.as_str()).unwrap_or("time limit"),
        simulated,
        frames = frame,
        lodge_visits,
        "Session finished"
    );
    if records.any() {
        tracing::info!(
            high_score = records.high_score,
            distance = records.distance,
            combo = records.combo,
            "New personal best"
        );
    }
    if let Err(e) = write_pairs(&bests_path, &bests.to_pairs()) {
        tracing::warn!("Failed to save personal bests to {}: {e}", bests_path.display());
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Host frame times: mostly 60 Hz with some jitter and a long hitch every
/// ten seconds, so the fixed-step clock has something to absorb.
fn frame_time(frame: u64) -> f32 {
    if frame % 600 == 599 {
        0.5
    } else if frame % 7 == 0 {
        1.0 / 45.0
    } else {
        1.0 / 60.0
    }
}

fn read_pairs(path: &Path) -> BTreeMap<String, String> {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {e}, starting fresh", path.display());
            BTreeMap::new()
        }),
        Err(_) => BTreeMap::new(),
    }
}

fn write_pairs(
    path: &Path,
    pairs: &BTreeMap<String, String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(pairs)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::TrickLanded { name, points } | GameEvent::GrindCompleted { name, points } => {
            tracing::info!(trick = %name, points, "Trick");
        },
        GameEvent::ChainCompleted { length, bonus } => {
            tracing::info!(length, bonus, "Chain completed");
        },
        GameEvent::BeastAwakened => tracing::info!("Beast awakened"),
        GameEvent::ScoreUpdate { .. } => {},
        other => tracing::debug!(event = ?other, "Event"),
    }
}
