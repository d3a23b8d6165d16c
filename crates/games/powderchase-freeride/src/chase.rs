//! Pursuit pressure: the fog wall and the beast.
//!
//! The fog only ever moves downhill except when a lodge visit or a repel
//! effect pushes it back. The beast wakes after a burst of crashes and cycles
//! chasing → lunging → retreating → chasing until it lands a catch.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use powderchase_core::events::DeathCause;

use crate::config::ChaseConfig;
use crate::util::{catmull_rom, dist_sq, exp_lerp, hash_seed};

const SALT_LUNGE: u64 = 0xB3A5;
/// Base lateral tracking rate of a chasing beast (1/s).
const BEAST_TRACKING_RATE: f32 = 3.0;

/// Snapshot of the rider that the chase needs each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quarry {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub lateral_speed: f32,
    pub invincible: bool,
    pub crashed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeastMode {
    Chasing,
    Lunging,
    Retreating,
}

impl BeastMode {
    /// The only legal successor.
    pub fn next(self) -> Self {
        match self {
            BeastMode::Chasing => BeastMode::Lunging,
            BeastMode::Lunging => BeastMode::Retreating,
            BeastMode::Retreating => BeastMode::Chasing,
        }
    }
}

/// An in-flight lunge: start, predicted target, and whether it is the
/// guaranteed variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lunge {
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub guaranteed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beast {
    pub active: bool,
    pub x: f32,
    pub y: f32,
    pub mode: BeastMode,
    /// 0..1, rises while active.
    pub rage: f32,
    /// Countdown to the next allowed lunge.
    pub lunge_timer: f32,
    /// Time spent in the current lunge or retreat.
    pub mode_timer: f32,
    pub lunge: Option<Lunge>,
    pub miss_count: u32,
    pub total_crashes: u32,
    pub lunges: u64,
}

impl Default for Beast {
    fn default() -> Self {
        Self {
            active: false,
            x: 0.0,
            y: 0.0,
            mode: BeastMode::Chasing,
            rage: 0.0,
            lunge_timer: 0.0,
            mode_timer: 0.0,
            lunge: None,
            miss_count: 0,
            total_crashes: 0,
            lunges: 0,
        }
    }
}

impl Beast {
    pub fn guaranteed_catch(&self, config: &ChaseConfig) -> bool {
        self.total_crashes >= config.guaranteed_catch_crashes
            || self.miss_count >= config.guaranteed_catch_misses
    }

    fn near_guaranteed(&self, config: &ChaseConfig) -> bool {
        self.total_crashes + 1 >= config.guaranteed_catch_crashes
            || self.miss_count + 1 >= config.guaranteed_catch_misses
    }

    pub fn catch_radius(&self, guaranteed: bool, config: &ChaseConfig) -> f32 {
        if guaranteed {
            config.guaranteed_catch_radius
        } else {
            config.catch_radius * (1.0 + config.rage_catch_factor * self.rage)
        }
    }

    fn next_lunge_delay(&self, config: &ChaseConfig) -> f32 {
        let delay = config.lunge_interval / (1.0 + self.rage);
        if self.near_guaranteed(config) {
            delay * 0.5
        } else {
            delay
        }
    }
}

/// Things that happened in the chase this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChaseReport {
    pub caught: Option<DeathCause>,
    pub lunged: bool,
    pub missed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chase {
    pub fog_y: f32,
    pub fog_speed: f32,
    /// Chase-active seconds; drives the fog ramp.
    pub elapsed: f32,
    /// Times (in `elapsed`) of recent crashes inside the rolling window.
    pub recent_crashes: Vec<f32>,
    pub beast: Beast,
    seed: u64,
}

impl Chase {
    pub fn new(player_y: f32, seed: u64, config: &ChaseConfig) -> Self {
        Self {
            fog_y: player_y - config.fog_start_gap,
            fog_speed: config.base_fog_speed,
            elapsed: 0.0,
            recent_crashes: Vec::new(),
            beast: Beast::default(),
            seed,
        }
    }

    /// Register a crash. Returns true if this crash woke the beast.
    pub fn record_crash(&mut self, quarry: &Quarry, config: &ChaseConfig) -> bool {
        self.beast.total_crashes += 1;
        if self.beast.active {
            self.beast.rage = (self.beast.rage + config.rage_per_crash).min(1.0);
            return false;
        }
        let now = self.elapsed;
        self.recent_crashes.push(now);
        self.recent_crashes.retain(|t| now - *t <= config.crash_window);
        if self.recent_crashes.len() < config.crash_threshold as usize {
            return false;
        }
        self.recent_crashes.clear();
        let beast = &mut self.beast;
        beast.active = true;
        beast.x = quarry.x;
        beast.y = quarry.y - config.beast_spawn_gap;
        beast.mode = BeastMode::Chasing;
        beast.lunge_timer = config.lunge_interval;
        beast.mode_timer = 0.0;
        beast.lunge = None;
        tracing::info!(
            crashes = beast.total_crashes,
            y = beast.y,
            "Beast awakened"
        );
        true
    }

    /// Advance fog and beast by one tick.
    pub fn update(&mut self, dt: f32, quarry: &Quarry, config: &ChaseConfig) -> ChaseReport {
        let mut report = ChaseReport::default();
        self.elapsed += dt;
        if self.update_fog(dt, quarry, config) {
            report.caught = Some(DeathCause::Fog);
            return report;
        }
        if self.beast.active {
            self.update_beast(dt, quarry, config, &mut report);
        }
        report
    }

    /// Returns true when the fog reaches the rider.
    fn update_fog(&mut self, dt: f32, quarry: &Quarry, config: &ChaseConfig) -> bool {
        let mut acceleration = config.fog_acceleration;
        if self.elapsed > config.ramp_start {
            let span = (config.max_time - config.ramp_start).max(1.0);
            let t = (self.elapsed - config.ramp_start) / span;
            acceleration *= 1.0 + config.ramp_strength * t * t;
        }
        self.fog_speed += acceleration * dt;

        let mut advance = self.fog_speed * dt;
        if quarry.speed < self.fog_speed {
            advance += (self.fog_speed - quarry.speed) * config.deficit_factor * dt;
        }
        if self.elapsed > config.max_time {
            let overtime = self.elapsed - config.max_time;
            advance += (config.overtime_flat + config.overtime_linear * overtime) * dt;
        }
        self.fog_y += advance.max(0.0);
        self.fog_y = self.fog_y.max(quarry.y - config.max_fog_gap);

        self.fog_y >= quarry.y - config.kill_margin
    }

    fn update_beast(
        &mut self,
        dt: f32,
        quarry: &Quarry,
        config: &ChaseConfig,
        report: &mut ChaseReport,
    ) {
        let beast = &mut self.beast;
        beast.rage = (beast.rage + config.rage_rate * dt).min(1.0);
        beast.y = beast.y.max(quarry.y - config.beast_leash);
        let rage_scale = 1.0 + beast.rage * config.rage_speed_factor;

        match beast.mode {
            BeastMode::Chasing => {
                beast.x = exp_lerp(beast.x, quarry.x, BEAST_TRACKING_RATE * rage_scale, dt);
                beast.y += quarry.speed * config.beast_speed_multiplier * rage_scale * dt;
                beast.y = beast.y.min(quarry.y - config.lunge_min_distance);
                beast.lunge_timer -= dt;

                let distance = dist_sq(beast.x, beast.y, quarry.x, quarry.y).sqrt();
                let in_band = distance >= config.lunge_min_distance - 1.0
                    && distance <= config.lunge_max_distance;
                if in_band && beast.lunge_timer <= 0.0 {
                    let guaranteed = beast.guaranteed_catch(config);
                    let mut target = (
                        quarry.x + quarry.lateral_speed * config.lunge_duration,
                        quarry.y + quarry.speed * config.lunge_duration,
                    );
                    if !guaranteed && config.prediction_variance > 0.0 {
                        let mut rng =
                            StdRng::seed_from_u64(hash_seed(self.seed, beast.lunges, 0, SALT_LUNGE));
                        let v = config.prediction_variance;
                        target.0 += rng.random_range(-v..=v);
                        target.1 += rng.random_range(-v..=v);
                    }
                    beast.lunge = Some(Lunge {
                        from: (beast.x, beast.y),
                        to: target,
                        guaranteed,
                    });
                    beast.lunges += 1;
                    beast.mode = beast.mode.next();
                    beast.mode_timer = 0.0;
                    report.lunged = true;
                }
            },
            BeastMode::Lunging => {
                beast.mode_timer += dt;
                let Some(lunge) = beast.lunge else {
                    beast.mode = beast.mode.next();
                    beast.mode_timer = 0.0;
                    return;
                };
                let t = (beast.mode_timer / config.lunge_duration.max(1e-3)).min(1.0);
                let eased = t * t * (3.0 - 2.0 * t);
                let (dx, dy) = (lunge.to.0 - lunge.from.0, lunge.to.1 - lunge.from.1);
                beast.x = catmull_rom(
                    lunge.from.0 - dx,
                    lunge.from.0,
                    lunge.to.0,
                    lunge.to.0 + dx,
                    eased,
                );
                beast.y = catmull_rom(
                    lunge.from.1 - dy,
                    lunge.from.1,
                    lunge.to.1,
                    lunge.to.1 + dy,
                    eased,
                );
                if t < 1.0 {
                    return;
                }

                let radius = beast.catch_radius(lunge.guaranteed, config);
                let close = dist_sq(beast.x, beast.y, quarry.x, quarry.y) <= radius * radius;
                let exposed = !quarry.invincible && (lunge.guaranteed || !quarry.crashed);
                if close && exposed {
                    report.caught = Some(DeathCause::Beast);
                    return;
                }
                beast.miss_count += 1;
                beast.lunge = None;
                beast.mode = beast.mode.next();
                beast.mode_timer = 0.0;
                report.missed = true;
            },
            BeastMode::Retreating => {
                beast.mode_timer += dt;
                beast.y += quarry.speed * (1.0 - config.retreat_speed_factor) * dt;
                if beast.mode_timer >= config.retreat_duration {
                    beast.mode = beast.mode.next();
                    beast.mode_timer = 0.0;
                    beast.lunge_timer = beast.next_lunge_delay(config);
                }
            },
        }
    }

    /// Lodge exit: push the fog back and bleed off part of its excess speed.
    pub fn lodge_exit(&mut self, player_y: f32, config: &ChaseConfig) {
        self.fog_y -= config.lodge_pushback;
        self.fog_speed = config.base_fog_speed
            + (self.fog_speed - config.base_fog_speed) * config.lodge_speed_reset;
        if self.beast.active {
            self.beast.y = self.beast.y.min(player_y - config.beast_leash);
        }
    }

    /// Push the fog back by `distance`.
    pub fn repel(&mut self, distance: f32) {
        if distance.is_finite() && distance > 0.0 {
            self.fog_y -= distance;
        }
    }

    pub fn fog_gap(&self, player_y: f32) -> f32 {
        player_y - self.fog_y
    }
}
