//! Endless freeride mode: descend a procedurally generated slope, score
//! tricks and grinds, and stay ahead of the fog and the beast.
//!
//! One call to `update` runs the tick pipeline in a fixed order:
//! terrain stream → collision → physics → trick scoring → chase.
//! Later stages observe what earlier stages changed in the same tick.

pub mod chase;
pub mod collision;
pub mod config;
pub mod entities;
pub mod physics;
pub mod scoring;
pub mod shop;
pub mod terrain;
pub mod tricks;
pub mod util;

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use powderchase_core::events::{Celebration, CelebrationQueue, Color, DeathCause};
use powderchase_core::game_mode_boilerplate;
use powderchase_core::game_trait::{GameEvent, GameMode, ModeMetadata, RunConfig, RunResult};
use powderchase_core::input::InputSignal;

use chase::{Beast, Chase, Quarry};
use collision::Interaction;
use config::{FreerideConfig, PhysicsConfig};
use entities::{Collectible, CollectibleKind, EntityRef, Jump, Lodge, Obstacle, Rail};
use physics::{GrindExit, Landing, Player, PlayerState, StateKind, StepOutcome};
use scoring::{LandingScore, ScoreState};
use shop::{Modifiers, ShopEffect, ShopEffectKind};
use terrain::Terrain;
use tricks::TrickStyle;
use util::{exp_lerp, hash_seed};

const SALT_TRICK: u64 = 0x7121;
const SALT_FLAVOUR: u64 = 0xF1A7;

const FLAVOUR: [&str; 6] = ["Sick", "Stomped", "Clean", "Smooth", "Huge", "Steezy"];

/// Gap between a lodge's bottom edge and the rider on exit.
const LODGE_EXIT_CLEARANCE: f32 = 10.0;

/// Whole-run world state. Everything the simulation reads or writes lives
/// here, so a snapshot of this struct is a snapshot of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreerideState {
    pub seed: u64,
    pub tick: u64,
    /// Monotonic distance descended from the start.
    pub distance: f32,
    pub start_y: f32,
    pub camera_y: f32,
    pub player: Player,
    pub terrain: Terrain,
    pub score: ScoreState,
    pub chase: Chase,
    pub modifiers: Modifiers,
    pub celebrations: CelebrationQueue,
    /// Obstacles that already paid a near-miss bonus.
    pub near_missed: BTreeSet<EntityRef>,
    pub visited_lodges: BTreeSet<EntityRef>,
    /// Set while the rider is inside a lodge; pursuit and physics are paused.
    pub in_lodge: Option<EntityRef>,
    pub jumps_taken: u64,
    pub outcome: Option<DeathCause>,
}

impl FreerideState {
    pub fn new(seed: u64, config: &FreerideConfig) -> Self {
        let player = Player::new(0.0, 0.0, &config.physics);
        let camera_y = player.y - config.camera.offset;
        let mut terrain = Terrain::new(seed);
        terrain.stream(camera_y, config);
        Self {
            seed,
            tick: 0,
            distance: 0.0,
            start_y: player.y,
            camera_y,
            chase: Chase::new(player.y, seed, &config.chase),
            player,
            terrain,
            score: ScoreState::default(),
            modifiers: Modifiers::default(),
            celebrations: CelebrationQueue::default(),
            near_missed: BTreeSet::new(),
            visited_lodges: BTreeSet::new(),
            in_lodge: None,
            jumps_taken: 0,
            outcome: None,
        }
    }

    fn quarry(&self) -> Quarry {
        Quarry {
            x: self.player.x,
            y: self.player.y,
            speed: self.player.speed,
            lateral_speed: self.player.lateral_speed,
            invincible: self.player.is_invincible(),
            crashed: self.player.is_crashed(),
        }
    }

    fn flavour(&self) -> &'static str {
        let mut rng = StdRng::seed_from_u64(hash_seed(self.seed, self.tick, 0, SALT_FLAVOUR));
        FLAVOUR[rng.random_range(0..FLAVOUR.len())]
    }

    fn tick(&mut self, dt: f32, input: &InputSignal, config: &FreerideConfig) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let score_before = self.score.score;

        self.tick += 1;
        self.celebrations.tick(dt);
        self.modifiers.tick(dt);
        self.player.tick_timers(dt);
        let physics = self.modifiers.apply(&config.physics);
        let bonus = self.modifiers.score_factor();

        // Terrain streaming.
        let streamed = self.terrain.stream(self.camera_y, config);
        if streamed.culled > 0 {
            if let Some(first) = self.terrain.chunks().next().map(|c| c.index) {
                self.near_missed.retain(|r| r.chunk >= first);
            }
        }

        // Collision.
        if let Some(hit) =
            collision::resolve(&self.player, &self.terrain, &self.visited_lodges, config)
        {
            self.interact(hit, config, &physics, bonus, &mut events);
            if self.in_lodge.is_some() {
                return events;
            }
        }

        // Physics.
        let rail = match &self.player.state {
            PlayerState::Grinding(grind) => self.terrain.rail(grind.rail),
            _ => None,
        };
        let outcome = self
            .player
            .step(dt, input, config, &physics, self.camera_y, rail);

        // Trick scoring.
        match outcome {
            StepOutcome::Landed(landing) => self.score_landing(&landing, config, bonus, &mut events),
            StepOutcome::GrindEnded(exit) => self.score_grind(&exit, config, bonus, &mut events),
            StepOutcome::Recovered | StepOutcome::None => {},
        }
        // Near misses are sampled every other tick.
        if self.tick % 2 == 0 {
            self.check_near_misses(config, bonus, &mut events);
        }
        if let Some(chain) = self.score.tick(dt, &config.tricks) {
            events.push(GameEvent::ChainCompleted {
                length: chain.length,
                bonus: chain.bonus,
            });
            self.celebrations.push(Celebration::new(
                format!("{}x Chain +{}", chain.length, chain.bonus),
                Color::PURPLE,
                1.3,
            ));
        }

        self.camera_y = exp_lerp(
            self.camera_y,
            self.player.y - config.camera.offset,
            config.camera.follow_rate,
            dt,
        );
        self.distance = self.distance.max(self.player.y - self.start_y);

        // Chase.
        let quarry = self.quarry();
        let report = self.chase.update(dt, &quarry, &config.chase);
        if report.lunged {
            events.push(GameEvent::BeastLunged);
        }

        if self.score.score != score_before {
            events.push(GameEvent::ScoreUpdate {
                score: self.score.score,
            });
        }
        if let Some(cause) = report.caught {
            self.outcome = Some(cause);
            events.push(GameEvent::RunOver { cause });
            tracing::info!(
                cause = cause.as_str(),
                score = self.score.score,
                distance = self.distance,
                "Run over"
            );
        }
        events
    }

    fn interact(
        &mut self,
        hit: Interaction,
        config: &FreerideConfig,
        physics: &PhysicsConfig,
        bonus: f32,
        events: &mut Vec<GameEvent>,
    ) {
        match hit {
            Interaction::LodgeDoor(r) => {
                self.in_lodge = Some(r);
                self.visited_lodges.insert(r);
                self.celebrations.clear();
                events.push(GameEvent::LodgeEntered);
                tracing::info!(chunk = r.chunk, distance = self.distance, "Lodge entered");
            },
            Interaction::LodgeWall(_) | Interaction::Obstacle(_) => {
                self.crash(config, physics, events);
            },
            Interaction::Jump(r) => {
                let Some(power) = self.terrain.jump(r).map(|j| j.launch_power) else {
                    return;
                };
                let v0 = config.launch_velocity(power, self.player.speed);
                let expected_air = 2.0 * v0 / config.physics.gravity.max(1.0);
                let mut rng =
                    StdRng::seed_from_u64(hash_seed(self.seed, self.jumps_taken, 0, SALT_TRICK));
                let trick = tricks::pick_auto_trick(&mut rng, expected_air);
                self.jumps_taken += 1;
                self.player.trigger_jump(power, Some(trick), config);
            },
            Interaction::Rail(r) => {
                if let Some(rail) = self.terrain.rail(r) {
                    self.player.start_grind(r, rail, physics);
                }
            },
            Interaction::Collectible(r) => {
                let Some(kind) = self.terrain.collect(r) else {
                    return;
                };
                let big = kind == CollectibleKind::Big;
                let base = if big {
                    config.tricks.big_collectible_points
                } else {
                    config.tricks.collectible_points
                };
                let points = self.score.award(base, bonus);
                events.push(GameEvent::CollectiblePicked { big, points });
                let color = if big { Color::ORANGE } else { Color::GOLD };
                self.celebrations
                    .push(Celebration::new(format!("+{points}"), color, 0.8));
            },
        }
    }

    fn crash(&mut self, config: &FreerideConfig, physics: &PhysicsConfig, events: &mut Vec<GameEvent>) {
        if !self.player.crash(physics) {
            return;
        }
        self.score.crash();
        events.push(GameEvent::Crashed);
        self.celebrations
            .push(Celebration::new("Wipeout", Color::RED, 1.0));
        let quarry = self.quarry();
        if self.chase.record_crash(&quarry, &config.chase) {
            events.push(GameEvent::BeastAwakened);
            self.celebrations
                .push(Celebration::new("The beast awakens", Color::RED, 1.5));
        }
    }

    fn score_landing(
        &mut self,
        landing: &Landing,
        config: &FreerideConfig,
        bonus: f32,
        events: &mut Vec<GameEvent>,
    ) {
        match self.score.land(landing, &config.tricks, bonus) {
            LandingScore::Trick { name, points } => {
                let text = format!("{}! {} +{}", self.flavour(), name, points);
                let color = landing.trick.map_or(Color::GOLD, |t| style_color(t.style()));
                self.celebrations.push(Celebration::new(text, color, 1.2));
                events.push(GameEvent::TrickLanded { name, points });
            },
            LandingScore::Partial { points } => {
                self.celebrations
                    .push(Celebration::new(format!("Air +{points}"), Color::WHITE, 0.9));
                events.push(GameEvent::TrickLanded {
                    name: "Air".to_string(),
                    points,
                });
            },
            LandingScore::Nothing => {},
        }
        if landing.air_time >= config.tricks.big_air_time {
            self.celebrations
                .push(Celebration::new("Big Air!", Color::CYAN, 1.1));
        }
    }

    fn score_grind(
        &mut self,
        exit: &GrindExit,
        config: &FreerideConfig,
        bonus: f32,
        events: &mut Vec<GameEvent>,
    ) {
        let Some((name, points)) = self.score.grind(exit, &config.tricks, bonus) else {
            return;
        };
        self.celebrations
            .push(Celebration::new(format!("{name} +{points}"), Color::PINK, 1.2));
        events.push(GameEvent::GrindCompleted { name, points });
    }

    fn check_near_misses(&mut self, config: &FreerideConfig, bonus: f32, events: &mut Vec<GameEvent>) {
        let misses =
            collision::near_misses(&self.player, &self.terrain, &self.near_missed, config);
        for r in misses {
            self.near_missed.insert(r);
            let points = self.score.near_miss(&config.tricks, bonus);
            events.push(GameEvent::NearMiss { points });
            self.celebrations
                .push(Celebration::new("Close call!", Color::CYAN, 0.8));
        }
    }
}

/// Read-only view handed to an external renderer each tick.
#[derive(Debug, Clone)]
pub struct RenderView<'a> {
    pub player: &'a Player,
    pub player_state: StateKind,
    pub camera_y: f32,
    pub obstacles: Vec<&'a Obstacle>,
    pub jumps: Vec<&'a Jump>,
    pub rails: Vec<&'a Rail>,
    pub lodges: Vec<&'a Lodge>,
    pub collectibles: Vec<&'a Collectible>,
    pub fog_y: f32,
    pub beast: Option<&'a Beast>,
    pub score: &'a ScoreState,
    pub celebrations: &'a CelebrationQueue,
    pub in_lodge: bool,
}

/// The freeride game mode.
pub struct Freeride {
    state: FreerideState,
    paused: bool,
    /// Config as loaded; per-run overrides are applied on top at `init`.
    game_config: FreerideConfig,
    active_config: FreerideConfig,
}

impl Freeride {
    pub fn new() -> Self {
        Self::with_config(FreerideConfig::load())
    }

    pub fn with_config(config: FreerideConfig) -> Self {
        Self {
            state: FreerideState::new(0, &config),
            paused: false,
            active_config: config.clone(),
            game_config: config,
        }
    }

    /// Config in effect for the current run.
    pub fn config(&self) -> &FreerideConfig {
        &self.active_config
    }

    pub fn state(&self) -> &FreerideState {
        &self.state
    }

    pub fn in_lodge(&self) -> bool {
        self.state.in_lodge.is_some()
    }

    /// Physics constants with the active shop boosts applied.
    pub fn effective_physics(&self) -> PhysicsConfig {
        self.state.modifiers.apply(&self.active_config.physics)
    }

    /// Apply purchases from the lodge shop. Timed boosts stack; one-shot
    /// effects take hold immediately. Fog repel only moves the fog on lodge
    /// exit and is ignored here.
    pub fn apply_shop_effects(&mut self, effects: &[ShopEffect]) {
        self.apply_purchases(effects, false);
    }

    fn apply_purchases(&mut self, effects: &[ShopEffect], lodge_exit: bool) {
        for effect in effects {
            match effect.kind {
                ShopEffectKind::Invincibility => {
                    if effect.value.is_finite() {
                        self.state.player.invincible = self.state.player.invincible.max(effect.value);
                    }
                },
                ShopEffectKind::FogRepel if lodge_exit => self.state.chase.repel(effect.value),
                ShopEffectKind::FogRepel => {
                    tracing::debug!(value = effect.value, "Fog repel outside a lodge ignored");
                    continue;
                },
                _ => self.state.modifiers.push(*effect),
            }
            tracing::debug!(kind = ?effect.kind, value = effect.value, "Shop effect applied");
        }
    }

    /// Drop every active boost and return to base physics.
    pub fn reset_modifiers(&mut self) {
        self.state.modifiers.clear();
    }

    /// Leave the current lodge with the shop's purchases. Pushes the fog
    /// back and places the rider just below the building.
    pub fn leave_lodge(&mut self, purchases: &[ShopEffect]) -> Vec<GameEvent> {
        let Some(r) = self.state.in_lodge.take() else {
            return Vec::new();
        };
        let config = &self.active_config;
        if let Some(lodge) = self.state.terrain.lodge(r) {
            let player = &mut self.state.player;
            player.x = lodge.footprint.x;
            player.y =
                lodge.footprint.bottom() + config.physics.player_half_height + LODGE_EXIT_CLEARANCE;
            player.visual_x = player.x;
            player.visual_y = player.y;
            player.angle = 0.0;
            player.lateral_speed = 0.0;
        }
        let player = &mut self.state.player;
        player.state = PlayerState::Ground;
        player.invincible = player.invincible.max(config.physics.recovery_invincibility);
        let player_y = player.y;
        self.state.chase.lodge_exit(player_y, &config.chase);
        self.apply_purchases(purchases, true);
        tracing::info!(
            chunk = r.chunk,
            purchases = purchases.len(),
            fog_gap = self.state.chase.fog_gap(player_y),
            "Lodge exited"
        );
        vec![GameEvent::LodgeExited]
    }

    pub fn view(&self) -> RenderView<'_> {
        let state = &self.state;
        let terrain = &state.terrain;
        RenderView {
            player: &state.player,
            player_state: state.player.kind(),
            camera_y: state.camera_y,
            obstacles: terrain.obstacles().map(|(_, o)| o).collect(),
            jumps: terrain.jumps().map(|(_, j)| j).collect(),
            rails: terrain.rails().map(|(_, r)| r).collect(),
            lodges: terrain.lodges().map(|(_, l)| l).collect(),
            collectibles: terrain.collectibles().map(|(_, c)| c).collect(),
            fog_y: state.chase.fog_y,
            beast: Some(&state.chase.beast).filter(|b| b.active),
            score: &state.score,
            celebrations: &state.celebrations,
            in_lodge: state.in_lodge.is_some(),
        }
    }
}

impl Default for Freeride {
    fn default() -> Self {
        Self::with_config(FreerideConfig::default())
    }
}

impl GameMode for Freeride {
    fn metadata(&self) -> ModeMetadata {
        ModeMetadata {
            name: "Freeride".to_string(),
            description: "Endless descent. Land tricks, grind rails, outrun the fog.".to_string(),
        }
    }

    fn init(&mut self, config: &RunConfig) {
        let mut active = self.game_config.clone();
        if let Some(width) = config.custom_f32("screen_width").filter(|w| *w > 0.0) {
            active.terrain.slope_width = width;
        }
        self.state = FreerideState::new(config.seed, &active);
        self.paused = false;
        tracing::info!(
            seed = config.seed,
            columns = active.terrain.columns(),
            "Freeride run started"
        );
        self.active_config = active;
    }

    fn update(&mut self, dt: f32, input: &InputSignal) -> Vec<GameEvent> {
        if self.paused || self.state.outcome.is_some() || self.state.in_lodge.is_some() {
            return Vec::new();
        }
        self.state.tick(dt, input, &self.active_config)
    }

    fn run_result(&self) -> RunResult {
        RunResult {
            score: self.state.score.score,
            distance: self.state.distance,
            best_combo: self.state.score.best_combo,
            cause: self.state.outcome,
        }
    }

    game_mode_boilerplate!(state_type: FreerideState);
}

/// Celebration colour for an automatic trick.
fn style_color(style: TrickStyle) -> Color {
    match style {
        TrickStyle::Grab => Color::GOLD,
        TrickStyle::Flip => Color::ORANGE,
        TrickStyle::Spin => Color::CYAN,
        TrickStyle::Combo => Color::PURPLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powderchase_core::test_helpers::{self, default_config, run_mode_ticks, steady_input};
    use crate::tricks::AerialTrick;

    const DT: f32 = 1.0 / 60.0;

    /// Short chase timings so idle runs end quickly; no lodges.
    fn quick_config() -> FreerideConfig {
        let mut config = FreerideConfig::default();
        config.terrain.lodge_chance = 0.0;
        config.chase.ramp_start = 5.0;
        config.chase.max_time = 15.0;
        config
    }

    fn started(seed: u64) -> Freeride {
        let mut mode = Freeride::with_config(quick_config());
        mode.init(&default_config(seed));
        mode
    }

    #[test]
    fn contract_init_creates_state() {
        let mut mode = Freeride::with_config(quick_config());
        test_helpers::contract_init_creates_state(&mut mode, 42);
    }

    #[test]
    fn contract_update_advances_time() {
        let mut mode = started(42);
        test_helpers::contract_update_advances_time(&mut mode, DT);
    }

    #[test]
    fn contract_deterministic() {
        let mut a = Freeride::with_config(quick_config());
        let mut b = Freeride::with_config(quick_config());
        let inputs: Vec<InputSignal> = (0..600)
            .map(|i| InputSignal {
                left: (i / 90) % 3 == 0,
                right: (i / 90) % 3 == 2,
                down: i % 7 < 4,
                jump_pressed: i % 97 == 0,
                ..Default::default()
            })
            .collect();
        test_helpers::contract_deterministic(&mut a, &mut b, 7, &inputs, DT);
    }

    #[test]
    fn contract_state_roundtrip_preserves() {
        let mut mode = started(42);
        run_mode_ticks(&mut mode, 120, DT, &steady_input(false, true, true));
        test_helpers::contract_state_roundtrip_preserves(&mut mode);
    }

    #[test]
    fn contract_pause_stops_updates() {
        let mut mode = started(42);
        test_helpers::contract_pause_stops_updates(&mut mode, DT);
    }

    #[test]
    fn contract_run_eventually_ends() {
        let mut mode = started(42);
        test_helpers::contract_run_eventually_ends(&mut mode, 60 * 120, DT);
    }

    #[test]
    fn screen_width_widens_the_slope() {
        let mut mode = Freeride::with_config(quick_config());
        let mut run = default_config(3);
        run.custom
            .insert("screen_width".to_string(), serde_json::json!(1600));
        mode.init(&run);
        assert_eq!(mode.config().terrain.columns(), 26);
    }

    #[test]
    fn distance_is_monotonic() {
        let mut mode = started(11);
        let mut last = 0.0;
        for i in 0..1200 {
            let input = steady_input(i % 240 < 120, i % 240 >= 120, false);
            mode.update(DT, &input);
            assert!(mode.state().distance >= last);
            last = mode.state().distance;
            if mode.is_run_over() {
                break;
            }
        }
        assert!(last > 0.0);
    }

    #[test]
    fn finished_run_ignores_updates() {
        let mut mode = started(5);
        run_mode_ticks(&mut mode, 60 * 120, DT, &InputSignal::default());
        assert!(mode.is_run_over());
        let before = mode.serialize_state().unwrap();
        assert!(mode.update(DT, &InputSignal::default()).is_empty());
        assert_eq!(before, mode.serialize_state().unwrap());
        let result = mode.run_result();
        assert!(result.cause.is_some());
        assert_eq!(result.score, mode.state().score.score);
    }

    fn lodge_config() -> FreerideConfig {
        let mut config = quick_config();
        config.terrain.lodge_chance = 1.0;
        config.terrain.lodge_min_distance = 0.0;
        config.terrain.lodge_spacing = 0.0;
        config
    }

    /// A started run with the rider parked on the first lodge's ramp.
    fn at_lodge() -> Option<(Freeride, EntityRef)> {
        for seed in 0..50 {
            let mut mode = Freeride::with_config(lodge_config());
            mode.init(&default_config(seed));
            let Some((r, ramp)) = mode
                .state
                .terrain
                .lodges()
                .next()
                .map(|(r, lodge)| (r, lodge.ramp))
            else {
                continue;
            };
            mode.state.player.x = ramp.x;
            mode.state.player.y = ramp.y;
            return Some((mode, r));
        }
        None
    }

    #[test]
    fn lodge_visit_pauses_and_pushes_fog_back() {
        let (mut mode, r) = at_lodge().expect("some seed must place an early lodge");
        let events = mode.update(DT, &InputSignal::default());
        assert!(events.contains(&GameEvent::LodgeEntered));
        assert!(mode.in_lodge());
        assert!(mode.state().visited_lodges.contains(&r));

        let frozen = mode.serialize_state().unwrap();
        assert!(mode.update(DT, &InputSignal::default()).is_empty());
        assert_eq!(frozen, mode.serialize_state().unwrap());

        let fog_before = mode.state().chase.fog_y;
        let purchases = [
            ShopEffect::new(ShopEffectKind::SpeedBoost, 0.5),
            ShopEffect::new(ShopEffectKind::FogRepel, 300.0),
        ];
        let events = mode.leave_lodge(&purchases);
        assert_eq!(events, vec![GameEvent::LodgeExited]);
        assert!(!mode.in_lodge());
        let cfg = mode.config().clone();
        assert_eq!(
            mode.state().chase.fog_y,
            fog_before - cfg.chase.lodge_pushback - 300.0
        );
        let lodge_bottom = mode.state().terrain.lodge(r).unwrap().footprint.bottom();
        assert!(mode.state().player.y > lodge_bottom);
        assert!(mode.state().player.is_invincible());
        assert_eq!(
            mode.effective_physics().max_speed,
            cfg.physics.max_speed * 1.5
        );

        mode.reset_modifiers();
        assert_eq!(mode.effective_physics(), cfg.physics);
        assert!(mode.leave_lodge(&[]).is_empty(), "not in a lodge any more");
    }

    #[test]
    fn repeated_crashes_wake_the_beast() {
        let mut mode = started(4);
        let threshold = mode.config().chase.crash_threshold as usize;
        let mut crashes = 0;
        let mut awakened = false;
        for _ in 0..60 * 30 {
            // Drop the rider onto the next obstacle downhill whenever they
            // are back on their feet.
            let player = &mode.state.player;
            if player.is_grounded() && !player.is_down() {
                let player_y = player.y;
                let target = mode
                    .state
                    .terrain
                    .obstacles()
                    .map(|(_, o)| (o.x, o.y))
                    .filter(|(_, y)| *y > player_y + 40.0)
                    .min_by(|a, b| a.1.total_cmp(&b.1));
                if let Some((x, y)) = target {
                    let player = &mut mode.state.player;
                    player.x = x;
                    player.y = y;
                    player.invincible = 0.0;
                }
            }
            for event in mode.update(DT, &InputSignal::default()) {
                match event {
                    GameEvent::Crashed => crashes += 1,
                    GameEvent::BeastAwakened => awakened = true,
                    _ => {},
                }
            }
            if awakened || mode.is_run_over() {
                break;
            }
        }
        assert!(awakened, "{crashes} crashes never woke the beast");
        assert_eq!(crashes, threshold);
        assert!(mode.state().chase.beast.active);
        assert!(!mode.is_run_over());
    }

    #[test]
    fn fog_repel_mid_run_leaves_fog_alone() {
        let mut mode = started(4);
        for _ in 0..120 {
            mode.update(DT, &InputSignal::default());
        }
        let fog_before = mode.state().chase.fog_y;
        mode.apply_shop_effects(&[
            ShopEffect::new(ShopEffectKind::FogRepel, 500.0),
            ShopEffect::new(ShopEffectKind::SpeedBoost, 0.25),
        ]);
        assert_eq!(mode.state().chase.fog_y, fog_before);
        assert_eq!(
            mode.effective_physics().max_speed,
            mode.config().physics.max_speed * 1.25
        );
        let mut last = fog_before;
        for _ in 0..60 {
            mode.update(DT, &InputSignal::default());
            assert!(mode.state().chase.fog_y >= last, "fog never moves uphill mid-run");
            last = mode.state().chase.fog_y;
        }
    }

    #[test]
    fn entering_a_lodge_drops_pending_celebrations() {
        let (mut mode, _) = at_lodge().expect("some seed must place an early lodge");
        mode.state
            .celebrations
            .push(Celebration::new("Stale", Color::WHITE, 1.0));
        let events = mode.update(DT, &InputSignal::default());
        assert!(events.contains(&GameEvent::LodgeEntered));
        assert!(mode.state().celebrations.iter().all(|c| c.text != "Stale"));
    }

    #[test]
    fn trick_styles_have_their_own_colours() {
        let colours: BTreeSet<(u8, u8, u8)> = AerialTrick::ALL
            .iter()
            .map(|t| style_color(t.style()))
            .map(|c| (c.r, c.g, c.b))
            .collect();
        assert_eq!(colours.len(), 4);
        assert_eq!(style_color(AerialTrick::Indy.style()), Color::GOLD);
    }

    #[test]
    fn visited_lodge_door_is_a_wall() {
        let (mut mode, r) = at_lodge().expect("some seed must place an early lodge");
        mode.state.visited_lodges.insert(r);
        let footprint = mode.state.terrain.lodge(r).unwrap().footprint;
        mode.state.player.x = footprint.x;
        mode.state.player.y = footprint.y;
        let events = mode.update(DT, &InputSignal::default());
        assert!(events.contains(&GameEvent::Crashed));
        assert!(!mode.in_lodge());
    }

    #[test]
    fn invincibility_purchase_is_one_shot() {
        let mut mode = started(1);
        mode.apply_shop_effects(&[ShopEffect::new(ShopEffectKind::Invincibility, 4.0)]);
        assert_eq!(mode.state().player.invincible, 4.0);
        assert!(mode.state().modifiers.active().is_empty());
    }

    #[test]
    fn jumps_launch_with_auto_trick() {
        for seed in 0..60 {
            let mut mode = started(seed);
            let Some((x, y)) = mode
                .state
                .terrain
                .jumps()
                .next()
                .map(|(_, j)| (j.x, j.y))
            else {
                continue;
            };
            mode.state.player.x = x;
            mode.state.player.y = y;
            mode.state.camera_y = y - mode.config().camera.offset;
            mode.update(DT, &InputSignal::default());
            let PlayerState::Airborne(air) = &mode.state().player.state else {
                panic!("hitting a jump must launch the rider");
            };
            assert!(air.trick.is_some());
            assert_eq!(mode.state().jumps_taken, 1);
            return;
        }
        panic!("no jumps generated in the first chunks");
    }

    #[test]
    fn view_exposes_active_entities() {
        let mode = started(9);
        let view = mode.view();
        assert_eq!(view.player_state, StateKind::Ground);
        assert_eq!(
            view.obstacles.len(),
            mode.state().terrain.active().obstacles.len()
        );
        assert!(view.beast.is_none());
        assert!(!view.in_lodge);
    }
}
