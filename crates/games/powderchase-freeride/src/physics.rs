use serde::{Deserialize, Serialize};

use powderchase_core::input::InputSignal;

use crate::config::{FreerideConfig, PhysicsConfig};
use crate::entities::{EntityRef, GrindableType, Rail, Rect};
use crate::tricks::AerialTrick;
use crate::util::{clamp, exp_lerp};

/// Carve angle past which the carve acceleration bonus applies (degrees).
const CARVE_BONUS_ANGLE: f32 = 20.0;

/// Airborne sub-state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirState {
    pub altitude: f32,
    pub vertical_velocity: f32,
    pub air_time: f32,
    /// Automatic trick, `None` for an ollie.
    pub trick: Option<AerialTrick>,
    /// Fraction of the automatic trick completed.
    pub trick_progress: f32,
    /// Manual spin accumulated from left/right input (signed degrees).
    pub spin: f32,
    /// Display flip rotation from the automatic trick (degrees).
    pub flip: f32,
    /// Display spin rotation from the automatic trick (degrees). Separate
    /// from `spin`, which only counts manual input.
    pub trick_spin: f32,
    /// 0..1 grab animation phase.
    pub grab_phase: f32,
}

/// Grinding sub-state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrindState {
    pub rail: EntityRef,
    pub grindable: GrindableType,
    pub progress: f32,
    pub elapsed: f32,
    pub frames: u32,
    /// Speed along the rail (px/s).
    pub grind_speed: f32,
}

/// Rider state. Exactly one variant governs integration per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerState {
    Ground,
    Airborne(AirState),
    Grinding(GrindState),
    Crashed { timer: f32 },
    Stunned { timer: f32 },
}

/// Fieldless mirror of [`PlayerState`] for render views and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Ground,
    Airborne,
    Grinding,
    Crashed,
    Stunned,
}

/// What the rider carried into a landing.
#[derive(Debug, Clone, PartialEq)]
pub struct Landing {
    pub air_time: f32,
    pub trick: Option<AerialTrick>,
    pub trick_progress: f32,
    pub spin: f32,
    /// Landing was forced by a safety cap rather than gravity.
    pub forced: bool,
}

/// How a grind ended.
#[derive(Debug, Clone, PartialEq)]
pub struct GrindExit {
    pub rail: EntityRef,
    pub grindable: GrindableType,
    /// Rail length × exit progress.
    pub length: f32,
    /// The rail vanished or was degenerate; no score is due.
    pub aborted: bool,
}

/// Result of one physics step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    None,
    Landed(Landing),
    GrindEnded(GrindExit),
    Recovered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    /// Render-only smoothed position.
    pub visual_x: f32,
    pub visual_y: f32,
    /// Forward speed along +y (px/s).
    pub speed: f32,
    pub lateral_speed: f32,
    /// Carve angle in degrees, positive to the right.
    pub angle: f32,
    pub state: PlayerState,
    pub invincible: f32,
    pub grind_immunity: f32,
    pub last_rail: Option<EntityRef>,
    pub last_rail_timer: f32,
}

impl Player {
    pub fn new(x: f32, y: f32, config: &PhysicsConfig) -> Self {
        Self {
            x,
            y,
            visual_x: x,
            visual_y: y,
            speed: config.min_speed,
            lateral_speed: 0.0,
            angle: 0.0,
            state: PlayerState::Ground,
            invincible: 0.0,
            grind_immunity: 0.0,
            last_rail: None,
            last_rail_timer: 0.0,
        }
    }

    pub fn kind(&self) -> StateKind {
        match self.state {
            PlayerState::Ground => StateKind::Ground,
            PlayerState::Airborne(_) => StateKind::Airborne,
            PlayerState::Grinding(_) => StateKind::Grinding,
            PlayerState::Crashed { .. } => StateKind::Crashed,
            PlayerState::Stunned { .. } => StateKind::Stunned,
        }
    }

    pub fn is_grounded(&self) -> bool {
        matches!(self.state, PlayerState::Ground)
    }

    pub fn is_airborne(&self) -> bool {
        matches!(self.state, PlayerState::Airborne(_))
    }

    pub fn is_grinding(&self) -> bool {
        matches!(self.state, PlayerState::Grinding(_))
    }

    pub fn is_crashed(&self) -> bool {
        matches!(self.state, PlayerState::Crashed { .. })
    }

    /// Crashed or stunned.
    pub fn is_down(&self) -> bool {
        matches!(
            self.state,
            PlayerState::Crashed { .. } | PlayerState::Stunned { .. }
        )
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible > 0.0
    }

    pub fn altitude(&self) -> f32 {
        match &self.state {
            PlayerState::Airborne(air) => air.altitude,
            _ => 0.0,
        }
    }

    pub fn bounds(&self, config: &PhysicsConfig) -> Rect {
        Rect::new(
            self.x,
            self.y,
            config.player_half_width,
            config.player_half_height,
        )
    }

    /// Whether `rail` is currently blocked by post-grind immunity.
    pub fn rail_blocked(&self, rail: EntityRef) -> bool {
        self.grind_immunity > 0.0
            || (self.last_rail_timer > 0.0 && self.last_rail == Some(rail))
    }

    pub fn tick_timers(&mut self, dt: f32) {
        self.invincible = (self.invincible - dt).max(0.0);
        self.grind_immunity = (self.grind_immunity - dt).max(0.0);
        self.last_rail_timer = (self.last_rail_timer - dt).max(0.0);
        if self.last_rail_timer <= 0.0 {
            self.last_rail = None;
        }
    }

    /// Advance the active state by one tick. Crashed and stunned are checked
    /// first, then airborne, then grinding, else ground. `rail` must be the
    /// rail being ground, if any; a missing rail aborts the grind.
    pub fn step(
        &mut self,
        dt: f32,
        input: &InputSignal,
        config: &FreerideConfig,
        physics: &PhysicsConfig,
        camera_y: f32,
        rail: Option<&Rail>,
    ) -> StepOutcome {
        let half_width = config.terrain.half_width();
        let outcome = match self.state {
            PlayerState::Crashed { .. } | PlayerState::Stunned { .. } => {
                if self.update_down(dt, physics) {
                    StepOutcome::Recovered
                } else {
                    StepOutcome::None
                }
            },
            PlayerState::Airborne(_) => self
                .update_air(dt, input, physics, camera_y, half_width)
                .map(StepOutcome::Landed)
                .unwrap_or(StepOutcome::None),
            PlayerState::Grinding(_) => self
                .update_grind(dt, rail, physics)
                .map(StepOutcome::GrindEnded)
                .unwrap_or(StepOutcome::None),
            PlayerState::Ground => {
                self.update_ground(dt, input, physics, half_width);
                if input.jump_pressed {
                    self.trigger_jump(physics.ollie_power, None, config);
                }
                StepOutcome::None
            },
        };
        self.update_visual(dt, physics);
        outcome
    }

    /// Ground integration: carve angle, forward speed, position.
    pub fn update_ground(
        &mut self,
        dt: f32,
        input: &InputSignal,
        physics: &PhysicsConfig,
        half_width: f32,
    ) {
        let target = input.steer() * physics.max_turn_angle;
        self.angle = approach_angle(self.angle, target, physics, dt);

        let mut speed = self.speed;
        if input.is_braking() {
            speed = (speed - physics.brake_deceleration * dt).max(physics.min_speed);
        } else if input.is_tucking() {
            speed += physics.acceleration * physics.tuck_multiplier * dt;
        } else if self.angle.abs() > CARVE_BONUS_ANGLE {
            speed += physics.acceleration * physics.carve_bonus * dt;
        } else {
            speed += physics.acceleration * dt;
        }
        speed = clamp(speed, physics.min_speed, physics.max_speed);
        self.speed = speed * physics.ground_friction.powf(dt * 60.0);

        self.lateral_speed = self.angle.to_radians().sin() * self.speed;
        self.y += self.speed * dt;
        self.x += self.lateral_speed * dt;
        self.clamp_x(physics, half_width);
    }

    /// Launch into the air with `power` times the base impulse, scaled by
    /// approach speed.
    pub fn trigger_jump(
        &mut self,
        power: f32,
        trick: Option<AerialTrick>,
        config: &FreerideConfig,
    ) -> f32 {
        let vertical_velocity = config.launch_velocity(power, self.speed);
        self.state = PlayerState::Airborne(AirState {
            altitude: 0.0,
            vertical_velocity,
            air_time: 0.0,
            trick,
            trick_progress: 0.0,
            spin: 0.0,
            flip: 0.0,
            trick_spin: 0.0,
            grab_phase: 0.0,
        });
        vertical_velocity
    }

    /// Airborne integration. Returns the landing when the rider touches down.
    pub fn update_air(
        &mut self,
        dt: f32,
        input: &InputSignal,
        physics: &PhysicsConfig,
        camera_y: f32,
        half_width: f32,
    ) -> Option<Landing> {
        let steer = input.steer();
        let max_lateral = physics.max_turn_angle.to_radians().sin() * self.speed;
        let target_lateral = steer * max_lateral * physics.air_control;
        self.lateral_speed = exp_lerp(
            self.lateral_speed,
            target_lateral,
            physics.turn_rate * physics.air_control,
            dt,
        );
        self.y += self.speed * dt;
        self.x += self.lateral_speed * dt;
        self.clamp_x(physics, half_width);
        let lead = self.y - camera_y;

        let PlayerState::Airborne(air) = &mut self.state else {
            return None;
        };
        air.vertical_velocity -= physics.gravity * dt;
        air.altitude += air.vertical_velocity * dt;
        air.air_time += dt;
        air.spin += steer * physics.manual_spin_rate * dt;
        if let Some(trick) = air.trick {
            air.trick_progress = (air.trick_progress + dt / trick.duration().max(0.01)).min(1.0);
            air.flip = trick.flip_degrees() * air.trick_progress;
            air.trick_spin = trick.spin_degrees() * air.trick_progress;
            air.grab_phase = (air.trick_progress * std::f32::consts::PI).sin();
        }

        let forced = air.altitude > physics.max_altitude || lead > physics.max_air_lead;
        if air.altitude > 0.0 && !forced {
            return None;
        }
        let landing = Landing {
            air_time: air.air_time,
            trick: air.trick,
            trick_progress: air.trick_progress,
            spin: air.spin,
            forced,
        };
        if forced {
            tracing::debug!(lead, "Forced landing");
        }
        self.state = PlayerState::Ground;
        Some(landing)
    }

    /// Begin grinding `rail`. A degenerate rail aborts immediately and applies
    /// the usual post-grind immunity.
    pub fn start_grind(&mut self, rail_ref: EntityRef, rail: &Rail, physics: &PhysicsConfig) -> bool {
        if rail.length() < 1e-3 {
            self.grind_immunity = physics.grind_immunity;
            self.last_rail = Some(rail_ref);
            self.last_rail_timer = physics.last_rail_window;
            return false;
        }
        let progress = rail.progress_at(self.y);
        let (x, y) = rail.point_at(progress);
        self.x = x;
        self.y = y;
        self.state = PlayerState::Grinding(GrindState {
            rail: rail_ref,
            grindable: rail.grindable,
            progress,
            elapsed: 0.0,
            frames: 0,
            grind_speed: (self.speed * physics.grind_speed_factor).max(physics.min_grind_speed),
        });
        true
    }

    /// Advance along the rail. Ends on full progress, elapsed time or frame
    /// count, whichever comes first.
    pub fn update_grind(
        &mut self,
        dt: f32,
        rail: Option<&Rail>,
        physics: &PhysicsConfig,
    ) -> Option<GrindExit> {
        let Some(rail) = rail.filter(|r| r.length() >= 1e-3) else {
            return self.end_grind(0.0, true, physics);
        };
        let length = rail.length();
        let PlayerState::Grinding(grind) = &mut self.state else {
            return None;
        };
        grind.frames += 1;
        grind.elapsed += dt;
        let advance = (grind.grind_speed * dt / length).max(physics.min_grind_progress_per_tick);
        grind.progress = (grind.progress + advance).min(1.0);
        let (x, y) = rail.point_at(grind.progress);
        self.x = x;
        self.y = y;
        self.speed = self.speed.max(grind.grind_speed);

        let done = grind.progress >= 1.0
            || grind.elapsed >= physics.max_grind_time
            || grind.frames >= physics.max_grind_frames;
        if done {
            self.end_grind(length, false, physics)
        } else {
            None
        }
    }

    /// Leave the rail. A second call is a no-op.
    pub fn end_grind(
        &mut self,
        rail_length: f32,
        aborted: bool,
        physics: &PhysicsConfig,
    ) -> Option<GrindExit> {
        let PlayerState::Grinding(grind) = &self.state else {
            return None;
        };
        let exit = GrindExit {
            rail: grind.rail,
            grindable: grind.grindable,
            length: rail_length * grind.progress,
            aborted,
        };
        self.state = PlayerState::Ground;
        self.angle = 0.0;
        self.grind_immunity = physics.grind_immunity;
        self.last_rail = Some(exit.rail);
        self.last_rail_timer = physics.last_rail_window;
        Some(exit)
    }

    /// Crash into something. Returns false when invincible or already down.
    pub fn crash(&mut self, physics: &PhysicsConfig) -> bool {
        if self.is_invincible() || self.is_down() {
            return false;
        }
        if self.is_grinding() {
            self.end_grind(0.0, true, physics);
        }
        self.speed *= physics.crash_speed_penalty;
        self.angle = 0.0;
        self.lateral_speed = 0.0;
        self.state = PlayerState::Crashed {
            timer: physics.crash_duration,
        };
        true
    }

    /// Crashed and stunned drift. Returns true when the rider gets back up.
    fn update_down(&mut self, dt: f32, physics: &PhysicsConfig) -> bool {
        match &mut self.state {
            PlayerState::Crashed { timer } => {
                self.y += self.speed * physics.crash_drift * dt;
                *timer -= dt;
                if *timer <= 0.0 {
                    self.state = PlayerState::Stunned {
                        timer: physics.stun_duration,
                    };
                }
                false
            },
            PlayerState::Stunned { timer } => {
                self.y += self.speed * physics.stun_drift * dt;
                *timer -= dt;
                if *timer <= 0.0 {
                    self.state = PlayerState::Ground;
                    self.invincible = physics.recovery_invincibility;
                    true
                } else {
                    false
                }
            },
            _ => false,
        }
    }

    pub fn update_visual(&mut self, dt: f32, physics: &PhysicsConfig) {
        self.visual_x = exp_lerp(self.visual_x, self.x, physics.visual_smoothing, dt);
        self.visual_y = exp_lerp(self.visual_y, self.y, physics.visual_smoothing, dt);
    }

    fn clamp_x(&mut self, physics: &PhysicsConfig, half_width: f32) {
        let limit = (half_width - physics.player_half_width).max(0.0);
        self.x = clamp(self.x, -limit, limit);
    }
}

/// Move the carve angle toward `target` by whichever is larger: the
/// exponential step or the linearly capped step. Never overshoots.
fn approach_angle(angle: f32, target: f32, physics: &PhysicsConfig, dt: f32) -> f32 {
    let exp_step = exp_lerp(angle, target, physics.turn_rate, dt) - angle;
    let remaining = target - angle;
    let linear_step = remaining.signum() * (physics.max_turn_step * dt).min(remaining.abs());
    if exp_step.abs() >= linear_step.abs() {
        angle + exp_step
    } else {
        angle + linear_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Cell;

    const DT: f32 = 1.0 / 60.0;

    fn config() -> FreerideConfig {
        FreerideConfig::default()
    }

    fn rail(length: f32) -> Rail {
        Rail {
            x1: 0.0,
            y1: 1000.0,
            x2: 0.0,
            y2: 1000.0 + length,
            grindable: GrindableType::Rail,
            cells: vec![Cell::new(0, 6)],
        }
    }

    fn rail_ref() -> EntityRef {
        EntityRef { chunk: 1, index: 0 }
    }

    #[test]
    fn medium_jump_at_reference_speed_launches_at_base_power() {
        let cfg = config();
        let mut player = Player::new(0.0, 0.0, &cfg.physics);
        player.speed = 400.0;
        let v = player.trigger_jump(1.0, None, &cfg);
        assert_eq!(v, cfg.physics.base_launch_power);
        assert!(player.is_airborne());
    }

    #[test]
    fn faster_approach_means_bigger_air() {
        let cfg = config();
        let mut slow = Player::new(0.0, 0.0, &cfg.physics);
        slow.speed = 300.0;
        let mut fast = slow.clone();
        fast.speed = 600.0;
        assert!(fast.trigger_jump(1.0, None, &cfg) > slow.trigger_jump(1.0, None, &cfg));
    }

    #[test]
    fn ground_speed_stays_bounded() {
        let cfg = config();
        let mut player = Player::new(0.0, 0.0, &cfg.physics);
        let tuck = InputSignal {
            down: true,
            ..Default::default()
        };
        for _ in 0..1200 {
            player.update_ground(DT, &tuck, &cfg.physics, 390.0);
        }
        assert!(player.speed <= cfg.physics.max_speed);
        assert!(player.speed > cfg.physics.max_speed * 0.99);

        let brake = InputSignal {
            up: true,
            ..Default::default()
        };
        for _ in 0..1200 {
            player.update_ground(DT, &brake, &cfg.physics, 390.0);
        }
        assert!(player.speed >= cfg.physics.min_speed * 0.99);
        assert!(player.speed <= cfg.physics.min_speed);
    }

    #[test]
    fn steering_carves_and_clamps_to_slope() {
        let cfg = config();
        let mut player = Player::new(0.0, 0.0, &cfg.physics);
        let right = InputSignal {
            right: true,
            ..Default::default()
        };
        for _ in 0..600 {
            player.update_ground(DT, &right, &cfg.physics, 390.0);
        }
        assert!(player.angle > 60.0 && player.angle <= cfg.physics.max_turn_angle);
        assert_eq!(player.x, 390.0 - cfg.physics.player_half_width);
        assert!(player.lateral_speed > 0.0);
    }

    #[test]
    fn angle_takes_the_faster_step() {
        let physics = PhysicsConfig::default();
        // Close to the target the linear step (4° per tick) wins.
        let small = approach_angle(0.0, 5.0, &physics, DT);
        assert!((small - 4.0).abs() < 1e-4);
        // Far from it the exponential step wins.
        let big = approach_angle(0.0, 65.0, &physics, DT);
        let exp_only = exp_lerp(0.0, 65.0, physics.turn_rate, DT);
        assert_eq!(big, exp_only);
        // Never overshoots.
        assert_eq!(approach_angle(3.0, 5.0, &physics, DT), 5.0);
    }

    #[test]
    fn landing_reports_trick_and_returns_to_ground() {
        let cfg = config();
        let mut player = Player::new(0.0, 0.0, &cfg.physics);
        player.speed = 400.0;
        player.trigger_jump(1.0, Some(AerialTrick::Method), &cfg);
        let mut landing = None;
        for _ in 0..120 {
            let camera_y = player.y - cfg.camera.offset;
            if let Some(l) =
                player.update_air(DT, &InputSignal::default(), &cfg.physics, camera_y, 390.0)
            {
                landing = Some(l);
                break;
            }
        }
        let landing = landing.expect("rider must land");
        assert!(player.is_grounded());
        assert!(!landing.forced);
        assert!((landing.air_time - 0.8).abs() < 0.05);
        assert_eq!(landing.trick, Some(AerialTrick::Method));
        assert_eq!(landing.trick_progress, 1.0);
    }

    #[test]
    fn trick_rotation_is_display_only() {
        let cfg = config();
        let mut player = Player::new(0.0, 0.0, &cfg.physics);
        player.speed = 400.0;
        player.trigger_jump(1.0, Some(AerialTrick::Cork720), &cfg);
        for _ in 0..30 {
            player.update_air(DT, &InputSignal::default(), &cfg.physics, player.y - 250.0, 390.0);
        }
        let PlayerState::Airborne(air) = &player.state else {
            panic!("still airborne after half a second");
        };
        assert!((air.trick_spin - 720.0 * air.trick_progress).abs() < 1e-3);
        assert!((air.flip - 360.0 * air.trick_progress).abs() < 1e-3);
        assert!(air.trick_spin > 0.0);
        assert_eq!(air.spin, 0.0, "auto trick rotation never counts as manual spin");
    }

    #[test]
    fn manual_spin_accumulates_in_air() {
        let cfg = config();
        let mut player = Player::new(0.0, 0.0, &cfg.physics);
        player.speed = 400.0;
        player.trigger_jump(1.0, None, &cfg);
        let left = InputSignal {
            left: true,
            ..Default::default()
        };
        for _ in 0..30 {
            player.update_air(DT, &left, &cfg.physics, player.y - 250.0, 390.0);
        }
        let PlayerState::Airborne(air) = &player.state else {
            panic!("still airborne after half a second");
        };
        assert!((air.spin + 270.0).abs() < 1.0);
    }

    #[test]
    fn altitude_cap_forces_landing() {
        let cfg = config();
        let mut player = Player::new(0.0, 0.0, &cfg.physics);
        player.speed = 700.0;
        player.trigger_jump(4.0, None, &cfg);
        let mut forced = false;
        for _ in 0..600 {
            if let Some(l) =
                player.update_air(DT, &InputSignal::default(), &cfg.physics, player.y - 250.0, 390.0)
            {
                forced = l.forced;
                break;
            }
        }
        assert!(forced);
        assert!(player.is_grounded());
    }

    #[test]
    fn lead_cap_forces_landing() {
        let cfg = config();
        let mut player = Player::new(0.0, 0.0, &cfg.physics);
        player.speed = 400.0;
        player.trigger_jump(1.0, None, &cfg);
        let landing = player
            .update_air(DT, &InputSignal::default(), &cfg.physics, -1000.0, 390.0)
            .expect("lead beyond the cap lands immediately");
        assert!(landing.forced);
    }

    #[test]
    fn grind_terminates_within_limits() {
        let physics = PhysicsConfig::default();
        for length in [20.0, 160.0, 320.0, 5000.0] {
            for speed in [0.0, 150.0, 700.0] {
                let mut player = Player::new(0.0, 1000.0, &physics);
                player.speed = speed;
                let r = rail(length);
                assert!(player.start_grind(rail_ref(), &r, &physics));
                let mut ticks = 0;
                let mut elapsed = 0.0;
                loop {
                    ticks += 1;
                    elapsed += DT;
                    if player.update_grind(DT, Some(&r), &physics).is_some() {
                        break;
                    }
                    assert!(ticks <= 60, "grind exceeded 60 ticks");
                }
                assert!(elapsed <= 1.0 + 1e-4);
                assert!(player.is_grounded());
                assert!(player.grind_immunity > 0.0);
            }
        }
    }

    #[test]
    fn grind_floors_progress_per_tick() {
        let physics = PhysicsConfig::default();
        let mut player = Player::new(0.0, 1000.0, &physics);
        let r = rail(100_000.0);
        player.start_grind(rail_ref(), &r, &physics);
        player.update_grind(DT, Some(&r), &physics);
        let PlayerState::Grinding(g) = &player.state else {
            panic!("grind should still be running");
        };
        assert!(g.progress >= physics.min_grind_progress_per_tick);
    }

    #[test]
    fn degenerate_rail_aborts_grind() {
        let physics = PhysicsConfig::default();
        let mut player = Player::new(0.0, 1000.0, &physics);
        assert!(!player.start_grind(rail_ref(), &rail(0.0), &physics));
        assert!(player.is_grounded());
        assert!(player.rail_blocked(rail_ref()));

        let mut player = Player::new(0.0, 1000.0, &physics);
        player.start_grind(rail_ref(), &rail(200.0), &physics);
        let exit = player.update_grind(DT, None, &physics).expect("missing rail ends grind");
        assert!(exit.aborted);
        assert!(player.is_grounded());
    }

    #[test]
    fn end_grind_twice_is_noop() {
        let physics = PhysicsConfig::default();
        let mut player = Player::new(0.0, 1000.0, &physics);
        player.start_grind(rail_ref(), &rail(200.0), &physics);
        assert!(player.end_grind(200.0, false, &physics).is_some());
        assert!(player.end_grind(200.0, false, &physics).is_none());
    }

    #[test]
    fn last_rail_blocked_after_immunity() {
        let physics = PhysicsConfig::default();
        let mut player = Player::new(0.0, 1000.0, &physics);
        player.start_grind(rail_ref(), &rail(200.0), &physics);
        player.end_grind(200.0, false, &physics);
        let other = EntityRef { chunk: 1, index: 1 };
        assert!(player.rail_blocked(other));
        player.tick_timers(0.3);
        assert!(!player.rail_blocked(other));
        assert!(player.rail_blocked(rail_ref()));
        player.tick_timers(0.8);
        assert!(!player.rail_blocked(rail_ref()));
    }

    #[test]
    fn crash_cycle_recovers_with_invincibility() {
        let cfg = config();
        let physics = &cfg.physics;
        let mut player = Player::new(0.0, 0.0, physics);
        player.speed = 500.0;
        assert!(player.crash(physics));
        assert!(!player.crash(physics), "already down");
        assert_eq!(player.speed, 200.0);

        let mut recovered = false;
        let mut last_y = player.y;
        for _ in 0..120 {
            let out = player.step(DT, &InputSignal::default(), &cfg, physics, player.y - 250.0, None);
            assert!(player.y > last_y, "position drifts forward while down");
            last_y = player.y;
            if out == StepOutcome::Recovered {
                recovered = true;
                break;
            }
        }
        assert!(recovered);
        assert!(player.is_grounded());
        assert!(player.is_invincible());
        assert!(!player.crash(physics));
    }

    #[test]
    fn ollie_from_ground() {
        let cfg = config();
        let mut player = Player::new(0.0, 0.0, &cfg.physics);
        let jump = InputSignal {
            jump_pressed: true,
            ..Default::default()
        };
        player.step(DT, &jump, &cfg, &cfg.physics, -250.0, None);
        let PlayerState::Airborne(air) = &player.state else {
            panic!("ollie must leave the ground");
        };
        assert_eq!(air.trick, None);
    }

    #[test]
    fn visual_position_lags_logical() {
        let physics = PhysicsConfig::default();
        let mut player = Player::new(0.0, 0.0, &physics);
        player.y = 100.0;
        player.update_visual(DT, &physics);
        assert!(player.visual_y > 0.0 && player.visual_y < 100.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_input() -> impl Strategy<Value = InputSignal> {
            (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
                |(left, right, up, down)| InputSignal {
                    left,
                    right,
                    up,
                    down,
                    jump_pressed: false,
                },
            )
        }

        proptest! {
            #[test]
            fn ground_speed_within_bounds(inputs in prop::collection::vec(arb_input(), 1..300)) {
                let physics = PhysicsConfig::default();
                let mut player = Player::new(0.0, 0.0, &physics);
                let floor = physics.min_speed * physics.ground_friction;
                for input in &inputs {
                    player.update_ground(DT, input, &physics, 390.0);
                    prop_assert!(player.speed <= physics.max_speed);
                    prop_assert!(player.speed >= floor - 1e-3);
                    prop_assert!(player.angle.abs() <= physics.max_turn_angle + 1e-3);
                    prop_assert!(player.x.abs() <= 390.0);
                }
            }
        }
    }
}
