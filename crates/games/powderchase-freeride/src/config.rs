use serde::{Deserialize, Serialize};

use crate::entities::JumpSize;

/// Rider physics tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Forward speed floor (px/s).
    pub min_speed: f32,
    /// Forward speed ceiling (px/s).
    pub max_speed: f32,
    /// Forward acceleration with no input (px/s²).
    pub acceleration: f32,
    /// Acceleration multiplier while tucking.
    pub tuck_multiplier: f32,
    /// Deceleration while braking (px/s²).
    pub brake_deceleration: f32,
    /// Acceleration multiplier while carving past 20°.
    pub carve_bonus: f32,
    /// Speed retained per 1/60 s on the ground.
    pub ground_friction: f32,
    /// Carve angle at full steering input (degrees).
    pub max_turn_angle: f32,
    /// Exponential rate toward the target carve angle (1/s).
    pub turn_rate: f32,
    /// Linear carve step cap (degrees/s).
    pub max_turn_step: f32,
    /// Vertical launch velocity for a power-1.0 jump at reference speed.
    pub base_launch_power: f32,
    /// Approach speed at which launch scaling is neutral.
    pub reference_speed: f32,
    /// Downward acceleration on altitude (px/s²).
    pub gravity: f32,
    /// Fraction of ground steering available in the air.
    pub air_control: f32,
    /// Manual spin rate from left/right while airborne (degrees/s).
    pub manual_spin_rate: f32,
    /// Altitude ceiling; exceeding it forces a landing.
    pub max_altitude: f32,
    /// Maximum lead over the camera while airborne before a forced landing.
    pub max_air_lead: f32,
    /// Launch power of a flat-ground ollie.
    pub ollie_power: f32,
    /// Floor on grind speed (px/s).
    pub min_grind_speed: f32,
    /// Fraction of approach speed kept while grinding.
    pub grind_speed_factor: f32,
    /// Minimum rail progress per tick.
    pub min_grind_progress_per_tick: f32,
    /// Grind safety net: seconds.
    pub max_grind_time: f32,
    /// Grind safety net: ticks.
    pub max_grind_frames: u32,
    /// Seconds after a grind during which no rail can be entered.
    pub grind_immunity: f32,
    /// Seconds during which the previous rail stays ignored.
    pub last_rail_window: f32,
    /// Speed multiplier applied on crash.
    pub crash_speed_penalty: f32,
    pub crash_duration: f32,
    /// Fraction of speed still applied to forward drift while crashed.
    pub crash_drift: f32,
    pub stun_duration: f32,
    /// Fraction of speed still applied to forward drift while stunned.
    pub stun_drift: f32,
    /// Invincibility granted when the rider gets back up.
    pub recovery_invincibility: f32,
    /// Render-only position smoothing rate (1/s).
    pub visual_smoothing: f32,
    pub player_half_width: f32,
    pub player_half_height: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            min_speed: 150.0,
            max_speed: 700.0,
            acceleration: 220.0,
            tuck_multiplier: 1.8,
            brake_deceleration: 450.0,
            carve_bonus: 1.15,
            ground_friction: 0.999,
            max_turn_angle: 65.0,
            turn_rate: 10.0,
            max_turn_step: 240.0,
            base_launch_power: 600.0,
            reference_speed: 400.0,
            gravity: 1500.0,
            air_control: 0.4,
            manual_spin_rate: 540.0,
            max_altitude: 400.0,
            max_air_lead: 650.0,
            ollie_power: 0.45,
            min_grind_speed: 250.0,
            grind_speed_factor: 0.85,
            min_grind_progress_per_tick: 0.03,
            max_grind_time: 1.0,
            max_grind_frames: 60,
            grind_immunity: 0.25,
            last_rail_window: 1.0,
            crash_speed_penalty: 0.4,
            crash_duration: 0.8,
            crash_drift: 0.3,
            stun_duration: 0.6,
            stun_drift: 0.5,
            recovery_invincibility: 1.5,
            visual_smoothing: 20.0,
            player_half_width: 12.0,
            player_half_height: 16.0,
        }
    }
}

/// Procedural slope tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Width of one lane / grid column (px).
    pub lane_width: f32,
    /// Playable slope width (px). Derived from screen width at run start.
    pub slope_width: f32,
    pub row_height: f32,
    pub rows_per_chunk: u32,
    /// Chunks are generated while `next_chunk_y < camera_y + lookahead_margin`.
    pub lookahead_margin: f32,
    /// Chunks ending this far above the camera are culled.
    pub cull_margin: f32,
    /// No jumps, rails or obstacles above this y.
    pub start_clear_distance: f32,
    pub massive_jump_chance: f32,
    pub jump_chance: f32,
    pub rail_chance: f32,
    /// One extra roll for a massive jump when a chunk has none.
    pub guaranteed_massive_chance: f32,
    pub jump_clearance: f32,
    pub rail_clearance: f32,
    pub rail_min_length: f32,
    pub rail_max_length: f32,
    /// Maximum lateral drift as a fraction of rail length.
    pub rail_max_drift: f32,
    /// Safety margin on the computed landing distance.
    pub landing_margin: f32,
    /// Approach speed assumed when carving landing zones.
    pub assumed_speed: f32,
    pub cluster_chances: Vec<f32>,
    pub cluster_min_trees: u32,
    pub cluster_max_trees: u32,
    /// Cluster spread in cells around its centre.
    pub cluster_radius: u32,
    pub tree_min_scale: f32,
    pub tree_max_scale: f32,
    pub base_density: f32,
    pub max_density: f32,
    pub density_ramp_distance: f32,
    pub rock_min_distance: f32,
    pub mogul_min_distance: f32,
    pub lodge_chance: f32,
    pub lodge_min_distance: f32,
    pub lodge_spacing: f32,
    pub lodge_width: f32,
    pub lodge_height: f32,
    pub min_collectibles: u32,
    pub max_collectibles: u32,
    pub big_collectible_chance: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            lane_width: 60.0,
            slope_width: 800.0,
            row_height: 80.0,
            rows_per_chunk: 10,
            lookahead_margin: 2000.0,
            cull_margin: 600.0,
            start_clear_distance: 600.0,
            massive_jump_chance: 0.004,
            jump_chance: 0.03,
            rail_chance: 0.02,
            guaranteed_massive_chance: 0.02,
            jump_clearance: 200.0,
            rail_clearance: 150.0,
            rail_min_length: 160.0,
            rail_max_length: 320.0,
            rail_max_drift: 0.15,
            landing_margin: 1.15,
            assumed_speed: 400.0,
            cluster_chances: vec![0.35, 0.25, 0.15],
            cluster_min_trees: 3,
            cluster_max_trees: 10,
            cluster_radius: 2,
            tree_min_scale: 0.6,
            tree_max_scale: 1.65,
            base_density: 0.08,
            max_density: 0.28,
            density_ramp_distance: 20_000.0,
            rock_min_distance: 1500.0,
            mogul_min_distance: 4000.0,
            lodge_chance: 0.06,
            lodge_min_distance: 3000.0,
            lodge_spacing: 6000.0,
            lodge_width: 200.0,
            lodge_height: 140.0,
            min_collectibles: 3,
            max_collectibles: 7,
            big_collectible_chance: 0.15,
        }
    }
}

impl TerrainConfig {
    /// Number of lanes across the slope. Wider slopes get more lanes.
    pub fn columns(&self) -> u32 {
        ((self.slope_width / self.lane_width).floor() as u32).max(3)
    }

    pub fn chunk_height(&self) -> f32 {
        self.rows_per_chunk as f32 * self.row_height
    }

    pub fn half_width(&self) -> f32 {
        self.columns() as f32 * self.lane_width / 2.0
    }

    /// Obstacle density for a chunk starting at `distance`: linear ramp, then clamp.
    pub fn density_at(&self, distance: f32) -> f32 {
        let t = if self.density_ramp_distance > 0.0 {
            (distance / self.density_ramp_distance).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.base_density + (self.max_density - self.base_density) * t
    }
}

/// Trick and combo scoring tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrickConfig {
    /// Auto trick progress needed to count as landed.
    pub landed_threshold: f32,
    pub big_air_time: f32,
    pub big_air_multiplier: f32,
    pub huge_air_time: f32,
    pub huge_air_multiplier: f32,
    pub multiplier_step: f32,
    pub partial_multiplier_step: f32,
    pub max_multiplier: f32,
    /// Seconds before an idle combo expires.
    pub combo_window: f32,
    /// Air time needed for partial credit on a failed trick.
    pub partial_credit_air_time: f32,
    pub partial_points_per_second: f32,
    pub long_grind_length: f32,
    pub epic_grind_length: f32,
    pub chain_bonus: f32,
    pub chain_complete_min: u32,
    pub chain_complete_points: f32,
    pub near_miss_points: f32,
    /// Annulus width beyond the hit distance that counts as a near miss.
    pub near_miss_margin: f32,
    pub collectible_points: f32,
    pub big_collectible_points: f32,
    pub flow_decay: f32,
}

impl Default for TrickConfig {
    fn default() -> Self {
        Self {
            landed_threshold: 0.8,
            big_air_time: 1.0,
            big_air_multiplier: 1.2,
            huge_air_time: 1.5,
            huge_air_multiplier: 1.5,
            multiplier_step: 0.5,
            partial_multiplier_step: 0.25,
            max_multiplier: 5.0,
            combo_window: 2.5,
            partial_credit_air_time: 0.8,
            partial_points_per_second: 100.0,
            long_grind_length: 120.0,
            epic_grind_length: 250.0,
            chain_bonus: 1.5,
            chain_complete_min: 3,
            chain_complete_points: 100.0,
            near_miss_points: 25.0,
            near_miss_margin: 45.0,
            collectible_points: 50.0,
            big_collectible_points: 250.0,
            flow_decay: 0.1,
        }
    }
}

/// Fog wall and beast tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseConfig {
    /// Initial distance between fog and rider.
    pub fog_start_gap: f32,
    pub base_fog_speed: f32,
    pub fog_acceleration: f32,
    /// Elapsed seconds after which fog acceleration ramps quadratically.
    pub ramp_start: f32,
    /// Elapsed seconds after which the overtime catch-up applies.
    pub max_time: f32,
    pub ramp_strength: f32,
    /// Fraction of the rider's speed deficit the fog closes each second.
    pub deficit_factor: f32,
    pub overtime_flat: f32,
    pub overtime_linear: f32,
    /// The fog never trails the rider by more than this.
    pub max_fog_gap: f32,
    /// Death when `fog_y >= player_y - kill_margin`.
    pub kill_margin: f32,
    pub lodge_pushback: f32,
    /// Fraction of the fog's excess speed kept after a lodge visit.
    pub lodge_speed_reset: f32,
    pub crash_threshold: u32,
    /// Rolling window for the crash threshold (seconds).
    pub crash_window: f32,
    pub beast_spawn_gap: f32,
    pub rage_rate: f32,
    pub rage_per_crash: f32,
    pub beast_speed_multiplier: f32,
    /// Beast responsiveness scale from rage.
    pub rage_speed_factor: f32,
    pub lunge_min_distance: f32,
    pub lunge_max_distance: f32,
    pub lunge_interval: f32,
    pub lunge_duration: f32,
    pub prediction_variance: f32,
    pub catch_radius: f32,
    pub rage_catch_factor: f32,
    pub guaranteed_catch_crashes: u32,
    pub guaranteed_catch_misses: u32,
    pub guaranteed_catch_radius: f32,
    pub retreat_duration: f32,
    pub retreat_speed_factor: f32,
    pub beast_leash: f32,
}

impl Default for ChaseConfig {
    fn default() -> Self {
        Self {
            fog_start_gap: 900.0,
            base_fog_speed: 160.0,
            fog_acceleration: 1.0,
            ramp_start: 60.0,
            max_time: 240.0,
            ramp_strength: 4.0,
            deficit_factor: 0.5,
            overtime_flat: 80.0,
            overtime_linear: 20.0,
            max_fog_gap: 1800.0,
            kill_margin: 30.0,
            lodge_pushback: 1200.0,
            lodge_speed_reset: 0.5,
            crash_threshold: 3,
            crash_window: 20.0,
            beast_spawn_gap: 500.0,
            rage_rate: 0.02,
            rage_per_crash: 0.1,
            beast_speed_multiplier: 1.05,
            rage_speed_factor: 0.6,
            lunge_min_distance: 60.0,
            lunge_max_distance: 260.0,
            lunge_interval: 3.0,
            lunge_duration: 0.5,
            prediction_variance: 60.0,
            catch_radius: 40.0,
            rage_catch_factor: 0.5,
            guaranteed_catch_crashes: 6,
            guaranteed_catch_misses: 3,
            guaranteed_catch_radius: 90.0,
            retreat_duration: 1.2,
            retreat_speed_factor: 0.5,
            beast_leash: 900.0,
        }
    }
}

/// Camera follow tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// How far above the rider the camera sits.
    pub offset: f32,
    pub follow_rate: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            offset: 250.0,
            follow_rate: 6.0,
        }
    }
}

/// Top-level freeride configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreerideConfig {
    pub physics: PhysicsConfig,
    pub terrain: TerrainConfig,
    pub tricks: TrickConfig,
    pub chase: ChaseConfig,
    pub camera: CameraConfig,
}

impl FreerideConfig {
    /// Load config from a TOML file. Falls back to defaults if the file is missing
    /// or unparseable.
    pub fn load() -> Self {
        let path = std::env::var("POWDERCHASE_FREERIDE_CONFIG")
            .unwrap_or_else(|_| "config/freeride.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse {path}: {e}, using defaults");
                FreerideConfig::default()
            }),
            Err(_) => FreerideConfig::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<FreerideConfig>(content)
    }

    /// Vertical launch velocity for a jump of `power` hit at `speed`.
    /// Shared by rider physics and landing-zone carving so both agree.
    pub fn launch_velocity(&self, power: f32, speed: f32) -> f32 {
        let reference = self.physics.reference_speed.max(1.0);
        self.physics.base_launch_power * power * (speed / reference)
    }

    /// Distance downhill from a jump where the terrain keeps a landing zone clear.
    pub fn landing_distance(&self, size: JumpSize) -> f32 {
        let speed = self.terrain.assumed_speed;
        let v0 = self.launch_velocity(size.launch_power(), speed);
        let air_time = v0 / self.physics.gravity.max(1.0);
        speed * air_time * self.terrain.landing_margin
    }
}
