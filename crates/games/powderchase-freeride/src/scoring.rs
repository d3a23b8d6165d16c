use serde::{Deserialize, Serialize};

use crate::config::TrickConfig;
use crate::physics::{GrindExit, Landing};
use crate::tricks::{GrindTier, air_multiplier, match_spin};

/// Flow gained per scored trick or grind.
const FLOW_PER_TRICK: f32 = 0.2;
/// Flow gained per near miss.
const FLOW_PER_NEAR_MISS: f32 = 0.1;

/// What a landing earned.
#[derive(Debug, Clone, PartialEq)]
pub enum LandingScore {
    Trick { name: String, points: u64 },
    /// Failed trick, but enough hang time for partial credit.
    Partial { points: u64 },
    Nothing,
}

/// A chain that expired with a lump bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainBonus {
    pub length: u32,
    pub bonus: u64,
}

/// Score, multiplier and combo chain for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    pub score: u64,
    /// 1..=max_multiplier.
    pub multiplier: f32,
    pub chain: u32,
    /// Seconds until the combo expires; zero when inactive.
    pub combo_timer: f32,
    pub best_combo: u32,
    /// 0..1 style meter, render only.
    pub flow: f32,
}

impl Default for ScoreState {
    fn default() -> Self {
        Self {
            score: 0,
            multiplier: 1.0,
            chain: 0,
            combo_timer: 0.0,
            best_combo: 0,
            flow: 0.0,
        }
    }
}

fn to_points(raw: f32) -> u64 {
    if raw.is_finite() && raw > 0.0 {
        raw.round() as u64
    } else {
        0
    }
}

impl ScoreState {
    /// Score a landing. Always extends the chain.
    pub fn land(&mut self, landing: &Landing, config: &TrickConfig, bonus: f32) -> LandingScore {
        self.extend_chain();

        let auto = landing
            .trick
            .filter(|_| landing.trick_progress >= config.landed_threshold)
            .map(|t| (t.name(), t.points()));
        let matched = auto.or_else(|| match_spin(landing.spin));
        let air = air_multiplier(landing.air_time, config);

        if let Some((name, base)) = matched {
            let points = to_points(base as f32 * air * self.multiplier * bonus);
            self.score += points;
            self.bump_multiplier(config.multiplier_step, config);
            self.combo_timer = config.combo_window;
            self.flow = (self.flow + FLOW_PER_TRICK).min(1.0);
            return LandingScore::Trick {
                name: name.to_string(),
                points,
            };
        }

        if landing.air_time >= config.partial_credit_air_time {
            let raw = landing.air_time * config.partial_points_per_second;
            let points = to_points(raw * self.multiplier * bonus);
            self.score += points;
            self.bump_multiplier(config.partial_multiplier_step, config);
            self.combo_timer = config.combo_window;
            return LandingScore::Partial { points };
        }

        // Arm the timer so an unscored chain still expires.
        if self.combo_timer <= 0.0 {
            self.combo_timer = config.combo_window;
        }
        LandingScore::Nothing
    }

    /// Score a rail dismount. Aborted grinds score nothing.
    pub fn grind(&mut self, exit: &GrindExit, config: &TrickConfig, bonus: f32) -> Option<(String, u64)> {
        if exit.aborted {
            return None;
        }
        let tier = GrindTier::for_length(exit.length, config);
        let chain_bonus = if self.combo_timer > 0.0 {
            config.chain_bonus
        } else {
            1.0
        };
        let raw = tier.points() as f32
            * exit.grindable.bonus()
            * self.multiplier
            * chain_bonus
            * bonus;
        let points = to_points(raw);
        self.score += points;
        self.extend_chain();
        self.bump_multiplier(config.multiplier_step, config);
        self.combo_timer = config.combo_window;
        self.flow = (self.flow + FLOW_PER_TRICK).min(1.0);
        let name = format!("{} {}", exit.grindable.label(), tier.name());
        Some((name, points))
    }

    /// Flat award scaled by the current multiplier (pickups, near misses).
    pub fn award(&mut self, base: f32, bonus: f32) -> u64 {
        let points = to_points(base * self.multiplier * bonus);
        self.score += points;
        points
    }

    pub fn near_miss(&mut self, config: &TrickConfig, bonus: f32) -> u64 {
        self.flow = (self.flow + FLOW_PER_NEAR_MISS).min(1.0);
        self.award(config.near_miss_points, bonus)
    }

    /// A crash kills the combo outright, no chain bonus.
    pub fn crash(&mut self) {
        self.multiplier = 1.0;
        self.chain = 0;
        self.combo_timer = 0.0;
        self.flow = 0.0;
    }

    /// Count the combo timer down. On expiry, pays the chain bonus (if the
    /// chain is long enough) and resets multiplier and chain.
    pub fn tick(&mut self, dt: f32, config: &TrickConfig) -> Option<ChainBonus> {
        self.flow = (self.flow - config.flow_decay * dt).max(0.0);
        if self.combo_timer <= 0.0 {
            return None;
        }
        self.combo_timer -= dt;
        if self.combo_timer > 0.0 {
            return None;
        }
        self.combo_timer = 0.0;
        let length = self.chain;
        let payout = if length >= config.chain_complete_min {
            let bonus = to_points(config.chain_complete_points * length as f32 * self.multiplier);
            self.score += bonus;
            Some(ChainBonus { length, bonus })
        } else {
            None
        };
        self.multiplier = 1.0;
        self.chain = 0;
        payout
    }

    fn extend_chain(&mut self) {
        self.chain += 1;
        self.best_combo = self.best_combo.max(self.chain);
    }

    fn bump_multiplier(&mut self, step: f32, config: &TrickConfig) {
        self.multiplier = (self.multiplier + step).min(config.max_multiplier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EntityRef, GrindableType};
    use crate::tricks::AerialTrick;

    fn landing(trick: Option<AerialTrick>, progress: f32, spin: f32, air_time: f32) -> Landing {
        Landing {
            air_time,
            trick,
            trick_progress: progress,
            spin,
            forced: false,
        }
    }

    fn grind_exit(length: f32, grindable: GrindableType) -> GrindExit {
        GrindExit {
            rail: EntityRef { chunk: 0, index: 0 },
            grindable,
            length,
            aborted: false,
        }
    }

    #[test]
    fn landed_auto_trick_scores_its_points() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        let result = score.land(&landing(Some(AerialTrick::Backflip), 0.85, 0.0, 0.7), &config, 1.0);
        assert_eq!(
            result,
            LandingScore::Trick {
                name: "Backflip".into(),
                points: 400
            }
        );
        assert_eq!(score.multiplier, 1.5);
        assert_eq!(score.chain, 1);
        assert_eq!(score.combo_timer, 2.5);
    }

    #[test]
    fn unfinished_trick_falls_back_to_spin_table() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        let result = score.land(&landing(Some(AerialTrick::Cork720), 0.5, 400.0, 0.6), &config, 1.0);
        assert_eq!(
            result,
            LandingScore::Trick {
                name: "360".into(),
                points: 250
            }
        );
    }

    #[test]
    fn big_air_scales_points() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        let result = score.land(&landing(None, 0.0, 720.0, 1.6), &config, 1.0);
        assert_eq!(
            result,
            LandingScore::Trick {
                name: "720".into(),
                points: 900
            }
        );
    }

    #[test]
    fn long_hang_time_earns_partial_credit() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        let result = score.land(&landing(None, 0.0, 90.0, 0.9), &config, 1.0);
        assert_eq!(result, LandingScore::Partial { points: 90 });
        assert_eq!(score.multiplier, 1.25);
    }

    #[test]
    fn plain_landing_still_extends_and_arms_chain() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        let result = score.land(&landing(None, 0.0, 0.0, 0.3), &config, 1.0);
        assert_eq!(result, LandingScore::Nothing);
        assert_eq!(score.chain, 1);
        assert_eq!(score.combo_timer, config.combo_window);
        assert_eq!(score.multiplier, 1.0);
    }

    #[test]
    fn multiplier_caps_at_five() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        for _ in 0..20 {
            score.land(&landing(Some(AerialTrick::Indy), 1.0, 0.0, 0.5), &config, 1.0);
        }
        assert_eq!(score.multiplier, 5.0);
        assert_eq!(score.best_combo, 20);
    }

    #[test]
    fn combo_decays_to_baseline() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        score.land(&landing(Some(AerialTrick::Method), 1.0, 0.0, 0.6), &config, 1.0);
        assert!(score.multiplier > 1.0);
        assert_eq!(score.combo_timer, 2.5);

        let mut expired = None;
        for _ in 0..200 {
            if let Some(bonus) = score.tick(1.0 / 60.0, &config) {
                expired = Some(bonus);
            }
        }
        assert_eq!(expired, None, "a one-trick chain pays no chain bonus");
        assert_eq!(score.multiplier, 1.0);
        assert_eq!(score.chain, 0);
        assert_eq!(score.combo_timer, 0.0);
    }

    #[test]
    fn long_chain_pays_bonus_on_expiry() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        for _ in 0..3 {
            score.land(&landing(Some(AerialTrick::Indy), 1.0, 0.0, 0.5), &config, 1.0);
        }
        let before = score.score;
        let bonus = score.tick(3.0, &config).expect("chain of three pays out");
        assert_eq!(bonus.length, 3);
        // 100 × 3 × 2.5
        assert_eq!(bonus.bonus, 750);
        assert_eq!(score.score, before + 750);
    }

    #[test]
    fn crash_resets_without_bonus() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        for _ in 0..4 {
            score.land(&landing(Some(AerialTrick::Indy), 1.0, 0.0, 0.5), &config, 1.0);
        }
        let before = score.score;
        score.crash();
        assert_eq!(score.tick(5.0, &config), None);
        assert_eq!(score.score, before);
        assert_eq!(score.multiplier, 1.0);
        assert_eq!(score.chain, 0);
    }

    #[test]
    fn grind_tiers_and_bonuses() {
        let config = TrickConfig::default();
        let cases = [
            (50.0, 150),
            (120.0, 400),
            (150.0, 400),
            (250.0, 1000),
            (300.0, 1000),
        ];
        for (length, expected) in cases {
            let mut score = ScoreState::default();
            let (_, points) = score
                .grind(&grind_exit(length, GrindableType::Rail), &config, 1.0)
                .unwrap();
            assert_eq!(points, expected, "length {length}");
        }

        let mut score = ScoreState::default();
        let (name, points) = score
            .grind(&grind_exit(300.0, GrindableType::Kinked), &config, 1.0)
            .unwrap();
        assert_eq!(name, "Kinked Rail Epic Grind");
        assert_eq!(points, 1600);
    }

    #[test]
    fn chained_grind_gets_chain_bonus() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        score.grind(&grind_exit(50.0, GrindableType::Rail), &config, 1.0);
        // multiplier 1.5, chain bonus 1.5
        let (_, points) = score
            .grind(&grind_exit(50.0, GrindableType::Rail), &config, 1.0)
            .unwrap();
        assert_eq!(points, 338);
        assert_eq!(score.chain, 2);
    }

    #[test]
    fn aborted_grind_scores_nothing() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        let mut exit = grind_exit(200.0, GrindableType::Rail);
        exit.aborted = true;
        assert_eq!(score.grind(&exit, &config, 1.0), None);
        assert_eq!(score.score, 0);
        assert_eq!(score.chain, 0);
    }

    #[test]
    fn flow_rises_and_decays() {
        let config = TrickConfig::default();
        let mut score = ScoreState::default();
        score.near_miss(&config, 1.0);
        score.near_miss(&config, 1.0);
        assert!((score.flow - 0.2).abs() < 1e-6);
        score.tick(10.0, &config);
        assert_eq!(score.flow, 0.0);
    }

    #[test]
    fn shop_bonus_scales_awards() {
        let mut score = ScoreState::default();
        assert_eq!(score.award(50.0, 2.0), 100);
        assert_eq!(score.score, 100);
    }
}
