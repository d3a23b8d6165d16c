//! Trick catalog: automatic aerial tricks, the manual spin table, grind tiers.

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::TrickConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrickStyle {
    Grab,
    Flip,
    Spin,
    Combo,
}

/// An automatically selected aerial trick. It plays out over its own fixed
/// duration regardless of how long the rider actually stays in the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AerialTrick {
    Indy,
    Method,
    Stalefish,
    Melon,
    Backflip,
    Frontflip,
    Spin360,
    Spin540,
    Rodeo,
    MistyFlip,
    Cork720,
    DoubleBackflip,
}

impl AerialTrick {
    pub const ALL: [AerialTrick; 12] = [
        AerialTrick::Indy,
        AerialTrick::Method,
        AerialTrick::Stalefish,
        AerialTrick::Melon,
        AerialTrick::Backflip,
        AerialTrick::Frontflip,
        AerialTrick::Spin360,
        AerialTrick::Spin540,
        AerialTrick::Rodeo,
        AerialTrick::MistyFlip,
        AerialTrick::Cork720,
        AerialTrick::DoubleBackflip,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AerialTrick::Indy => "Indy Grab",
            AerialTrick::Method => "Method",
            AerialTrick::Stalefish => "Stalefish",
            AerialTrick::Melon => "Melon Grab",
            AerialTrick::Backflip => "Backflip",
            AerialTrick::Frontflip => "Frontflip",
            AerialTrick::Spin360 => "360",
            AerialTrick::Spin540 => "540",
            AerialTrick::Rodeo => "Rodeo 540",
            AerialTrick::MistyFlip => "Misty Flip",
            AerialTrick::Cork720 => "Cork 720",
            AerialTrick::DoubleBackflip => "Double Backflip",
        }
    }

    pub fn style(&self) -> TrickStyle {
        match self {
            AerialTrick::Indy
            | AerialTrick::Method
            | AerialTrick::Stalefish
            | AerialTrick::Melon => TrickStyle::Grab,
            AerialTrick::Backflip | AerialTrick::Frontflip | AerialTrick::DoubleBackflip => {
                TrickStyle::Flip
            },
            AerialTrick::Spin360 | AerialTrick::Spin540 => TrickStyle::Spin,
            AerialTrick::Rodeo | AerialTrick::MistyFlip | AerialTrick::Cork720 => {
                TrickStyle::Combo
            },
        }
    }

    pub fn points(&self) -> u64 {
        match self {
            AerialTrick::Indy => 100,
            AerialTrick::Method => 150,
            AerialTrick::Stalefish => 150,
            AerialTrick::Melon => 120,
            AerialTrick::Backflip => 400,
            AerialTrick::Frontflip => 450,
            AerialTrick::Spin360 => 250,
            AerialTrick::Spin540 => 400,
            AerialTrick::Rodeo => 700,
            AerialTrick::MistyFlip => 750,
            AerialTrick::Cork720 => 900,
            AerialTrick::DoubleBackflip => 1200,
        }
    }

    /// Seconds the trick animation takes to complete.
    pub fn duration(&self) -> f32 {
        match self {
            AerialTrick::Indy | AerialTrick::Melon => 0.4,
            AerialTrick::Method | AerialTrick::Stalefish => 0.5,
            AerialTrick::Spin360 => 0.55,
            AerialTrick::Backflip | AerialTrick::Frontflip => 0.7,
            AerialTrick::Spin540 => 0.75,
            AerialTrick::Rodeo | AerialTrick::MistyFlip => 0.9,
            AerialTrick::Cork720 => 1.0,
            AerialTrick::DoubleBackflip => 1.2,
        }
    }

    /// Spin degrees the trick sweeps through (display only).
    pub fn spin_degrees(&self) -> f32 {
        match self {
            AerialTrick::Spin360 => 360.0,
            AerialTrick::Spin540 | AerialTrick::Rodeo | AerialTrick::MistyFlip => 540.0,
            AerialTrick::Cork720 => 720.0,
            _ => 0.0,
        }
    }

    /// Flip degrees the trick sweeps through (display only).
    pub fn flip_degrees(&self) -> f32 {
        match self {
            AerialTrick::Backflip | AerialTrick::Frontflip => 360.0,
            AerialTrick::Rodeo | AerialTrick::MistyFlip | AerialTrick::Cork720 => 360.0,
            AerialTrick::DoubleBackflip => 720.0,
            _ => 0.0,
        }
    }
}

/// Pick an automatic trick that fits the expected air time.
/// Falls back to the quickest grab when nothing fits.
pub fn pick_auto_trick(rng: &mut StdRng, expected_air_time: f32) -> AerialTrick {
    let fitting: Vec<AerialTrick> = AerialTrick::ALL
        .iter()
        .copied()
        .filter(|t| t.duration() <= expected_air_time)
        .collect();
    if fitting.is_empty() {
        return AerialTrick::Indy;
    }
    fitting[rng.random_range(0..fitting.len())]
}

/// Manual spin table, highest threshold first.
const SPIN_TABLE: [(f32, &str, u64); 8] = [
    (1440.0, "1440", 2000),
    (1260.0, "1260", 1600),
    (1080.0, "1080", 1200),
    (900.0, "900", 900),
    (720.0, "720", 600),
    (540.0, "540", 400),
    (360.0, "360", 250),
    (180.0, "180", 100),
];

/// Largest clean spin matched by accumulated rotation (sign ignored).
pub fn match_spin(degrees: f32) -> Option<(&'static str, u64)> {
    let magnitude = degrees.abs();
    SPIN_TABLE
        .iter()
        .find(|(threshold, _, _)| magnitude >= *threshold)
        .map(|(_, name, points)| (*name, *points))
}

/// Big-air multiplier for a given air time.
pub fn air_multiplier(air_time: f32, config: &TrickConfig) -> f32 {
    if air_time >= config.huge_air_time {
        config.huge_air_multiplier
    } else if air_time >= config.big_air_time {
        config.big_air_multiplier
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrindTier {
    Short,
    Long,
    Epic,
}

impl GrindTier {
    /// Tier for a grind length. Boundaries belong to the higher tier.
    pub fn for_length(length: f32, config: &TrickConfig) -> Self {
        if length >= config.epic_grind_length {
            GrindTier::Epic
        } else if length >= config.long_grind_length {
            GrindTier::Long
        } else {
            GrindTier::Short
        }
    }

    pub fn points(&self) -> u64 {
        match self {
            GrindTier::Short => 150,
            GrindTier::Long => 400,
            GrindTier::Epic => 1000,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GrindTier::Short => "Grind",
            GrindTier::Long => "Long Grind",
            GrindTier::Epic => "Epic Grind",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn spin_table_takes_highest_match() {
        assert_eq!(match_spin(1500.0), Some(("1440", 2000)));
        assert_eq!(match_spin(-725.0), Some(("720", 600)));
        assert_eq!(match_spin(359.9), Some(("180", 100)));
        assert_eq!(match_spin(90.0), None);
    }

    #[test]
    fn grind_tier_boundaries() {
        let config = TrickConfig::default();
        assert_eq!(GrindTier::for_length(50.0, &config), GrindTier::Short);
        assert_eq!(GrindTier::for_length(119.99, &config), GrindTier::Short);
        assert_eq!(GrindTier::for_length(120.0, &config), GrindTier::Long);
        assert_eq!(GrindTier::for_length(150.0, &config), GrindTier::Long);
        assert_eq!(GrindTier::for_length(249.99, &config), GrindTier::Long);
        assert_eq!(GrindTier::for_length(250.0, &config), GrindTier::Epic);
        assert_eq!(GrindTier::for_length(300.0, &config), GrindTier::Epic);
    }

    #[test]
    fn air_multiplier_thresholds() {
        let config = TrickConfig::default();
        assert_eq!(air_multiplier(0.5, &config), 1.0);
        assert_eq!(air_multiplier(1.0, &config), 1.2);
        assert_eq!(air_multiplier(1.7, &config), 1.5);
    }

    #[test]
    fn auto_trick_fits_air_time() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let trick = pick_auto_trick(&mut rng, 0.8);
            assert!(trick.duration() <= 0.8);
        }
        assert_eq!(pick_auto_trick(&mut rng, 0.1), AerialTrick::Indy);
    }

    #[test]
    fn auto_trick_is_seeded() {
        let a: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(11);
            (0..20).map(|_| pick_auto_trick(&mut rng, 2.0)).collect()
        };
        let b: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(11);
            (0..20).map(|_| pick_auto_trick(&mut rng, 2.0)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn harder_tricks_pay_more() {
        assert!(AerialTrick::DoubleBackflip.points() > AerialTrick::Backflip.points());
        assert!(AerialTrick::Cork720.points() > AerialTrick::Spin540.points());
        assert_eq!(AerialTrick::Method.style(), TrickStyle::Grab);
        assert_eq!(AerialTrick::Rodeo.style(), TrickStyle::Combo);
    }
}
