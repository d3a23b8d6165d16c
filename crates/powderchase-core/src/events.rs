use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Maximum number of celebrations kept on screen at once.
pub const MAX_CELEBRATIONS: usize = 8;

/// Default on-screen lifetime of a celebration, in seconds.
pub const CELEBRATION_LIFETIME: f32 = 1.5;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeathCause {
    /// The fog wall reached the rider.
    Fog,
    /// The beast landed a lunge.
    Beast,
}

impl DeathCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeathCause::Fog => "fog",
            DeathCause::Beast => "beast",
        }
    }
}

/// RGB color for celebration text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const GOLD: Color = Color {
        r: 255,
        g: 195,
        b: 18,
    };
    pub const CYAN: Color = Color {
        r: 78,
        g: 205,
        b: 196,
    };
    pub const PINK: Color = Color {
        r: 255,
        g: 107,
        b: 175,
    };
    pub const ORANGE: Color = Color {
        r: 255,
        g: 148,
        b: 77,
    };
    pub const RED: Color = Color {
        r: 255,
        g: 87,
        b: 87,
    };
    pub const PURPLE: Color = Color {
        r: 130,
        g: 88,
        b: 255,
    };
}

/// Short-lived on-screen text emitted on scoring events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Celebration {
    pub text: String,
    pub color: Color,
    /// Remaining lifetime in seconds.
    pub timer: f32,
    pub scale: f32,
}

impl Celebration {
    pub fn new(text: impl Into<String>, color: Color, scale: f32) -> Self {
        Self {
            text: text.into(),
            color,
            timer: CELEBRATION_LIFETIME,
            scale,
        }
    }
}

/// Bounded queue of celebrations. Oldest entries are dropped when full.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CelebrationQueue {
    entries: VecDeque<Celebration>,
}

impl CelebrationQueue {
    pub fn push(&mut self, celebration: Celebration) {
        if self.entries.len() >= MAX_CELEBRATIONS {
            self.entries.pop_front();
        }
        self.entries.push_back(celebration);
    }

    /// Count timers down and drop expired entries.
    pub fn tick(&mut self, dt: f32) {
        for entry in &mut self.entries {
            entry.timer -= dt;
        }
        self.entries.retain(|c| c.timer > 0.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Celebration> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
