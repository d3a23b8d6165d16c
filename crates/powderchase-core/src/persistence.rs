//! Personal-best records exchanged with the storage layer at session boundaries.
//!
//! The storage format is opaque key → numeric-string pairs; the driver decides
//! where they live (LocalStorage, a file, nothing at all).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game_trait::RunResult;

pub const HIGH_SCORE_KEY: &str = "powderchase.high_score";
pub const BEST_DISTANCE_KEY: &str = "powderchase.best_distance";
pub const BEST_COMBO_KEY: &str = "powderchase.best_combo";

/// A stored value could not be read back as a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    InvalidNumber { key: String, value: String },
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "stored value for {key} is not a number: {value:?}")
            },
        }
    }
}

impl std::error::Error for StorageError {}

/// Best results across sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalBests {
    pub high_score: u64,
    pub best_distance: f32,
    pub best_combo: u32,
}

/// Which records a finished run broke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecords {
    pub high_score: bool,
    pub distance: bool,
    pub combo: bool,
}

impl NewRecords {
    pub fn any(&self) -> bool {
        self.high_score || self.distance || self.combo
    }
}

impl PersonalBests {
    /// Parse from storage pairs. Missing keys count as zero; present but
    /// malformed values are an error so the caller can decide to reset.
    pub fn from_pairs(pairs: &BTreeMap<String, String>) -> Result<Self, StorageError> {
        Ok(Self {
            high_score: parse_key(pairs, HIGH_SCORE_KEY)?.unwrap_or(0),
            best_distance: parse_key::<f32>(pairs, BEST_DISTANCE_KEY)?
                .filter(|d| d.is_finite() && *d >= 0.0)
                .unwrap_or(0.0),
            best_combo: parse_key(pairs, BEST_COMBO_KEY)?.unwrap_or(0),
        })
    }

    /// Like `from_pairs`, but logs and falls back to empty records on bad data.
    pub fn load_or_default(pairs: &BTreeMap<String, String>) -> Self {
        match Self::from_pairs(pairs) {
            Ok(bests) => bests,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable personal bests");
                Self::default()
            },
        }
    }

    pub fn to_pairs(&self) -> BTreeMap<String, String> {
        let mut pairs = BTreeMap::new();
        pairs.insert(HIGH_SCORE_KEY.to_string(), self.high_score.to_string());
        pairs.insert(
            BEST_DISTANCE_KEY.to_string(),
            format!("{:.0}", self.best_distance),
        );
        pairs.insert(BEST_COMBO_KEY.to_string(), self.best_combo.to_string());
        pairs
    }

    /// Fold a finished run into the records.
    pub fn record(&mut self, run: &RunResult) -> NewRecords {
        let mut records = NewRecords::default();
        if run.score > self.high_score {
            self.high_score = run.score;
            records.high_score = true;
        }
        if run.distance > self.best_distance {
            self.best_distance = run.distance;
            records.distance = true;
        }
        if run.best_combo > self.best_combo {
            self.best_combo = run.best_combo;
            records.combo = true;
        }
        records
    }
}

fn parse_key<T: std::str::FromStr>(
    pairs: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = pairs.get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| StorageError::InvalidNumber {
            key: key.to_string(),
            value: raw.clone(),
        })
}
