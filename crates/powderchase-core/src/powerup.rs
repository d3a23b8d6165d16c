use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Trait for mode-specific timed effect kinds (shop purchases, pickups).
pub trait PowerUpKind: Clone + Copy + PartialEq + Serialize + DeserializeOwned {
    /// Duration in seconds. `0.0` means "applied once on purchase",
    /// `f32::INFINITY` means "lasts the whole run".
    fn duration(&self) -> f32;
}

/// A timed effect carrying its purchased magnitude, generic over the kind enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ActivePowerUp<K: PowerUpKind> {
    pub kind: K,
    pub value: f32,
    pub remaining: f32,
}

impl<K: PowerUpKind> ActivePowerUp<K> {
    pub fn new(kind: K, value: f32) -> Self {
        Self {
            remaining: kind.duration(),
            kind,
            value,
        }
    }

    pub fn tick(&mut self, dt: f32) {
        if self.remaining.is_finite() {
            self.remaining -= dt;
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}
