use serde::{Deserialize, Serialize};

use powderchase_core::powerup;

use crate::config::PhysicsConfig;

/// Effects a lodge shop can sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShopEffectKind {
    SpeedBoost,
    TurnBoost,
    TrickMultiplier,
    /// One-shot: grants `value` seconds of invincibility.
    Invincibility,
    /// One-shot: pushes the fog back by `value` px.
    FogRepel,
}

impl powerup::PowerUpKind for ShopEffectKind {
    fn duration(&self) -> f32 {
        match self {
            ShopEffectKind::SpeedBoost => 20.0,
            ShopEffectKind::TurnBoost => 20.0,
            ShopEffectKind::TrickMultiplier => 30.0,
            ShopEffectKind::Invincibility => 0.0,
            ShopEffectKind::FogRepel => 0.0,
        }
    }
}

/// A purchase handed back by the shop flow when the rider leaves a lodge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShopEffect {
    pub kind: ShopEffectKind,
    pub value: f32,
}

impl ShopEffect {
    pub fn new(kind: ShopEffectKind, value: f32) -> Self {
        Self { kind, value }
    }

    pub fn is_timed(&self) -> bool {
        powerup::PowerUpKind::duration(&self.kind) > 0.0
    }
}

pub type ActiveEffect = powerup::ActivePowerUp<ShopEffectKind>;

/// Timed modifiers layered over the base physics config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    active: Vec<ActiveEffect>,
}

impl Modifiers {
    /// Start a timed effect. One-shot kinds are ignored here; the caller
    /// applies them directly.
    pub fn push(&mut self, effect: ShopEffect) {
        if effect.is_timed() && effect.value.is_finite() {
            self.active.push(ActiveEffect::new(effect.kind, effect.value));
        }
    }

    pub fn tick(&mut self, dt: f32) {
        for effect in &mut self.active {
            effect.tick(dt);
        }
        self.active.retain(|e| !e.is_expired());
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn active(&self) -> &[ActiveEffect] {
        &self.active
    }

    fn factor(&self, kind: ShopEffectKind) -> f32 {
        self.active
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| 1.0 + e.value.max(0.0))
            .product()
    }

    pub fn speed_factor(&self) -> f32 {
        self.factor(ShopEffectKind::SpeedBoost)
    }

    pub fn turn_factor(&self) -> f32 {
        self.factor(ShopEffectKind::TurnBoost)
    }

    /// Multiplier applied to every score award.
    pub fn score_factor(&self) -> f32 {
        self.factor(ShopEffectKind::TrickMultiplier)
    }

    /// Effective physics: base constants with the active boosts applied.
    pub fn apply(&self, base: &PhysicsConfig) -> PhysicsConfig {
        let speed = self.speed_factor();
        let turn = self.turn_factor();
        PhysicsConfig {
            max_speed: base.max_speed * speed,
            acceleration: base.acceleration * speed,
            turn_rate: base.turn_rate * turn,
            max_turn_step: base.max_turn_step * turn,
            ..base.clone()
        }
    }
}
