use powderchase_core::input::InputSignal;
use powderchase_freeride::RenderView;
use powderchase_freeride::shop::{ShopEffect, ShopEffectKind};

/// How far downhill the autopilot looks for trouble.
const LOOKAHEAD: f32 = 260.0;
/// Lateral clearance it tries to keep from obstacles.
const CLEARANCE: f32 = 45.0;

/// Steer around the nearest obstacle in the rider's lane, otherwise tuck
/// and drift back toward the centre line.
pub fn steer(view: &RenderView<'_>) -> InputSignal {
    let player = view.player;
    let threat = view
        .obstacles
        .iter()
        .filter(|o| o.y > player.y && o.y - player.y < LOOKAHEAD)
        .filter(|o| (o.x - player.x).abs() < o.half_w + CLEARANCE)
        .min_by(|a, b| a.y.total_cmp(&b.y));

    let Some(obstacle) = threat else {
        return InputSignal {
            left: player.x > 120.0,
            right: player.x < -120.0,
            down: true,
            ..Default::default()
        };
    };
    // Dodge to whichever side keeps us nearer the middle of the slope.
    let go_left = if (obstacle.x - player.x).abs() < 1.0 {
        player.x > 0.0
    } else {
        obstacle.x > player.x
    };
    InputSignal {
        left: go_left,
        right: !go_left,
        // Bleed speed if the obstacle is close.
        up: obstacle.y - player.y < LOOKAHEAD * 0.4,
        ..Default::default()
    }
}

/// What the autopilot buys on its `visit`-th lodge stop.
pub fn shopping_list(visit: u32) -> Vec<ShopEffect> {
    match visit % 3 {
        0 => vec![ShopEffect::new(ShopEffectKind::FogRepel, 400.0)],
        1 => vec![
            ShopEffect::new(ShopEffectKind::SpeedBoost, 0.2),
            ShopEffect::new(ShopEffectKind::Invincibility, 3.0),
        ],
        _ => vec![ShopEffect::new(ShopEffectKind::TrickMultiplier, 0.5)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powderchase_core::game_trait::{GameMode, RunConfig};
    use powderchase_freeride::Freeride;

    #[test]
    fn open_slope_means_tuck() {
        let mut mode = Freeride::default();
        mode.init(&RunConfig::with_seed(1));
        let view = mode.view();
        let input = steer(&view);
        if !input.left && !input.right {
            assert!(input.down);
        }
    }

    #[test]
    fn shopping_cycles_through_purchases() {
        assert_eq!(shopping_list(0)[0].kind, ShopEffectKind::FogRepel);
        assert_eq!(shopping_list(1).len(), 2);
        assert_eq!(shopping_list(2)[0].kind, ShopEffectKind::TrickMultiplier);
        assert_eq!(shopping_list(3), shopping_list(0));
    }
}
