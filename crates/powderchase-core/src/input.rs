use serde::{Deserialize, Serialize};

/// Logical input for a single tick. Produced by keyboard, touch or gamepad
/// polling outside the core; the simulation never sees the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSignal {
    pub left: bool,
    pub right: bool,
    /// Brake.
    pub up: bool,
    /// Tuck.
    pub down: bool,
    pub jump_pressed: bool,
}

impl InputSignal {
    /// Steering direction: -1 (left), 0, +1 (right). Opposing keys cancel.
    pub fn steer(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    pub fn is_braking(&self) -> bool {
        self.up && !self.down
    }

    pub fn is_tucking(&self) -> bool {
        self.down && !self.up
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposing_keys_cancel() {
        let input = InputSignal {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(input.steer(), 0.0);
    }

    #[test]
    fn steer_direction() {
        let left = InputSignal {
            left: true,
            ..Default::default()
        };
        let right = InputSignal {
            right: true,
            ..Default::default()
        };
        assert_eq!(left.steer(), -1.0);
        assert_eq!(right.steer(), 1.0);
    }

    #[test]
    fn brake_and_tuck_are_exclusive() {
        let both = InputSignal {
            up: true,
            down: true,
            ..Default::default()
        };
        assert!(!both.is_braking());
        assert!(!both.is_tucking());
    }
}
