pub mod events;
pub mod game_trait;
pub mod input;
pub mod persistence;
pub mod powerup;
pub mod snapshot;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::game_trait::{GameEvent, GameMode, RunConfig};
    use crate::input::InputSignal;

    /// Create a run config with the given seed and no custom values.
    pub fn default_config(seed: u64) -> RunConfig {
        RunConfig::with_seed(seed)
    }

    /// Input that holds a single direction for every tick.
    pub fn steady_input(left: bool, right: bool, down: bool) -> InputSignal {
        InputSignal {
            left,
            right,
            down,
            ..Default::default()
        }
    }

    /// Run N ticks with the same input, returning all accumulated events.
    pub fn run_mode_ticks(
        mode: &mut dyn GameMode,
        n: usize,
        dt: f32,
        input: &InputSignal,
    ) -> Vec<GameEvent> {
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(mode.update(dt, input));
        }
        all_events
    }

    fn snapshot(mode: &dyn GameMode) -> Vec<u8> {
        mode.serialize_state()
            .expect("snapshot serialization must succeed")
    }

    // ================================================================
    // GameMode Contract Tests
    // ================================================================
    // Generic checks every GameMode implementation must pass. Mode crates
    // call them from their own test modules with a concrete instance.

    /// After init(), serialize_state() must return non-empty bytes.
    pub fn contract_init_creates_state(mode: &mut dyn GameMode, seed: u64) {
        mode.init(&default_config(seed));
        let state = snapshot(mode);
        assert!(
            !state.is_empty(),
            "serialize_state() must return non-empty bytes after init"
        );
        assert!(!mode.is_run_over(), "a fresh run must not be over");
    }

    /// update() with dt>0 must advance the world.
    pub fn contract_update_advances_time(mode: &mut dyn GameMode, dt: f32) {
        let before = snapshot(mode);
        mode.update(dt, &InputSignal::default());
        let after = snapshot(mode);
        assert_ne!(before, after, "update(dt>0) must advance the world");
    }

    /// Two instances fed identical inputs must produce identical snapshots.
    pub fn contract_deterministic(
        a: &mut dyn GameMode,
        b: &mut dyn GameMode,
        seed: u64,
        inputs: &[InputSignal],
        dt: f32,
    ) {
        a.init(&default_config(seed));
        b.init(&default_config(seed));
        for input in inputs {
            a.update(dt, input);
            b.update(dt, input);
        }
        assert_eq!(
            snapshot(a),
            snapshot(b),
            "identical seed and input sequence must yield identical state"
        );
    }

    /// serialize → apply → serialize must be stable.
    pub fn contract_state_roundtrip_preserves(mode: &mut dyn GameMode) {
        let state_a = snapshot(mode);
        mode.apply_state(&state_a)
            .expect("a mode must accept its own snapshot");
        let state_b = snapshot(mode);
        assert_eq!(
            state_a, state_b,
            "State must be stable after serialize→apply→serialize roundtrip"
        );
    }

    /// pause() must freeze the world, resume() must unfreeze it.
    pub fn contract_pause_stops_updates(mode: &mut dyn GameMode, dt: f32) {
        mode.pause();
        let before = snapshot(mode);
        mode.update(dt, &InputSignal::default());
        let during_pause = snapshot(mode);
        assert_eq!(before, during_pause, "State must not change while paused");

        mode.resume();
        mode.update(dt, &InputSignal::default());
        let after_resume = snapshot(mode);
        assert_ne!(during_pause, after_resume, "State must change after resume");
    }

    /// Idling long enough must end the run through the pursuit mechanics.
    pub fn contract_run_eventually_ends(mode: &mut dyn GameMode, max_ticks: usize, dt: f32) {
        let idle = InputSignal::default();
        for _ in 0..max_ticks {
            mode.update(dt, &idle);
            if mode.is_run_over() {
                let result = mode.run_result();
                assert!(result.cause.is_some(), "a finished run must record a cause");
                return;
            }
        }
        panic!("run must end within {max_ticks} ticks of {dt}s each");
    }
}
