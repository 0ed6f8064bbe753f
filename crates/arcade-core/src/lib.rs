pub mod catalog;
pub mod chat;
pub mod game_trait;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::game_trait::{GameEvent, GameStatus, LocalGame};

    /// Run N updates of `dt` seconds, returning all accumulated events.
    pub fn run_game_ticks(game: &mut dyn LocalGame, n: usize, dt: f32) -> Vec<GameEvent> {
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(game.update(dt));
        }
        all_events
    }

    /// Encode a game input the way the host does before handing it to a game.
    pub fn encode_input<T: serde::Serialize>(input: &T) -> Vec<u8> {
        rmp_serde::to_vec(input).expect("test input must encode")
    }

    /// Assert that the game's serialized state differs from `before`.
    pub fn assert_game_state_changed(game: &dyn LocalGame, before: &[u8]) {
        let after = game.serialize_state();
        assert_ne!(
            before,
            &after[..],
            "Game state should have changed after operation"
        );
    }

    // ================================================================
    // Local Game Contract Tests
    // ================================================================
    // Every LocalGame implementation must pass these. Game crates call them
    // from their own #[cfg(test)] modules with a concrete game instance.

    /// reset() must leave the game playing with a non-empty serialized state.
    pub fn contract_reset_starts_playing(game: &mut dyn LocalGame) {
        game.reset();
        assert_eq!(game.status(), GameStatus::Playing);
        assert!(
            !game.serialize_state().is_empty(),
            "serialize_state() must return non-empty bytes after reset"
        );
    }

    /// Malformed input bytes are dropped without touching state.
    pub fn contract_garbage_input_ignored(game: &mut dyn LocalGame) {
        let before = game.serialize_state();
        game.apply_input(&[0xFF, 0xFE, 0x00, 0x01, 0xAB, 0xCD]);
        assert_eq!(
            before,
            game.serialize_state(),
            "Garbage input must not change state"
        );
    }

    /// A truncated snapshot is rejected and the previous state kept.
    pub fn contract_truncated_state_ignored(game: &mut dyn LocalGame) {
        let before = game.serialize_state();
        game.apply_state(&before[..before.len() / 2]);
        assert_eq!(before, game.serialize_state());
    }

    /// serialize_state → apply_state must be stable.
    pub fn contract_state_roundtrip_preserves(game: &mut dyn LocalGame) {
        let state_a = game.serialize_state();
        game.apply_state(&state_a);
        let state_b = game.serialize_state();
        assert_eq!(
            state_a, state_b,
            "State must be stable after serialize→apply→serialize roundtrip"
        );
    }

    /// state_json() must expose the status the game reports.
    pub fn contract_state_json_reports_status(game: &dyn LocalGame) {
        let json = game.state_json();
        let expected = serde_json::to_value(game.status()).expect("status serializes");
        assert_eq!(json["status"], expected, "state_json must carry status");
    }

    /// A finished game ignores further time.
    pub fn contract_finished_game_is_frozen(game: &mut dyn LocalGame) {
        assert!(game.status().is_finished(), "game must be finished first");
        let before = game.serialize_state();
        let events = run_game_ticks(game, 10, 0.1);
        assert!(events.is_empty(), "No events after the game finished");
        assert_eq!(before, game.serialize_state());
    }
}
