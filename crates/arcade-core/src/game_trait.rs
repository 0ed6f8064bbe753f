use serde::{Deserialize, Serialize};

/// Lifecycle of a local game. Drives which controls and overlays a view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Idle,
    Playing,
    GameOver,
    Victory,
}

impl GameStatus {
    /// Whether the game reached a terminal state (draw, loss or win).
    pub fn is_finished(self) -> bool {
        matches!(self, Self::GameOver | Self::Victory)
    }
}

/// Core trait that all locally hosted Arcade games implement.
///
/// The host owns the tick loop and the transport; the game only handles its
/// own board and transition rules. Inputs and state travel as MessagePack.
pub trait LocalGame: Send + Sync {
    /// Short description shown above the board.
    fn info(&self) -> LocalGameInfo;

    /// Current lifecycle status.
    fn status(&self) -> GameStatus;

    /// Replace the whole game state with a fresh round and start playing.
    fn reset(&mut self);

    /// Apply one encoded player input. Malformed or invalid inputs are ignored.
    fn apply_input(&mut self, input: &[u8]);

    /// Advance timers by `dt` seconds. Returns the events produced.
    fn update(&mut self, dt: f32) -> Vec<GameEvent>;

    /// Serialize the authoritative state.
    fn serialize_state(&self) -> Vec<u8>;

    /// The same state as JSON, for HTTP clients.
    fn state_json(&self) -> serde_json::Value;

    /// Replace state from a serialized snapshot. Garbage leaves state untouched.
    fn apply_state(&mut self, state: &[u8]);

    /// Tick rate in Hz the host should call `update` at.
    fn tick_rate(&self) -> f32 {
        10.0
    }
}

/// Static facts about a local game implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalGameInfo {
    pub name: String,
    pub description: String,
}

/// Events emitted by a game during update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    ScoreUpdate { score: u32 },
    StatusChanged { status: GameStatus },
}

/// Generates the `LocalGame` methods that are identical across all games:
/// `status`, `serialize_state`, `state_json`, `apply_state`.
///
/// Requires the implementing struct to have a `state: $StateType` field, and
/// `$StateType` to have a `status: GameStatus` field. Games that hide part of
/// their state from players pass `custom_state_json` and write `state_json`
/// themselves.
#[macro_export]
macro_rules! local_game_boilerplate {
    (state_type: $StateType:ty) => {
        $crate::local_game_boilerplate!(state_type: $StateType, custom_state_json);

        fn state_json(&self) -> serde_json::Value {
            serde_json::to_value(&self.state).unwrap_or(serde_json::Value::Null)
        }
    };
    (state_type: $StateType:ty, custom_state_json) => {
        fn status(&self) -> $crate::game_trait::GameStatus {
            self.state.status
        }

        fn serialize_state(&self) -> Vec<u8> {
            match rmp_serde::to_vec(&self.state) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode game state");
                    Vec::new()
                },
            }
        }

        fn apply_state(&mut self, state: &[u8]) {
            match rmp_serde::from_slice::<$StateType>(state) {
                Ok(s) => self.state = s,
                Err(e) => tracing::debug!(error = %e, "Dropped malformed game state"),
            }
        }
    };
}
