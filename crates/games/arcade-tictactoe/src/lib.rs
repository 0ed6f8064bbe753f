pub mod lines;

use serde::{Deserialize, Serialize};

use arcade_core::game_trait::{GameEvent, GameStatus, LocalGame, LocalGameInfo};
use arcade_core::local_game_boilerplate;

/// A player's mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

/// Input from the (shared) keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicTacToeInput {
    PlayAt { cell: usize },
    Reset,
}

/// Serializable board state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicTacToeState {
    pub board: [Option<Mark>; 9],
    pub next: Mark,
    pub status: GameStatus,
    pub winner: Option<Mark>,
    pub winning_line: Option<[usize; 3]>,
}

impl TicTacToeState {
    fn fresh() -> Self {
        Self {
            board: [None; 9],
            next: Mark::X,
            status: GameStatus::Playing,
            winner: None,
            winning_line: None,
        }
    }
}

/// Two-player tic-tac-toe. Both marks are placed by people; there is no AI.
pub struct TicTacToe {
    state: TicTacToeState,
}

impl TicTacToe {
    pub fn new() -> Self {
        Self {
            state: TicTacToeState::fresh(),
        }
    }

    pub fn state(&self) -> &TicTacToeState {
        &self.state
    }

    pub fn current_player(&self) -> Mark {
        self.state.next
    }

    /// Place the current player's mark. Returns false (and changes nothing)
    /// unless the game is playing and `cell` is an empty cell on the board.
    pub fn play_at(&mut self, cell: usize) -> bool {
        if self.state.status != GameStatus::Playing
            || cell >= self.state.board.len()
            || self.state.board[cell].is_some()
        {
            return false;
        }

        let mark = self.state.next;
        self.state.board[cell] = Some(mark);
        self.state.next = mark.other();

        if let Some((winner, line)) = lines::find_winner(&self.state.board) {
            self.state.winner = Some(winner);
            self.state.winning_line = Some(line);
            self.state.status = GameStatus::Victory;
            tracing::debug!(?winner, "Tic-tac-toe won");
        } else if lines::is_full(&self.state.board) {
            self.state.status = GameStatus::GameOver;
            tracing::debug!("Tic-tac-toe drawn");
        }
        true
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalGame for TicTacToe {
    fn info(&self) -> LocalGameInfo {
        LocalGameInfo {
            name: "Tic-Tac-Toe".to_string(),
            description: "X moves first. Three in a row wins.".to_string(),
        }
    }

    fn reset(&mut self) {
        self.state = TicTacToeState::fresh();
    }

    fn apply_input(&mut self, input: &[u8]) {
        match rmp_serde::from_slice::<TicTacToeInput>(input) {
            Err(e) => {
                tracing::debug!(error = %e, "Dropped malformed tic-tac-toe input");
            },
            Ok(TicTacToeInput::PlayAt { cell }) => {
                if !self.play_at(cell) {
                    tracing::trace!(cell, "Ignored tic-tac-toe move");
                }
            },
            Ok(TicTacToeInput::Reset) => self.reset(),
        }
    }

    fn update(&mut self, _dt: f32) -> Vec<GameEvent> {
        Vec::new()
    }

    local_game_boilerplate!(state_type: TicTacToeState);
}
