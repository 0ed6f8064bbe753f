pub mod config;
pub mod grid;

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use arcade_core::game_trait::{GameEvent, GameStatus, LocalGame, LocalGameInfo};
use arcade_core::local_game_boilerplate;

use config::SnakeConfig;
pub use grid::{Cell, Direction};

/// Input from the arrow keys and the start/pause button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnakeInput {
    Turn(Direction),
    Reset,
    TogglePause,
}

/// Serializable snake state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnakeState {
    pub width: i32,
    pub height: i32,
    /// Occupied cells, head first.
    pub body: VecDeque<Cell>,
    pub food: Cell,
    /// Heading used on the next step. `None` before the first round.
    pub heading: Option<Direction>,
    /// Heading the snake actually moved with on its last step.
    pub last_step: Option<Direction>,
    pub score: u32,
    pub high_score: u32,
    pub status: GameStatus,
}

/// Single-player snake on a fixed grid.
pub struct SnakeGame {
    state: SnakeState,
    config: SnakeConfig,
    rng: StdRng,
    /// Time carried over between updates, in seconds.
    tick_accum: f32,
}

impl SnakeGame {
    pub fn new() -> Self {
        Self::with_config(SnakeConfig::load())
    }

    pub fn with_config(config: SnakeConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic food placement, for tests and replays.
    pub fn with_seed(config: SnakeConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SnakeConfig, rng: StdRng) -> Self {
        let state = SnakeState {
            width: config.width,
            height: config.height,
            body: VecDeque::from([Cell::new(config.start_x, config.start_y)]),
            food: Cell::new(config.initial_food_x, config.initial_food_y),
            heading: None,
            last_step: None,
            score: 0,
            high_score: 0,
            status: GameStatus::Idle,
        };
        Self {
            state,
            config,
            rng,
            tick_accum: 0.0,
        }
    }

    pub fn state(&self) -> &SnakeState {
        &self.state
    }

    pub fn config(&self) -> &SnakeConfig {
        &self.config
    }

    pub fn head(&self) -> Cell {
        self.state.body.front().copied().unwrap_or(Cell::new(
            self.config.start_x,
            self.config.start_y,
        ))
    }

    fn random_food(&mut self) -> Cell {
        Cell::new(
            self.rng.random_range(0..self.state.width.max(1)),
            self.rng.random_range(0..self.state.height.max(1)),
        )
    }

    /// Change heading. Rejected unless playing, and rejected when the new
    /// direction reverses the one the snake last moved in. Turning back to
    /// the current direction cancels a queued turn.
    pub fn turn(&mut self, direction: Direction) -> bool {
        if self.state.status != GameStatus::Playing {
            return false;
        }
        let reference = self.state.last_step.or(self.state.heading);
        if reference.is_some_and(|current| direction == current.opposite()) {
            return false;
        }
        self.state.heading = Some(direction);
        true
    }

    /// Start/pause button: pause a running game, resume a paused one, or
    /// start a fresh round from the title screen or after a crash.
    pub fn toggle_pause(&mut self) {
        match self.state.status {
            GameStatus::Playing => self.state.status = GameStatus::Idle,
            GameStatus::Idle if self.state.heading.is_some() => {
                self.state.status = GameStatus::Playing;
                self.tick_accum = 0.0;
            },
            GameStatus::Idle | GameStatus::GameOver | GameStatus::Victory => self.reset(),
        }
    }

    /// Advance the snake by one cell.
    pub fn step(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.state.status != GameStatus::Playing {
            return events;
        }
        let Some(direction) = self.state.heading else {
            return events;
        };

        let new_head = self.head().step(direction);
        if !new_head.in_bounds(self.state.width, self.state.height)
            || self.state.body.contains(&new_head)
        {
            self.state.status = GameStatus::GameOver;
            tracing::debug!(score = self.state.score, "Snake crashed");
            events.push(GameEvent::StatusChanged {
                status: GameStatus::GameOver,
            });
            return events;
        }

        self.state.body.push_front(new_head);
        self.state.last_step = Some(direction);

        if new_head == self.state.food {
            self.state.score = self.state.score.saturating_add(self.config.score_increment);
            self.state.high_score = self.state.high_score.max(self.state.score);
            self.state.food = self.random_food();
            events.push(GameEvent::ScoreUpdate {
                score: self.state.score,
            });
        } else {
            self.state.body.pop_back();
        }
        events
    }
}

impl Default for SnakeGame {
    fn default() -> Self {
        Self::with_config(SnakeConfig::default())
    }
}

impl LocalGame for SnakeGame {
    fn info(&self) -> LocalGameInfo {
        LocalGameInfo {
            name: "Snake".to_string(),
            description: "Arrow keys to steer. Eat to grow, avoid walls and yourself.".to_string(),
        }
    }

    fn tick_rate(&self) -> f32 {
        1.0 / self.config.tick_interval_secs()
    }

    fn reset(&mut self) {
        self.state.body = VecDeque::from([Cell::new(self.config.start_x, self.config.start_y)]);
        self.state.heading = Some(Direction::Right);
        self.state.last_step = None;
        self.state.score = 0;
        self.state.status = GameStatus::Playing;
        self.state.food = self.random_food();
        self.tick_accum = 0.0;
    }

    fn apply_input(&mut self, input: &[u8]) {
        match rmp_serde::from_slice::<SnakeInput>(input) {
            Err(e) => {
                tracing::debug!(error = %e, "Dropped malformed snake input");
            },
            Ok(SnakeInput::Turn(direction)) => {
                if !self.turn(direction) {
                    tracing::trace!(?direction, "Rejected snake turn");
                }
            },
            Ok(SnakeInput::Reset) => self.reset(),
            Ok(SnakeInput::TogglePause) => self.toggle_pause(),
        }
    }

    fn update(&mut self, dt: f32) -> Vec<GameEvent> {
        if self.state.status != GameStatus::Playing {
            self.tick_accum = 0.0;
            return Vec::new();
        }

        let interval = self.config.tick_interval_secs();
        self.tick_accum += dt;
        let mut events = Vec::new();
        // Small slack so accumulated float error never drops a step.
        while self.tick_accum + 1e-4 >= interval {
            self.tick_accum = (self.tick_accum - interval).max(0.0);
            events.extend(self.step());
            if self.state.status != GameStatus::Playing {
                break;
            }
        }
        events
    }

    local_game_boilerplate!(state_type: SnakeState);
}
