use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use arcade_core::catalog::LocalGameKind;
use arcade_core::game_trait::{GameEvent, GameStatus, LocalGame};

/// Commands sent from HTTP handlers to a game's tick loop.
#[derive(Debug)]
pub enum GameCommand {
    /// MessagePack-encoded game input. `ack` receives the snapshot taken
    /// right after the input was applied.
    Input {
        data: Vec<u8>,
        ack: Option<oneshot::Sender<GameSnapshot>>,
    },
    Stop,
}

/// Published by the tick loop whenever the game state changes.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub tick: u64,
    pub status: GameStatus,
    pub state: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<GameEvent>,
}

/// Factory function type for creating local game instances.
type LocalGameFactory = fn() -> Box<dyn LocalGame>;

/// Registry mapping local game kinds to factory functions.
pub struct LocalGameRegistry {
    factories: HashMap<LocalGameKind, LocalGameFactory>,
}

impl Default for LocalGameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalGameRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        #[cfg(feature = "tictactoe")]
        self.factories.insert(LocalGameKind::TicTacToe, || {
            Box::new(arcade_tictactoe::TicTacToe::new())
        });
        #[cfg(feature = "snake")]
        self.factories.insert(LocalGameKind::Snake, || {
            Box::new(arcade_snake::SnakeGame::with_config(
                arcade_snake::config::SnakeConfig::load(),
            ))
        });
        #[cfg(feature = "memory")]
        self.factories.insert(LocalGameKind::Memory, || {
            Box::new(arcade_memory::MemoryGame::with_config(
                arcade_memory::config::MemoryConfig::load(),
            ))
        });
    }

    pub fn create(&self, kind: LocalGameKind) -> Option<Box<dyn LocalGame>> {
        self.factories.get(&kind).map(|f| f())
    }

    /// Return the number of registered game kinds.
    pub fn available_games(&self) -> usize {
        self.factories.len()
    }
}

/// Owner-side handle to a running tick loop. Dropping it stops the loop.
pub struct GameHandle {
    cmd_tx: mpsc::UnboundedSender<GameCommand>,
    snapshot_rx: watch::Receiver<GameSnapshot>,
    updates_tx: broadcast::Sender<GameSnapshot>,
    task: JoinHandle<()>,
}

impl GameHandle {
    /// Queue an input without waiting for it. Returns false if the loop is gone.
    pub fn send_input(&self, data: Vec<u8>) -> bool {
        self.cmd_tx
            .send(GameCommand::Input { data, ack: None })
            .is_ok()
    }

    /// Queue an input and return a receiver for the snapshot taken right
    /// after it was applied. `None` if the loop is gone.
    pub fn request_input(&self, data: Vec<u8>) -> Option<oneshot::Receiver<GameSnapshot>> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.cmd_tx
            .send(GameCommand::Input {
                data,
                ack: Some(ack_tx),
            })
            .ok()?;
        Some(ack_rx)
    }

    /// Apply an input and wait for the resulting snapshot.
    pub async fn apply_input(&self, data: Vec<u8>) -> Option<GameSnapshot> {
        self.request_input(data)?.await.ok()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscribe to future snapshots, paired with the current one.
    pub fn subscribe(&self) -> (GameSnapshot, broadcast::Receiver<GameSnapshot>) {
        let rx = self.updates_tx.subscribe();
        (self.snapshot(), rx)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for GameHandle {
    fn drop(&mut self) {
        if let Err(e) = self.cmd_tx.send(GameCommand::Stop) {
            tracing::debug!(error = %e, "Game loop already stopped");
        }
        self.task.abort();
    }
}

/// Spawn a game tick loop as a tokio task.
pub fn spawn_game(game: Box<dyn LocalGame>, broadcast_capacity: usize) -> GameHandle {
    let initial = take_snapshot(&*game, 0, Vec::new());
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(initial);
    let (updates_tx, _) = broadcast::channel(broadcast_capacity.max(1));

    let loop_updates_tx = updates_tx.clone();
    let task = tokio::spawn(async move {
        run_game_tick_loop(game, cmd_rx, snapshot_tx, loop_updates_tx).await;
    });

    GameHandle {
        cmd_tx,
        snapshot_rx,
        updates_tx,
        task,
    }
}

fn take_snapshot(game: &dyn LocalGame, tick: u64, events: Vec<GameEvent>) -> GameSnapshot {
    GameSnapshot {
        tick,
        status: game.status(),
        state: game.state_json(),
        events,
    }
}

/// Publishes snapshots, skipping ticks that changed nothing.
struct Publisher {
    snapshot_tx: watch::Sender<GameSnapshot>,
    updates_tx: broadcast::Sender<GameSnapshot>,
    last_state: Vec<u8>,
}

impl Publisher {
    fn publish(
        &mut self,
        game: &dyn LocalGame,
        tick: u64,
        events: Vec<GameEvent>,
    ) -> Option<GameSnapshot> {
        let state = game.serialize_state();
        if events.is_empty() && state == self.last_state {
            return None;
        }
        self.last_state = state;

        let snapshot = take_snapshot(game, tick, events);
        self.snapshot_tx.send_replace(snapshot.clone());
        // No subscribers is fine; the watch channel still holds the latest.
        let _ = self.updates_tx.send(snapshot.clone());
        Some(snapshot)
    }
}

/// The per-view game tick loop. Owns the game; nothing else touches it.
async fn run_game_tick_loop(
    mut game: Box<dyn LocalGame>,
    mut cmd_rx: mpsc::UnboundedReceiver<GameCommand>,
    snapshot_tx: watch::Sender<GameSnapshot>,
    updates_tx: broadcast::Sender<GameSnapshot>,
) {
    let game_name = game.info().name;
    let tick_rate = game.tick_rate().max(1.0);
    let dt = 1.0 / tick_rate;
    let mut interval = tokio::time::interval(Duration::from_secs_f32(dt));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut publisher = Publisher {
        snapshot_tx,
        updates_tx,
        last_state: game.serialize_state(),
    };
    let mut tick: u64 = 0;
    let mut status = game.status();

    tracing::debug!(game = %game_name, tick_rate, "Game loop started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tick += 1;
                let events = game.update(dt);
                for event in &events {
                    tracing::debug!(game = %game_name, tick, ?event, "Game event");
                }
                publisher.publish(&*game, tick, events);
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(GameCommand::Input { data, ack }) => {
                        game.apply_input(&data);
                        let snapshot = publisher
                            .publish(&*game, tick, Vec::new())
                            .unwrap_or_else(|| take_snapshot(&*game, tick, Vec::new()));
                        if let Some(ack) = ack {
                            let _ = ack.send(snapshot);
                        }
                    },
                    Some(GameCommand::Stop) | None => {
                        tracing::debug!(game = %game_name, tick, "Game loop stopping");
                        break;
                    },
                }
            }
        }

        let now = game.status();
        if now != status {
            tracing::info!(game = %game_name, from = ?status, to = ?now, "Game status changed");
            status = now;
        }
    }
}
