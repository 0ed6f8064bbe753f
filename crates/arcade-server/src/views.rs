use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use arcade_core::catalog::{EmbedDescriptor, GameMetadata};
use arcade_core::chat::ChatMessage;
use arcade_gemini::{ChatPanel, GeminiClient};

use crate::error::AppError;
use crate::game_loop::{GameHandle, GameSnapshot, LocalGameRegistry, spawn_game};

/// A chat panel shared between HTTP handlers and the task streaming a reply.
/// Never held across an await.
pub type SharedPanel = Arc<Mutex<ChatPanel>>;

pub fn lock_panel(panel: &SharedPanel) -> MutexGuard<'_, ChatPanel> {
    panel.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One open game page: the game's metadata, its local game loop (if any)
/// and the chat panel scoped to it.
pub struct ViewEntry {
    game: GameMetadata,
    local: Option<GameHandle>,
    chat: SharedPanel,
    last_activity: Instant,
}

impl ViewEntry {
    pub fn game(&self) -> &GameMetadata {
        &self.game
    }

    pub fn local_game(&self) -> Option<&GameHandle> {
        self.local.as_ref()
    }

    pub fn chat(&self) -> SharedPanel {
        Arc::clone(&self.chat)
    }

    pub fn snapshot(&self, id: Uuid) -> ViewSnapshot {
        let panel = lock_panel(&self.chat);
        ViewSnapshot {
            view_id: id,
            game: self.game.clone(),
            embed: self.game.embed(),
            local_game: self.local.as_ref().map(GameHandle::snapshot),
            chat: ChatSnapshot {
                enabled: panel.is_enabled(),
                is_typing: panel.is_typing(),
                messages: panel.messages().to_vec(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatSnapshot {
    pub enabled: bool,
    pub is_typing: bool,
    pub messages: Vec<ChatMessage>,
}

/// Everything a client needs to render a view.
#[derive(Debug, Serialize)]
pub struct ViewSnapshot {
    pub view_id: Uuid,
    pub game: GameMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_game: Option<GameSnapshot>,
    pub chat: ChatSnapshot,
}

/// Manages all open views.
pub struct ViewManager {
    views: HashMap<Uuid, ViewEntry>,
    max_views: usize,
}

impl ViewManager {
    pub fn new(max_views: usize) -> Self {
        Self {
            views: HashMap::new(),
            max_views,
        }
    }

    /// Open a view on `game`. Local games get their own tick loop; every view
    /// gets a chat panel, disabled when `chat` has no credential.
    pub fn open(
        &mut self,
        game: &GameMetadata,
        registry: &LocalGameRegistry,
        chat: &GeminiClient,
        broadcast_capacity: usize,
    ) -> Result<Uuid, AppError> {
        if self.views.len() >= self.max_views {
            tracing::warn!(max = self.max_views, "View limit reached");
            return Err(AppError::Unavailable("Too many open views".to_string()));
        }

        let local = match game.local_game() {
            Some(kind) => {
                let instance = registry.create(kind).ok_or_else(|| {
                    AppError::Internal(format!("Local game {kind:?} is not available"))
                })?;
                Some(spawn_game(instance, broadcast_capacity))
            },
            None => None,
        };

        let id = Uuid::new_v4();
        let panel = ChatPanel::open(chat, &game.title);
        self.views.insert(
            id,
            ViewEntry {
                game: game.clone(),
                local,
                chat: Arc::new(Mutex::new(panel)),
                last_activity: Instant::now(),
            },
        );
        tracing::info!(view = %id, game = %game.id, "View opened");
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Option<&ViewEntry> {
        self.views.get(&id)
    }

    /// Touch view activity timestamp (call on any request against it).
    pub fn touch(&mut self, id: Uuid) -> Option<&ViewEntry> {
        let entry = self.views.get_mut(&id)?;
        entry.last_activity = Instant::now();
        Some(entry)
    }

    /// Tear down a view. Its game loop stops and its chat history is dropped.
    pub fn close(&mut self, id: Uuid) -> bool {
        match self.views.remove(&id) {
            Some(entry) => {
                tracing::info!(view = %id, game = %entry.game.id, "View closed");
                true
            },
            None => false,
        }
    }

    /// Remove views that have been idle for longer than `max_idle`.
    /// Returns the number of views removed.
    pub fn cleanup_idle_views(&mut self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.views.len();
        self.views
            .retain(|_, entry| now.duration_since(entry.last_activity) < max_idle);
        before - self.views.len()
    }

    /// (open views, running local games)
    pub fn stats(&self) -> (usize, usize) {
        let running = self
            .views
            .values()
            .filter(|e| e.local.as_ref().is_some_and(GameHandle::is_running))
            .count();
        (self.views.len(), running)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::catalog::GameCatalog;
    use arcade_gemini::GeminiConfig;

    fn chat(api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: api_key.map(str::to_string),
            ..GeminiConfig::default()
        })
        .unwrap()
    }

    fn open(mgr: &mut ViewManager, id: &str) -> Result<Uuid, AppError> {
        let catalog = GameCatalog::default();
        let game = catalog.get(id).unwrap();
        mgr.open(game, &LocalGameRegistry::new(), &chat(None), 8)
    }

    #[tokio::test]
    async fn local_view_runs_a_game() {
        let mut mgr = ViewManager::new(4);
        let id = open(&mut mgr, "tic-tac-toe").unwrap();
        let snap = mgr.get(id).unwrap().snapshot(id);
        assert!(snap.local_game.is_some());
        assert!(snap.embed.is_none());
        assert!(!snap.chat.enabled);
        assert_eq!(snap.chat.messages.len(), 1);
        assert_eq!(mgr.stats(), (1, 1));
    }

    #[tokio::test]
    async fn external_view_has_embed_and_no_game() {
        let mut mgr = ViewManager::new(4);
        let id = open(&mut mgr, "tetris-3d").unwrap();
        let snap = mgr.get(id).unwrap().snapshot(id);
        assert!(snap.local_game.is_none());
        let embed = snap.embed.unwrap();
        assert!(embed.allow_fullscreen);
        assert_eq!(mgr.stats(), (1, 0));
    }

    #[tokio::test]
    async fn chat_enabled_with_credential() {
        let mut mgr = ViewManager::new(4);
        let catalog = GameCatalog::default();
        let game = catalog.get("snake").unwrap();
        let id = mgr
            .open(game, &LocalGameRegistry::new(), &chat(Some("key")), 8)
            .unwrap();
        let snap = mgr.get(id).unwrap().snapshot(id);
        assert!(snap.chat.enabled);
        assert!(snap.chat.messages[0].text.contains(&game.title));
    }

    #[tokio::test]
    async fn view_limit_enforced() {
        let mut mgr = ViewManager::new(1);
        open(&mut mgr, "memory").unwrap();
        assert!(matches!(
            open(&mut mgr, "memory"),
            Err(AppError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn close_removes_view() {
        let mut mgr = ViewManager::new(4);
        let id = open(&mut mgr, "snake").unwrap();
        assert!(mgr.close(id));
        assert!(mgr.get(id).is_none());
        assert!(!mgr.close(id));
        assert!(mgr.is_empty());
    }

    #[tokio::test]
    async fn idle_view_cleanup_removes_stale_views() {
        let mut mgr = ViewManager::new(4);
        let stale = open(&mut mgr, "snake").unwrap();
        let fresh = open(&mut mgr, "memory").unwrap();
        mgr.views.get_mut(&stale).unwrap().last_activity =
            Instant::now() - Duration::from_secs(7200);

        let removed = mgr.cleanup_idle_views(Duration::from_secs(3600));
        assert_eq!(removed, 1);
        assert!(mgr.get(stale).is_none());
        assert!(mgr.get(fresh).is_some());
    }
}
