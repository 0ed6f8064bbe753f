use std::sync::Arc;
use tokio::sync::RwLock;

use arcade_core::catalog::GameCatalog;
use arcade_gemini::{ChatError, GeminiClient};

use crate::config::ServerConfig;
use crate::game_loop::LocalGameRegistry;
use crate::views::ViewManager;

pub type SharedViewManager = Arc<RwLock<ViewManager>>;

#[derive(Clone)]
pub struct AppState {
    pub views: SharedViewManager,
    pub catalog: Arc<GameCatalog>,
    pub game_registry: Arc<LocalGameRegistry>,
    pub chat: GeminiClient,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, catalog: GameCatalog) -> Result<Self, ChatError> {
        let chat = GeminiClient::new(config.chat.clone())?;
        Ok(Self {
            views: Arc::new(RwLock::new(ViewManager::new(config.views.max_views))),
            catalog: Arc::new(catalog),
            game_registry: Arc::new(LocalGameRegistry::new()),
            chat,
            config: Arc::new(config),
        })
    }
}
