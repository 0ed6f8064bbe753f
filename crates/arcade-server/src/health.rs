use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub catalog: CatalogInfo,
    pub views: ViewInfo,
    pub chat_enabled: bool,
}

#[derive(Serialize)]
pub struct CatalogInfo {
    pub games: usize,
    pub local_games: usize,
}

#[derive(Serialize)]
pub struct ViewInfo {
    pub open: usize,
    pub running_games: usize,
}

/// GET /health: server status, catalog size and open views as JSON.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (open, running_games) = {
        let views = state.views.read().await;
        views.stats()
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        catalog: CatalogInfo {
            games: state.catalog.len(),
            local_games: state.game_registry.available_games(),
        },
        views: ViewInfo {
            open,
            running_games,
        },
        chat_enabled: state.chat.is_enabled(),
    })
}
