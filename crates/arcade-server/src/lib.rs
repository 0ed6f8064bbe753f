pub mod api;
pub mod config;
pub mod error;
pub mod game_loop;
pub mod health;
pub mod sse;
pub mod state;
pub mod views;

use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::services::ServeDir;

use arcade_core::catalog::GameCatalog;
use arcade_gemini::ChatError;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config and catalog.
pub fn build_app(
    config: ServerConfig,
    catalog: GameCatalog,
) -> Result<(Router<()>, AppState), ChatError> {
    let web_root = config.web_root.clone();
    let state = AppState::new(config, catalog)?;

    let api_routes = Router::new()
        .route("/games", get(api::list_games))
        .route("/games/{id}", get(api::get_game))
        // POST takes a game id, GET/DELETE a view id.
        .route(
            "/views/{id}",
            post(api::open_view)
                .get(api::get_view)
                .delete(api::close_view),
        )
        .route("/views/{id}/input", post(api::post_input))
        .route("/views/{id}/events", get(sse::view_events))
        .route("/views/{id}/chat", post(sse::chat_stream));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes)
        .fallback_service(ServeDir::new(&web_root))
        .with_state(state.clone());

    Ok((app, state))
}

/// Background task that closes views nobody has touched for
/// `views.idle_timeout_secs`.
pub fn spawn_view_reaper(state: AppState) -> tokio::task::JoinHandle<()> {
    let max_idle = Duration::from_secs(state.config.views.idle_timeout_secs);
    let period = Duration::from_secs(state.config.views.idle_check_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let removed = state.views.write().await.cleanup_idle_views(max_idle);
            if removed > 0 {
                tracing::info!(removed, "Reaped idle views");
            }
        }
    })
}
