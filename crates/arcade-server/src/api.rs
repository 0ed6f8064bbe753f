use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use arcade_core::catalog::{Category, EmbedDescriptor, GameMetadata};

use crate::error::AppError;
use crate::game_loop::GameSnapshot;
use crate::state::AppState;
use crate::views::ViewSnapshot;

/// A catalog entry plus how to mount it.
#[derive(Debug, Serialize)]
pub struct GameEntry {
    #[serde(flatten)]
    pub game: GameMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedDescriptor>,
}

impl From<&GameMetadata> for GameEntry {
    fn from(game: &GameMetadata) -> Self {
        Self {
            game: game.clone(),
            embed: game.embed(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GameQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GameListResponse {
    pub featured: Option<String>,
    pub games: Vec<GameEntry>,
}

/// GET /api/v1/games: catalog listing, optionally filtered.
pub async fn list_games(
    State(state): State<AppState>,
    Query(query): Query<GameQuery>,
) -> Result<Json<GameListResponse>, AppError> {
    let category = match query.category.as_deref().filter(|c| !c.is_empty()) {
        Some(raw) => Some(raw.parse::<Category>().map_err(AppError::BadRequest)?),
        None => None,
    };

    let catalog = &state.catalog;
    let mut games: Vec<&GameMetadata> = match query.q.as_deref() {
        Some(q) => catalog.search(q),
        None => catalog.entries().iter().collect(),
    };
    if let Some(category) = category {
        games.retain(|g| g.category == category);
    }

    Ok(Json(GameListResponse {
        featured: catalog.featured().map(|g| g.id.to_string()),
        games: games.into_iter().map(GameEntry::from).collect(),
    }))
}

/// GET /api/v1/games/{game_id}
pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<GameEntry>, AppError> {
    state
        .catalog
        .get(&game_id)
        .map(|g| Json(GameEntry::from(g)))
        .ok_or_else(|| AppError::NotFound(format!("Game {game_id} not found")))
}

/// POST /api/v1/views/{game_id}: open a view on a catalog entry.
pub async fn open_view(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<(StatusCode, Json<ViewSnapshot>), AppError> {
    let game = state
        .catalog
        .get(&game_id)
        .ok_or_else(|| AppError::NotFound(format!("Game {game_id} not found")))?;

    let mut views = state.views.write().await;
    let id = views.open(
        game,
        &state.game_registry,
        &state.chat,
        state.config.limits.broadcast_capacity,
    )?;
    let snapshot = views
        .get(id)
        .map(|v| v.snapshot(id))
        .ok_or_else(|| AppError::Internal("View vanished after opening".to_string()))?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub(crate) fn parse_view_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("View {raw} not found")))
}

fn view_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("View {id} not found"))
}

/// GET /api/v1/views/{view_id}
pub async fn get_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Json<ViewSnapshot>, AppError> {
    let id = parse_view_id(&view_id)?;
    let mut views = state.views.write().await;
    let entry = views.touch(id).ok_or_else(|| view_not_found(id))?;
    Ok(Json(entry.snapshot(id)))
}

/// DELETE /api/v1/views/{view_id}: stop the game loop and drop the chat.
pub async fn close_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_view_id(&view_id)?;
    let mut views = state.views.write().await;
    if views.close(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(view_not_found(id))
    }
}

/// POST /api/v1/views/{view_id}/input: forward a JSON game input to the
/// view's game loop and return the resulting snapshot.
pub async fn post_input(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Json(input): Json<serde_json::Value>,
) -> Result<Json<GameSnapshot>, AppError> {
    let id = parse_view_id(&view_id)?;
    let data = rmp_serde::to_vec(&input)
        .map_err(|e| AppError::BadRequest(format!("Input not encodable: {e}")))?;
    let max = state.config.limits.max_input_len;
    if data.len() > max {
        return Err(AppError::BadRequest(format!(
            "Input too large: {} bytes (max {max})",
            data.len()
        )));
    }

    let stopped = || AppError::Internal("Game loop stopped".to_string());
    let ack = {
        let mut views = state.views.write().await;
        let entry = views.touch(id).ok_or_else(|| view_not_found(id))?;
        let handle = entry.local_game().ok_or_else(|| {
            AppError::Conflict(format!("{} is an external game", entry.game().title))
        })?;
        handle.request_input(data).ok_or_else(stopped)?
    };

    ack.await.map(Json).map_err(|_| stopped())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_entry_flattens_metadata() {
        let catalog = arcade_core::catalog::GameCatalog::default();
        let entry = GameEntry::from(catalog.get("tetris-3d").unwrap());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], "tetris-3d");
        assert_eq!(json["category"], "3D");
        assert_eq!(json["embed"]["allow_fullscreen"], true);

        let entry = GameEntry::from(catalog.get("snake").unwrap());
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("embed").is_none());
        assert_eq!(json["renderable"]["kind"], "embedded");
    }

    #[test]
    fn bad_view_id_is_not_found() {
        assert!(matches!(
            parse_view_id("nope"),
            Err(AppError::NotFound(_))
        ));
    }
}
