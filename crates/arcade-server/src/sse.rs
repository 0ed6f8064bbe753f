use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{BroadcastStream, UnboundedReceiverStream};

use crate::api::parse_view_id;
use crate::error::AppError;
use crate::game_loop::GameSnapshot;
use crate::state::AppState;
use crate::views::lock_panel;

fn snapshot_event(snapshot: &GameSnapshot) -> SseEvent {
    let json = serde_json::to_string(snapshot).unwrap_or_default();
    SseEvent::default()
        .event("state")
        .data(json)
        .id(snapshot.tick.to_string())
}

/// GET /api/v1/views/{view_id}/events: the current game state, then every
/// change as it happens.
pub async fn view_events(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    let id = parse_view_id(&view_id)?;
    let (initial, rx) = {
        let mut views = state.views.write().await;
        let entry = views
            .touch(id)
            .ok_or_else(|| AppError::NotFound(format!("View {id} not found")))?;
        let handle = entry.local_game().ok_or_else(|| {
            AppError::Conflict(format!("{} is an external game", entry.game().title))
        })?;
        handle.subscribe()
    };

    let first = tokio_stream::once(Ok::<_, Infallible>(snapshot_event(&initial)));
    let updates = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(snapshot) => Some(Ok(snapshot_event(&snapshot))),
        Err(e) => {
            tracing::warn!(view = %id, "Game SSE receive error: {e}");
            None
        },
    });

    Ok(Sse::new(first.chain(updates)).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub message: String,
}

/// Events on a chat reply stream.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum ChatStreamEvent {
    Chunk { text: String },
    Done { reply: String },
}

impl ChatStreamEvent {
    fn into_sse(self) -> SseEvent {
        let name = match self {
            Self::Chunk { .. } => "chunk",
            Self::Done { .. } => "done",
        };
        let json = serde_json::to_string(&self).unwrap_or_default();
        SseEvent::default().event(name).data(json)
    }
}

/// POST /api/v1/views/{view_id}/chat: send a message to the sidekick and
/// stream the reply as `chunk` events followed by one `done` event.
///
/// The reply keeps streaming into the view's transcript even if the client
/// goes away.
pub async fn chat_stream(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
    Json(body): Json<ChatBody>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    let id = parse_view_id(&view_id)?;
    let max = state.config.limits.max_chat_message_len;
    if body.message.len() > max {
        return Err(AppError::BadRequest(format!(
            "Message too long: {} bytes (max {max})",
            body.message.len()
        )));
    }

    let panel = {
        let mut views = state.views.write().await;
        views
            .touch(id)
            .ok_or_else(|| AppError::NotFound(format!("View {id} not found")))?
            .chat()
    };
    let mut session = lock_panel(&panel).begin_send(&body.message)?;

    let (tx, rx) = mpsc::unbounded_channel::<ChatStreamEvent>();
    let message = body.message;
    tokio::spawn(async move {
        let chunk_panel = Arc::clone(&panel);
        let chunk_tx = tx.clone();
        let reply = session
            .stream_send(&message, move |chunk| {
                lock_panel(&chunk_panel).apply_chunk(chunk);
                let _ = chunk_tx.send(ChatStreamEvent::Chunk {
                    text: chunk.to_string(),
                });
            })
            .await;
        lock_panel(&panel).finish_send(session);
        tracing::debug!(view = %id, chars = reply.len(), "Chat send finished");
        let _ = tx.send(ChatStreamEvent::Done { reply });
    });

    let stream = UnboundedReceiverStream::new(rx).map(|event| Ok(event.into_sse()));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_events_serialize_flat() {
        let chunk = ChatStreamEvent::Chunk {
            text: "hi\nthere".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&chunk).unwrap(),
            r#"{"text":"hi\nthere"}"#
        );
        let done = ChatStreamEvent::Done {
            reply: "ok".to_string(),
        };
        assert_eq!(serde_json::to_string(&done).unwrap(), r#"{"reply":"ok"}"#);
    }
}
