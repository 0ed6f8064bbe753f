use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;

use crate::config::GeminiConfig;
use crate::error::ChatError;
use crate::sse::{FragmentStream, decode_fragments};

/// Appended to the transcript when a send fails.
pub const ERROR_NOTICE: &str = "\n[Connection error: please check your API key]";

/// Persona for the sidekick, bound to one game.
pub fn system_instruction(game_title: &str) -> String {
    format!(
        "You are an enthusiastic, helpful AI game companion built for the game \"{game_title}\". \
         Chat with the player, give strategy tips when asked, cheer them on, and be fun company. \
         Keep replies short (under 50 words) unless you are explaining complex rules. \
         Be witty and use gaming lingo where it fits."
    )
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

/// One turn of the conversation as the API expects it.
#[derive(Debug, Clone, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: "user",
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }

    fn model(text: &str) -> Self {
        Self {
            role: "model",
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: [PartRef<'a>; 1],
}

#[derive(Debug, Serialize)]
struct PartRef<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<&'a Content>,
}

/// Factory for chat sessions. Cheap to clone.
#[derive(Clone)]
pub struct GeminiClient {
    config: Arc<GeminiConfig>,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .user_agent("arcade-gemini/0.1")
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ChatError::Connection(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.credential().is_some()
    }

    /// A session scoped to `game_title`, or `None` when no credential is
    /// configured. Creating a session never touches the network.
    pub fn create_session(&self, game_title: &str) -> Option<ChatSession> {
        let Some(api_key) = self.config.credential() else {
            tracing::debug!(game_title, "No API key configured, chat disabled");
            return None;
        };
        Some(ChatSession {
            http: self.http.clone(),
            url: self.config.stream_url(),
            api_key: api_key.to_string(),
            system_instruction: system_instruction(game_title),
            history: Vec::new(),
        })
    }
}

/// A conversation bound to one game title and one system instruction.
///
/// At most one send may be outstanding; `&mut self` on `stream_send`
/// enforces that for direct callers.
pub struct ChatSession {
    http: reqwest::Client,
    url: String,
    api_key: String,
    system_instruction: String,
    history: Vec<Content>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("url", &self.url)
            .field("turns", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Completed turns (user and model) kept as context.
    pub fn turns(&self) -> usize {
        self.history.len()
    }

    /// Send `message` with the running history and return its fragments.
    /// The history is not updated; `stream_send` does that on success.
    pub async fn send_stream(&self, message: &str) -> Result<FragmentStream, ChatError> {
        let user = Content::user(message);
        let mut contents: Vec<&Content> = self.history.iter().collect();
        contents.push(&user);
        let body = StreamRequest {
            system_instruction: SystemInstruction {
                parts: [PartRef {
                    text: &self.system_instruction,
                }],
            },
            contents,
        };

        let response = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(decode_fragments(response.bytes_stream()))
    }

    /// Send `message` once, calling `on_chunk` for every fragment in arrival
    /// order. Failures never escape: they are logged and reported through
    /// `on_chunk` as [`ERROR_NOTICE`]. Returns everything delivered.
    pub async fn stream_send<F>(&mut self, message: &str, mut on_chunk: F) -> String
    where
        F: FnMut(&str) + Send,
    {
        let mut delivered = String::new();
        match self.try_stream(message, &mut delivered, &mut on_chunk).await {
            Ok(()) => {
                self.history.push(Content::user(message));
                self.history.push(Content::model(&delivered));
                tracing::debug!(
                    chars = delivered.len(),
                    turns = self.history.len(),
                    "Chat reply complete"
                );
            },
            Err(e) => {
                tracing::warn!(error = %e, "Chat stream failed");
                delivered.push_str(ERROR_NOTICE);
                on_chunk(ERROR_NOTICE);
            },
        }
        delivered
    }

    async fn try_stream<F>(
        &self,
        message: &str,
        delivered: &mut String,
        on_chunk: &mut F,
    ) -> Result<(), ChatError>
    where
        F: FnMut(&str) + Send,
    {
        let mut fragments = self.send_stream(message).await?;
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            delivered.push_str(&fragment);
            on_chunk(&fragment);
        }
        Ok(())
    }
}
