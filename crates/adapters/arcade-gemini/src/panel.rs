use arcade_core::chat::{ChatMessage, Role};

use crate::session::{ChatSession, GeminiClient};

/// Shown instead of a greeting when no credential is configured.
pub const DISABLED_NOTICE: &str = "⚠ No API key detected. The sidekick is sleeping; configure an API key to wake it up.";

pub fn greeting(game_title: &str) -> String {
    format!("Hi! I'm the AI sidekick for **{game_title}**. Stuck on something? Ask me!")
}

/// Why a send was refused. Nothing is sent and the transcript is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelError {
    EmptyMessage,
    Disabled,
    Busy,
}

impl std::fmt::Display for PanelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "message is empty"),
            Self::Disabled => write!(f, "chat is disabled: no API key configured"),
            Self::Busy => write!(f, "a reply is still streaming"),
        }
    }
}

impl std::error::Error for PanelError {}

/// Transcript and send state for the sidekick next to one game.
///
/// A send is split in three steps so a host can stream fragments into the
/// panel without holding it borrowed across the network call:
/// [`begin_send`](Self::begin_send) hands the session out,
/// [`apply_chunk`](Self::apply_chunk) is called per fragment, and
/// [`finish_send`](Self::finish_send) gives the session back.
#[derive(Debug)]
pub struct ChatPanel {
    game_title: String,
    messages: Vec<ChatMessage>,
    input: String,
    is_typing: bool,
    enabled: bool,
    session: Option<ChatSession>,
}

impl ChatPanel {
    pub fn new(game_title: &str, session: Option<ChatSession>) -> Self {
        let enabled = session.is_some();
        let first = if enabled {
            ChatMessage::assistant(greeting(game_title))
        } else {
            ChatMessage::assistant(DISABLED_NOTICE)
        };
        Self {
            game_title: game_title.to_string(),
            messages: vec![first],
            input: String::new(),
            is_typing: false,
            enabled,
            session,
        }
    }

    /// Open a panel for `game_title`, enabled only if `client` has a key.
    pub fn open(client: &GeminiClient, game_title: &str) -> Self {
        Self::new(game_title, client.create_session(game_title))
    }

    pub fn game_title(&self) -> &str {
        &self.game_title
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    fn check_ready(&self, text: &str) -> Result<(), PanelError> {
        if !self.enabled {
            return Err(PanelError::Disabled);
        }
        if self.is_typing || self.session.is_none() {
            return Err(PanelError::Busy);
        }
        if text.trim().is_empty() {
            return Err(PanelError::EmptyMessage);
        }
        Ok(())
    }

    /// Record the user's message and an empty in-flight reply, and take the
    /// session for the duration of the send.
    pub fn begin_send(&mut self, text: &str) -> Result<ChatSession, PanelError> {
        self.check_ready(text)?;
        let session = self.session.take().ok_or(PanelError::Busy)?;
        self.messages.push(ChatMessage::user(text));
        self.messages.push(ChatMessage::pending_assistant());
        self.is_typing = true;
        Ok(session)
    }

    /// Append a streamed fragment to the reply being built.
    pub fn apply_chunk(&mut self, chunk: &str) {
        match self.messages.last_mut() {
            Some(last) if last.role == Role::Assistant => {
                last.text.push_str(chunk);
                last.in_flight = false;
            },
            _ => self.messages.push(ChatMessage::assistant(chunk)),
        }
    }

    /// Return the session after its send completed.
    pub fn finish_send(&mut self, session: ChatSession) {
        if let Some(last) = self.messages.last_mut()
            && last.in_flight
        {
            // Stream ended without a single fragment.
            last.in_flight = false;
        }
        self.session = Some(session);
        self.is_typing = false;
    }

    /// Send `text` and stream the reply into the transcript.
    /// Returns the reply text, which ends in the error notice on failure.
    pub async fn send(&mut self, text: &str) -> Result<String, PanelError> {
        let mut session = self.begin_send(text)?;
        let reply = session
            .stream_send(text, |chunk| self.apply_chunk(chunk))
            .await;
        self.finish_send(session);
        Ok(reply)
    }

    /// Send whatever is in the input box. The box is cleared only if the
    /// send is accepted.
    pub async fn submit(&mut self) -> Result<String, PanelError> {
        self.check_ready(&self.input)?;
        let text = std::mem::take(&mut self.input);
        self.send(&text).await
    }
}
