pub mod config;
pub mod error;
pub mod panel;
pub mod session;
pub mod sse;

pub use config::GeminiConfig;
pub use error::ChatError;
pub use panel::{ChatPanel, PanelError};
pub use session::{ChatSession, ERROR_NOTICE, GeminiClient};
