use serde::Deserialize;

/// Default hosted endpoint for the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the chat sidekick.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key. Chat is disabled when absent.
    pub api_key: Option<String>,
    /// Model name, e.g. "gemini-2.5-flash".
    pub model: String,
    /// API root; must end with a slash.
    pub base_url: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    /// Apply environment overrides: `GEMINI_API_KEY` (or `API_KEY`),
    /// `ARCADE_GEMINI_MODEL`, `ARCADE_GEMINI_BASE_URL`.
    pub fn apply_env(&mut self) {
        let key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("API_KEY").ok().filter(|k| !k.is_empty()));
        if key.is_some() {
            self.api_key = key;
        }
        if let Ok(model) = std::env::var("ARCADE_GEMINI_MODEL")
            && !model.is_empty()
        {
            self.model = model;
        }
        if let Ok(url) = std::env::var("ARCADE_GEMINI_BASE_URL")
            && !url.is_empty()
        {
            self.base_url = url;
        }
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// The configured key, treating an empty string as missing.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn stream_url(&self) -> String {
        let base = if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        };
        format!("{base}models/{}:streamGenerateContent?alt=sse", self.model)
    }
}
