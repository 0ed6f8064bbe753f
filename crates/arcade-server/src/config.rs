use serde::Deserialize;

use arcade_gemini::GeminiConfig;

/// Top-level server configuration, loaded from `arcade.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub limits: LimitsConfig,
    pub views: ViewsConfig,
    pub chat: GeminiConfig,
    /// Whether the chat key in use was read from the config file rather than
    /// the environment.
    #[serde(skip)]
    pub api_key_from_file: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            limits: LimitsConfig::default(),
            views: ViewsConfig::default(),
            chat: GeminiConfig::default(),
            api_key_from_file: false,
        }
    }
}

/// Buffer sizes and request caps.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Snapshots buffered per game broadcast channel before slow
    /// subscribers start lagging.
    pub broadcast_capacity: usize,
    /// Longest chat message accepted, in bytes.
    pub max_chat_message_len: usize,
    /// Longest serialized game input accepted, in bytes.
    pub max_input_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
            max_chat_message_len: 4000,
            max_input_len: 1024,
        }
    }
}

/// View lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub max_views: usize,
    pub idle_timeout_secs: u64,
    pub idle_check_interval_secs: u64,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            max_views: 256,
            idle_timeout_secs: 1800,
            idle_check_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Validate configuration. Fatal problems are logged and exit the process.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.api_key_from_file {
            tracing::warn!(
                "chat.api_key is set in config file; use the GEMINI_API_KEY env var in production"
            );
        }
        if self.chat.credential().is_none() {
            tracing::info!("No chat API key configured, the sidekick will be disabled");
        }
        if self.chat.model.is_empty() {
            tracing::error!("chat.model must not be empty");
            std::process::exit(1);
        }

        if self.limits.broadcast_capacity == 0 {
            tracing::error!("limits.broadcast_capacity must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_chat_message_len == 0 {
            tracing::error!("limits.max_chat_message_len must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_input_len == 0 {
            tracing::error!("limits.max_input_len must be > 0");
            std::process::exit(1);
        }

        if self.views.max_views == 0 {
            tracing::error!("views.max_views must be > 0");
            std::process::exit(1);
        }
        if self.views.idle_timeout_secs == 0 {
            tracing::error!("views.idle_timeout_secs must be > 0");
            std::process::exit(1);
        }
        if self.views.idle_check_interval_secs == 0 {
            tracing::error!("views.idle_check_interval_secs must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `arcade.toml` (or the file named by `ARCADE_CONFIG`)
    /// if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let path = std::env::var("ARCADE_CONFIG").unwrap_or_else(|_| "arcade.toml".to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path, "Failed to parse config: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path, "No config file found, using defaults");
                ServerConfig::default()
            },
        };

        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        let file_key = self.chat.api_key.clone();
        if let Ok(addr) = std::env::var("ARCADE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Ok(root) = std::env::var("ARCADE_WEB_ROOT")
            && !root.is_empty()
        {
            self.web_root = root;
        }
        if let Ok(val) = std::env::var("ARCADE_MAX_VIEWS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.views.max_views = n;
        }
        if let Ok(val) = std::env::var("ARCADE_VIEW_IDLE_TIMEOUT")
            && let Ok(n) = val.parse::<u64>()
        {
            self.views.idle_timeout_secs = n;
        }
        self.chat.apply_env();
        self.api_key_from_file =
            key_unchanged_by_env(file_key.as_deref(), self.chat.api_key.as_deref());
    }
}

/// True when the file supplied a key and the environment did not replace it.
fn key_unchanged_by_env(file_key: Option<&str>, effective: Option<&str>) -> bool {
    file_key.is_some_and(|k| !k.trim().is_empty()) && file_key == effective
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
        assert_eq!(cfg.web_root, "web");
        assert!(cfg.chat.api_key.is_none());
        assert_eq!(cfg.views.idle_timeout_secs, 1800);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
listen_addr = "127.0.0.1:9090"
web_root = "/var/www"

[chat]
model = "gemini-2.0-flash"
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9090");
        assert_eq!(cfg.web_root, "/var/www");
        assert_eq!(cfg.chat.model, "gemini-2.0-flash");
        // Unlisted chat fields keep their defaults.
        assert_eq!(cfg.chat.timeout_secs, 60);
    }

    #[test]
    fn validate_accepts_valid_config() {
        let cfg = ServerConfig::default();
        cfg.validate();
    }

    #[test]
    fn validate_rejects_invalid_addr() {
        let cfg = ServerConfig {
            listen_addr: "not-an-address".to_string(),
            ..ServerConfig::default()
        };
        // validate() calls process::exit, so we test the underlying check
        assert!(cfg.listen_addr.parse::<std::net::SocketAddr>().is_err());
    }

    #[test]
    fn env_only_key_is_not_a_file_key() {
        // Whatever GEMINI_API_KEY / API_KEY hold, a config without a file
        // key never reports one.
        let mut cfg = ServerConfig::default();
        cfg.apply_env();
        assert!(!cfg.api_key_from_file);

        let cfg = ServerConfig {
            chat: GeminiConfig {
                api_key: Some("from-test".to_string()),
                ..GeminiConfig::default()
            },
            ..ServerConfig::default()
        };
        assert!(!cfg.api_key_from_file);
    }

    #[test]
    fn file_key_tracking() {
        assert!(key_unchanged_by_env(Some("k"), Some("k")));
        assert!(!key_unchanged_by_env(Some("k"), Some("env-key")));
        assert!(!key_unchanged_by_env(None, Some("env-key")));
        assert!(!key_unchanged_by_env(Some(" "), Some(" ")));
        assert!(!key_unchanged_by_env(None, None));
    }

    #[test]
    fn api_key_from_file_is_not_deserialized() {
        let cfg: ServerConfig = toml::from_str("api_key_from_file = true").unwrap();
        assert!(!cfg.api_key_from_file);
    }

    #[test]
    fn parse_limits_and_views_toml() {
        let toml_str = r#"
[limits]
broadcast_capacity = 16
max_chat_message_len = 500

[views]
max_views = 8
idle_timeout_secs = 120
idle_check_interval_secs = 10
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.limits.broadcast_capacity, 16);
        assert_eq!(cfg.limits.max_chat_message_len, 500);
        assert_eq!(cfg.limits.max_input_len, 1024);
        assert_eq!(cfg.views.max_views, 8);
        assert_eq!(cfg.views.idle_timeout_secs, 120);
        assert_eq!(cfg.views.idle_check_interval_secs, 10);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: ServerConfig = toml::from_str("listen_addr = \"0.0.0.0:8080\"").unwrap();
        assert_eq!(cfg.views.max_views, 256);
        assert_eq!(cfg.limits.broadcast_capacity, 64);
    }
}
