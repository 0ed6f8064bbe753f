use serde::{Deserialize, Serialize};

/// Data-driven configuration for the memory game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of symbol pairs (the deck holds twice as many cards).
    pub pairs: u8,
    /// Seconds both cards stay visible before they are compared.
    pub match_delay_secs: f32,
    /// Extra seconds a mismatched pair stays visible before flipping back.
    pub mismatch_delay_secs: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            pairs: 8,
            match_delay_secs: 0.5,
            mismatch_delay_secs: 0.5,
        }
    }
}

impl MemoryConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("ARCADE_MEMORY_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        if let Ok(contents) = std::fs::read_to_string("config/memory.toml")
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_four_by_four() {
        let cfg = MemoryConfig::default();
        assert_eq!(cfg.pairs as usize * 2, 16);
        assert!((cfg.match_delay_secs + cfg.mismatch_delay_secs - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn parse_toml() {
        let cfg: MemoryConfig = toml::from_str("pairs = 6\nmatch_delay_secs = 0.25").unwrap();
        assert_eq!(cfg.pairs, 6);
        assert!((cfg.match_delay_secs - 0.25).abs() < f32::EPSILON);
        assert!((cfg.mismatch_delay_secs - 0.5).abs() < f32::EPSILON);
    }
}
