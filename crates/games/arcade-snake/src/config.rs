use serde::{Deserialize, Serialize};

/// Data-driven configuration for the snake game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnakeConfig {
    /// Grid width in cells.
    pub width: i32,
    /// Grid height in cells.
    pub height: i32,
    /// Milliseconds between snake steps.
    pub tick_interval_ms: u64,
    /// Points per food eaten.
    pub score_increment: u32,
    /// Starting cell of the head.
    pub start_x: i32,
    pub start_y: i32,
    /// Food position before the first round starts.
    pub initial_food_x: i32,
    pub initial_food_y: i32,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            tick_interval_ms: 100,
            score_increment: 10,
            start_x: 10,
            start_y: 10,
            initial_food_x: 15,
            initial_food_y: 15,
        }
    }
}

impl SnakeConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("ARCADE_SNAKE_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        if let Ok(contents) = std::fs::read_to_string("config/snake.toml")
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        Self::default()
    }

    pub fn tick_interval_secs(&self) -> f32 {
        self.tick_interval_ms.max(1) as f32 / 1000.0
    }
}
