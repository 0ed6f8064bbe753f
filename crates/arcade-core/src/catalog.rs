use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Unique identifier for a catalog entry (also the URL slug of its view).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Closed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Puzzle,
    Action,
    Strategy,
    Classic,
    Roguelike,
    #[serde(rename = "3D")]
    ThreeD,
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "puzzle" => Ok(Self::Puzzle),
            "action" => Ok(Self::Action),
            "strategy" => Ok(Self::Strategy),
            "classic" => Ok(Self::Classic),
            "roguelike" => Ok(Self::Roguelike),
            "3d" => Ok(Self::ThreeD),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// The local games this host can run in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalGameKind {
    TicTacToe,
    Snake,
    Memory,
}

/// How a catalog entry is shown: hosted locally, or loaded in an isolated frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Renderable {
    Embedded { game: LocalGameKind },
    External { url: String },
}

/// Frame permissions granted to external games.
pub const EXTERNAL_FRAME_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture";

/// What a client needs to mount an external game in a sandboxed frame.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedDescriptor {
    pub src: String,
    pub title: String,
    pub allow: &'static str,
    pub allow_fullscreen: bool,
}

/// Static descriptor of one playable game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub id: GameId,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub category: Category,
    pub renderable: Renderable,
}

impl GameMetadata {
    pub fn local_game(&self) -> Option<LocalGameKind> {
        match self.renderable {
            Renderable::Embedded { game } => Some(game),
            Renderable::External { .. } => None,
        }
    }

    pub fn embed(&self) -> Option<EmbedDescriptor> {
        match &self.renderable {
            Renderable::External { url } => Some(EmbedDescriptor {
                src: url.clone(),
                title: self.title.clone(),
                allow: EXTERNAL_FRAME_ALLOW,
                allow_fullscreen: true,
            }),
            Renderable::Embedded { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    games: Vec<GameMetadata>,
}

/// Read-only list of games, in display order. The first entry is featured.
#[derive(Debug, Clone)]
pub struct GameCatalog {
    entries: Vec<GameMetadata>,
}

impl GameCatalog {
    /// Build a catalog, dropping entries whose id was already used.
    pub fn new(entries: Vec<GameMetadata>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|e| {
                let fresh = seen.insert(e.id.clone());
                if !fresh {
                    tracing::warn!(id = %e.id, "Duplicate catalog id, ignoring entry");
                }
                fresh
            })
            .collect();
        Self { entries }
    }

    /// Parse a catalog from TOML (`[[games]]` tables).
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        let file: CatalogFile = toml::from_str(contents)?;
        Ok(Self::new(file.games))
    }

    /// Load from `ARCADE_CATALOG` or `catalog.toml`, falling back to the built-in list.
    pub fn load() -> Self {
        let path = std::env::var("ARCADE_CATALOG").unwrap_or_else(|_| "catalog.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(contents) => match Self::from_toml(&contents) {
                Ok(catalog) => {
                    tracing::info!(path, games = catalog.len(), "Loaded game catalog");
                    catalog
                },
                Err(e) => {
                    tracing::warn!(path, "Failed to parse catalog: {e}, using built-in games");
                    Self::default()
                },
            },
            Err(_) => {
                tracing::info!(path, "No catalog file found, using built-in games");
                Self::default()
            },
        }
    }

    pub fn get(&self, id: &str) -> Option<&GameMetadata> {
        self.entries.iter().find(|e| e.id.as_str() == id)
    }

    pub fn entries(&self) -> &[GameMetadata] {
        &self.entries
    }

    pub fn featured(&self) -> Option<&GameMetadata> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_category(&self, category: Category) -> Vec<&GameMetadata> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Case-insensitive match against title and description.
    pub fn search(&self, query: &str) -> Vec<&GameMetadata> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|e| {
                e.title.to_lowercase().contains(&needle)
                    || e.description.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

fn external(
    id: &str,
    title: &str,
    description: &str,
    category: Category,
    thumbnail: &str,
    url: &str,
) -> GameMetadata {
    GameMetadata {
        id: GameId::from(id),
        title: title.to_string(),
        description: description.to_string(),
        thumbnail: thumbnail.to_string(),
        category,
        renderable: Renderable::External {
            url: url.to_string(),
        },
    }
}

fn embedded(
    id: &str,
    title: &str,
    description: &str,
    category: Category,
    thumbnail: &str,
    game: LocalGameKind,
) -> GameMetadata {
    GameMetadata {
        id: GameId::from(id),
        title: title.to_string(),
        description: description.to_string(),
        thumbnail: thumbnail.to_string(),
        category,
        renderable: Renderable::Embedded { game },
    }
}

impl Default for GameCatalog {
    fn default() -> Self {
        Self::new(vec![
            external(
                "roguelike-survivor",
                "Roguelike Survivor",
                "Survive endless monster waves! Level up your skills and beat powerful foes.",
                Category::Roguelike,
                "https://images.unsplash.com/photo-1519074069444-1ba4fff66d16?auto=format&fit=crop&q=80&w=600",
                "https://huckhuck12.github.io/roguelike_survivor/",
            ),
            external(
                "sheep-match",
                "Sheep Match",
                "A brutally hard tile-matching game. Tests your eye and your planning.",
                Category::Puzzle,
                "https://images.unsplash.com/photo-1516467508483-a7212febe31a?auto=format&fit=crop&q=80&w=600",
                "https://huckhuck12.github.io/sheep_match/",
            ),
            external(
                "tetris-3d",
                "Tetris 3D",
                "Classic falling blocks, evolved into three dimensions.",
                Category::ThreeD,
                "https://images.unsplash.com/photo-1605218427306-022ba8c290b8?auto=format&fit=crop&q=80&w=600",
                "https://huckhuck12.github.io/tetris-3d/",
            ),
            external(
                "jumpjump-h5",
                "Jump Jump 3D",
                "Hold to charge, release to jump. How far can you go?",
                Category::ThreeD,
                "https://images.unsplash.com/photo-1473445730015-841f29a9490b?auto=format&fit=crop&q=80&w=600",
                "https://huckhuck12.github.io/jumpjump-h5/",
            ),
            embedded(
                "tic-tac-toe",
                "Tic-Tac-Toe",
                "Three in a row wins. Pass the keyboard to a friend.",
                Category::Classic,
                "/thumbnails/tic-tac-toe.png",
                LocalGameKind::TicTacToe,
            ),
            embedded(
                "snake",
                "Snake",
                "Eat, grow, and don't bite your own tail.",
                Category::Action,
                "/thumbnails/snake.png",
                LocalGameKind::Snake,
            ),
            embedded(
                "memory",
                "Memory Match",
                "Flip cards two at a time and find every pair.",
                Category::Puzzle,
                "/thumbnails/memory.png",
                LocalGameKind::Memory,
            ),
        ])
    }
}
