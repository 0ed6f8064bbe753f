pub mod config;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use arcade_core::game_trait::{GameEvent, GameStatus, LocalGame, LocalGameInfo};
use arcade_core::local_game_boilerplate;

use config::MemoryConfig;

/// Icon names for symbol ids, in id order. Decks with more pairs reuse them.
pub const SYMBOLS: [&str; 8] = [
    "zap", "star", "heart", "cloud", "moon", "sun", "anchor", "music",
];

pub fn symbol_name(symbol: u8) -> &'static str {
    SYMBOLS[symbol as usize % SYMBOLS.len()]
}

/// Input from a card click or the reset button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryInput {
    Flip { card: usize },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: usize,
    pub symbol: u8,
    pub face_up: bool,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealPhase {
    /// Two cards are up and will be compared when the timer runs out.
    Comparing,
    /// The pair did not match and flips back when the timer runs out.
    Hiding,
}

/// A running reveal timer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reveal {
    pub phase: RevealPhase,
    pub remaining: f32,
}

/// Serializable deck state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub cards: Vec<Card>,
    /// Face-up, unmatched cards awaiting comparison. Never more than two.
    pub pending: Vec<usize>,
    pub moves: u32,
    pub status: GameStatus,
    pub reveal: Option<Reveal>,
}

/// Memory matching: find all pairs by flipping two cards at a time.
pub struct MemoryGame {
    state: MemoryState,
    config: MemoryConfig,
    rng: StdRng,
}

impl MemoryGame {
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::load())
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic shuffles, for tests and replays.
    pub fn with_seed(config: MemoryConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: MemoryConfig, rng: StdRng) -> Self {
        let mut game = Self {
            state: MemoryState {
                cards: Vec::new(),
                pending: Vec::new(),
                moves: 0,
                status: GameStatus::Idle,
                reveal: None,
            },
            config,
            rng,
        };
        game.initialize();
        game
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    /// Deal a freshly shuffled deck and start playing.
    pub fn initialize(&mut self) {
        let pairs = self.config.pairs.max(1);
        let mut symbols: Vec<u8> = (0..pairs).flat_map(|s| [s, s]).collect();
        symbols.shuffle(&mut self.rng);

        self.state = MemoryState {
            cards: symbols
                .into_iter()
                .enumerate()
                .map(|(id, symbol)| Card {
                    id,
                    symbol,
                    face_up: false,
                    matched: false,
                })
                .collect(),
            pending: Vec::new(),
            moves: 0,
            status: GameStatus::Playing,
            reveal: None,
        };
    }

    /// Turn a card face up. Ignored unless playing, the card is face down and
    /// unmatched, and fewer than two cards are pending.
    pub fn flip(&mut self, card_id: usize) -> bool {
        if self.state.status != GameStatus::Playing || self.state.pending.len() >= 2 {
            return false;
        }
        let Some(card) = self.state.cards.get_mut(card_id) else {
            return false;
        };
        if card.face_up || card.matched {
            return false;
        }

        card.face_up = true;
        self.state.pending.push(card_id);

        if self.state.pending.len() == 2 {
            self.state.moves += 1;
            self.state.reveal = Some(Reveal {
                phase: RevealPhase::Comparing,
                remaining: self.config.match_delay_secs,
            });
        }
        true
    }

    pub fn all_matched(&self) -> bool {
        self.state.cards.iter().all(|c| c.matched)
    }

    /// Compare the pending pair after the match delay.
    fn compare_pending(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let &[first, second] = self.state.pending.as_slice() else {
            self.state.reveal = None;
            return events;
        };

        if self.state.cards[first].symbol == self.state.cards[second].symbol {
            for id in [first, second] {
                let card = &mut self.state.cards[id];
                card.matched = true;
                card.face_up = true;
            }
            self.state.pending.clear();
            self.state.reveal = None;

            // Checked on the updated deck, so the final pair counts.
            if self.all_matched() {
                self.state.status = GameStatus::Victory;
                tracing::debug!(moves = self.state.moves, "Memory game won");
                events.push(GameEvent::StatusChanged {
                    status: GameStatus::Victory,
                });
            }
        } else {
            self.state.reveal = Some(Reveal {
                phase: RevealPhase::Hiding,
                remaining: self.config.mismatch_delay_secs,
            });
        }
        events
    }

    fn hide_pending(&mut self) {
        for id in self.state.pending.drain(..) {
            if let Some(card) = self.state.cards.get_mut(id) {
                card.face_up = false;
            }
        }
        self.state.reveal = None;
    }
}

impl Default for MemoryGame {
    fn default() -> Self {
        Self::with_config(MemoryConfig::default())
    }
}

impl LocalGame for MemoryGame {
    fn info(&self) -> LocalGameInfo {
        LocalGameInfo {
            name: "Memory Match".to_string(),
            description: "Flip two cards at a time. Match every pair in as few moves as you can."
                .to_string(),
        }
    }

    fn tick_rate(&self) -> f32 {
        20.0
    }

    fn reset(&mut self) {
        self.initialize();
    }

    fn apply_input(&mut self, input: &[u8]) {
        match rmp_serde::from_slice::<MemoryInput>(input) {
            Err(e) => {
                tracing::debug!(error = %e, "Dropped malformed memory input");
            },
            Ok(MemoryInput::Flip { card }) => {
                if !self.flip(card) {
                    tracing::trace!(card, "Ignored memory flip");
                }
            },
            Ok(MemoryInput::Reset) => self.reset(),
        }
    }

    fn update(&mut self, dt: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.state.status != GameStatus::Playing {
            return events;
        }

        let mut budget = dt;
        while let Some(reveal) = self.state.reveal {
            if budget < reveal.remaining {
                self.state.reveal = Some(Reveal {
                    remaining: reveal.remaining - budget,
                    ..reveal
                });
                break;
            }
            budget -= reveal.remaining;
            match reveal.phase {
                RevealPhase::Comparing => events.extend(self.compare_pending()),
                RevealPhase::Hiding => self.hide_pending(),
            }
        }
        events
    }

    /// Face-down cards are sent without their symbol.
    fn state_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(&self.state).unwrap_or(serde_json::Value::Null);
        if let Some(cards) = value.get_mut("cards").and_then(|c| c.as_array_mut()) {
            for (json, card) in cards.iter_mut().zip(&self.state.cards) {
                if !card.face_up && !card.matched {
                    json["symbol"] = serde_json::Value::Null;
                }
            }
        }
        value
    }

    local_game_boilerplate!(state_type: MemoryState, custom_state_json);
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::test_helpers::encode_input;
    use proptest::prelude::*;

    fn game() -> MemoryGame {
        MemoryGame::with_seed(MemoryConfig::default(), 42)
    }

    /// Ids of the two cards carrying `symbol`.
    fn pair_of(game: &MemoryGame, symbol: u8) -> (usize, usize) {
        let ids: Vec<usize> = game
            .state
            .cards
            .iter()
            .filter(|c| c.symbol == symbol)
            .map(|c| c.id)
            .collect();
        (ids[0], ids[1])
    }

    /// Two cards with different symbols.
    fn mismatch(game: &MemoryGame) -> (usize, usize) {
        (pair_of(game, 0).0, pair_of(game, 1).0)
    }

    #[test]
    fn every_symbol_appears_exactly_twice() {
        let game = game();
        assert_eq!(game.state.cards.len(), 16);
        for symbol in 0..8 {
            let count = game
                .state
                .cards
                .iter()
                .filter(|c| c.symbol == symbol)
                .count();
            assert_eq!(count, 2, "symbol {symbol}");
        }
        assert_eq!(game.status(), GameStatus::Playing);
        assert_eq!(game.state.moves, 0);
    }

    #[test]
    fn card_ids_match_positions() {
        let game = game();
        for (i, card) in game.state.cards.iter().enumerate() {
            assert_eq!(card.id, i);
        }
    }

    #[test]
    fn second_flip_counts_a_move() {
        let mut game = game();
        let (a, b) = mismatch(&game);
        assert!(game.flip(a));
        assert_eq!(game.state.moves, 0);
        assert!(game.flip(b));
        assert_eq!(game.state.moves, 1);
        assert_eq!(game.state.pending, vec![a, b]);
    }

    #[test]
    fn matching_pair_is_kept_after_delay() {
        let mut game = game();
        let (a, b) = pair_of(&game, 3);
        game.flip(a);
        game.flip(b);

        // Outcome is not visible before the delay elapses.
        game.update(0.25);
        assert!(!game.state.cards[a].matched);
        assert_eq!(game.state.pending.len(), 2);

        game.update(0.25);
        assert!(game.state.cards[a].matched && game.state.cards[b].matched);
        assert!(game.state.cards[a].face_up && game.state.cards[b].face_up);
        assert!(game.state.pending.is_empty());
        assert_eq!(game.status(), GameStatus::Playing);
    }

    #[test]
    fn mismatched_pair_flips_back_after_both_delays() {
        let mut game = game();
        let (a, b) = mismatch(&game);
        game.flip(a);
        game.flip(b);

        game.update(0.5);
        assert!(game.state.cards[a].face_up, "still visible after compare");
        assert_eq!(
            game.state.reveal.map(|r| r.phase),
            Some(RevealPhase::Hiding)
        );

        game.update(0.5);
        assert!(!game.state.cards[a].face_up && !game.state.cards[b].face_up);
        assert!(!game.state.cards[a].matched);
        assert!(game.state.pending.is_empty());
        assert!(game.state.reveal.is_none());
    }

    #[test]
    fn one_long_update_runs_both_phases() {
        let mut game = game();
        let (a, b) = mismatch(&game);
        game.flip(a);
        game.flip(b);
        game.update(2.0);
        assert!(!game.state.cards[a].face_up);
        assert!(game.state.pending.is_empty());
    }

    #[test]
    fn third_flip_while_two_pending_is_noop() {
        let mut game = game();
        let (a, b) = mismatch(&game);
        game.flip(a);
        game.flip(b);
        let third = (0..16).find(|&i| i != a && i != b).unwrap();
        let before = game.state.clone();
        assert!(!game.flip(third));
        assert_eq!(game.state, before);

        // Still rejected during the hide delay.
        game.update(0.5);
        assert!(!game.flip(third));
        assert!(!game.state.cards[third].face_up);
    }

    #[test]
    fn face_up_and_matched_cards_ignore_flips() {
        let mut game = game();
        let (a, b) = pair_of(&game, 0);
        game.flip(a);
        assert!(!game.flip(a), "already face up");
        game.flip(b);
        game.update(0.5);
        assert!(!game.flip(a), "already matched");
        assert!(!game.flip(99), "no such card");
    }

    #[test]
    fn last_pair_wins() {
        let mut game = game();
        // Everything but symbol 7 already matched.
        for card in &mut game.state.cards {
            if card.symbol != 7 {
                card.matched = true;
                card.face_up = true;
            }
        }
        let (a, b) = pair_of(&game, 7);
        game.flip(a);
        game.flip(b);
        assert_eq!(game.status(), GameStatus::Playing);
        let events = game.update(0.5);
        assert_eq!(game.status(), GameStatus::Victory);
        assert_eq!(
            events,
            vec![GameEvent::StatusChanged {
                status: GameStatus::Victory
            }]
        );
    }

    #[test]
    fn clearing_the_board_pair_by_pair_wins() {
        let mut game = game();
        for symbol in 0..8 {
            let (a, b) = pair_of(&game, symbol);
            game.apply_input(&encode_input(&MemoryInput::Flip { card: a }));
            game.apply_input(&encode_input(&MemoryInput::Flip { card: b }));
            assert_eq!(game.status(), GameStatus::Playing);
            game.update(0.5);
        }
        assert_eq!(game.status(), GameStatus::Victory);
        assert_eq!(game.state.moves, 8);
        assert!(game.all_matched());
    }

    #[test]
    fn no_flips_after_victory() {
        let mut game = game();
        for symbol in 0..8 {
            let (a, b) = pair_of(&game, symbol);
            game.flip(a);
            game.flip(b);
            game.update(0.5);
        }
        assert!(!game.flip(0));
    }

    #[test]
    fn reset_discards_running_timer() {
        let mut game = game();
        let (a, b) = mismatch(&game);
        game.flip(a);
        game.flip(b);
        game.apply_input(&encode_input(&MemoryInput::Reset));
        assert!(game.state.reveal.is_none());
        assert!(game.state.pending.is_empty());
        assert_eq!(game.state.moves, 0);
        assert!(game.state.cards.iter().all(|c| !c.face_up));
    }

    #[test]
    fn face_down_symbols_are_hidden() {
        let mut game = game();
        let json = game.state_json();
        let cards = json["cards"].as_array().unwrap();
        assert_eq!(cards.len(), 16);
        assert!(cards.iter().all(|c| c["symbol"].is_null()));

        let (a, b) = pair_of(&game, 2);
        game.flip(a);
        let json = game.state_json();
        assert_eq!(json["cards"][a]["symbol"], 2);
        assert!(json["cards"][b]["symbol"].is_null());

        // Matched cards stay visible, the full state keeps every symbol.
        game.flip(b);
        game.update(0.5);
        let json = game.state_json();
        assert_eq!(json["cards"][a]["symbol"], 2);
        assert_eq!(json["cards"][b]["symbol"], 2);
        let mut restored = MemoryGame::with_seed(MemoryConfig::default(), 1);
        restored.apply_state(&game.serialize_state());
        assert_eq!(restored.state, game.state);
    }

    #[test]
    fn zero_pairs_deals_one_pair() {
        let config = MemoryConfig {
            pairs: 0,
            ..MemoryConfig::default()
        };
        let mut game = MemoryGame::with_seed(config, 9);
        assert_eq!(game.state.cards.len(), 2);
        game.flip(0);
        game.flip(1);
        game.update(0.5);
        assert_eq!(game.status(), GameStatus::Victory);
    }

    #[test]
    fn symbol_names_wrap() {
        assert_eq!(symbol_name(0), "zap");
        assert_eq!(symbol_name(7), "music");
        assert_eq!(symbol_name(8), "zap");
    }

    // ================================================================
    // Local Game Contract Tests
    // ================================================================

    #[test]
    fn contract_reset_starts_playing() {
        arcade_core::test_helpers::contract_reset_starts_playing(&mut game());
    }

    #[test]
    fn contract_garbage_input_ignored() {
        arcade_core::test_helpers::contract_garbage_input_ignored(&mut game());
    }

    #[test]
    fn contract_truncated_state_ignored() {
        arcade_core::test_helpers::contract_truncated_state_ignored(&mut game());
    }

    #[test]
    fn contract_state_roundtrip_preserves() {
        let mut game = game();
        game.flip(0);
        arcade_core::test_helpers::contract_state_roundtrip_preserves(&mut game);
    }

    #[test]
    fn contract_state_json_reports_status() {
        arcade_core::test_helpers::contract_state_json_reports_status(&game());
    }

    #[test]
    fn contract_finished_game_is_frozen() {
        let mut game = game();
        for symbol in 0..8 {
            let (a, b) = pair_of(&game, symbol);
            game.flip(a);
            game.flip(b);
            game.update(0.5);
        }
        arcade_core::test_helpers::contract_finished_game_is_frozen(&mut game);
    }

    proptest! {
        #[test]
        fn shuffle_always_deals_pairs(seed in any::<u64>(), pairs in 1u8..16) {
            let config = MemoryConfig { pairs, ..MemoryConfig::default() };
            let game = MemoryGame::with_seed(config, seed);
            prop_assert_eq!(game.state.cards.len(), pairs as usize * 2);
            for symbol in 0..pairs {
                let count = game.state.cards.iter().filter(|c| c.symbol == symbol).count();
                prop_assert_eq!(count, 2);
            }
        }

        #[test]
        fn never_more_than_two_pending(clicks in proptest::collection::vec((0usize..16, 0u8..3), 0..60)) {
            let mut game = game();
            for (card, wait) in clicks {
                game.flip(card);
                prop_assert!(game.state.pending.len() <= 2);
                game.update(wait as f32 * 0.3);
                let up_unmatched = game.state.cards.iter().filter(|c| c.face_up && !c.matched).count();
                prop_assert!(up_unmatched <= 2);
            }
        }
    }
}
