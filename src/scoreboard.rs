//! Session scoreboard and the game-over name entry screen
//!
//! Nothing here outlives the process; the board is seeded with call-sign
//! placeholders so a first game has something to beat.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::hooks::GameOverUi;

/// Maximum number of entries kept on the board
pub const MAX_ENTRIES: usize = 8;

/// Longest accepted player name
pub const NAME_MAX_LEN: usize = 8;

/// Name used when the player submits nothing
pub const DEFAULT_NAME: &str = "ACE";

const PLACEHOLDER_NAMES: [&str; 8] = [
    "ACE", "NOVA", "VIPER", "ORBIT", "QUASAR", "COMET", "PULSAR", "ZENITH",
];

/// A single scoreboard entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: u64,
    pub name: String,
    pub score: u64,
}

/// Top scores for the current session, highest first
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scoreboard {
    entries: Vec<ScoreEntry>,
    next_id: u64,
    last_added: Option<u64>,
}

impl Scoreboard {
    /// Create empty scoreboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Board filled with placeholder scores descending from 15000
    pub fn with_placeholders(rng: &mut impl Rng) -> Self {
        let mut board = Self::new();
        for (i, name) in PLACEHOLDER_NAMES.iter().enumerate() {
            let score = 15_000 - i as u64 * 300 - rng.random_range(0..200_u64);
            board.push(name.to_string(), score);
        }
        board.entries.sort_by(|a, b| b.score.cmp(&a.score));
        board.last_added = None;
        board
    }

    fn push(&mut self, name: String, score: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(ScoreEntry { id, name, score });
        id
    }

    /// Whether a score would make the board
    pub fn qualifies(&self, score: u64) -> bool {
        self.entries.len() < MAX_ENTRIES || self.entries.last().is_some_and(|e| score > e.score)
    }

    /// Add an entry, returning its 1-indexed rank or None if it fell off
    pub fn add_entry(&mut self, name: &str, score: u64) -> Option<usize> {
        let id = self.push(normalize_name(name), score);
        // Stable sort keeps earlier entries ahead on ties
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_ENTRIES);
        self.last_added = Some(id);
        self.entries.iter().position(|e| e.id == id).map(|i| i + 1)
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    /// The most recently added entry, if it is still on the board
    pub fn last_added(&self) -> Option<&ScoreEntry> {
        let id = self.last_added?;
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trim, upper-case and cap a player name; blank becomes the default
pub fn normalize_name(raw: &str) -> String {
    let name = raw.trim().to_uppercase();
    if name.is_empty() {
        return DEFAULT_NAME.to_string();
    }
    name.chars().take(NAME_MAX_LEN).collect()
}

/// Game-over overlay with name entry
///
/// Ready for restart once a name has been submitted for the finished game.
#[derive(Debug, Clone, Default)]
pub struct GameOverScreen {
    scoreboard: Scoreboard,
    score: u64,
    visible: bool,
    awaiting_restart: bool,
}

impl GameOverScreen {
    pub fn new(scoreboard: Scoreboard) -> Self {
        Self {
            scoreboard,
            ..Default::default()
        }
    }

    /// Record the player's name for the finished game
    ///
    /// Ignored once a name was already submitted or while hidden.
    pub fn submit_name(&mut self, raw: &str) -> Option<usize> {
        if !self.visible || self.awaiting_restart {
            return None;
        }
        let rank = self.scoreboard.add_entry(raw, self.score);
        self.awaiting_restart = true;
        log::info!("Score {} entered, rank {:?}", self.score, rank);
        rank
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn score(&self) -> u64 {
        self.score
    }
}

impl GameOverUi for GameOverScreen {
    fn start(&mut self, score: u64) {
        self.score = score;
        self.visible = true;
        self.awaiting_restart = false;
    }

    fn ready_for_restart(&self) -> bool {
        self.awaiting_restart
    }

    fn hide(&mut self) {
        self.visible = false;
        self.awaiting_restart = false;
    }
}
