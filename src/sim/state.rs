//! Game-level state: score, lives, wave size and the upgrade ladder
//!
//! Owned by `Game` and passed explicitly to the flow controller and collision
//! reactions.

use serde::{Deserialize, Serialize};

use crate::audio::SoundEffect;
use crate::consts::*;
use crate::settings::Settings;

/// Current state of the game-flow controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    /// Populate decorative asteroids and reset overlays
    Boot,
    /// Idle attract screen, waiting for a start request
    Waiting,
    /// Reset counters and lay out the first wave
    Start,
    /// Ship parked at the center until the area is clear
    SpawnShip,
    /// Active gameplay
    Run,
    /// Wave cleared, transition effect playing
    NewLevel,
    /// Ship destroyed, respawn or game over pending
    PlayerDied,
    /// Game over screen
    EndGame,
}

impl GamePhase {
    /// Phases in which a game is in progress
    pub fn in_game(self) -> bool {
        matches!(
            self,
            GamePhase::SpawnShip | GamePhase::Run | GamePhase::NewLevel | GamePhase::PlayerDied
        )
    }

    /// Whether score/lives HUD should be shown
    pub fn shows_hud(self) -> bool {
        self == GamePhase::Run
    }
}

/// Upgrade charges derived from score
///
/// One charge is earned per `step_score` points with no cap; absorbed hits
/// consume charges. The usable level is the unspent charges clamped to
/// `max_level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeLadder {
    pub level: u32,
    pub hits: u64,
    pub step_score: u64,
    pub max_level: u32,
}

impl UpgradeLadder {
    pub fn new(step_score: u64, max_level: u32) -> Self {
        Self {
            level: 0,
            hits: 0,
            step_score: step_score.max(1),
            max_level,
        }
    }

    #[inline]
    pub fn earned(&self, score: u64) -> u64 {
        score / self.step_score
    }

    /// Recompute the level for `score`; returns true if it went up
    ///
    /// Idempotent for an unchanged score and hit count.
    pub fn recompute(&mut self, score: u64) -> bool {
        let earned = self.earned(score);
        if self.hits > earned {
            self.hits = earned;
        }
        let level = (earned - self.hits).min(self.max_level as u64) as u32;
        let gained = level > self.level;
        self.level = level;
        gained
    }

    /// Spend one charge and settle the level immediately
    pub fn spend_charge(&mut self, score: u64) {
        self.hits += 1;
        self.recompute(score);
    }

    pub fn reset(&mut self) {
        self.level = 0;
        self.hits = 0;
    }
}

/// Score, lives, wave size and upgrades for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub score: u64,
    /// Spare lives; negative once the last ship is lost
    pub lives: i32,
    /// Asteroids per wave
    pub asteroid_count: u32,
    pub upgrade: UpgradeLadder,
}

impl GameState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            score: 0,
            lives: 0,
            asteroid_count: BOOT_ASTEROIDS,
            upgrade: UpgradeLadder::new(settings.upgrade_step_score, settings.upgrade_max_level),
        }
    }

    /// Initial values for a fresh game
    pub fn reset(&mut self) {
        self.score = 0;
        self.lives = START_LIVES;
        self.asteroid_count = START_ASTEROIDS;
        self.upgrade.reset();
    }

    pub fn award(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    /// Grow the wave by one asteroid, up to the cap
    pub fn advance_level(&mut self) {
        self.asteroid_count = (self.asteroid_count + 1).min(MAX_ASTEROIDS);
    }
}

/// Something that happened during a frame, for collaborators and callers
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Sound(SoundEffect),
    Explosion { x: f32, y: f32 },
    UpgradeGained { level: u32 },
    ChargeSpent { level: u32 },
    ShipDestroyed { lives: i32 },
    AsteroidDestroyed { points: u64 },
    EnemyDestroyed { points: u64 },
    LevelCleared,
}
