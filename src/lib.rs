//! Glyph Roids - a toroidal arcade shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spatial grid, collisions, game flow)
//! - `hooks`: Collaborator traits the simulation calls into (render, UI, effects)
//! - `audio`: Sound effect triggers
//! - `scoreboard`: Session-scoped scoreboard and game-over name entry
//! - `settings`: JSON configuration

pub mod audio;
pub mod error;
pub mod hooks;
pub mod scoreboard;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, ConfigResult};
pub use scoreboard::{GameOverScreen, Scoreboard};
pub use settings::Settings;

/// Game configuration constants
///
/// Speeds are in pixels per second, spins in degrees per second and
/// durations in seconds.
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Playfield defaults
    pub const CANVAS_WIDTH: f32 = 800.0;
    pub const CANVAS_HEIGHT: f32 = 600.0;
    /// Spatial partition cell edge in pixels
    pub const GRID_SIZE: f32 = 60.0;

    /// Ship handling
    pub const SHIP_TURN_RATE: f32 = 200.0;
    pub const SHIP_THRUST: f32 = 555.0;
    pub const SHIP_MAX_SPEED: f32 = 266.0;
    /// Per-frame damping applied while above max speed
    pub const SHIP_OVERSPEED_DAMPING: f32 = 0.95;
    pub const SHIP_FIRE_COOLDOWN: f32 = 0.3;
    /// Window after an absorbed hit during which further hits are ignored
    pub const SHIP_HIT_COOLDOWN: f32 = 0.45;
    /// Velocity multiplier applied when a hit is absorbed
    pub const SHIP_KNOCKBACK: f32 = -0.4;

    /// Player bullets
    pub const BULLET_POOL_SIZE: usize = 10;
    pub const BULLET_SPEED: f32 = 266.0;
    pub const BULLET_LIFETIME: f32 = 1.5;
    pub const BULLET_MUZZLE_OFFSET: f32 = 4.0;
    /// Upgrade level at which the ship fires two bullets per shot
    pub const DOUBLE_SHOT_LEVEL: u32 = 2;
    /// Radians between bullets of a multi-shot
    pub const DOUBLE_SHOT_SPREAD: f32 = 0.15;

    /// Asteroids
    pub const ASTEROID_MIN_RADIUS: f32 = 55.0;
    pub const ASTEROID_RADIUS_JITTER: f32 = 20.0;
    pub const ASTEROID_VERTICES: usize = 12;
    pub const ASTEROID_MAX_DRIFT: f32 = 66.0;
    pub const ASTEROID_MAX_SPIN: f32 = 33.0;
    pub const ASTEROID_SCORE: f32 = 120.0;
    /// Scale divisor when an asteroid breaks apart
    pub const ASTEROID_SPLIT_FACTOR: f32 = 3.0;
    /// Fragments are only spawned while their scale stays above this
    pub const ASTEROID_MIN_SCALE: f32 = 1.0 / 12.0;
    pub const ASTEROID_FRAGMENTS: usize = 3;
    pub const FRAGMENT_MAX_DRIFT: f32 = 100.0;
    /// Seconds of drift applied to a fresh fragment so siblings separate
    pub const FRAGMENT_PUSH: f32 = 0.1;
    /// Placement attempts before an asteroid is dropped where it stands
    pub const ASTEROID_PLACEMENT_ATTEMPTS: u32 = 64;
    pub const ASTEROID_GLYPHS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789@#$%&*+=?!";
    pub const DEFAULT_GLYPH_COUNT: u32 = 200;
    pub const MIN_GLYPH_COUNT: u32 = 40;
    pub const MAX_GLYPH_COUNT: u32 = 400;

    /// Waves
    pub const BOOT_ASTEROIDS: u32 = 5;
    pub const START_ASTEROIDS: u32 = 2;
    pub const MAX_ASTEROIDS: u32 = 12;

    /// Enemy saucer
    pub const ENEMY_SPEED: f32 = 50.0;
    pub const ENEMY_DODGE_SPEED: f32 = 33.0;
    /// Chance per frame that an undecided saucer flips its vertical drift
    pub const ENEMY_DRIFT_FLIP_CHANCE: f64 = 0.01;
    /// Distance beyond the playfield edge where the saucer enters and leaves
    pub const ENEMY_MARGIN: f32 = 20.0;
    pub const ENEMY_FIRE_COOLDOWN: f32 = 0.66;
    pub const ENEMY_BULLET_POOL_SIZE: usize = 3;
    pub const ENEMY_BULLET_SPEED: f32 = 200.0;
    pub const ENEMY_SCORE: u64 = 200;
    pub const ENEMY_FIRST_SPAWN_MIN: f32 = 30.0;
    pub const ENEMY_FIRST_SPAWN_JITTER: f32 = 30.0;
    pub const ENEMY_RESPAWN_JITTER: f32 = 30.0;

    /// Explosion effect growth (scale units per second) and final scale
    pub const EXPLOSION_GROWTH: f32 = 33.0;
    pub const EXPLOSION_MAX_SCALE: f32 = 8.0;

    /// Game rules
    pub const START_LIVES: i32 = 2;
    pub const UPGRADE_STEP_SCORE: u64 = 1000;
    pub const UPGRADE_MAX_LEVEL: u32 = 3;

    /// Flow timings
    pub const RESPAWN_DELAY: f32 = 1.0;
    pub const LEVEL_HOLD: f32 = 1.0;
    pub const GAME_OVER_DELAY: f32 = 5.0;
}

/// Wrap a coordinate into `[0, extent)`
#[inline]
pub fn wrap_coord(value: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs
    if wrapped >= extent { 0.0 } else { wrapped }
}

/// Wrap an angle in degrees into `[0, 360)`
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    wrap_coord(angle, 360.0)
}

/// Unit direction for a heading in degrees, where 0 points up the screen
#[inline]
pub fn heading_to_dir(rot_degrees: f32) -> glam::Vec2 {
    let rad = (rot_degrees - 90.0).to_radians();
    glam::Vec2::new(rad.cos(), rad.sin())
}
