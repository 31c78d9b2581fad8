//! Game settings and preferences
//!
//! Loaded from a JSON file; every field has a default so partial files work.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{ConfigError, ConfigResult};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Playfield ===
    /// Canvas width (pixels)
    pub width: f32,
    /// Canvas height (pixels)
    pub height: f32,
    /// Nominal spatial grid cell size (pixels)
    pub grid_size: f32,

    // === Gameplay ===
    /// Glyphs per full-size asteroid
    pub glyph_count: u32,
    /// Score needed per upgrade charge
    pub upgrade_step_score: u64,
    /// Highest usable upgrade level
    pub upgrade_max_level: u32,
    /// Ship bullets in the pool
    pub bullet_pool: usize,
    /// Fixed RNG seed; a random one is drawn when absent
    pub seed: Option<u64>,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            grid_size: GRID_SIZE,

            glyph_count: DEFAULT_GLYPH_COUNT,
            upgrade_step_score: UPGRADE_STEP_SCORE,
            upgrade_max_level: UPGRADE_MAX_LEVEL,
            bullet_pool: BULLET_POOL_SIZE,
            seed: None,

            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }
}

impl Settings {
    /// Parse and validate settings from JSON text
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is missing or bad
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", path.as_ref().display(), e);
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("width", self.width),
            ("height", self.height),
            ("grid_size", self.grid_size),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }
        if self.upgrade_step_score == 0 {
            return Err(ConfigError::Invalid {
                field: "upgrade_step_score",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Glyph count clamped to the supported range
    pub fn glyph_count(&self) -> u32 {
        self.glyph_count.clamp(MIN_GLYPH_COUNT, MAX_GLYPH_COUNT)
    }
}
