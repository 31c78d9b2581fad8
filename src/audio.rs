//! Sound effect triggers
//!
//! The simulation only names effects; an `AudioSink` decides what to do with
//! them. `AudioManager` is the stock sink: volume and mute handling plus a log
//! line and a play count per effect.

use serde::{Deserialize, Serialize};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEffect {
    /// A bullet leaves the ship or the enemy
    Laser,
    /// Destructive collision or upgrade gained
    Explosion,
}

impl SoundEffect {
    pub const ALL: [SoundEffect; 2] = [SoundEffect::Laser, SoundEffect::Explosion];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundEffect::Laser => "laser",
            SoundEffect::Explosion => "explosion",
        }
    }

    fn slot(self) -> usize {
        match self {
            SoundEffect::Laser => 0,
            SoundEffect::Explosion => 1,
        }
    }
}

/// Anything that can be asked to play an effect
pub trait AudioSink {
    fn play(&mut self, effect: SoundEffect);
}

/// Audio manager for the game
#[derive(Debug, Clone)]
pub struct AudioManager {
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
    played: [u64; SoundEffect::ALL.len()],
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            played: [0; SoundEffect::ALL.len()],
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        log::info!("Audio {}", if muted { "muted" } else { "unmuted" });
    }

    pub fn toggle_mute(&mut self) {
        self.set_muted(!self.muted);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// How many times an effect actually played
    pub fn played(&self, effect: SoundEffect) -> u64 {
        self.played[effect.slot()]
    }
}

impl AudioSink for AudioManager {
    fn play(&mut self, effect: SoundEffect) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        self.played[effect.slot()] += 1;
        log::trace!("play {} at {:.2}", effect.as_str(), vol);
    }
}
