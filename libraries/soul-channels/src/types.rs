//! Core types for channel pool management

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a cached sound asset
///
/// Used to look up the interchangeable playback handles for the asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundKey(String);

impl SoundKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SoundKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for SoundKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for SoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a sound instance registered with a [`SoundManager`](crate::SoundManager)
///
/// Ids are allocated in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SoundId(pub u64);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

/// Per-sound playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Mute this sound (default: false)
    pub mute: bool,

    /// Volume, multiplied by the manager volume (default: 1.0)
    pub volume: f32,

    /// Playback rate, multiplied by the manager rate (default: 1.0)
    pub rate: f32,

    /// Detune in cents (default: 0.0)
    pub detune: f32,

    /// Start offset in seconds, consumed by the next start (default: 0.0)
    pub seek: f64,

    /// Loop the sound or current marker (default: false)
    #[serde(rename = "loop")]
    pub looping: bool,

    /// Start delay in seconds, consumed by the next start (default: 0.0)
    pub delay: f64,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            mute: false,
            volume: 1.0,
            rate: 1.0,
            detune: 0.0,
            seek: 0.0,
            looping: false,
            delay: 0.0,
        }
    }
}

/// One-shot overrides merged over a sound's config when it starts playing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayConfig {
    pub mute: Option<bool>,
    pub volume: Option<f32>,
    pub rate: Option<f32>,
    pub detune: Option<f32>,
    pub seek: Option<f64>,
    #[serde(rename = "loop")]
    pub looping: Option<bool>,
    pub delay: Option<f64>,
}

impl PlayConfig {
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_seek(mut self, seek: f64) -> Self {
        self.seek = Some(seek);
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = Some(looping);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Overwrite the fields of `config` that are set here
    pub fn apply_to(&self, config: &mut SoundConfig) {
        if let Some(mute) = self.mute {
            config.mute = mute;
        }
        if let Some(volume) = self.volume {
            config.volume = volume;
        }
        if let Some(rate) = self.rate {
            config.rate = rate;
        }
        if let Some(detune) = self.detune {
            config.detune = detune;
        }
        if let Some(seek) = self.seek {
            config.seek = seek;
        }
        if let Some(looping) = self.looping {
            config.looping = looping;
        }
        if let Some(delay) = self.delay {
            config.delay = delay;
        }
    }
}

/// Named sub-range `[start, start + duration)` of an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,

    /// Start position in seconds
    pub start: f64,

    /// Length in seconds
    pub duration: f64,

    /// Config used when playing this marker
    #[serde(default)]
    pub config: SoundConfig,
}

impl Marker {
    pub fn new(name: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            name: name.into(),
            start,
            duration,
            config: SoundConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SoundConfig) -> Self {
        self.config = config;
        self
    }

    /// End position in seconds
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Observable state of a sound instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundState {
    /// Not playing and not paused; no handle held
    #[default]
    Idle,

    /// Audibly playing on a handle
    Playing,

    /// Holding a handle, waiting for its delayed start
    DelayedPending,

    /// Paused mid-sound; handle released
    Paused,
}

impl SoundState {
    /// Playing or waiting for a delayed start
    pub fn is_active(self) -> bool {
        matches!(self, SoundState::Playing | SoundState::DelayedPending)
    }
}
