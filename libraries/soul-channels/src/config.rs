//! Manager-wide settings

use serde::{Deserialize, Serialize};

/// Configuration for [`SoundManager`](crate::SoundManager)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    /// Global mute, OR-ed with each sound's mute (default: false)
    pub mute: bool,

    /// Global volume, multiplied into each sound's volume (default: 1.0)
    pub volume: f32,

    /// Global playback rate (default: 1.0)
    pub rate: f32,

    /// Global detune in cents (default: 0.0)
    pub detune: f32,

    /// Steal a handle from another instance of the same key when the pool
    /// is exhausted (default: true)
    #[serde(rename = "override")]
    pub allow_override: bool,

    /// How far past its deadline a delayed start must be before it fires,
    /// in the tick clock's milliseconds (default: 0.1)
    pub audio_play_delay_ms: f64,

    /// Loop wrap happens this many seconds before the loop end (default: 0.05)
    pub loop_end_offset: f64,

    /// Release handles on focus loss and restart them on focus gain (default: true)
    pub pause_on_blur: bool,

    /// Start gesture-locked (default: false)
    pub locked: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            mute: false,
            volume: 1.0,
            rate: 1.0,
            detune: 0.0,
            allow_override: true,
            audio_play_delay_ms: 0.1,
            loop_end_offset: 0.05,
            pause_on_blur: true,
            locked: false,
        }
    }
}
