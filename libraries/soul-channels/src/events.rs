//! Sound Events
//!
//! Notifications emitted after a state change has fully taken effect:
//! - Transport changes (play/pause/resume/stop)
//! - Loop wrap and natural end, detected by the scheduler tick
//! - Property changes (mute/volume/rate/detune/seek/loop)
//!
//! Calls rejected or deferred by the gesture lock emit nothing until they are
//! replayed.

use crate::types::SoundId;
use serde::{Deserialize, Serialize};

/// A notification about one sound instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEvent {
    pub sound: SoundId,
    pub kind: SoundEventKind,
}

impl SoundEvent {
    pub fn new(sound: SoundId, kind: SoundEventKind) -> Self {
        Self { sound, kind }
    }
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum SoundEventKind {
    Play,
    Pause,
    Resume,
    Stop,

    /// Playback wrapped back to the loop start
    Looped,

    /// Non-looping playback reached the end of the sound or marker
    Ended,

    Mute(bool),
    Volume(f32),
    Rate(f32),
    Detune(f32),

    /// New position relative to the marker start, in seconds
    Seek(f64),

    Loop(bool),
}

impl SoundEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            SoundEventKind::Play => "play",
            SoundEventKind::Pause => "pause",
            SoundEventKind::Resume => "resume",
            SoundEventKind::Stop => "stop",
            SoundEventKind::Looped => "looped",
            SoundEventKind::Ended => "ended",
            SoundEventKind::Mute(_) => "mute",
            SoundEventKind::Volume(_) => "volume",
            SoundEventKind::Rate(_) => "rate",
            SoundEventKind::Detune(_) => "detune",
            SoundEventKind::Seek(_) => "seek",
            SoundEventKind::Loop(_) => "loop",
        }
    }
}
