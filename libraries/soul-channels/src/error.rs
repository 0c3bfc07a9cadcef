//! Error types for channel pool management

use crate::types::{SoundId, SoundKey};
use thiserror::Error;

/// Channel pool errors
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No playback handles were loaded for the key
    #[error("No audio loaded in cache with key: '{key}'")]
    MissingAudio { key: SoundKey },

    /// A handle list was already registered for the key
    #[error("Audio already cached with key: '{key}'")]
    DuplicateAsset { key: SoundKey },

    /// The sound was destroyed or never existed
    #[error("Unknown sound: {0}")]
    UnknownSound(SoundId),

    /// Platform playback primitive could not be created
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Result type for channel pool operations
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Why a call was refused without changing any state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Base state does not allow the transition (e.g. pausing an idle sound)
    InvalidState,

    /// A delayed start is armed and has not fired yet
    DelayPending,

    /// No free handle and preemption disabled or no eligible victim
    PoolExhausted,

    /// The requested marker does not exist
    UnknownMarker,
}

/// Result of a state-changing call on a sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The call took effect
    Applied,

    /// Playback is gesture-locked; the call was queued for replay
    Deferred,

    /// The call was refused
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }

    pub fn is_deferred(self) -> bool {
        self == Outcome::Deferred
    }

    pub fn is_rejected(self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }
}

impl From<std::result::Result<(), Rejection>> for Outcome {
    fn from(result: std::result::Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => Outcome::Applied,
            Err(rejection) => Outcome::Rejected(rejection),
        }
    }
}
