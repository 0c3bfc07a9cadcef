//! Gesture lock queue
//!
//! Until the platform has seen a user gesture, audio may not start. Calls made
//! during that window are recorded here and replayed, in call order across all
//! sounds, once the lock clears.

use crate::types::{PlayConfig, SoundId};

/// Whether a deferred call was a method or a property write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Method,
    Property,
}

/// A call captured while locked
#[derive(Debug, Clone, PartialEq)]
pub enum LockedCall {
    Play {
        marker: Option<String>,
        config: PlayConfig,
    },
    Pause,
    Resume,
    Stop,
    SetMute(bool),
    SetVolume(f32),
    SetRate(f32),
    SetDetune(f32),
}

impl LockedCall {
    pub fn kind(&self) -> ActionKind {
        match self {
            LockedCall::Play { .. } | LockedCall::Pause | LockedCall::Resume | LockedCall::Stop => {
                ActionKind::Method
            }
            LockedCall::SetMute(_)
            | LockedCall::SetVolume(_)
            | LockedCall::SetRate(_)
            | LockedCall::SetDetune(_) => ActionKind::Property,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LockedCall::Play { .. } => "play",
            LockedCall::Pause => "pause",
            LockedCall::Resume => "resume",
            LockedCall::Stop => "stop",
            LockedCall::SetMute(_) => "mute",
            LockedCall::SetVolume(_) => "volume",
            LockedCall::SetRate(_) => "rate",
            LockedCall::SetDetune(_) => "detune",
        }
    }
}

/// One queued call with its owner and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct LockedAction {
    pub sound: SoundId,
    pub call: LockedCall,
    /// Clock time of the original call, in milliseconds
    pub time: f64,
}

/// Calls waiting for the gesture lock to clear
#[derive(Debug, Default)]
pub struct LockQueue {
    actions: Vec<LockedAction>,
}

impl LockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sound: SoundId, call: LockedCall, time: f64) {
        self.actions.push(LockedAction { sound, call, time });
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Queued calls in insertion order
    pub fn actions(&self) -> &[LockedAction] {
        &self.actions
    }

    /// Drop every call queued by `sound`
    pub fn purge(&mut self, sound: SoundId) {
        self.actions.retain(|action| action.sound != sound);
    }

    /// Take every queued call, oldest first
    ///
    /// The sort is stable, so calls with equal timestamps keep insertion order.
    pub fn drain_in_order(&mut self) -> Vec<LockedAction> {
        let mut actions = std::mem::take(&mut self.actions);
        actions.sort_by(|a, b| a.time.total_cmp(&b.time));
        actions
    }
}
