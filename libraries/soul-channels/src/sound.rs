//! Sound instances and their shared base state
//!
//! [`BaseSound`] holds what every sound has regardless of how it reaches the
//! speakers: config, markers, play/pause flags and the derived total rate.
//! [`Sound`] pairs it with the channel bookkeeping of the handle pool.

use crate::error::Rejection;
use crate::scheduler::Channel;
use crate::types::{Marker, PlayConfig, SoundConfig, SoundId, SoundKey, SoundState};
use std::collections::HashMap;
use tracing::warn;

/// Ratio of one cent
const CENTS_PER_OCTAVE: f32 = 1200.0;

/// Base sound state shared by all playback backends
#[derive(Debug, Clone)]
pub struct BaseSound {
    /// Config used when playing without a marker
    config: SoundConfig,

    /// Live config of the current (or last) playback
    current_config: SoundConfig,

    markers: HashMap<String, Marker>,
    current_marker: Option<Marker>,

    is_playing: bool,
    is_paused: bool,

    /// Length of the current marker, or of the whole asset
    duration: f64,
    total_duration: f64,

    total_rate: f32,
}

impl BaseSound {
    pub fn new(config: SoundConfig, total_duration: f64) -> Self {
        Self {
            current_config: config.clone(),
            config,
            markers: HashMap::new(),
            current_marker: None,
            is_playing: false,
            is_paused: false,
            duration: total_duration,
            total_duration,
            total_rate: 1.0,
        }
    }

    // ===== Base transitions =====

    /// Enter the playing state, selecting the marker and merging overrides
    pub fn play(&mut self, marker: Option<&str>, overrides: &PlayConfig) -> Result<(), Rejection> {
        match marker {
            None => {
                self.current_marker = None;
                self.current_config = self.config.clone();
                self.duration = self.total_duration;
            }
            Some(name) => {
                let Some(marker) = self.markers.get(name) else {
                    warn!("No marker with name '{}' found", name);
                    return Err(Rejection::UnknownMarker);
                };
                self.current_config = marker.config.clone();
                self.duration = marker.duration;
                self.current_marker = Some(marker.clone());
            }
        }

        self.reset_config();
        overrides.apply_to(&mut self.current_config);
        self.is_playing = true;
        self.is_paused = false;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), Rejection> {
        if self.is_paused || !self.is_playing {
            return Err(Rejection::InvalidState);
        }
        self.is_playing = false;
        self.is_paused = true;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), Rejection> {
        if !self.is_paused || self.is_playing {
            return Err(Rejection::InvalidState);
        }
        self.is_playing = true;
        self.is_paused = false;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), Rejection> {
        if !self.is_paused && !self.is_playing {
            return Err(Rejection::InvalidState);
        }
        self.is_playing = false;
        self.is_paused = false;
        self.reset_config();
        Ok(())
    }

    /// Return to idle unconditionally, without a notification
    pub(crate) fn reset(&mut self) {
        self.is_playing = false;
        self.is_paused = false;
        self.reset_config();
    }

    /// Force the paused flags without the transition checks (focus loss)
    pub(crate) fn mark_paused(&mut self) {
        self.is_playing = false;
        self.is_paused = true;
    }

    /// Force the playing flags without the transition checks (focus gain)
    pub(crate) fn mark_playing(&mut self) {
        self.is_playing = true;
        self.is_paused = false;
    }

    /// Clear the one-shot start parameters
    pub fn reset_config(&mut self) {
        self.current_config.seek = 0.0;
        self.current_config.delay = 0.0;
    }

    /// Recompute the effective rate from local and global rate/detune
    pub fn update_rate(&mut self, global_rate: f32, global_detune: f32) -> f32 {
        let detune = self.current_config.detune + global_detune;
        let detune_rate = 2.0_f32.powf(detune / CENTS_PER_OCTAVE);
        self.total_rate = self.current_config.rate * global_rate * detune_rate;
        self.total_rate
    }

    /// Write a config field to the live config and to the config it came from
    ///
    /// Keeps the value for the next playback of the same marker (or of the
    /// whole sound).
    pub fn write_config(&mut self, write: impl Fn(&mut SoundConfig)) {
        write(&mut self.current_config);
        match &self.current_marker {
            Some(current) => {
                if let Some(marker) = self.markers.get_mut(&current.name) {
                    write(&mut marker.config);
                }
            }
            None => write(&mut self.config),
        }
    }

    pub(crate) fn current_config_mut(&mut self) -> &mut SoundConfig {
        &mut self.current_config
    }

    // ===== Markers =====

    /// Register a marker; a non-positive duration extends it to the end of the asset
    pub fn add_marker(&mut self, mut marker: Marker) -> bool {
        if marker.name.is_empty() {
            warn!("Marker needs a name");
            return false;
        }
        if self.markers.contains_key(&marker.name) {
            warn!("Marker '{}' already exists", marker.name);
            return false;
        }
        if marker.duration <= 0.0 {
            marker.duration = (self.total_duration - marker.start).max(0.0);
        }
        self.markers.insert(marker.name.clone(), marker);
        true
    }

    /// Replace an existing marker
    pub fn update_marker(&mut self, marker: Marker) -> bool {
        match self.markers.get_mut(&marker.name) {
            Some(existing) => {
                *existing = marker;
                true
            }
            None => {
                warn!("Marker '{}' does not exist", marker.name);
                false
            }
        }
    }

    pub fn remove_marker(&mut self, name: &str) -> Option<Marker> {
        self.markers.remove(name)
    }

    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.get(name)
    }

    pub fn current_marker(&self) -> Option<&Marker> {
        self.current_marker.as_ref()
    }

    /// Start of the playable region in seconds
    pub fn marker_start(&self) -> f64 {
        self.current_marker.as_ref().map_or(0.0, |marker| marker.start)
    }

    // ===== Queries =====

    pub fn config(&self) -> &SoundConfig {
        &self.config
    }

    pub fn current_config(&self) -> &SoundConfig {
        &self.current_config
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn total_rate(&self) -> f32 {
        self.total_rate
    }

    /// Refresh the asset length once the platform knows it
    pub(crate) fn set_total_duration(&mut self, total_duration: f64) {
        self.total_duration = total_duration;
        if self.current_marker.is_none() {
            self.duration = total_duration;
        }
    }
}

/// A registered sound instance
#[derive(Debug)]
pub struct Sound {
    id: SoundId,
    key: SoundKey,
    pub(crate) base: BaseSound,
    pub(crate) channel: Channel,
    pub(crate) destroy_on_end: bool,
}

impl Sound {
    pub(crate) fn new(id: SoundId, key: SoundKey, config: SoundConfig, total_duration: f64) -> Self {
        Self {
            id,
            key,
            base: BaseSound::new(config, total_duration),
            channel: Channel::default(),
            destroy_on_end: false,
        }
    }

    pub fn id(&self) -> SoundId {
        self.id
    }

    pub fn key(&self) -> &SoundKey {
        &self.key
    }

    pub fn base(&self) -> &BaseSound {
        &self.base
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Pool slot of the handle this sound owns
    pub fn handle_slot(&self) -> Option<usize> {
        self.channel.slot()
    }

    pub fn state(&self) -> SoundState {
        if self.base.is_playing() {
            if self.channel.is_delayed() {
                SoundState::DelayedPending
            } else {
                SoundState::Playing
            }
        } else if self.base.is_paused() {
            SoundState::Paused
        } else {
            SoundState::Idle
        }
    }

    pub fn is_playing(&self) -> bool {
        self.base.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.base.is_paused()
    }

    pub fn mute(&self) -> bool {
        self.base.current_config().mute
    }

    pub fn volume(&self) -> f32 {
        self.base.current_config().volume
    }

    pub fn rate(&self) -> f32 {
        self.base.current_config().rate
    }

    pub fn detune(&self) -> f32 {
        self.base.current_config().detune
    }

    pub fn looping(&self) -> bool {
        self.base.current_config().looping
    }

    pub fn duration(&self) -> f64 {
        self.base.duration()
    }

    /// Destroyed automatically when it ends naturally
    pub fn destroys_on_end(&self) -> bool {
        self.destroy_on_end
    }
}
