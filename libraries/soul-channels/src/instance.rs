//! Instance facade - per-sound control surface
//!
//! Every mutator runs the same gesture-lock guard first: while the manager is
//! locked, transport calls are queued and return [`Outcome::Deferred`];
//! property writes update the stored config right away and queue only the
//! device update and notification.

use crate::error::{Outcome, Rejection};
use crate::events::SoundEventKind;
use crate::lock::LockedCall;
use crate::manager::SoundManager;
use crate::sound::Sound;
use crate::types::{Marker, PlayConfig, SoundConfig, SoundId, SoundKey, SoundState};
use tracing::trace;

/// Mutable handle to one sound instance
///
/// Obtained from [`SoundManager::sound_mut`].
pub struct SoundMut<'a> {
    manager: &'a mut SoundManager,
    id: SoundId,
}

impl<'a> SoundMut<'a> {
    pub(crate) fn new(manager: &'a mut SoundManager, id: SoundId) -> Self {
        Self { manager, id }
    }

    pub fn id(&self) -> SoundId {
        self.id
    }

    // ===== Transport =====

    /// Start playback of the whole sound or of `marker`
    pub fn play(&mut self, marker: Option<&str>, config: PlayConfig) -> Outcome {
        self.manager.play_sound(self.id, marker, config)
    }

    /// Pause playback
    ///
    /// While a delayed start is armed the call returns
    /// `Rejected(Rejection::DelayPending)` and changes nothing; retry once
    /// the start has fired.
    pub fn pause(&mut self) -> Outcome {
        self.manager.pause_sound(self.id)
    }

    pub fn resume(&mut self) -> Outcome {
        self.manager.resume_sound(self.id)
    }

    pub fn stop(&mut self) -> Outcome {
        self.manager.stop_sound(self.id)
    }

    // ===== Properties =====

    pub fn set_mute(&mut self, mute: bool) -> Outcome {
        self.manager.set_property(self.id, LockedCall::SetMute(mute))
    }

    pub fn set_volume(&mut self, volume: f32) -> Outcome {
        self.manager
            .set_property(self.id, LockedCall::SetVolume(volume))
    }

    pub fn set_rate(&mut self, rate: f32) -> Outcome {
        self.manager.set_property(self.id, LockedCall::SetRate(rate))
    }

    /// Detune in cents
    pub fn set_detune(&mut self, detune: f32) -> Outcome {
        self.manager
            .set_property(self.id, LockedCall::SetDetune(detune))
    }

    /// Loop the sound or current marker; never deferred by the lock
    pub fn set_loop(&mut self, looping: bool) {
        self.manager.set_loop(self.id, looping);
    }

    /// Move the position, relative to the marker start (seconds)
    ///
    /// Rejected while a delayed start is armed or while idle. The value is
    /// clamped to `[0, duration]`.
    pub fn set_seek(&mut self, seek: f64) -> Outcome {
        self.manager.set_seek(self.id, seek)
    }

    // ===== Queries =====

    fn read<T: Default>(&self, read: impl FnOnce(&Sound) -> T) -> T {
        self.manager.sound(self.id).map(read).unwrap_or_default()
    }

    pub fn state(&self) -> SoundState {
        self.read(Sound::state)
    }

    /// Position relative to the marker start
    ///
    /// Live handle position while playing, stored position while paused,
    /// 0.0 when idle.
    pub fn seek(&self) -> f64 {
        self.manager.seek_of(self.id)
    }

    pub fn mute(&self) -> bool {
        self.read(Sound::mute)
    }

    pub fn volume(&self) -> f32 {
        self.read(Sound::volume)
    }

    pub fn rate(&self) -> f32 {
        self.read(Sound::rate)
    }

    pub fn detune(&self) -> f32 {
        self.read(Sound::detune)
    }

    pub fn looping(&self) -> bool {
        self.read(Sound::looping)
    }

    pub fn duration(&self) -> f64 {
        self.read(Sound::duration)
    }

    /// Effective rate including global rate and detune
    pub fn total_rate(&self) -> f32 {
        self.read(|sound| sound.base().total_rate())
    }

    pub fn key(&self) -> SoundKey {
        self.read(|sound| sound.key().clone())
    }

    pub fn config(&self) -> SoundConfig {
        self.read(|sound| sound.base().current_config().clone())
    }

    // ===== Markers =====

    pub fn add_marker(&mut self, marker: Marker) -> bool {
        self.manager
            .sounds
            .get_mut(&self.id)
            .is_some_and(|sound| sound.base.add_marker(marker))
    }

    pub fn update_marker(&mut self, marker: Marker) -> bool {
        self.manager
            .sounds
            .get_mut(&self.id)
            .is_some_and(|sound| sound.base.update_marker(marker))
    }

    pub fn remove_marker(&mut self, name: &str) -> Option<Marker> {
        self.manager
            .sounds
            .get_mut(&self.id)
            .and_then(|sound| sound.base.remove_marker(name))
    }

    /// Release the handle, drop queued calls and unregister the instance
    pub fn destroy(self) {
        self.manager.destroy_sound(self.id);
    }
}

impl SoundManager {
    // ===== Lock Guard =====

    /// Queue `call` if locked; returns true when the call was deferred
    fn defer(&mut self, id: SoundId, call: LockedCall) -> bool {
        if !self.locked {
            return false;
        }
        trace!("Deferring {} on {}", call.name(), id);
        let now = self.clock.now_ms();
        self.lock_queue.push(id, call, now);
        true
    }

    // ===== Guarded Entry Points =====

    pub(crate) fn play_sound(
        &mut self,
        id: SoundId,
        marker: Option<&str>,
        config: PlayConfig,
    ) -> Outcome {
        if self.locked {
            let call = LockedCall::Play {
                marker: marker.map(str::to_owned),
                config,
            };
            self.defer(id, call);
            return Outcome::Deferred;
        }
        self.play_unlocked(id, marker, &config)
    }

    pub(crate) fn pause_sound(&mut self, id: SoundId) -> Outcome {
        if self.defer(id, LockedCall::Pause) {
            return Outcome::Deferred;
        }
        self.pause_unlocked(id)
    }

    pub(crate) fn resume_sound(&mut self, id: SoundId) -> Outcome {
        if self.defer(id, LockedCall::Resume) {
            return Outcome::Deferred;
        }
        self.resume_unlocked(id)
    }

    pub(crate) fn stop_sound(&mut self, id: SoundId) -> Outcome {
        if self.defer(id, LockedCall::Stop) {
            return Outcome::Deferred;
        }
        self.stop_unlocked(id)
    }

    /// Store a property write, then sync the handle unless locked
    pub(crate) fn set_property(&mut self, id: SoundId, call: LockedCall) -> Outcome {
        if !self.sounds.contains_key(&id) {
            return Outcome::Rejected(Rejection::InvalidState);
        }
        self.write_property(id, &call);
        if self.defer(id, call.clone()) {
            return Outcome::Deferred;
        }
        self.sync_property(id, &call);
        Outcome::Applied
    }

    // ===== Unlocked Paths =====

    pub(crate) fn play_unlocked(
        &mut self,
        id: SoundId,
        marker: Option<&str>,
        config: &PlayConfig,
    ) -> Outcome {
        let Some(sound) = self.sounds.get_mut(&id) else {
            return Outcome::Rejected(Rejection::InvalidState);
        };
        if let Err(rejection) = sound.base.play(marker, config) {
            return Outcome::Rejected(rejection);
        }
        if !self.pick_and_start(id) {
            return Outcome::Rejected(Rejection::PoolExhausted);
        }
        self.emit(id, SoundEventKind::Play);
        Outcome::Applied
    }

    pub(crate) fn pause_unlocked(&mut self, id: SoundId) -> Outcome {
        let position = self.seek_of(id);
        let Some(sound) = self.sounds.get_mut(&id) else {
            return Outcome::Rejected(Rejection::InvalidState);
        };
        if sound.channel.is_delayed() {
            return Outcome::Rejected(Rejection::DelayPending);
        }
        if let Err(rejection) = sound.base.pause() {
            return Outcome::Rejected(rejection);
        }
        sound.base.current_config_mut().seek = position;
        self.release(id);
        self.emit(id, SoundEventKind::Pause);
        Outcome::Applied
    }

    pub(crate) fn resume_unlocked(&mut self, id: SoundId) -> Outcome {
        let Some(sound) = self.sounds.get_mut(&id) else {
            return Outcome::Rejected(Rejection::InvalidState);
        };
        if sound.channel.is_delayed() {
            return Outcome::Rejected(Rejection::DelayPending);
        }
        if let Err(rejection) = sound.base.resume() {
            return Outcome::Rejected(rejection);
        }
        if !self.pick_and_start(id) {
            return Outcome::Rejected(Rejection::PoolExhausted);
        }
        self.emit(id, SoundEventKind::Resume);
        Outcome::Applied
    }

    pub(crate) fn stop_unlocked(&mut self, id: SoundId) -> Outcome {
        let Some(sound) = self.sounds.get_mut(&id) else {
            return Outcome::Rejected(Rejection::InvalidState);
        };
        if let Err(rejection) = sound.base.stop() {
            return Outcome::Rejected(rejection);
        }
        self.release(id);
        self.emit(id, SoundEventKind::Stop);
        Outcome::Applied
    }

    /// Write and sync a property in one go (lock replay)
    pub(crate) fn apply_property(&mut self, id: SoundId, call: &LockedCall) {
        self.write_property(id, call);
        self.sync_property(id, call);
    }

    fn write_property(&mut self, id: SoundId, call: &LockedCall) {
        let Some(sound) = self.sounds.get_mut(&id) else {
            return;
        };
        match *call {
            LockedCall::SetMute(mute) => sound.base.write_config(|c| c.mute = mute),
            LockedCall::SetVolume(volume) => sound.base.write_config(|c| c.volume = volume),
            LockedCall::SetRate(rate) => sound.base.write_config(|c| c.rate = rate),
            LockedCall::SetDetune(detune) => sound.base.write_config(|c| c.detune = detune),
            _ => {}
        }
    }

    /// Push a stored property to the handle and notify
    fn sync_property(&mut self, id: SoundId, call: &LockedCall) {
        let Some(sound) = self.sounds.get_mut(&id) else {
            return;
        };
        if matches!(call, LockedCall::SetRate(_) | LockedCall::SetDetune(_)) {
            sound
                .base
                .update_rate(self.settings.rate, self.settings.detune);
        }

        if let Some(handle) = sound
            .handle_slot()
            .and_then(|slot| self.cache.get_mut(sound.key())?.handle_mut(slot))
        {
            let config = sound.base.current_config();
            match call {
                LockedCall::SetMute(_) => handle.set_muted(config.mute || self.settings.mute),
                LockedCall::SetVolume(_) => handle.set_volume(config.volume * self.settings.volume),
                LockedCall::SetRate(_) | LockedCall::SetDetune(_) => {
                    handle.set_playback_rate(sound.base.total_rate());
                }
                _ => {}
            }
        }

        let kind = match *call {
            LockedCall::SetMute(mute) => SoundEventKind::Mute(mute),
            LockedCall::SetVolume(volume) => SoundEventKind::Volume(volume),
            LockedCall::SetRate(rate) => SoundEventKind::Rate(rate),
            LockedCall::SetDetune(detune) => SoundEventKind::Detune(detune),
            _ => return,
        };
        self.emit(id, kind);
    }

    pub(crate) fn set_loop(&mut self, id: SoundId, looping: bool) {
        let Some(sound) = self.sounds.get_mut(&id) else {
            return;
        };
        sound.base.write_config(|c| c.looping = looping);
        if let Some(handle) = sound
            .handle_slot()
            .and_then(|slot| self.cache.get_mut(sound.key())?.handle_mut(slot))
        {
            handle.set_looping(looping);
        }
        self.emit(id, SoundEventKind::Loop(looping));
    }

    pub(crate) fn set_seek(&mut self, id: SoundId, seek: f64) -> Outcome {
        let Some(sound) = self.sounds.get_mut(&id) else {
            return Outcome::Rejected(Rejection::InvalidState);
        };
        if sound.channel.is_delayed() {
            return Outcome::Rejected(Rejection::DelayPending);
        }
        if !sound.is_playing() && !sound.is_paused() {
            return Outcome::Rejected(Rejection::InvalidState);
        }

        let seek = seek.clamp(0.0, sound.duration().max(0.0));
        if sound.is_playing() {
            let position = sound.base.marker_start() + seek;
            sound.channel.previous_time = position;
            if let Some(handle) = sound
                .handle_slot()
                .and_then(|slot| self.cache.get_mut(sound.key())?.handle_mut(slot))
            {
                handle.set_current_time(position);
            }
        } else {
            sound.base.current_config_mut().seek = seek;
        }

        self.emit(id, SoundEventKind::Seek(seek));
        Outcome::Applied
    }
}
