//! Sound manager - registry of sound instances over shared handle pools
//!
//! The manager owns everything the instances share: the asset cache with its
//! handle pools, global mute/volume/rate/detune, the gesture lock and its
//! queue, the clock, and the notification queue. Instances are addressed by
//! [`SoundId`] and manipulated through [`SoundMut`](crate::SoundMut).

use crate::clock::{Clock, SystemClock};
use crate::config::ManagerSettings;
use crate::error::{ChannelError, Outcome, Result};
use crate::events::{SoundEvent, SoundEventKind};
use crate::handle::PlaybackHandle;
use crate::instance::SoundMut;
use crate::lock::{LockQueue, LockedCall};
use crate::pool::{select_victim, AudioCache, Candidate, HandlePool};
use crate::scheduler::{self, TickOutcome};
use crate::sound::Sound;
use crate::types::{PlayConfig, SoundConfig, SoundId, SoundKey};
use std::collections::BTreeMap;
use tracing::{debug, error, info, trace, warn};

/// Owner of all sound instances and their handle pools
pub struct SoundManager {
    pub(crate) settings: ManagerSettings,
    pub(crate) cache: AudioCache,
    pub(crate) sounds: BTreeMap<SoundId, Sound>,
    pub(crate) lock_queue: LockQueue,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) locked: bool,

    // Instances paused by the last focus loss
    blur_paused: Vec<SoundId>,

    next_id: u64,

    // Event queue for host synchronization
    pending_events: Vec<SoundEvent>,
}

impl SoundManager {
    /// Create a manager timed by the system clock
    pub fn new(settings: ManagerSettings) -> Self {
        Self::with_clock(settings, SystemClock::new())
    }

    /// Create a manager timed by `clock`
    ///
    /// `update` must be given times from the same clock.
    pub fn with_clock(settings: ManagerSettings, clock: impl Clock + 'static) -> Self {
        Self {
            locked: settings.locked,
            settings,
            cache: AudioCache::new(),
            sounds: BTreeMap::new(),
            lock_queue: LockQueue::new(),
            clock: Box::new(clock),
            blur_paused: Vec::new(),
            next_id: 1,
            pending_events: Vec::new(),
        }
    }

    // ===== Assets =====

    /// Register the playback handles of a loaded asset
    pub fn insert_audio(
        &mut self,
        key: impl Into<SoundKey>,
        handles: Vec<Box<dyn PlaybackHandle>>,
    ) -> Result<()> {
        let key = key.into();
        debug!("Caching {} handles for '{}'", handles.len(), key);
        self.cache.insert(key, handles)
    }

    pub fn cache(&self) -> &AudioCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut AudioCache {
        &mut self.cache
    }

    /// Handle pool backing `key`
    pub fn pool(&self, key: &SoundKey) -> Option<&HandlePool> {
        self.cache.get(key)
    }

    // ===== Instances =====

    /// Create a sound instance bound to a cached asset
    ///
    /// Fails with [`ChannelError::MissingAudio`] if the key has no handles.
    pub fn add(&mut self, key: impl Into<SoundKey>, config: SoundConfig) -> Result<SoundId> {
        let key = key.into();
        let total_duration = match self.cache.get(&key) {
            Some(pool) if !pool.is_empty() => pool.duration(),
            _ => {
                error!("No audio loaded in cache with key: '{}'", key);
                return Err(ChannelError::MissingAudio { key });
            }
        };

        let id = SoundId(self.next_id);
        self.next_id += 1;

        let mut sound = Sound::new(id, key, config, total_duration);
        sound
            .base
            .update_rate(self.settings.rate, self.settings.detune);
        debug!("Added {} for '{}'", id, sound.key());
        self.sounds.insert(id, sound);

        Ok(id)
    }

    /// Create an instance, play it, and destroy it once it ends
    ///
    /// A rejected start destroys the instance right away.
    pub fn play_once(
        &mut self,
        key: impl Into<SoundKey>,
        marker: Option<&str>,
        config: PlayConfig,
    ) -> Result<(SoundId, Outcome)> {
        let id = self.add(key, SoundConfig::default())?;
        if let Some(sound) = self.sounds.get_mut(&id) {
            sound.destroy_on_end = true;
        }

        let outcome = self.play_sound(id, marker, config);
        if outcome.is_rejected() {
            self.destroy_sound(id);
        }
        Ok((id, outcome))
    }

    pub fn sound(&self, id: SoundId) -> Option<&Sound> {
        self.sounds.get(&id)
    }

    /// Mutable facade over one instance
    pub fn sound_mut(&mut self, id: SoundId) -> Result<SoundMut<'_>> {
        if !self.sounds.contains_key(&id) {
            return Err(ChannelError::UnknownSound(id));
        }
        Ok(SoundMut::new(self, id))
    }

    /// All instances in creation order
    pub fn sounds(&self) -> impl Iterator<Item = &Sound> {
        self.sounds.values()
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// Destroy an instance; returns false if it did not exist
    pub fn remove(&mut self, id: SoundId) -> bool {
        self.destroy_sound(id)
    }

    /// Instances of `key` that currently own a handle
    pub fn active_instances_for_key<'a>(
        &'a self,
        key: &'a SoundKey,
    ) -> impl Iterator<Item = &'a Sound> + 'a {
        self.sounds
            .values()
            .filter(move |sound| sound.key() == key && sound.handle_slot().is_some())
    }

    // ===== Frame Update =====

    /// Advance every playing instance by one frame
    ///
    /// `now` is in clock milliseconds; positions are polled from the handles,
    /// so `elapsed` only feeds the trace output.
    pub fn update(&mut self, now: f64, elapsed: f64) {
        trace!(now, elapsed, "Sound update");

        let playing: Vec<SoundId> = self
            .sounds
            .values()
            .filter(|sound| sound.is_playing())
            .map(Sound::id)
            .collect();

        for id in playing {
            match self.tick_sound(id, now) {
                Some(TickOutcome::Looped) => {
                    debug!("{} looped", id);
                    self.emit(id, SoundEventKind::Looped);
                }
                Some(TickOutcome::Ended) => self.finish(id),
                _ => {}
            }
        }
    }

    fn tick_sound(&mut self, id: SoundId, now: f64) -> Option<TickOutcome> {
        let sound = self.sounds.get_mut(&id)?;
        let slot = sound.channel.slot?;
        let handle = self.cache.get_mut(sound.key())?.handle_mut(slot)?;
        Some(scheduler::tick(
            &sound.base,
            &mut sound.channel,
            handle,
            &self.settings,
            now,
        ))
    }

    /// Natural end: back to idle, release, notify
    fn finish(&mut self, id: SoundId) {
        let destroy = match self.sounds.get_mut(&id) {
            Some(sound) => {
                sound.base.reset();
                sound.destroy_on_end
            }
            None => return,
        };
        self.release(id);
        debug!("{} ended", id);
        self.emit(id, SoundEventKind::Ended);

        if destroy {
            self.destroy_sound(id);
        }
    }

    // ===== Gesture Lock =====

    /// Defer playback until the next [`unlock`](Self::unlock)
    pub fn lock(&mut self) {
        if !self.locked {
            debug!("Audio locked");
            self.locked = true;
        }
    }

    /// Clear the gesture lock and replay every deferred call in call order
    pub fn unlock(&mut self) {
        if !self.locked {
            return;
        }
        self.locked = false;

        // Platform handles may only know their length after the first gesture
        for sound in self.sounds.values_mut() {
            if let Some(pool) = self.cache.get(sound.key()) {
                sound.base.set_total_duration(pool.duration());
            }
        }

        let actions = self.lock_queue.drain_in_order();
        info!("Audio unlocked, replaying {} queued actions", actions.len());

        for action in actions {
            if !self.sounds.contains_key(&action.sound) {
                continue;
            }
            let id = action.sound;
            match action.call {
                LockedCall::Play { marker, config } => {
                    let outcome = self.play_unlocked(id, marker.as_deref(), &config);
                    let one_shot = self.sounds.get(&id).is_some_and(|sound| sound.destroy_on_end);
                    if outcome.is_rejected() && one_shot {
                        self.destroy_sound(id);
                    }
                }
                LockedCall::Pause => {
                    self.pause_unlocked(id);
                }
                LockedCall::Resume => {
                    self.resume_unlocked(id);
                }
                LockedCall::Stop => {
                    self.stop_unlocked(id);
                }
                property => self.apply_property(id, &property),
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Number of calls waiting for the lock to clear
    pub fn queued_actions(&self) -> usize {
        self.lock_queue.len()
    }

    // ===== Focus =====

    /// Application lost focus: pause and release every playing instance
    ///
    /// Each instance keeps its position and the remaining part of an armed
    /// delay, so [`on_focus`](Self::on_focus) restarts it where it left off.
    pub fn on_blur(&mut self) {
        if !self.settings.pause_on_blur {
            return;
        }
        let now = self.clock.now_ms();

        let playing: Vec<SoundId> = self
            .sounds
            .values()
            .filter(|sound| sound.is_playing())
            .map(Sound::id)
            .collect();

        for &id in &playing {
            let seek = self.seek_of(id);
            if let Some(sound) = self.sounds.get_mut(&id) {
                let delay = ((sound.channel.start_time - now) / 1000.0).max(0.0);
                sound.base.mark_paused();
                let config = sound.base.current_config_mut();
                config.seek = seek;
                config.delay = delay;
            }
            self.release(id);
        }

        info!("Paused {} sounds on blur", playing.len());
        self.blur_paused.extend(playing);
    }

    /// Application regained focus: restart the instances paused by the blur
    pub fn on_focus(&mut self) {
        let paused = std::mem::take(&mut self.blur_paused);
        let mut resumed = 0;

        for id in paused {
            match self.sounds.get_mut(&id) {
                Some(sound) if sound.is_paused() && sound.handle_slot().is_none() => {
                    sound.base.mark_playing();
                }
                _ => continue,
            }
            if self.pick_and_start(id) {
                resumed += 1;
            }
        }

        info!("Resumed {} sounds on focus", resumed);
    }

    // ===== Batch Control =====

    pub fn pause_all(&mut self) {
        for id in self.ids() {
            self.pause_sound(id);
        }
    }

    pub fn resume_all(&mut self) {
        for id in self.ids() {
            self.resume_sound(id);
        }
    }

    pub fn stop_all(&mut self) {
        for id in self.ids() {
            self.stop_sound(id);
        }
    }

    fn ids(&self) -> Vec<SoundId> {
        self.sounds.keys().copied().collect()
    }

    // ===== Global Settings =====

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// Global mute, OR-ed into every held handle
    pub fn set_mute(&mut self, mute: bool) {
        self.settings.mute = mute;
        self.sync_all(|settings, sound, handle| {
            handle.set_muted(sound.mute() || settings.mute);
        });
    }

    /// Global volume, multiplied into every held handle
    pub fn set_volume(&mut self, volume: f32) {
        self.settings.volume = volume;
        self.sync_all(|settings, sound, handle| {
            handle.set_volume(sound.volume() * settings.volume);
        });
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.settings.rate = rate;
        self.refresh_rates();
    }

    pub fn set_detune(&mut self, detune: f32) {
        self.settings.detune = detune;
        self.refresh_rates();
    }

    fn refresh_rates(&mut self) {
        for sound in self.sounds.values_mut() {
            sound
                .base
                .update_rate(self.settings.rate, self.settings.detune);
        }
        self.sync_all(|_, sound, handle| {
            handle.set_playback_rate(sound.base.total_rate());
        });
    }

    fn sync_all(&mut self, sync: impl Fn(&ManagerSettings, &Sound, &mut dyn PlaybackHandle)) {
        for sound in self.sounds.values() {
            let Some(slot) = sound.handle_slot() else {
                continue;
            };
            if let Some(handle) = self
                .cache
                .get_mut(sound.key())
                .and_then(|pool| pool.handle_mut(slot))
            {
                sync(&self.settings, sound, handle);
            }
        }
    }

    // ===== Events =====

    /// Drain all pending notifications
    pub fn drain_events(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending notifications
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    pub(crate) fn emit(&mut self, id: SoundId, kind: SoundEventKind) {
        self.pending_events.push(SoundEvent::new(id, kind));
    }

    // ===== Handle Allocation =====

    /// Bind a handle to `id`, stealing one from another instance if allowed
    pub(crate) fn acquire(&mut self, id: SoundId) -> bool {
        let Some(sound) = self.sounds.get(&id) else {
            return false;
        };
        if sound.handle_slot().is_some() {
            return true;
        }
        let key = sound.key().clone();

        let Some(pool) = self.cache.get_mut(&key) else {
            return false;
        };
        if let Some(slot) = pool.free_slot() {
            pool.claim(slot, id);
            self.bind(id, slot);
            debug!("{} took free handle {} of '{}'", id, slot, key);
            return true;
        }

        if !self.settings.allow_override {
            warn!("No free handle for '{}' and override is disabled", key);
            return false;
        }

        let candidates: Vec<Candidate> = self
            .active_instances_for_key(&key)
            .filter(|other| other.id() != id)
            .map(|other| Candidate {
                id: other.id(),
                looping: other.looping(),
                progress: self.seek_of(other.id()) / other.duration(),
            })
            .collect();

        let Some(victim) = select_victim(&candidates) else {
            warn!("No free handle for '{}' and nothing to preempt", key);
            return false;
        };
        let Some(slot) = self.sounds.get(&victim).and_then(Sound::handle_slot) else {
            return false;
        };

        if let Some(pool) = self.cache.get_mut(&key) {
            pool.transfer(slot, id);
        }
        let destroy_victim = match self.sounds.get_mut(&victim) {
            Some(other) => {
                other.base.reset();
                other.channel.clear();
                other.destroy_on_end
            }
            None => false,
        };
        self.bind(id, slot);
        debug!("{} preempted {} on handle {} of '{}'", id, victim, slot, key);

        // A preempted one-shot can never reach its end
        if destroy_victim {
            self.destroy_sound(victim);
        }
        true
    }

    fn bind(&mut self, id: SoundId, slot: usize) {
        if let Some(sound) = self.sounds.get_mut(&id) {
            sound.channel.slot = Some(slot);
        }
    }

    /// Pause and free the owned handle, clearing all timing state
    pub(crate) fn release(&mut self, id: SoundId) {
        let Some(sound) = self.sounds.get_mut(&id) else {
            return;
        };
        if let Some(slot) = sound.channel.slot {
            if let Some(pool) = self.cache.get_mut(sound.key()) {
                pool.release(slot);
            }
        }
        sound.channel.clear();
    }

    /// Acquire a handle and start on it; resets the instance on failure
    pub(crate) fn pick_and_start(&mut self, id: SoundId) -> bool {
        if !self.acquire(id) {
            if let Some(sound) = self.sounds.get_mut(&id) {
                sound.base.reset();
            }
            return false;
        }

        let now = self.clock.now_ms();
        let Some(sound) = self.sounds.get_mut(&id) else {
            return false;
        };
        let Some(slot) = sound.channel.slot else {
            return false;
        };
        let Some(handle) = self
            .cache
            .get_mut(sound.key())
            .and_then(|pool| pool.handle_mut(slot))
        else {
            return false;
        };
        scheduler::start(
            &mut sound.base,
            &mut sound.channel,
            handle,
            &self.settings,
            now,
        );
        true
    }

    /// Position relative to the marker start
    pub(crate) fn seek_of(&self, id: SoundId) -> f64 {
        let Some(sound) = self.sounds.get(&id) else {
            return 0.0;
        };
        if sound.is_playing() {
            sound
                .handle_slot()
                .and_then(|slot| self.cache.get(sound.key())?.handle(slot))
                .map_or(0.0, |handle| {
                    handle.current_time() - sound.base.marker_start()
                })
        } else if sound.is_paused() {
            sound.base.current_config().seek
        } else {
            0.0
        }
    }

    /// Release, unqueue and drop an instance
    pub(crate) fn destroy_sound(&mut self, id: SoundId) -> bool {
        if !self.sounds.contains_key(&id) {
            return false;
        }
        self.release(id);
        self.lock_queue.purge(id);
        self.blur_paused.retain(|&paused| paused != id);
        self.sounds.remove(&id);
        debug!("Destroyed {}", id);
        true
    }
}
