//! Playback scheduler - positioning, delayed start and loop/end detection
//!
//! Handles are polled, never trusted to report their own end: each tick the
//! scheduler reads the handle position and compares it against the bounds of
//! the current marker (or the whole asset).

use crate::config::ManagerSettings;
use crate::handle::PlaybackHandle;
use crate::sound::BaseSound;
use tracing::{debug, trace};

/// Scheduling state of one sound on its handle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    pub(crate) slot: Option<usize>,

    /// Clock time (ms) of an armed delayed start; 0.0 when not delayed
    pub(crate) start_time: f64,

    /// Handle position (seconds) seen on the previous tick
    pub(crate) previous_time: f64,
}

impl Channel {
    /// Pool slot of the owned handle
    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn previous_time(&self) -> f64 {
        self.previous_time
    }

    /// A delayed start is armed and has not fired yet
    pub fn is_delayed(&self) -> bool {
        self.start_time > 0.0
    }

    /// Forget the handle and any timing state
    pub(crate) fn clear(&mut self) {
        self.slot = None;
        self.start_time = 0.0;
        self.previous_time = 0.0;
    }
}

/// What a tick observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Delayed start armed, deadline not reached
    Waiting,

    /// Delayed start fired this tick
    Started,

    /// Normal playback progress
    Advanced,

    /// Position wrapped back to the loop start
    Looped,

    /// Non-looping playback reached the end; caller must stop and release
    Ended,
}

/// Push the sound's live config to the handle
///
/// Volume and mute combine with the global values; rate is the derived
/// total rate.
pub fn apply_config(base: &BaseSound, handle: &mut dyn PlaybackHandle, settings: &ManagerSettings) {
    let config = base.current_config();
    handle.set_muted(config.mute || settings.mute);
    handle.set_volume(config.volume * settings.volume);
    handle.set_playback_rate(base.total_rate());
    handle.set_looping(config.looping);
}

/// Position the handle and start it, or arm a delayed start
///
/// Consumes the pending seek and delay of the sound's config.
pub fn start(
    base: &mut BaseSound,
    channel: &mut Channel,
    handle: &mut dyn PlaybackHandle,
    settings: &ManagerSettings,
    now: f64,
) {
    let offset = base.marker_start() + base.current_config().seek;
    let delay = base.current_config().delay;

    channel.previous_time = offset;
    handle.set_current_time(offset);

    base.update_rate(settings.rate, settings.detune);
    apply_config(base, handle, settings);

    if delay <= 0.0 {
        channel.start_time = 0.0;
        if handle.is_paused() {
            handle.play();
        }
    } else {
        channel.start_time = now + delay * 1000.0;
        if !handle.is_paused() {
            handle.pause();
        }
        debug!("Delayed start armed for {:.1} ms", channel.start_time);
    }

    base.reset_config();
}

/// Advance one frame
pub fn tick(
    base: &BaseSound,
    channel: &mut Channel,
    handle: &mut dyn PlaybackHandle,
    settings: &ManagerSettings,
    now: f64,
) -> TickOutcome {
    if channel.start_time > 0.0 {
        if channel.start_time < now - settings.audio_play_delay_ms {
            let overshoot_ms = (now - channel.start_time).max(0.0);
            handle.set_current_time(handle.current_time() + overshoot_ms / 1000.0);
            channel.start_time = 0.0;
            channel.previous_time = handle.current_time();
            handle.play();
            debug!("Delayed start fired {:.1} ms late", overshoot_ms);
            return TickOutcome::Started;
        }
        return TickOutcome::Waiting;
    }

    let start = base.marker_start();
    let end = start + base.duration();
    let mut position = handle.current_time();

    if base.current_config().looping {
        if position >= end - settings.loop_end_offset {
            handle.set_current_time(start + (position - end).max(0.0));
            position = handle.current_time();
        } else if position < start {
            handle.set_current_time(position + start);
            position = handle.current_time();
        }

        let looped = position < channel.previous_time;
        channel.previous_time = position;
        if looped {
            trace!("Loop wrap to {:.3}", position);
            return TickOutcome::Looped;
        }
        return TickOutcome::Advanced;
    }

    if position >= end {
        return TickOutcome::Ended;
    }

    channel.previous_time = position;
    TickOutcome::Advanced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::VirtualHandle;
    use crate::types::{Marker, PlayConfig, SoundConfig};

    fn playing(config: PlayConfig, duration: f64) -> (BaseSound, VirtualHandle) {
        let mut base = BaseSound::new(SoundConfig::default(), duration);
        base.play(None, &config).unwrap();
        (base, VirtualHandle::new(duration))
    }

    #[test]
    fn immediate_start_plays_and_consumes_seek() {
        let settings = ManagerSettings::default();
        let (mut base, handle) = playing(PlayConfig::default().with_seek(1.5), 4.0);
        let mut channel = Channel::default();
        let mut device = handle.clone();

        start(&mut base, &mut channel, &mut device, &settings, 100.0);

        assert!(!handle.is_paused());
        assert_eq!(handle.current_time(), 1.5);
        assert_eq!(channel.start_time, 0.0);
        assert_eq!(channel.previous_time, 1.5);
        assert_eq!(base.current_config().seek, 0.0);
    }

    #[test]
    fn delayed_start_arms_deadline_and_stays_paused() {
        let settings = ManagerSettings::default();
        let (mut base, handle) = playing(PlayConfig::default().with_delay(2.0), 4.0);
        let mut channel = Channel::default();
        let mut device = handle.clone();

        start(&mut base, &mut channel, &mut device, &settings, 1000.0);

        assert!(handle.is_paused());
        assert_eq!(channel.start_time, 3000.0);
        assert!(channel.is_delayed());
        assert_eq!(base.current_config().delay, 0.0);

        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 2000.0),
            TickOutcome::Waiting
        );
        assert!(handle.is_paused());

        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 3050.0),
            TickOutcome::Started
        );
        assert!(!handle.is_paused());
        assert!((handle.current_time() - 0.05).abs() < 1e-9);
        assert_eq!(channel.start_time, 0.0);
    }

    #[test]
    fn delayed_start_waits_for_tolerance_window() {
        let settings = ManagerSettings {
            audio_play_delay_ms: 10.0,
            ..ManagerSettings::default()
        };
        let (mut base, handle) = playing(PlayConfig::default().with_delay(1.0), 4.0);
        let mut channel = Channel::default();
        let mut device = handle.clone();
        start(&mut base, &mut channel, &mut device, &settings, 0.0);

        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 1005.0),
            TickOutcome::Waiting
        );
        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 1011.0),
            TickOutcome::Started
        );
    }

    #[test]
    fn config_combines_with_globals() {
        let settings = ManagerSettings {
            volume: 0.5,
            mute: true,
            rate: 2.0,
            ..ManagerSettings::default()
        };
        let (mut base, handle) = playing(PlayConfig::default().with_volume(0.5).with_loop(true), 4.0);
        let mut channel = Channel::default();
        let mut device = handle.clone();

        start(&mut base, &mut channel, &mut device, &settings, 0.0);

        assert_eq!(handle.volume(), 0.25);
        assert!(handle.muted());
        assert_eq!(handle.playback_rate(), 2.0);
        assert!(handle.looping());
    }

    #[test]
    fn loop_wraps_near_end_once() {
        let settings = ManagerSettings {
            loop_end_offset: 0.1,
            ..ManagerSettings::default()
        };
        let (mut base, handle) = playing(PlayConfig::default().with_loop(true), 5.0);
        let mut channel = Channel::default();
        let mut device = handle.clone();
        start(&mut base, &mut channel, &mut device, &settings, 0.0);

        device.set_current_time(4.0);
        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 16.0),
            TickOutcome::Advanced
        );

        device.set_current_time(4.95);
        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 32.0),
            TickOutcome::Looped
        );
        assert_eq!(handle.current_time(), 0.0);
        assert_eq!(channel.previous_time, 0.0);

        device.set_current_time(0.02);
        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 48.0),
            TickOutcome::Advanced
        );
    }

    #[test]
    fn loop_within_marker_wraps_to_marker_start() {
        let settings = ManagerSettings::default();
        let mut base = BaseSound::new(SoundConfig::default(), 10.0);
        base.add_marker(Marker::new("mid", 2.0, 3.0));
        base.play(Some("mid"), &PlayConfig::default().with_loop(true))
            .unwrap();
        let handle = VirtualHandle::new(10.0);
        let mut device = handle.clone();
        let mut channel = Channel::default();
        start(&mut base, &mut channel, &mut device, &settings, 0.0);
        assert_eq!(handle.current_time(), 2.0);

        device.set_current_time(4.5);
        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 8.0),
            TickOutcome::Advanced
        );

        device.set_current_time(5.2);
        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 16.0),
            TickOutcome::Looped
        );
        assert!((handle.current_time() - 2.2).abs() < 1e-9);
    }

    #[test]
    fn loop_below_marker_start_is_shifted_forward() {
        let settings = ManagerSettings::default();
        let mut base = BaseSound::new(SoundConfig::default(), 10.0);
        base.add_marker(Marker::new("mid", 2.0, 3.0));
        base.play(Some("mid"), &PlayConfig::default().with_loop(true))
            .unwrap();
        let handle = VirtualHandle::new(10.0);
        let mut device = handle.clone();
        let mut channel = Channel::default();
        start(&mut base, &mut channel, &mut device, &settings, 0.0);

        device.set_current_time(0.5);
        tick(&base, &mut channel, &mut device, &settings, 16.0);
        assert_eq!(handle.current_time(), 2.5);
    }

    #[test]
    fn non_looping_reports_end_without_updating_previous() {
        let settings = ManagerSettings::default();
        let (mut base, handle) = playing(PlayConfig::default(), 2.0);
        let mut channel = Channel::default();
        let mut device = handle.clone();
        start(&mut base, &mut channel, &mut device, &settings, 0.0);

        device.set_current_time(1.0);
        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 16.0),
            TickOutcome::Advanced
        );
        assert_eq!(channel.previous_time, 1.0);

        device.set_current_time(2.0);
        assert_eq!(
            tick(&base, &mut channel, &mut device, &settings, 32.0),
            TickOutcome::Ended
        );
        assert_eq!(channel.previous_time, 1.0);
    }

    #[test]
    fn clear_resets_channel() {
        let mut channel = Channel {
            slot: Some(1),
            start_time: 10.0,
            previous_time: 2.0,
        };
        channel.clear();
        assert_eq!(channel, Channel::default());
    }
}
