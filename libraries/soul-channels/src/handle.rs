//! Platform-agnostic playback handle trait
//!
//! A handle is one physical playback channel (an HTML audio element, a mixer
//! voice, ...) with its own position, rate, volume and loop state.

use std::cell::RefCell;
use std::rc::Rc;

/// One physical playback channel
///
/// Implementors are black-box playback primitives. Position is polled, never
/// pushed: the scheduler reads [`current_time`](Self::current_time) once per tick.
pub trait PlaybackHandle {
    /// Start or continue audible playback from the current position
    fn play(&mut self);

    /// Stop audible playback, keeping the current position
    fn pause(&mut self);

    /// Check if playback is paused
    fn is_paused(&self) -> bool;

    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Move the playback position (seconds)
    fn set_current_time(&mut self, seconds: f64);

    /// Natural length of the media in seconds
    ///
    /// May be 0.0 until the platform has loaded the media.
    fn duration(&self) -> f64;

    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32);

    fn muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    fn playback_rate(&self) -> f32;

    fn set_playback_rate(&mut self, rate: f32);

    fn looping(&self) -> bool;

    fn set_looping(&mut self, looping: bool);
}

#[derive(Debug, Clone)]
struct VirtualState {
    duration: f64,
    position: f64,
    paused: bool,
    volume: f32,
    muted: bool,
    rate: f32,
    looping: bool,
    play_count: usize,
}

/// Headless playback handle
///
/// Produces no sound; its position only moves when the host calls
/// [`advance`](Self::advance). Clones share state, so a host can keep a
/// clone after handing the handle to an [`AudioCache`](crate::AudioCache).
#[derive(Debug, Clone)]
pub struct VirtualHandle {
    state: Rc<RefCell<VirtualState>>,
}

impl VirtualHandle {
    /// Create a paused handle for media of the given length
    pub fn new(duration: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(VirtualState {
                duration,
                position: 0.0,
                paused: true,
                volume: 1.0,
                muted: false,
                rate: 1.0,
                looping: false,
                play_count: 0,
            })),
        }
    }

    /// Create `count` independent handles for the same media
    pub fn pool(duration: f64, count: usize) -> Vec<Self> {
        (0..count).map(|_| Self::new(duration)).collect()
    }

    /// Advance playback by `elapsed` seconds of wall time
    ///
    /// Looping handles wrap at the end of media; others stop there and pause.
    pub fn advance(&self, elapsed: f64) {
        let mut state = self.state.borrow_mut();
        if state.paused || elapsed <= 0.0 {
            return;
        }

        state.position += elapsed * f64::from(state.rate);

        if state.position >= state.duration {
            if state.looping && state.duration > 0.0 {
                state.position %= state.duration;
            } else {
                state.position = state.duration;
                state.paused = true;
            }
        }
    }

    /// Change the media length (e.g. once metadata has loaded)
    pub fn set_duration(&self, duration: f64) {
        self.state.borrow_mut().duration = duration;
    }

    /// Number of times `play` was called
    pub fn play_count(&self) -> usize {
        self.state.borrow().play_count
    }

    pub fn boxed(&self) -> Box<dyn PlaybackHandle> {
        Box::new(self.clone())
    }
}

impl PlaybackHandle for VirtualHandle {
    fn play(&mut self) {
        let mut state = self.state.borrow_mut();
        state.paused = false;
        state.play_count += 1;
    }

    fn pause(&mut self) {
        self.state.borrow_mut().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().position
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut state = self.state.borrow_mut();
        state.position = seconds.clamp(0.0, state.duration.max(0.0));
    }

    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    fn volume(&self) -> f32 {
        self.state.borrow().volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.borrow_mut().volume = volume.clamp(0.0, 1.0);
    }

    fn muted(&self) -> bool {
        self.state.borrow().muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.borrow_mut().muted = muted;
    }

    fn playback_rate(&self) -> f32 {
        self.state.borrow().rate
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.state.borrow_mut().rate = rate;
    }

    fn looping(&self) -> bool {
        self.state.borrow().looping
    }

    fn set_looping(&mut self, looping: bool) {
        self.state.borrow_mut().looping = looping;
    }
}
