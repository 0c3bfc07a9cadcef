//! Soul Player - Sound Channel Pools
//!
//! Multiplexes many logical sound instances onto a small, fixed pool of
//! interchangeable playback handles per asset.
//!
//! This crate provides:
//! - Per-key handle pools with preemptive stealing when a pool is exhausted
//! - Delayed starts driven by a frame tick, tolerant of tick jitter
//! - Loop wrap and natural end detection by polling handle positions
//! - A gesture lock that queues calls until the platform allows audio
//! - Pause/restart of every playing sound on focus loss and gain
//! - Markers (named sub-ranges of an asset)
//!
//! # Architecture
//!
//! `soul-channels` is platform-agnostic and single-threaded:
//! - Playback primitives are provided via the [`PlaybackHandle`] trait
//! - Time is provided via the [`Clock`] trait
//! - [`VirtualHandle`] and [`ManualClock`] run everything headless
//! - With the `wasm` feature, `HtmlAudioHandle` drives browser audio elements
//!
//! # Example: Basic Playback
//!
//! ```rust
//! use soul_channels::{
//!     Clock, ManagerSettings, ManualClock, PlayConfig, SoundConfig, SoundManager, SoundState,
//!     VirtualHandle,
//! };
//!
//! let clock = ManualClock::new();
//! let mut manager = SoundManager::with_clock(ManagerSettings::default(), clock.clone());
//!
//! // Two channels for the "laser" asset, 1.5 seconds long
//! let handles = VirtualHandle::pool(1.5, 2);
//! manager
//!     .insert_audio("laser", handles.iter().map(VirtualHandle::boxed).collect())
//!     .unwrap();
//!
//! let id = manager.add("laser", SoundConfig::default()).unwrap();
//! let mut sound = manager.sound_mut(id).unwrap();
//! sound.play(None, PlayConfig::default().with_volume(0.8));
//! assert_eq!(sound.state(), SoundState::Playing);
//!
//! // Once per frame
//! clock.advance(16.0);
//! handles[0].advance(0.016);
//! manager.update(clock.now_ms(), 16.0);
//!
//! for event in manager.drain_events() {
//!     println!("{} {}", event.sound, event.kind.name());
//! }
//! ```
//!
//! # Example: Gesture Lock
//!
//! ```rust
//! use soul_channels::{ManagerSettings, Outcome, PlayConfig, SoundConfig, SoundManager, VirtualHandle};
//!
//! let settings = ManagerSettings { locked: true, ..ManagerSettings::default() };
//! let mut manager = SoundManager::new(settings);
//! manager.insert_audio("music", vec![VirtualHandle::new(60.0).boxed()]).unwrap();
//!
//! let id = manager.add("music", SoundConfig::default()).unwrap();
//! let outcome = manager.sound_mut(id).unwrap().play(None, PlayConfig::default());
//! assert_eq!(outcome, Outcome::Deferred);
//!
//! // First user gesture
//! manager.unlock();
//! assert!(manager.sound(id).unwrap().is_playing());
//! ```

mod clock;
mod config;
mod error;
mod events;
mod handle;
mod instance;
mod lock;
mod manager;
mod pool;
pub mod scheduler;
mod sound;
pub mod types;

#[cfg(feature = "wasm")]
pub mod wasm;

// Public exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ManagerSettings;
pub use error::{ChannelError, Outcome, Rejection, Result};
pub use events::{SoundEvent, SoundEventKind};
pub use handle::{PlaybackHandle, VirtualHandle};
pub use instance::SoundMut;
pub use lock::{ActionKind, LockQueue, LockedAction, LockedCall};
pub use manager::SoundManager;
pub use pool::{select_victim, AudioCache, Candidate, HandlePool};
pub use scheduler::{Channel, TickOutcome};
pub use sound::{BaseSound, Sound};
pub use types::{Marker, PlayConfig, SoundConfig, SoundId, SoundKey, SoundState};
