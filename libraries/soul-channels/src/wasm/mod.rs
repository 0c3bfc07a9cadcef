//! Browser backend
//!
//! Playback handles over HTML audio elements and a clock over
//! `performance.now()`.

mod audio_element;
mod performance;

pub use audio_element::HtmlAudioHandle;
pub use performance::PerformanceClock;

use crate::error::ChannelError;
use wasm_bindgen::JsValue;

fn platform_error(context: &str, err: &JsValue) -> ChannelError {
    ChannelError::Platform(format!("{context}: {err:?}"))
}
