use super::platform_error;
use crate::error::Result;
use crate::handle::PlaybackHandle;
use tracing::warn;
use web_sys::HtmlAudioElement;

/// Playback handle over one `<audio>` element
pub struct HtmlAudioHandle {
    element: HtmlAudioElement,
}

impl HtmlAudioHandle {
    /// Create a detached audio element loading `src`
    pub fn new(src: &str) -> Result<Self> {
        let element = HtmlAudioElement::new_with_src(src)
            .map_err(|err| platform_error("creating audio element", &err))?;
        Ok(Self::from_element(element))
    }

    pub fn from_element(element: HtmlAudioElement) -> Self {
        Self { element }
    }

    /// Create `count` elements for the same source, ready for an
    /// [`AudioCache`](crate::AudioCache)
    pub fn pool(src: &str, count: usize) -> Result<Vec<Box<dyn PlaybackHandle>>> {
        (0..count)
            .map(|_| Self::new(src).map(|handle| Box::new(handle) as Box<dyn PlaybackHandle>))
            .collect()
    }

    pub fn element(&self) -> &HtmlAudioElement {
        &self.element
    }
}

impl PlaybackHandle for HtmlAudioHandle {
    fn play(&mut self) {
        // The returned promise rejects asynchronously if playback is refused
        if let Err(err) = self.element.play() {
            warn!("Audio element refused to play: {:?}", err);
        }
    }

    fn pause(&mut self) {
        if let Err(err) = self.element.pause() {
            warn!("Audio element refused to pause: {:?}", err);
        }
    }

    fn is_paused(&self) -> bool {
        self.element.paused()
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.element.set_current_time(seconds);
    }

    fn duration(&self) -> f64 {
        // NaN until metadata has loaded
        let duration = self.element.duration();
        if duration.is_finite() {
            duration
        } else {
            0.0
        }
    }

    fn volume(&self) -> f32 {
        self.element.volume() as f32
    }

    fn set_volume(&mut self, volume: f32) {
        self.element.set_volume(f64::from(volume.clamp(0.0, 1.0)));
    }

    fn muted(&self) -> bool {
        self.element.muted()
    }

    fn set_muted(&mut self, muted: bool) {
        self.element.set_muted(muted);
    }

    fn playback_rate(&self) -> f32 {
        self.element.playback_rate() as f32
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.element.set_playback_rate(f64::from(rate));
    }

    fn looping(&self) -> bool {
        self.element.loop_()
    }

    fn set_looping(&mut self, looping: bool) {
        self.element.set_loop(looping);
    }
}
