use crate::clock::Clock;
use crate::error::{ChannelError, Result};
use web_sys::Performance;

/// Clock over the page's `performance.now()`
pub struct PerformanceClock {
    performance: Performance,
}

impl PerformanceClock {
    pub fn new() -> Result<Self> {
        web_sys::window()
            .and_then(|window| window.performance())
            .map(|performance| Self { performance })
            .ok_or_else(|| ChannelError::Platform("performance API unavailable".to_string()))
    }
}

impl Clock for PerformanceClock {
    fn now_ms(&self) -> f64 {
        self.performance.now()
    }
}
