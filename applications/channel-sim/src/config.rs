/// Scenario configuration
use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use soul_channels::{ManagerSettings, Marker, PlayConfig, SoundConfig};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(default)]
    pub manager: ManagerSettings,

    #[serde(default = "default_run")]
    pub run: RunSettings,

    #[serde(default)]
    pub assets: Vec<AssetSpec>,

    #[serde(default)]
    pub sounds: Vec<SoundSpec>,

    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunSettings {
    /// Simulated time span in milliseconds
    #[serde(default = "default_duration_ms")]
    pub duration_ms: f64,

    /// Length of one frame in milliseconds
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
}

/// A cached asset backed by headless handles
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetSpec {
    pub key: String,

    /// Number of interchangeable handles
    #[serde(default = "default_channels")]
    pub channels: usize,

    /// Length in seconds
    pub duration: f64,
}

/// A named sound instance created before the script runs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SoundSpec {
    pub name: String,
    pub key: String,

    #[serde(default)]
    pub config: SoundConfig,

    #[serde(default)]
    pub markers: Vec<Marker>,
}

/// What a script step does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    Play,
    PlayOnce,
    Pause,
    Resume,
    Stop,
    Destroy,
    Mute,
    Volume,
    Rate,
    Detune,
    Seek,
    Loop,
    Lock,
    Unlock,
    Blur,
    Focus,
    PauseAll,
    ResumeAll,
    StopAll,
    GlobalMute,
    GlobalVolume,
    GlobalRate,
    GlobalDetune,
}

/// One timed call, as written in the scenario file
///
/// Which of the optional fields are required depends on `action`; see
/// [`Action::from_step`](crate::script::Action::from_step).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptStep {
    pub at_ms: f64,
    pub action: ActionName,

    /// Target sound name
    #[serde(default)]
    pub sound: Option<String>,

    /// Asset key for `play_once`
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub marker: Option<String>,

    /// Numeric argument (volume, rate, detune, seek)
    #[serde(default)]
    pub value: Option<f64>,

    /// Boolean argument (mute, loop)
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Play overrides
    #[serde(default)]
    pub config: Option<PlayConfig>,
}

impl SimConfig {
    /// Load a scenario file, with `SIM_` environment overrides
    ///
    /// Nested keys use a double underscore, e.g. `SIM_RUN__FRAME_MS=8`.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("SIM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: SimConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a scenario from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?;

        let config: SimConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate run settings and sound names
    pub fn validate(&self) -> Result<()> {
        if !self.run.frame_ms.is_finite() || self.run.frame_ms <= 0.0 {
            return Err(SimError::Run(format!(
                "frame_ms must be positive and finite, got {}",
                self.run.frame_ms
            )));
        }
        if !self.run.duration_ms.is_finite() || self.run.duration_ms < 0.0 {
            return Err(SimError::Run(format!(
                "duration_ms must be finite and not negative, got {}",
                self.run.duration_ms
            )));
        }

        let mut names = HashSet::new();
        for sound in &self.sounds {
            if !names.insert(sound.name.as_str()) {
                return Err(SimError::DuplicateName(sound.name.clone()));
            }
        }

        Ok(())
    }
}

// Default values
fn default_run() -> RunSettings {
    RunSettings {
        duration_ms: default_duration_ms(),
        frame_ms: default_frame_ms(),
    }
}

fn default_duration_ms() -> f64 {
    5000.0
}

fn default_frame_ms() -> f64 {
    16.0
}

fn default_channels() -> usize {
    1
}

impl Default for RunSettings {
    fn default() -> Self {
        default_run()
    }
}
