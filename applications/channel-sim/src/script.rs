/// Validated script actions
use crate::config::{ActionName, ScriptStep};
use crate::error::{Result, SimError};
use serde::Serialize;
use soul_channels::PlayConfig;

/// A script step with its arguments checked
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Play {
        sound: String,
        marker: Option<String>,
        config: PlayConfig,
    },
    PlayOnce {
        key: String,
        marker: Option<String>,
        config: PlayConfig,
    },
    Pause {
        sound: String,
    },
    Resume {
        sound: String,
    },
    Stop {
        sound: String,
    },
    Destroy {
        sound: String,
    },
    Mute {
        sound: String,
        enabled: bool,
    },
    Volume {
        sound: String,
        value: f32,
    },
    Rate {
        sound: String,
        value: f32,
    },
    Detune {
        sound: String,
        value: f32,
    },
    Seek {
        sound: String,
        value: f64,
    },
    Loop {
        sound: String,
        enabled: bool,
    },
    Lock,
    Unlock,
    Blur,
    Focus,
    PauseAll,
    ResumeAll,
    StopAll,
    GlobalMute {
        enabled: bool,
    },
    GlobalVolume {
        value: f32,
    },
    GlobalRate {
        value: f32,
    },
    GlobalDetune {
        value: f32,
    },
}

impl Action {
    /// Check that a step carries the arguments its action needs
    ///
    /// Per-sound actions need `sound`, `play_once` needs `key`, numeric
    /// setters need `value` and boolean setters need `enabled`.
    pub fn from_step(step: &ScriptStep) -> Result<Self> {
        let args = Args(step);

        let action = match step.action {
            ActionName::Play => Action::Play {
                sound: args.sound()?,
                marker: step.marker.clone(),
                config: step.config.clone().unwrap_or_default(),
            },
            ActionName::PlayOnce => Action::PlayOnce {
                key: args.key()?,
                marker: step.marker.clone(),
                config: step.config.clone().unwrap_or_default(),
            },
            ActionName::Pause => Action::Pause {
                sound: args.sound()?,
            },
            ActionName::Resume => Action::Resume {
                sound: args.sound()?,
            },
            ActionName::Stop => Action::Stop {
                sound: args.sound()?,
            },
            ActionName::Destroy => Action::Destroy {
                sound: args.sound()?,
            },
            ActionName::Mute => Action::Mute {
                sound: args.sound()?,
                enabled: args.enabled()?,
            },
            ActionName::Volume => Action::Volume {
                sound: args.sound()?,
                value: args.value_f32()?,
            },
            ActionName::Rate => Action::Rate {
                sound: args.sound()?,
                value: args.value_f32()?,
            },
            ActionName::Detune => Action::Detune {
                sound: args.sound()?,
                value: args.value_f32()?,
            },
            ActionName::Seek => Action::Seek {
                sound: args.sound()?,
                value: args.value()?,
            },
            ActionName::Loop => Action::Loop {
                sound: args.sound()?,
                enabled: args.enabled()?,
            },
            ActionName::Lock => Action::Lock,
            ActionName::Unlock => Action::Unlock,
            ActionName::Blur => Action::Blur,
            ActionName::Focus => Action::Focus,
            ActionName::PauseAll => Action::PauseAll,
            ActionName::ResumeAll => Action::ResumeAll,
            ActionName::StopAll => Action::StopAll,
            ActionName::GlobalMute => Action::GlobalMute {
                enabled: args.enabled()?,
            },
            ActionName::GlobalVolume => Action::GlobalVolume {
                value: args.value_f32()?,
            },
            ActionName::GlobalRate => Action::GlobalRate {
                value: args.value_f32()?,
            },
            ActionName::GlobalDetune => Action::GlobalDetune {
                value: args.value_f32()?,
            },
        };

        Ok(action)
    }

    /// Target sound name, if the action addresses one instance
    pub fn sound(&self) -> Option<&str> {
        match self {
            Action::Play { sound, .. }
            | Action::Pause { sound }
            | Action::Resume { sound }
            | Action::Stop { sound }
            | Action::Destroy { sound }
            | Action::Mute { sound, .. }
            | Action::Volume { sound, .. }
            | Action::Rate { sound, .. }
            | Action::Detune { sound, .. }
            | Action::Seek { sound, .. }
            | Action::Loop { sound, .. } => Some(sound),
            _ => None,
        }
    }
}

struct Args<'a>(&'a ScriptStep);

impl Args<'_> {
    fn missing(&self, field: &str) -> SimError {
        SimError::Script {
            at_ms: self.0.at_ms,
            message: format!("{:?} requires '{}'", self.0.action, field),
        }
    }

    fn sound(&self) -> Result<String> {
        self.0.sound.clone().ok_or_else(|| self.missing("sound"))
    }

    fn key(&self) -> Result<String> {
        self.0.key.clone().ok_or_else(|| self.missing("key"))
    }

    fn enabled(&self) -> Result<bool> {
        self.0.enabled.ok_or_else(|| self.missing("enabled"))
    }

    fn value(&self) -> Result<f64> {
        self.0.value.ok_or_else(|| self.missing("value"))
    }

    fn value_f32(&self) -> Result<f32> {
        self.value().map(|value| value as f32)
    }
}
