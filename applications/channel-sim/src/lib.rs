//! Channel Simulator
//!
//! Drives a [`SoundManager`] over headless handles, frame by frame, from a
//! TOML scenario: assets, named sounds, and a timed script of calls. The
//! result is the event log plus the outcome of every script step.

pub mod config;
pub mod error;
pub mod script;

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::script::Action;
use serde::Serialize;
use soul_channels::{
    Clock, ManualClock, Outcome, SoundEventKind, SoundId, SoundManager, VirtualHandle,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One emitted sound event, stamped with simulated time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at_ms: f64,
    pub sound: SoundId,

    /// Scenario name, absent for `play_once` instances
    pub name: Option<String>,

    pub event: SoundEventKind,
}

/// What a script step returned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub at_ms: f64,
    pub action: Action,

    /// `Applied`, `Deferred` or `Rejected(..)` for calls that report one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimReport {
    pub events: Vec<LogEntry>,
    pub outcomes: Vec<StepOutcome>,
}

impl SimReport {
    /// Events for one named sound, in emission order
    pub fn events_for(&self, name: &str) -> Vec<&SoundEventKind> {
        self.events
            .iter()
            .filter(|entry| entry.name.as_deref() == Some(name))
            .map(|entry| &entry.event)
            .collect()
    }

    /// Time of the first matching event for a named sound
    pub fn first(&self, name: &str, event: &SoundEventKind) -> Option<f64> {
        self.events
            .iter()
            .find(|entry| entry.name.as_deref() == Some(name) && &entry.event == event)
            .map(|entry| entry.at_ms)
    }
}

/// A scenario loaded into a live manager
pub struct Simulation {
    manager: SoundManager,
    clock: ManualClock,
    handles: Vec<VirtualHandle>,
    names: HashMap<String, SoundId>,
    labels: HashMap<SoundId, String>,
    script: Vec<(f64, Action)>,
    next_step: usize,
    duration_ms: f64,
    frame_ms: f64,
    report: SimReport,
}

impl Simulation {
    /// Build the manager, assets and named sounds of a scenario
    pub fn new(config: &SimConfig) -> Result<Self> {
        config.validate()?;

        let clock = ManualClock::starting_at(0.0);
        let mut manager = SoundManager::with_clock(config.manager.clone(), clock.clone());
        let mut handles = Vec::new();

        for asset in &config.assets {
            let pool = VirtualHandle::pool(asset.duration, asset.channels);
            manager.insert_audio(
                asset.key.as_str(),
                pool.iter().map(VirtualHandle::boxed).collect(),
            )?;
            debug!(
                "Asset '{}': {} channels, {}s",
                asset.key, asset.channels, asset.duration
            );
            handles.extend(pool);
        }

        let mut names = HashMap::new();
        let mut labels = HashMap::new();
        for entry in &config.sounds {
            let id = manager.add(entry.key.as_str(), entry.config.clone())?;
            let mut sound = manager.sound_mut(id)?;
            for marker in &entry.markers {
                if !sound.add_marker(marker.clone()) {
                    return Err(SimError::Run(format!(
                        "invalid marker '{}' on sound '{}'",
                        marker.name, entry.name
                    )));
                }
            }
            names.insert(entry.name.clone(), id);
            labels.insert(id, entry.name.clone());
        }

        let mut script = Vec::with_capacity(config.script.len());
        for step in &config.script {
            let action = Action::from_step(step)?;
            if let Some(name) = action.sound() {
                if !names.contains_key(name) {
                    return Err(SimError::UnknownName(name.to_string()));
                }
            }
            if step.at_ms > config.run.duration_ms {
                warn!(
                    "Step {:?} at {} ms is past the end of the run",
                    step.action, step.at_ms
                );
            }
            script.push((step.at_ms, action));
        }
        script.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(Self {
            manager,
            clock,
            handles,
            names,
            labels,
            script,
            next_step: 0,
            duration_ms: config.run.duration_ms,
            frame_ms: config.run.frame_ms,
            report: SimReport::default(),
        })
    }

    pub fn manager(&self) -> &SoundManager {
        &self.manager
    }

    /// Id of a named sound
    pub fn id(&self, name: &str) -> Option<SoundId> {
        self.names.get(name).copied()
    }

    /// Run to the end and return the log
    pub fn run(mut self) -> Result<SimReport> {
        info!(
            "Simulating {} ms in {} ms frames, {} steps",
            self.duration_ms,
            self.frame_ms,
            self.script.len()
        );

        let mut now = 0.0;
        loop {
            self.run_due(now)?;
            self.collect(now);

            if now >= self.duration_ms {
                break;
            }

            let frame = self.frame_ms.min(self.duration_ms - now);
            self.clock.advance(frame);
            for handle in &self.handles {
                handle.advance(frame / 1000.0);
            }
            now = self.clock.now_ms();
            self.manager.update(now, frame);
            self.collect(now);
        }

        info!(
            "Simulation finished: {} events, {} steps run",
            self.report.events.len(),
            self.report.outcomes.len()
        );
        Ok(self.report)
    }

    fn run_due(&mut self, now: f64) -> Result<()> {
        while let Some((at_ms, action)) = self.script.get(self.next_step).cloned() {
            if at_ms > now {
                break;
            }
            self.next_step += 1;

            let outcome = self.execute(&action)?;
            debug!("{} ms: {:?} -> {:?}", now, action, outcome);
            self.report.outcomes.push(StepOutcome {
                at_ms,
                action,
                outcome: outcome.map(|o| format!("{o:?}")),
            });
        }
        Ok(())
    }

    fn execute(&mut self, action: &Action) -> Result<Option<Outcome>> {
        let outcome = match action {
            Action::Play {
                sound,
                marker,
                config,
            } => {
                let id = self.lookup(sound)?;
                Some(
                    self.manager
                        .sound_mut(id)?
                        .play(marker.as_deref(), config.clone()),
                )
            }
            Action::PlayOnce {
                key,
                marker,
                config,
            } => {
                let (id, outcome) =
                    self.manager
                        .play_once(key.as_str(), marker.as_deref(), config.clone())?;
                debug!("play_once '{}' created {}", key, id);
                Some(outcome)
            }
            Action::Pause { sound } => Some(self.sound(sound)?.pause()),
            Action::Resume { sound } => Some(self.sound(sound)?.resume()),
            Action::Stop { sound } => Some(self.sound(sound)?.stop()),
            Action::Destroy { sound } => {
                let id = self.lookup(sound)?;
                self.manager.remove(id);
                None
            }
            Action::Mute { sound, enabled } => Some(self.sound(sound)?.set_mute(*enabled)),
            Action::Volume { sound, value } => Some(self.sound(sound)?.set_volume(*value)),
            Action::Rate { sound, value } => Some(self.sound(sound)?.set_rate(*value)),
            Action::Detune { sound, value } => Some(self.sound(sound)?.set_detune(*value)),
            Action::Seek { sound, value } => Some(self.sound(sound)?.set_seek(*value)),
            Action::Loop { sound, enabled } => {
                self.sound(sound)?.set_loop(*enabled);
                None
            }
            Action::Lock => {
                self.manager.lock();
                None
            }
            Action::Unlock => {
                self.manager.unlock();
                None
            }
            Action::Blur => {
                self.manager.on_blur();
                None
            }
            Action::Focus => {
                self.manager.on_focus();
                None
            }
            Action::PauseAll => {
                self.manager.pause_all();
                None
            }
            Action::ResumeAll => {
                self.manager.resume_all();
                None
            }
            Action::StopAll => {
                self.manager.stop_all();
                None
            }
            Action::GlobalMute { enabled } => {
                self.manager.set_mute(*enabled);
                None
            }
            Action::GlobalVolume { value } => {
                self.manager.set_volume(*value);
                None
            }
            Action::GlobalRate { value } => {
                self.manager.set_rate(*value);
                None
            }
            Action::GlobalDetune { value } => {
                self.manager.set_detune(*value);
                None
            }
        };
        Ok(outcome)
    }

    fn lookup(&self, name: &str) -> Result<SoundId> {
        self.id(name)
            .ok_or_else(|| SimError::UnknownName(name.to_string()))
    }

    fn sound(&mut self, name: &str) -> Result<soul_channels::SoundMut<'_>> {
        let id = self.lookup(name)?;
        Ok(self.manager.sound_mut(id)?)
    }

    fn collect(&mut self, now: f64) {
        for event in self.manager.drain_events() {
            self.report.events.push(LogEntry {
                at_ms: now,
                sound: event.sound,
                name: self.labels.get(&event.sound).cloned(),
                event: event.kind,
            });
        }
    }
}

/// Run a parsed scenario to completion
pub fn simulate(config: &SimConfig) -> Result<SimReport> {
    Simulation::new(config)?.run()
}
