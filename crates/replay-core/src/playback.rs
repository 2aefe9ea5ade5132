use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ReplayError;

/// Whether ticks are admitted to the replay engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Running,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Running => write!(f, "running"),
        }
    }
}

/// Explicit playback action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackAction {
    Start,
    Pause,
}

impl std::str::FromStr for PlaybackAction {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" | "play" => Ok(PlaybackAction::Start),
            "pause" | "stop" => Ok(PlaybackAction::Pause),
            other => Err(ReplayError::InvalidConfig(format!(
                "unrecognized playback trigger: {}",
                other
            ))),
        }
    }
}

/// Two-state play/pause machine.
///
/// Level-triggered: `start` always leaves `Running`, `pause` always leaves
/// `Stopped`, whatever the current state.
#[derive(Debug, Clone, Default)]
pub struct PlaybackController {
    state: PlaybackState,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Running
    }

    pub fn start(&mut self) -> PlaybackState {
        self.apply(PlaybackAction::Start)
    }

    pub fn pause(&mut self) -> PlaybackState {
        self.apply(PlaybackAction::Pause)
    }

    pub fn apply(&mut self, action: PlaybackAction) -> PlaybackState {
        let next = match action {
            PlaybackAction::Start => PlaybackState::Running,
            PlaybackAction::Pause => PlaybackState::Stopped,
        };
        if next != self.state {
            info!("Playback {} -> {}", self.state, next);
        }
        self.state = next;
        self.state
    }

    /// Apply a textual trigger; unrecognized triggers leave the state as is.
    pub fn apply_trigger(&mut self, trigger: &str) -> PlaybackState {
        match trigger.parse::<PlaybackAction>() {
            Ok(action) => self.apply(action),
            Err(e) => {
                warn!("Ignoring trigger: {}", e);
                self.state
            }
        }
    }

    /// Whether the next tick may reach the replay engine
    pub fn admits_tick(&self) -> bool {
        self.is_running()
    }
}
