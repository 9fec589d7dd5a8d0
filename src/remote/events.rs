//! Domain events published by the mirror

use crate::ids::{AudioId, SceneId, TransitionId};
use std::fmt;

/// Streaming output lifecycle as reported by OBS
///
/// Only ever changed by stream notifications; the bridge never guesses the
/// next state after asking OBS to start or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamingState {
    #[default]
    Stopped,
    Starting,
    Started,
    Stopping,
}

impl StreamingState {
    /// Starting and stopping are transitional states
    pub fn is_transitional(&self) -> bool {
        matches!(self, StreamingState::Starting | StreamingState::Stopping)
    }

    /// Starting and started count as "on air"
    pub fn is_active(&self) -> bool {
        matches!(self, StreamingState::Starting | StreamingState::Started)
    }
}

impl fmt::Display for StreamingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamingState::Stopped => "stopped",
            StreamingState::Starting => "starting",
            StreamingState::Started => "started",
            StreamingState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Events emitted to every mirror subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorEvent {
    ScenesListChanged(Vec<SceneId>),
    PreviewSceneChanged {
        previous: Option<SceneId>,
        current: Option<SceneId>,
    },
    CurrentSceneChanged {
        previous: Option<SceneId>,
        current: Option<SceneId>,
    },
    TransitionListChanged(Vec<TransitionId>),
    AudioListChanged(Vec<AudioId>),
    AudioMuteChanged { id: AudioId, muted: bool },
    StreamingStatusChanged(StreamingState),
}
