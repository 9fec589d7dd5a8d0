//! Remote control transport seam
//!
//! The mirror talks to OBS only through [`RemoteControl`] (requests) and the
//! [`Notification`] stream of a [`Session`]. The obs-websocket implementation
//! lives in [`super::obs`]; tests plug in in-memory fakes.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors surfaced by remote requests
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("OBS not connected")]
    NotConnected,

    #[error("OBS request failed: {0}")]
    Request(String),

    #[error(transparent)]
    Obs(#[from] obws::Error),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Requests the mirror issues to the production application
#[async_trait]
pub trait RemoteControl: Send + Sync {
    /// Names of all scenes, in the application's order
    async fn scene_names(&self) -> RemoteResult<Vec<String>>;

    /// Name of the scene currently on program
    async fn current_scene(&self) -> RemoteResult<String>;

    /// Names of all scene transitions
    async fn transition_names(&self) -> RemoteResult<Vec<String>>;

    /// Name of the scene currently staged in preview
    async fn preview_scene(&self) -> RemoteResult<String>;

    /// Names of all sources (inputs)
    async fn source_names(&self) -> RemoteResult<Vec<String>>;

    /// Whether the stream output is currently live
    async fn streaming_active(&self) -> RemoteResult<bool>;

    async fn is_muted(&self, source: &str) -> RemoteResult<bool>;

    async fn set_preview_scene(&self, scene: &str) -> RemoteResult<()>;

    /// Promote preview to program using the named transition
    async fn transition_to_program(&self, transition: &str) -> RemoteResult<()>;

    async fn toggle_mute(&self, source: &str) -> RemoteResult<()>;

    /// Start or stop the stream; the application decides which
    async fn toggle_streaming(&self) -> RemoteResult<()>;

    /// Switch the application to preview/program (studio) mode
    async fn enable_studio_mode(&self) -> RemoteResult<()>;
}

/// Change notifications consumed by the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ConnectionOpened,
    ConnectionClosed,
    Error(String),
    /// Structural change of the scene list (add, remove, rename)
    ScenesChanged,
    /// Program scene switched
    SwitchScenes { scene_name: String },
    PreviewSceneChanged { scene_name: String },
    TransitionListChanged,
    StreamStarting,
    StreamStarted,
    StreamStopping,
    StreamStopped,
    SourceMuteStateChanged { source_name: String, muted: bool },
    SourceRenamed { previous_name: String, new_name: String },
}

/// An established connection
///
/// The notification channel closing means the connection is gone.
pub struct Session {
    pub remote: Arc<dyn RemoteControl>,
    pub notifications: mpsc::Receiver<Notification>,
}

/// Opens sessions to the production application
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human readable endpoint, for logs
    fn endpoint(&self) -> String;

    async fn connect(&self) -> anyhow::Result<Session>;
}
