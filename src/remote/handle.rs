//! MirrorHandle - public API for the MirrorActor
//!
//! Commands are fire-and-forget; the only query is [`MirrorHandle::snapshot`].
//! None of the command methods change the mirror directly: the actor asks OBS
//! and waits for the matching notification.

use super::actor::{MirrorActor, MirrorCommand};
use super::events::MirrorEvent;
use super::state::MirrorSnapshot;
use super::transport::Connector;
use crate::ids::{AudioId, SceneId, TransitionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Handle for interacting with the MirrorActor
///
/// Cheap to clone. The actor stops once every handle is dropped.
#[derive(Clone)]
pub struct MirrorHandle {
    cmd_tx: mpsc::UnboundedSender<MirrorCommand>,
}

impl MirrorHandle {
    pub(super) fn new(cmd_tx: mpsc::UnboundedSender<MirrorCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Spawn a new MirrorActor and return a handle
    ///
    /// `reconnect_delay` separates failed connection attempts.
    pub fn spawn(connector: Arc<dyn Connector>, reconnect_delay: Duration) -> Self {
        MirrorActor::spawn(connector, reconnect_delay)
    }

    fn send(&self, cmd: MirrorCommand) {
        let _ = self.cmd_tx.send(cmd);
    }

    /// Open the connection and keep retrying until it succeeds
    ///
    /// A lost connection is re-established automatically until
    /// [`MirrorHandle::disconnect`] is called.
    pub fn connect(&self) {
        self.send(MirrorCommand::Connect);
    }

    /// Close the connection and discard all mirrored state
    pub fn disconnect(&self) {
        self.send(MirrorCommand::Disconnect);
    }

    /// Stage a scene in preview; ignored when `id` is not registered
    pub fn select_preview_scene(&self, id: SceneId) {
        self.send(MirrorCommand::SelectPreviewScene(id));
    }

    /// Promote preview to program with a transition; ignored when `id` is not registered
    pub fn execute_transition(&self, id: TransitionId) {
        self.send(MirrorCommand::ExecuteTransition(id));
    }

    /// Flip the mute state of an audio source; ignored when `id` is not registered
    pub fn toggle_mute(&self, id: AudioId) {
        self.send(MirrorCommand::ToggleMute(id));
    }

    pub fn toggle_streaming(&self) {
        self.send(MirrorCommand::ToggleStreaming);
    }

    /// Receive every event the mirror emits from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<MirrorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.send(MirrorCommand::Subscribe(tx));
        rx
    }

    /// Current mirror contents, or `None` if the actor is gone
    pub async fn snapshot(&self) -> Option<MirrorSnapshot> {
        let (response_tx, response_rx) = oneshot::channel();
        if self.cmd_tx.send(MirrorCommand::Snapshot(response_tx)).is_err() {
            return None;
        }
        response_rx.await.ok()
    }
}
