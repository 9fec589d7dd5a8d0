//! MirrorActor - the single task that owns the OBS mirror
//!
//! All mirror state is owned by one task and changed only from here:
//! - commands arrive from [`MirrorHandle`]s over an unbounded channel
//! - remote requests run in spawned tasks and post their results back as
//!   completions tagged with the connection epoch
//! - notifications are pumped from the session into the same completion queue
//!
//! The epoch changes on every connect, disconnect and connection loss. A
//! completion carrying an older epoch belongs to a dead connection and is
//! discarded, so late responses can never leak into a newer session.

use super::events::{MirrorEvent, StreamingState};
use super::handle::MirrorHandle;
use super::state::{MirrorSnapshot, MirrorState};
use super::transport::{
    Connector, Notification, RemoteControl, RemoteError, RemoteResult, Session,
};
use crate::ids::{AudioId, SceneId, TransitionId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Commands accepted by the actor
#[derive(Debug)]
pub enum MirrorCommand {
    Connect,
    Disconnect,
    SelectPreviewScene(SceneId),
    ExecuteTransition(TransitionId),
    ToggleMute(AudioId),
    ToggleStreaming,
    Subscribe(mpsc::UnboundedSender<MirrorEvent>),
    Snapshot(oneshot::Sender<MirrorSnapshot>),
}

/// Results of work the actor handed off to other tasks
enum Completion {
    Connected(Session),
    ConnectFailed(anyhow::Error),
    Notification(Notification),
    NotificationsClosed,
    SceneList {
        names: Vec<String>,
        current: Option<String>,
    },
    TransitionList(Vec<String>),
    PreviewScene(String),
    SourceList(Vec<String>),
    StreamStatus(StreamingState),
    Mute {
        id: AudioId,
        source: String,
        muted: bool,
    },
}

struct Tagged {
    epoch: u64,
    completion: Completion,
}

pub struct MirrorActor {
    connector: Arc<dyn Connector>,
    reconnect_delay: Duration,

    state: MirrorState,
    subscribers: Vec<mpsc::UnboundedSender<MirrorEvent>>,

    /// Live connection, if any
    remote: Option<Arc<dyn RemoteControl>>,
    pump: Option<JoinHandle<()>>,

    /// Connection generation; completions from other generations are dropped
    epoch: u64,
    /// Set between `connect()` and `disconnect()`; drives automatic retries
    wanted: bool,
    attempts: usize,

    command_rx: mpsc::UnboundedReceiver<MirrorCommand>,
    completion_tx: mpsc::UnboundedSender<Tagged>,
    completion_rx: mpsc::UnboundedReceiver<Tagged>,
}

impl MirrorActor {
    /// Spawn the actor and return a handle to it
    pub fn spawn(connector: Arc<dyn Connector>, reconnect_delay: Duration) -> MirrorHandle {
        let (cmd_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let actor = MirrorActor {
            connector,
            reconnect_delay,
            state: MirrorState::new(),
            subscribers: Vec::new(),
            remote: None,
            pump: None,
            epoch: 0,
            wanted: false,
            attempts: 0,
            command_rx,
            completion_tx,
            completion_rx,
        };

        tokio::spawn(actor.run());
        debug!("MirrorActor spawned");

        MirrorHandle::new(cmd_tx)
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    // Every handle is gone
                    None => break,
                },
                Some(tagged) = self.completion_rx.recv() => self.handle_completion(tagged),
            }
        }

        self.close_session();
        debug!("MirrorActor stopped");
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn handle_command(&mut self, cmd: MirrorCommand) {
        trace!(?cmd, "Mirror command");

        match cmd {
            MirrorCommand::Connect => self.connect(),
            MirrorCommand::Disconnect => self.disconnect(),
            MirrorCommand::SelectPreviewScene(id) => {
                let Some(name) = self.state.scene_name(&id).map(str::to_string) else {
                    debug!("Preview request for unknown scene {}", id);
                    return;
                };
                info!("🎬 Preview scene {} → '{}'", id, name);
                self.spawn_command("SetPreviewScene", move |remote| async move {
                    remote.set_preview_scene(&name).await
                });
            },
            MirrorCommand::ExecuteTransition(id) => {
                let Some(name) = self.state.transition_name(&id).map(str::to_string) else {
                    debug!("Transition request for unknown transition {}", id);
                    return;
                };
                info!("🎬 Transition to program with '{}'", name);
                self.spawn_command("TransitionToProgram", move |remote| async move {
                    remote.transition_to_program(&name).await
                });
            },
            MirrorCommand::ToggleMute(id) => {
                let Some(name) = self.state.audio_name(&id).map(str::to_string) else {
                    debug!("Mute request for unknown audio source {}", id);
                    return;
                };
                info!("🔇 Toggle mute on '{}'", name);
                self.spawn_command("ToggleMute", move |remote| async move {
                    remote.toggle_mute(&name).await
                });
            },
            MirrorCommand::ToggleStreaming => {
                info!("📡 Start/stop streaming requested");
                self.spawn_command("StartStopStreaming", |remote| async move {
                    remote.toggle_streaming().await
                });
            },
            MirrorCommand::Subscribe(tx) => self.subscribers.push(tx),
            MirrorCommand::Snapshot(reply) => {
                let _ = reply.send(self.state.snapshot(self.remote.is_some()));
            },
        }
    }

    fn connect(&mut self) {
        if self.wanted {
            debug!("OBS connection already requested");
            return;
        }
        self.wanted = true;
        self.attempts = 0;
        self.epoch += 1;
        info!("🎬 Connecting to OBS at {}", self.connector.endpoint());
        self.spawn_connect(Duration::ZERO);
    }

    fn disconnect(&mut self) {
        if !self.wanted {
            return;
        }
        self.wanted = false;
        self.epoch += 1;
        self.close_session();
        self.state.reset();
        info!("OBS disconnected");
    }

    /// Drop the live session, stopping its notification pump
    fn close_session(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.remote = None;
    }

    // =========================================================================
    // Completions
    // =========================================================================

    fn handle_completion(&mut self, Tagged { epoch, completion }: Tagged) {
        if epoch != self.epoch {
            trace!("Discarding completion from stale epoch {} (now {})", epoch, self.epoch);
            return;
        }

        match completion {
            Completion::Connected(session) => self.on_connected(session),
            Completion::ConnectFailed(e) => {
                self.attempts += 1;
                warn!("OBS connection attempt #{} failed: {:#}", self.attempts, e);
                debug!(
                    "⏳ OBS reconnect #{} in {}ms",
                    self.attempts,
                    self.reconnect_delay.as_millis()
                );
                self.spawn_connect(self.reconnect_delay);
            },
            Completion::Notification(notification) => self.on_notification(notification),
            Completion::NotificationsClosed => {
                warn!("🔌 OBS connection closed");
                self.close_session();
                for event in self.state.reset_lost() {
                    self.emit(event);
                }
                self.epoch += 1;
                if self.wanted {
                    self.attempts = 0;
                    self.spawn_connect(self.reconnect_delay);
                }
            },
            Completion::SceneList { names, current } => {
                for event in self.state.apply_scene_list(names, current) {
                    self.emit(event);
                }
            },
            Completion::TransitionList(names) => {
                let event = self.state.apply_transition_list(names);
                self.emit(event);
            },
            Completion::PreviewScene(name) => {
                let event = self.state.apply_preview_scene(&name);
                self.emit(event);
            },
            Completion::SourceList(names) => {
                let (event, registered) = self.state.apply_source_list(names);
                self.emit(event);
                for (id, source) in registered {
                    self.query_mute(id, source);
                }
            },
            Completion::StreamStatus(state) => {
                let event = self.state.apply_streaming(state);
                self.emit(event);
            },
            Completion::Mute { id, source, muted } => {
                if let Some(event) = self.state.apply_mute_query(id, &source, muted) {
                    self.emit(event);
                }
            },
        }
    }

    fn on_connected(&mut self, session: Session) {
        let Session {
            remote,
            mut notifications,
        } = session;

        info!("✅ OBS WebSocket connected");
        self.attempts = 0;
        self.remote = Some(remote);

        let tx = self.completion_tx.clone();
        let epoch = self.epoch;
        self.pump = Some(tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                let tagged = Tagged {
                    epoch,
                    completion: Completion::Notification(notification),
                };
                if tx.send(tagged).is_err() {
                    return;
                }
            }
            let _ = tx.send(Tagged {
                epoch,
                completion: Completion::NotificationsClosed,
            });
        }));

        // Onboarding; each step stands alone
        self.reload_scenes();
        self.reload_transitions();
        self.load_preview_scene();
        self.spawn_command("EnableStudioMode", |remote| async move {
            remote.enable_studio_mode().await
        });
        self.reload_audio_sources();

        let event = MirrorEvent::StreamingStatusChanged(self.state.streaming());
        self.emit(event);
        self.load_stream_status();
    }

    fn on_notification(&mut self, notification: Notification) {
        debug!(?notification, "OBS notification");

        match notification {
            Notification::ConnectionOpened => debug!("OBS connection opened"),
            Notification::ConnectionClosed => debug!("OBS reported connection closed"),
            Notification::Error(message) => warn!("OBS error: {}", message),
            Notification::ScenesChanged => self.reload_scenes(),
            Notification::SwitchScenes { scene_name } => {
                let event = self.state.apply_current_scene(&scene_name);
                self.emit(event);
            },
            Notification::PreviewSceneChanged { scene_name } => {
                let event = self.state.apply_preview_scene(&scene_name);
                self.emit(event);
            },
            Notification::TransitionListChanged => self.reload_transitions(),
            Notification::StreamStarting => self.set_streaming(StreamingState::Starting),
            Notification::StreamStarted => self.set_streaming(StreamingState::Started),
            Notification::StreamStopping => self.set_streaming(StreamingState::Stopping),
            Notification::StreamStopped => self.set_streaming(StreamingState::Stopped),
            Notification::SourceMuteStateChanged { source_name, muted } => {
                if let Some(event) = self.state.apply_mute_notification(&source_name, muted) {
                    self.emit(event);
                }
            },
            Notification::SourceRenamed {
                previous_name,
                new_name,
            } => {
                if MirrorState::rename_affects_audio(&previous_name, &new_name) {
                    self.reload_audio_sources();
                }
            },
        }
    }

    fn set_streaming(&mut self, state: StreamingState) {
        info!("📡 Streaming {}", state);
        let event = self.state.apply_streaming(state);
        self.emit(event);
    }

    fn emit(&mut self, event: MirrorEvent) {
        trace!(?event, "Mirror event");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // =========================================================================
    // Remote requests
    // =========================================================================

    fn reload_scenes(&self) {
        self.spawn_query("GetSceneList", |remote| async move {
            let names = remote.scene_names().await?;
            let current = match remote.current_scene().await {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!("OBS request GetCurrentScene failed: {}", e);
                    None
                },
            };
            Ok::<_, RemoteError>(Completion::SceneList { names, current })
        });
    }

    fn reload_transitions(&self) {
        self.spawn_query("GetTransitionList", |remote| async move {
            Ok::<_, RemoteError>(Completion::TransitionList(remote.transition_names().await?))
        });
    }

    fn load_preview_scene(&self) {
        self.spawn_query("GetPreviewScene", |remote| async move {
            Ok::<_, RemoteError>(Completion::PreviewScene(remote.preview_scene().await?))
        });
    }

    fn reload_audio_sources(&self) {
        self.spawn_query("GetSourcesList", |remote| async move {
            Ok::<_, RemoteError>(Completion::SourceList(remote.source_names().await?))
        });
    }

    /// The stream may have outlived a dropped connection
    fn load_stream_status(&self) {
        self.spawn_query("GetStreamStatus", |remote| async move {
            let state = if remote.streaming_active().await? {
                StreamingState::Started
            } else {
                StreamingState::Stopped
            };
            Ok::<_, RemoteError>(Completion::StreamStatus(state))
        });
    }

    fn query_mute(&self, id: AudioId, source: String) {
        self.spawn_query("GetMute", move |remote| async move {
            let muted = remote.is_muted(&source).await?;
            Ok::<_, RemoteError>(Completion::Mute { id, source, muted })
        });
    }

    /// Run a request whose answer updates the mirror
    fn spawn_query<F, Fut>(&self, what: &'static str, request: F)
    where
        F: FnOnce(Arc<dyn RemoteControl>) -> Fut + Send + 'static,
        Fut: Future<Output = RemoteResult<Completion>> + Send + 'static,
    {
        let Some(remote) = self.remote.clone() else {
            debug!("OBS not connected, skipping {}", what);
            return;
        };
        let tx = self.completion_tx.clone();
        let epoch = self.epoch;

        tokio::spawn(async move {
            match request(remote).await {
                Ok(completion) => {
                    let _ = tx.send(Tagged { epoch, completion });
                },
                Err(e) => warn!("OBS request {} failed: {}", what, e),
            }
        });
    }

    /// Run a fire-and-forget request; the mirror only changes when OBS echoes it
    fn spawn_command<F, Fut>(&self, what: &'static str, request: F)
    where
        F: FnOnce(Arc<dyn RemoteControl>) -> Fut + Send + 'static,
        Fut: Future<Output = RemoteResult<()>> + Send + 'static,
    {
        let Some(remote) = self.remote.clone() else {
            debug!("OBS not connected, skipping {}", what);
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = request(remote).await {
                warn!("OBS request {} failed: {}", what, e);
            }
        });
    }

    fn spawn_connect(&self, delay: Duration) {
        let connector = Arc::clone(&self.connector);
        let tx = self.completion_tx.clone();
        let epoch = self.epoch;

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let completion = match connector.connect().await {
                Ok(session) => Completion::Connected(session),
                Err(e) => Completion::ConnectFailed(e),
            };
            let _ = tx.send(Tagged { epoch, completion });
        });
    }
}
