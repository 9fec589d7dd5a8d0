//! obs-websocket implementation of the remote control seam

use super::transport::{Connector, Notification, RemoteControl, RemoteResult, Session};
use crate::config::ObsConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use obws::events::{Event, OutputState};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Buffered notifications between the event stream and the mirror
const NOTIFICATION_BUFFER: usize = 256;

/// Opens obs-websocket sessions
pub struct ObsConnector {
    host: String,
    port: u16,
    password: Option<String>,
}

impl ObsConnector {
    pub fn new(host: impl Into<String>, port: u16, password: Option<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password,
        }
    }

    pub fn from_config(config: &ObsConfig) -> Self {
        Self::new(config.host.clone(), config.port, config.password.clone())
    }
}

#[async_trait]
impl Connector for ObsConnector {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self) -> Result<Session> {
        let client = obws::Client::connect(self.host.clone(), self.port, self.password.clone())
            .await
            .context("Failed to connect to OBS WebSocket")?;

        let events = client
            .events()
            .context("Failed to get OBS event stream")?;

        let (tx, notifications) = mpsc::channel(NOTIFICATION_BUFFER);

        tokio::spawn(async move {
            use tokio_stream::StreamExt;

            tokio::pin!(events);
            if tx.send(Notification::ConnectionOpened).await.is_err() {
                return;
            }
            while let Some(event) = events.next().await {
                trace!(?event, "OBS event");
                let Some(notification) = notification_for(event) else {
                    continue;
                };
                if tx.send(notification).await.is_err() {
                    // Mirror dropped the session
                    return;
                }
            }
            debug!("OBS event stream ended");
            let _ = tx.send(Notification::ConnectionClosed).await;
        });

        Ok(Session {
            remote: Arc::new(ObsRemote { client }),
            notifications,
        })
    }
}

/// Translate an obs-websocket event into a mirror notification
fn notification_for(event: Event) -> Option<Notification> {
    let notification = match event {
        Event::SceneCreated { .. }
        | Event::SceneRemoved { .. }
        | Event::SceneNameChanged { .. }
        | Event::SceneListChanged { .. } => Notification::ScenesChanged,

        Event::CurrentProgramSceneChanged { name } => Notification::SwitchScenes { scene_name: name },
        Event::CurrentPreviewSceneChanged { name } => {
            Notification::PreviewSceneChanged { scene_name: name }
        },

        // No list event exists; the active transition changing is the closest signal
        Event::CurrentSceneTransitionChanged { .. } => Notification::TransitionListChanged,

        Event::StreamStateChanged { state, .. } => match state {
            OutputState::Starting => Notification::StreamStarting,
            OutputState::Started => Notification::StreamStarted,
            OutputState::Stopping => Notification::StreamStopping,
            OutputState::Stopped => Notification::StreamStopped,
            _ => return None,
        },

        Event::InputMuteStateChanged { name, muted, .. } => Notification::SourceMuteStateChanged {
            source_name: name,
            muted,
        },
        Event::InputNameChanged {
            old_name, new_name, ..
        } => Notification::SourceRenamed {
            previous_name: old_name,
            new_name,
        },
        Event::InputCreated { name, .. } => Notification::SourceRenamed {
            previous_name: String::new(),
            new_name: name,
        },
        Event::InputRemoved { name, .. } => Notification::SourceRenamed {
            previous_name: name,
            new_name: String::new(),
        },

        _ => return None,
    };
    Some(notification)
}

/// Requests over a live obs-websocket connection
struct ObsRemote {
    client: obws::Client,
}

#[async_trait]
impl RemoteControl for ObsRemote {
    async fn scene_names(&self) -> RemoteResult<Vec<String>> {
        let list = self.client.scenes().list().await?;
        Ok(list.scenes.into_iter().map(|scene| scene.name).collect())
    }

    async fn current_scene(&self) -> RemoteResult<String> {
        Ok(self.client.scenes().current_program_scene().await?)
    }

    async fn transition_names(&self) -> RemoteResult<Vec<String>> {
        let list = self.client.transitions().list().await?;
        Ok(list
            .transitions
            .into_iter()
            .map(|transition| transition.name)
            .collect())
    }

    async fn preview_scene(&self) -> RemoteResult<String> {
        Ok(self.client.scenes().current_preview_scene().await?)
    }

    async fn source_names(&self) -> RemoteResult<Vec<String>> {
        let inputs = self.client.inputs().list(None).await?;
        Ok(inputs.into_iter().map(|input| input.name).collect())
    }

    async fn streaming_active(&self) -> RemoteResult<bool> {
        Ok(self.client.streaming().status().await?.active)
    }

    async fn is_muted(&self, source: &str) -> RemoteResult<bool> {
        Ok(self.client.inputs().muted(source).await?)
    }

    async fn set_preview_scene(&self, scene: &str) -> RemoteResult<()> {
        Ok(self.client.scenes().set_current_preview_scene(scene).await?)
    }

    async fn transition_to_program(&self, transition: &str) -> RemoteResult<()> {
        self.client.transitions().set_current(transition).await?;
        Ok(self.client.transitions().trigger().await?)
    }

    async fn toggle_mute(&self, source: &str) -> RemoteResult<()> {
        self.client.inputs().toggle_mute(source).await?;
        Ok(())
    }

    async fn toggle_streaming(&self) -> RemoteResult<()> {
        self.client.streaming().toggle().await?;
        Ok(())
    }

    async fn enable_studio_mode(&self) -> RemoteResult<()> {
        Ok(self.client.ui().set_studio_mode_enabled(true).await?)
    }
}
