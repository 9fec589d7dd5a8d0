//! Tests for the remote state mirror

use super::*;
use crate::ids::{AudioId, SceneId, TransitionId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// In-memory OBS that records every mutating request
#[derive(Default)]
struct FakeRemote {
    scenes: Mutex<Vec<String>>,
    current: Mutex<String>,
    preview: Mutex<String>,
    transitions: Mutex<Vec<String>>,
    sources: Mutex<Vec<String>>,
    muted: Mutex<HashMap<String, bool>>,
    streaming: Mutex<bool>,
    /// Delay applied to scene list requests
    scene_delay: Mutex<Duration>,
    /// Delay applied to preview scene requests
    preview_delay: Mutex<Duration>,
    /// Requests that answer with an error
    failing: Mutex<Vec<&'static str>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRemote {
    fn studio() -> Arc<Self> {
        let remote = FakeRemote::default();
        *remote.scenes.lock() = strings(&["1.1.Wide", "1.4.Slides", "2.2.Interview", "Backstage"]);
        *remote.current.lock() = "1.1.Wide".to_string();
        *remote.preview.lock() = "2.2.Interview".to_string();
        *remote.transitions.lock() = strings(&["Cut", "Fade", "2.Swipe"]);
        *remote.sources.lock() = strings(&["1.audio.Mic", "Camera", "2.audio.Desktop"]);
        remote.muted.lock().insert("1.audio.Mic".to_string(), true);
        Arc::new(remote)
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn fail(&self, request: &'static str) {
        self.failing.lock().push(request);
    }

    fn check(&self, request: &'static str) -> RemoteResult<()> {
        if self.failing.lock().contains(&request) {
            return Err(RemoteError::Request(format!("{} rejected", request)));
        }
        Ok(())
    }
}

async fn sleep_for(delay: &Mutex<Duration>) {
    let delay = *delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl RemoteControl for FakeRemote {
    async fn scene_names(&self) -> RemoteResult<Vec<String>> {
        sleep_for(&self.scene_delay).await;
        self.check("GetSceneList")?;
        Ok(self.scenes.lock().clone())
    }

    async fn current_scene(&self) -> RemoteResult<String> {
        self.check("GetCurrentScene")?;
        Ok(self.current.lock().clone())
    }

    async fn transition_names(&self) -> RemoteResult<Vec<String>> {
        self.check("GetTransitionList")?;
        Ok(self.transitions.lock().clone())
    }

    async fn preview_scene(&self) -> RemoteResult<String> {
        sleep_for(&self.preview_delay).await;
        self.check("GetPreviewScene")?;
        Ok(self.preview.lock().clone())
    }

    async fn source_names(&self) -> RemoteResult<Vec<String>> {
        self.check("GetSourcesList")?;
        Ok(self.sources.lock().clone())
    }

    async fn streaming_active(&self) -> RemoteResult<bool> {
        self.check("GetStreamStatus")?;
        Ok(*self.streaming.lock())
    }

    async fn is_muted(&self, source: &str) -> RemoteResult<bool> {
        self.check("GetMute")?;
        Ok(self.muted.lock().get(source).copied().unwrap_or(false))
    }

    async fn set_preview_scene(&self, scene: &str) -> RemoteResult<()> {
        self.record(format!("SetPreviewScene({})", scene));
        self.check("SetPreviewScene")
    }

    async fn transition_to_program(&self, transition: &str) -> RemoteResult<()> {
        self.record(format!("TransitionToProgram({})", transition));
        self.check("TransitionToProgram")
    }

    async fn toggle_mute(&self, source: &str) -> RemoteResult<()> {
        self.record(format!("ToggleMute({})", source));
        self.check("ToggleMute")
    }

    async fn toggle_streaming(&self) -> RemoteResult<()> {
        self.record("StartStopStreaming".to_string());
        self.check("StartStopStreaming")
    }

    async fn enable_studio_mode(&self) -> RemoteResult<()> {
        self.record("EnableStudioMode".to_string());
        self.check("EnableStudioMode")
    }
}

/// Hands out sessions on [`FakeRemote`], optionally refusing the first attempts
struct FakeConnector {
    remote: Arc<FakeRemote>,
    failures: Mutex<usize>,
    attempts: AtomicUsize,
    sessions: Mutex<Vec<mpsc::Sender<Notification>>>,
}

impl FakeConnector {
    fn new(remote: Arc<FakeRemote>) -> Arc<Self> {
        Self::failing(remote, 0)
    }

    fn failing(remote: Arc<FakeRemote>, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            remote,
            failures: Mutex::new(failures),
            attempts: AtomicUsize::new(0),
            sessions: Mutex::new(Vec::new()),
        })
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Push a notification into the most recent session
    async fn notify(&self, notification: Notification) {
        let tx = self.sessions.lock().last().cloned().expect("no session");
        tx.send(notification).await.expect("session closed");
    }

    /// Drop every open session, as if OBS went away
    fn drop_sessions(&self) {
        self.sessions.lock().clear();
    }
}

#[async_trait]
impl Connector for FakeConnector {
    fn endpoint(&self) -> String {
        "fake:4444".to_string()
    }

    async fn connect(&self) -> anyhow::Result<Session> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                anyhow::bail!("connection refused");
            }
        }

        let (tx, notifications) = mpsc::channel(16);
        self.sessions.lock().push(tx);
        Ok(Session {
            remote: self.remote.clone(),
            notifications,
        })
    }
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn scene(row: u8, column: u8) -> SceneId {
    SceneId::new(row, column).unwrap()
}

/// Poll the mirror until `ready` holds
async fn wait_for(handle: &MirrorHandle, ready: impl Fn(&MirrorSnapshot) -> bool) -> MirrorSnapshot {
    let poll = async {
        loop {
            if let Some(snapshot) = handle.snapshot().await {
                if ready(&snapshot) {
                    return snapshot;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), poll)
        .await
        .expect("mirror never reached the expected state")
}

fn onboarded(snapshot: &MirrorSnapshot) -> bool {
    snapshot.connected
        && !snapshot.scenes.is_empty()
        && !snapshot.transitions.is_empty()
        && !snapshot.audio_sources.is_empty()
        && snapshot.preview_scene.is_some()
        && snapshot.current_scene.is_some()
}

async fn connected_mirror(remote: Arc<FakeRemote>) -> (MirrorHandle, Arc<FakeConnector>) {
    let connector = FakeConnector::new(remote);
    let handle = MirrorHandle::spawn(connector.clone(), Duration::from_millis(10));
    handle.connect();
    wait_for(&handle, onboarded).await;
    // Let the mute queries land
    tokio::time::sleep(Duration::from_millis(30)).await;
    (handle, connector)
}

/// Subscribe and make sure the actor registered the subscriber
async fn subscribe(handle: &MirrorHandle) -> mpsc::UnboundedReceiver<MirrorEvent> {
    let rx = handle.subscribe();
    handle.snapshot().await;
    rx
}

/// Drain whatever events arrived so far
async fn drain(rx: &mut mpsc::UnboundedReceiver<MirrorEvent>) -> Vec<MirrorEvent> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_onboarding_loads_everything() {
    let remote = FakeRemote::studio();
    let connector = FakeConnector::new(remote.clone());
    let handle = MirrorHandle::spawn(connector.clone(), Duration::from_millis(10));
    let mut events = handle.subscribe();

    handle.connect();
    let snapshot = wait_for(&handle, onboarded).await;

    assert_eq!(snapshot.scenes, vec![scene(1, 1), scene(1, 4), scene(2, 2)]);
    assert_eq!(
        snapshot.transitions,
        vec![TransitionId::Cut, TransitionId::Numbered(2)]
    );
    assert_eq!(snapshot.audio_sources, vec![AudioId(1), AudioId(2)]);
    assert_eq!(snapshot.current_scene, Some(scene(1, 1)));
    assert_eq!(snapshot.preview_scene, Some(scene(2, 2)));
    assert_eq!(snapshot.streaming, StreamingState::Stopped);

    let events = drain(&mut events).await;
    assert!(events.contains(&MirrorEvent::StreamingStatusChanged(StreamingState::Stopped)));
    assert!(events.contains(&MirrorEvent::AudioMuteChanged {
        id: AudioId(1),
        muted: true,
    }));
    assert!(events.contains(&MirrorEvent::AudioMuteChanged {
        id: AudioId(2),
        muted: false,
    }));

    // Scene list comes before the current scene it carries
    let list = events
        .iter()
        .position(|e| matches!(e, MirrorEvent::ScenesListChanged(_)))
        .unwrap();
    let current = events
        .iter()
        .position(|e| matches!(e, MirrorEvent::CurrentSceneChanged { .. }))
        .unwrap();
    assert!(list < current);

    assert!(remote.calls().contains(&"EnableStudioMode".to_string()));
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_select_preview_scene_requests_without_mutating() {
    let remote = FakeRemote::studio();
    let (handle, _connector) = connected_mirror(remote.clone()).await;

    handle.select_preview_scene(scene(1, 4));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(remote.calls().contains(&"SetPreviewScene(1.4.Slides)".to_string()));
    // Preview only moves when OBS says so
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.preview_scene, Some(scene(2, 2)));
}

#[tokio::test]
async fn test_commands_on_unknown_ids_are_ignored() {
    let remote = FakeRemote::studio();
    let (handle, _connector) = connected_mirror(remote.clone()).await;
    let before = remote.calls().len();

    handle.select_preview_scene(scene(8, 8));
    handle.execute_transition(TransitionId::Numbered(3));
    handle.toggle_mute(AudioId(4));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(remote.calls().len(), before);
}

#[tokio::test]
async fn test_transition_mute_and_streaming_commands() {
    let remote = FakeRemote::studio();
    let (handle, _connector) = connected_mirror(remote.clone()).await;

    handle.execute_transition(TransitionId::Cut);
    handle.toggle_mute(AudioId(2));
    handle.toggle_streaming();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let calls = remote.calls();
    assert!(calls.contains(&"TransitionToProgram(Cut)".to_string()));
    assert!(calls.contains(&"ToggleMute(2.audio.Desktop)".to_string()));
    assert!(calls.contains(&"StartStopStreaming".to_string()));

    // Streaming state waits for OBS
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.streaming, StreamingState::Stopped);
}

#[tokio::test]
async fn test_commands_before_connect_are_dropped() {
    let remote = FakeRemote::studio();
    let connector = FakeConnector::new(remote.clone());
    let handle = MirrorHandle::spawn(connector, Duration::from_millis(10));

    handle.toggle_streaming();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn test_notifications_update_mirror() {
    let remote = FakeRemote::studio();
    let (handle, connector) = connected_mirror(remote).await;
    let mut events = subscribe(&handle).await;

    connector
        .notify(Notification::SwitchScenes {
            scene_name: "2.2.Interview".to_string(),
        })
        .await;
    connector
        .notify(Notification::PreviewSceneChanged {
            scene_name: "1.4.Slides".to_string(),
        })
        .await;
    connector.notify(Notification::StreamStarting).await;
    connector
        .notify(Notification::SourceMuteStateChanged {
            source_name: "2.audio.Desktop".to_string(),
            muted: true,
        })
        .await;

    let events = drain(&mut events).await;
    assert_eq!(
        events,
        vec![
            MirrorEvent::CurrentSceneChanged {
                previous: Some(scene(1, 1)),
                current: Some(scene(2, 2)),
            },
            MirrorEvent::PreviewSceneChanged {
                previous: Some(scene(2, 2)),
                current: Some(scene(1, 4)),
            },
            MirrorEvent::StreamingStatusChanged(StreamingState::Starting),
            MirrorEvent::AudioMuteChanged {
                id: AudioId(2),
                muted: true,
            },
        ]
    );

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.streaming, StreamingState::Starting);
}

#[tokio::test]
async fn test_mute_notification_for_unregistered_source_is_ignored() {
    let remote = FakeRemote::studio();
    let (handle, connector) = connected_mirror(remote).await;
    let mut events = subscribe(&handle).await;

    connector
        .notify(Notification::SourceMuteStateChanged {
            source_name: "3.audio.Music".to_string(),
            muted: true,
        })
        .await;
    connector
        .notify(Notification::SourceMuteStateChanged {
            source_name: "Camera".to_string(),
            muted: true,
        })
        .await;

    assert!(drain(&mut events).await.is_empty());
}

#[tokio::test]
async fn test_rename_into_convention_reloads_sources() {
    let remote = FakeRemote::studio();
    let (handle, connector) = connected_mirror(remote.clone()).await;

    *remote.sources.lock() = strings(&["1.audio.Mic", "2.audio.Desktop", "3.audio.Music"]);
    connector
        .notify(Notification::SourceRenamed {
            previous_name: "Music".to_string(),
            new_name: "3.audio.Music".to_string(),
        })
        .await;

    let snapshot = wait_for(&handle, |s| s.audio_sources.len() == 3).await;
    assert_eq!(
        snapshot.audio_sources,
        vec![AudioId(1), AudioId(2), AudioId(3)]
    );
}

#[tokio::test]
async fn test_scene_structure_change_reloads_scenes() {
    let remote = FakeRemote::studio();
    let (handle, connector) = connected_mirror(remote.clone()).await;

    *remote.scenes.lock() = strings(&["1.1.Wide", "3.3.Outro"]);
    connector.notify(Notification::ScenesChanged).await;

    let snapshot = wait_for(&handle, |s| s.scenes.contains(&scene(3, 3))).await;
    assert_eq!(snapshot.scenes, vec![scene(1, 1), scene(3, 3)]);
}

#[tokio::test]
async fn test_connect_retries_until_success() {
    let remote = FakeRemote::studio();
    let connector = FakeConnector::failing(remote, 2);
    let handle = MirrorHandle::spawn(connector.clone(), Duration::from_millis(10));

    handle.connect();
    wait_for(&handle, onboarded).await;

    assert_eq!(connector.attempts(), 3);
}

#[tokio::test]
async fn test_disconnect_discards_state_and_late_responses() {
    let remote = FakeRemote::studio();
    *remote.scene_delay.lock() = Duration::from_millis(100);
    let connector = FakeConnector::new(remote);
    let handle = MirrorHandle::spawn(connector, Duration::from_millis(10));
    let mut events = handle.subscribe();

    handle.connect();
    wait_for(&handle, |s| s.connected && !s.transitions.is_empty()).await;
    handle.disconnect();

    // The scene list answer lands after the disconnect
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot, MirrorSnapshot::default());

    let events = drain(&mut events).await;
    assert!(!events
        .iter()
        .any(|e| matches!(e, MirrorEvent::ScenesListChanged(_))));
}

#[tokio::test]
async fn test_lost_connection_reconnects() {
    let remote = FakeRemote::studio();
    let (handle, connector) = connected_mirror(remote).await;

    connector.notify(Notification::StreamStarted).await;
    wait_for(&handle, |s| s.streaming == StreamingState::Started).await;

    connector.drop_sessions();
    wait_for(&handle, |s| connector.attempts() == 2 && onboarded(s)).await;

    // Fresh session starts from scratch
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.streaming, StreamingState::Stopped);
}

#[tokio::test]
async fn test_no_reconnect_after_disconnect() {
    let remote = FakeRemote::studio();
    let (handle, connector) = connected_mirror(remote).await;

    handle.disconnect();
    connector.drop_sessions();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(connector.attempts(), 1);
    assert!(!handle.snapshot().await.unwrap().connected);
}

#[tokio::test]
async fn test_failed_onboarding_steps_do_not_block_others() {
    let remote = FakeRemote::studio();
    remote.fail("GetTransitionList");
    remote.fail("EnableStudioMode");
    let connector = FakeConnector::new(remote.clone());
    let handle = MirrorHandle::spawn(connector.clone(), Duration::from_millis(10));

    handle.connect();
    let snapshot = wait_for(&handle, |s| {
        s.connected
            && !s.scenes.is_empty()
            && !s.audio_sources.is_empty()
            && s.preview_scene.is_some()
    })
    .await;

    assert_eq!(snapshot.current_scene, Some(scene(1, 1)));
    assert_eq!(snapshot.preview_scene, Some(scene(2, 2)));
    assert!(snapshot.transitions.is_empty());
    assert!(remote.calls().contains(&"EnableStudioMode".to_string()));

    // The session is still alive
    connector
        .notify(Notification::SwitchScenes {
            scene_name: "1.4.Slides".to_string(),
        })
        .await;
    wait_for(&handle, |s| s.current_scene == Some(scene(1, 4))).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_failed_command_keeps_session() {
    let remote = FakeRemote::studio();
    remote.fail("SetPreviewScene");
    remote.fail("StartStopStreaming");
    let (handle, connector) = connected_mirror(remote.clone()).await;

    handle.select_preview_scene(scene(1, 4));
    handle.toggle_streaming();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(remote.calls().contains(&"SetPreviewScene(1.4.Slides)".to_string()));

    handle.execute_transition(TransitionId::Cut);
    connector.notify(Notification::StreamStarted).await;

    let snapshot = wait_for(&handle, |s| s.streaming == StreamingState::Started).await;
    assert!(snapshot.connected);
    assert!(remote.calls().contains(&"TransitionToProgram(Cut)".to_string()));
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_reconnect_picks_up_live_stream() {
    let remote = FakeRemote::studio();
    let (handle, connector) = connected_mirror(remote.clone()).await;

    // The stream keeps running while the websocket drops
    *remote.streaming.lock() = true;
    connector.drop_sessions();

    let snapshot = wait_for(&handle, |s| {
        connector.attempts() == 2 && s.streaming == StreamingState::Started
    })
    .await;
    assert!(snapshot.connected);
}

#[tokio::test]
async fn test_lost_connection_clears_scene_lights_before_late_preview() {
    use crate::surface::testing::RecordingOutput;
    use crate::surface::{palette, Lighting};

    let remote = FakeRemote::studio();
    let connector = FakeConnector::new(remote.clone());
    let handle = MirrorHandle::spawn(connector.clone(), Duration::from_millis(10));
    let mut events = handle.subscribe();

    handle.connect();
    wait_for(&handle, onboarded).await;

    // OBS moves the preview while the connection is down; its answer is slow
    *remote.preview.lock() = "1.4.Slides".to_string();
    *remote.preview_delay.lock() = Duration::from_millis(100);
    connector.drop_sessions();

    wait_for(&handle, |s| s.preview_scene == Some(scene(1, 4))).await;

    let output = RecordingOutput::default();
    let mut lighting = Lighting::new(&output);
    for event in drain(&mut events).await {
        lighting.handle(&event);
    }

    // 2.2. (note 72) was preview before the drop
    assert_eq!(output.last_value(72), Some(palette::SCENE_EXISTS));
    assert_eq!(output.last_value(84), Some(palette::SCENE_PREVIEW));
    assert_eq!(output.last_value(81), Some(palette::SCENE_CURRENT));
}
