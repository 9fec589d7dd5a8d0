//! Mirror state and its transitions
//!
//! Every method here is synchronous and returns the events that the change
//! produces. The actor feeds it query responses and notifications; nothing in
//! here talks to OBS.

use super::events::{MirrorEvent, StreamingState};
use super::names::NameTable;
use crate::ids::{audio_source_id, scene_id, transition_id, AudioId, SceneId, TransitionId};

/// Point-in-time copy of the mirror, for queries
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MirrorSnapshot {
    pub connected: bool,
    pub scenes: Vec<SceneId>,
    pub transitions: Vec<TransitionId>,
    pub audio_sources: Vec<AudioId>,
    pub current_scene: Option<SceneId>,
    pub preview_scene: Option<SceneId>,
    pub streaming: StreamingState,
}

#[derive(Debug, Clone)]
pub struct MirrorState {
    scenes: NameTable<SceneId>,
    transitions: NameTable<TransitionId>,
    audio: NameTable<AudioId>,
    current_scene: Option<SceneId>,
    preview_scene: Option<SceneId>,
    streaming: StreamingState,
}

impl Default for MirrorState {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorState {
    pub fn new() -> Self {
        Self {
            scenes: NameTable::new("Scene"),
            transitions: NameTable::new("Transition"),
            audio: NameTable::new("Audio source"),
            current_scene: None,
            preview_scene: None,
            streaming: StreamingState::Stopped,
        }
    }

    /// Forget everything (disconnect)
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Forget everything after losing the connection
    ///
    /// Unlike [`reset`](Self::reset), returns the events that clear the
    /// preview and program scenes, so observers drop them before the next
    /// session repopulates the mirror.
    pub fn reset_lost(&mut self) -> Vec<MirrorEvent> {
        let previous = std::mem::take(self);

        let mut events = Vec::new();
        if previous.preview_scene.is_some() {
            events.push(MirrorEvent::PreviewSceneChanged {
                previous: previous.preview_scene,
                current: None,
            });
        }
        if previous.current_scene.is_some() {
            events.push(MirrorEvent::CurrentSceneChanged {
                previous: previous.current_scene,
                current: None,
            });
        }
        events
    }

    /// Scene list reloaded; `current` is the program scene reported alongside it
    pub fn apply_scene_list(&mut self, names: Vec<String>, current: Option<String>) -> Vec<MirrorEvent> {
        self.scenes.rebuild(names, scene_id);

        let mut events = vec![MirrorEvent::ScenesListChanged(self.scenes.ids())];
        if let Some(current) = current {
            events.push(self.apply_current_scene(&current));
        }
        events
    }

    /// Program scene switched to `name`
    pub fn apply_current_scene(&mut self, name: &str) -> MirrorEvent {
        let current = scene_id(name);
        let previous = std::mem::replace(&mut self.current_scene, current);
        MirrorEvent::CurrentSceneChanged { previous, current }
    }

    /// Preview scene changed to `name`
    pub fn apply_preview_scene(&mut self, name: &str) -> MirrorEvent {
        let current = scene_id(name);
        let previous = std::mem::replace(&mut self.preview_scene, current);
        MirrorEvent::PreviewSceneChanged { previous, current }
    }

    pub fn apply_transition_list(&mut self, names: Vec<String>) -> MirrorEvent {
        self.transitions.rebuild(names, transition_id);
        MirrorEvent::TransitionListChanged(self.transitions.ids())
    }

    /// Source list reloaded
    ///
    /// Returns the list event and the registered sources whose mute state
    /// must be queried.
    pub fn apply_source_list(&mut self, names: Vec<String>) -> (MirrorEvent, Vec<(AudioId, String)>) {
        self.audio.rebuild(names, audio_source_id);

        let registered = self
            .audio
            .ids()
            .into_iter()
            .filter_map(|id| self.audio.name_of(&id).map(|name| (id, name.to_string())))
            .collect();

        (MirrorEvent::AudioListChanged(self.audio.ids()), registered)
    }

    /// Mute query answered for `source`
    ///
    /// Dropped when the source list was rebuilt in the meantime and `id` no
    /// longer stands for `source`.
    pub fn apply_mute_query(&self, id: AudioId, source: &str, muted: bool) -> Option<MirrorEvent> {
        (self.audio.name_of(&id) == Some(source)).then_some(MirrorEvent::AudioMuteChanged { id, muted })
    }

    /// Mute state changed notification for `source`
    pub fn apply_mute_notification(&self, source: &str, muted: bool) -> Option<MirrorEvent> {
        let id = audio_source_id(source)?;
        self.audio
            .contains(&id)
            .then_some(MirrorEvent::AudioMuteChanged { id, muted })
    }

    /// A rename matters when either side follows the audio naming convention
    pub fn rename_affects_audio(previous: &str, new: &str) -> bool {
        audio_source_id(previous).is_some() || audio_source_id(new).is_some()
    }

    pub fn apply_streaming(&mut self, state: StreamingState) -> MirrorEvent {
        self.streaming = state;
        MirrorEvent::StreamingStatusChanged(state)
    }

    pub fn streaming(&self) -> StreamingState {
        self.streaming
    }

    pub fn current_scene(&self) -> Option<SceneId> {
        self.current_scene
    }

    pub fn preview_scene(&self) -> Option<SceneId> {
        self.preview_scene
    }

    pub fn scene_name(&self, id: &SceneId) -> Option<&str> {
        self.scenes.name_of(id)
    }

    pub fn transition_name(&self, id: &TransitionId) -> Option<&str> {
        self.transitions.name_of(id)
    }

    pub fn audio_name(&self, id: &AudioId) -> Option<&str> {
        self.audio.name_of(id)
    }

    pub fn snapshot(&self, connected: bool) -> MirrorSnapshot {
        MirrorSnapshot {
            connected,
            scenes: self.scenes.ids(),
            transitions: self.transitions.ids(),
            audio_sources: self.audio.ids(),
            current_scene: self.current_scene,
            preview_scene: self.preview_scene,
            streaming: self.streaming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn scene(row: u8, column: u8) -> SceneId {
        SceneId::new(row, column).unwrap()
    }

    #[test]
    fn test_scene_list_emits_list_then_current() {
        let mut state = MirrorState::new();
        let events = state.apply_scene_list(
            names(&["1.1. Wide", "Backstage", "1.2. Close"]),
            Some("1.2. Close".to_string()),
        );

        assert_eq!(
            events,
            vec![
                MirrorEvent::ScenesListChanged(vec![scene(1, 1), scene(1, 2)]),
                MirrorEvent::CurrentSceneChanged {
                    previous: None,
                    current: Some(scene(1, 2)),
                },
            ]
        );
        assert_eq!(state.scene_name(&scene(1, 1)), Some("1.1. Wide"));
    }

    #[test]
    fn test_scene_reload_keeps_current_and_preview() {
        let mut state = MirrorState::new();
        state.apply_scene_list(names(&["1.1.A", "1.2.B"]), None);
        state.apply_current_scene("1.1.A");
        state.apply_preview_scene("1.2.B");

        state.apply_scene_list(names(&["3.3.C"]), None);

        assert_eq!(state.current_scene(), Some(scene(1, 1)));
        assert_eq!(state.preview_scene(), Some(scene(1, 2)));
        assert_eq!(state.scene_name(&scene(1, 1)), None);
    }

    #[test]
    fn test_current_scene_tracks_previous() {
        let mut state = MirrorState::new();
        state.apply_current_scene("1.1.A");

        assert_eq!(
            state.apply_current_scene("2.2.B"),
            MirrorEvent::CurrentSceneChanged {
                previous: Some(scene(1, 1)),
                current: Some(scene(2, 2)),
            }
        );
        // A scene outside the convention clears the current id
        assert_eq!(
            state.apply_current_scene("Backstage"),
            MirrorEvent::CurrentSceneChanged {
                previous: Some(scene(2, 2)),
                current: None,
            }
        );
        assert_eq!(state.current_scene(), None);
    }

    #[test]
    fn test_preview_scene_tracks_previous() {
        let mut state = MirrorState::new();
        assert_eq!(
            state.apply_preview_scene("4.5.Slides"),
            MirrorEvent::PreviewSceneChanged {
                previous: None,
                current: Some(scene(4, 5)),
            }
        );
        assert_eq!(state.preview_scene(), Some(scene(4, 5)));
    }

    #[test]
    fn test_transition_list_with_cut() {
        let mut state = MirrorState::new();
        let event = state.apply_transition_list(names(&["Fade", "Cut", "3.Stinger", "2.Swipe"]));

        assert_eq!(
            event,
            MirrorEvent::TransitionListChanged(vec![
                TransitionId::Cut,
                TransitionId::Numbered(2),
                TransitionId::Numbered(3),
            ])
        );
        assert_eq!(state.transition_name(&TransitionId::Cut), Some("Cut"));
    }

    #[test]
    fn test_source_list_returns_sources_to_query() {
        let mut state = MirrorState::new();
        let (event, registered) =
            state.apply_source_list(names(&["2.audio.Desktop", "Camera", "1.audio.Mic"]));

        assert_eq!(event, MirrorEvent::AudioListChanged(vec![AudioId(1), AudioId(2)]));
        assert_eq!(
            registered,
            vec![
                (AudioId(1), "1.audio.Mic".to_string()),
                (AudioId(2), "2.audio.Desktop".to_string()),
            ]
        );
    }

    #[test]
    fn test_stale_mute_query_is_dropped() {
        let mut state = MirrorState::new();
        state.apply_source_list(names(&["1.audio.Mic"]));
        state.apply_source_list(names(&["1.audio.Headset"]));

        assert_eq!(state.apply_mute_query(AudioId(1), "1.audio.Mic", true), None);
        assert_eq!(
            state.apply_mute_query(AudioId(1), "1.audio.Headset", true),
            Some(MirrorEvent::AudioMuteChanged {
                id: AudioId(1),
                muted: true,
            })
        );
    }

    #[test]
    fn test_mute_notification_requires_registered_source() {
        let mut state = MirrorState::new();
        state.apply_source_list(names(&["1.audio.Mic"]));

        assert_eq!(
            state.apply_mute_notification("1.audio.Mic", false),
            Some(MirrorEvent::AudioMuteChanged {
                id: AudioId(1),
                muted: false,
            })
        );
        assert_eq!(state.apply_mute_notification("3.audio.Music", true), None);
        assert_eq!(state.apply_mute_notification("Camera", true), None);
    }

    #[test]
    fn test_rename_affects_audio() {
        assert!(MirrorState::rename_affects_audio("Mic", "1.audio.Mic"));
        assert!(MirrorState::rename_affects_audio("1.audio.Mic", "Mic"));
        assert!(!MirrorState::rename_affects_audio("Camera", "Camera 2"));
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut state = MirrorState::new();
        state.apply_scene_list(names(&["1.1.A"]), Some("1.1.A".to_string()));
        state.apply_streaming(StreamingState::Started);

        state.reset();

        assert_eq!(state.snapshot(false), MirrorSnapshot::default());
    }

    #[test]
    fn test_reset_lost_clears_preview_then_current() {
        let mut state = MirrorState::new();
        state.apply_scene_list(names(&["1.1.A", "2.2.B"]), Some("1.1.A".to_string()));
        state.apply_preview_scene("2.2.B");

        assert_eq!(
            state.reset_lost(),
            vec![
                MirrorEvent::PreviewSceneChanged {
                    previous: Some(scene(2, 2)),
                    current: None,
                },
                MirrorEvent::CurrentSceneChanged {
                    previous: Some(scene(1, 1)),
                    current: None,
                },
            ]
        );
        assert_eq!(state.snapshot(false), MirrorSnapshot::default());

        // Nothing left to clear
        assert!(state.reset_lost().is_empty());
    }
}
