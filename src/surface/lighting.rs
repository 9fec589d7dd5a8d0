//! Surface illumination - mirror events to Launchpad lights
//!
//! Owns the button <-> identifier tables for the transition and audio
//! columns; the scene grid needs no table since positions are computed from
//! the identifier itself.

use super::{
    palette, LedOutput, AUDIO_NOTES, PRIMARY_CHANNEL, SECONDARY_CHANNEL, STREAM_CC,
    TRANSITION_NOTES,
};
use crate::ids::{AudioId, SceneId, TransitionId};
use crate::midi::MidiMessage;
use crate::remote::{MirrorEvent, StreamingState};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Number of MIDI channels cleared on a full grid reset
const MIDI_CHANNELS: u8 = 16;

/// Fixed set of buttons assigned to the lowest sorted identifiers
#[derive(Debug, Clone)]
pub struct SlotTable<K> {
    notes: [u8; 4],
    by_id: BTreeMap<K, u8>,
}

impl<K: Ord + Copy> SlotTable<K> {
    pub fn new(notes: [u8; 4]) -> Self {
        Self {
            notes,
            by_id: BTreeMap::new(),
        }
    }

    /// Replace the table; identifiers past the last button are dropped
    pub fn rebuild(&mut self, ids: &[K]) {
        let mut sorted = ids.to_vec();
        sorted.sort();
        sorted.dedup();

        self.by_id = sorted
            .into_iter()
            .zip(self.notes.iter().copied())
            .collect();
    }

    pub fn note_of(&self, id: &K) -> Option<u8> {
        self.by_id.get(id).copied()
    }

    pub fn id_at(&self, note: u8) -> Option<K> {
        self.by_id
            .iter()
            .find_map(|(id, n)| (*n == note).then_some(*id))
    }

    /// The fixed buttons, whether assigned or not
    pub fn notes(&self) -> &[u8; 4] {
        &self.notes
    }

    /// Assigned `(id, note)` pairs in slot order
    pub fn entries(&self) -> Vec<(K, u8)> {
        self.by_id.iter().map(|(id, note)| (*id, *note)).collect()
    }
}

/// Lights the Launchpad from mirror events
pub struct Lighting<O> {
    output: O,
    transitions: SlotTable<TransitionId>,
    audio: SlotTable<AudioId>,
    /// Last program scene we were told about
    current: Option<SceneId>,
    /// Last preview scene we were told about
    preview: Option<SceneId>,
}

impl<O: LedOutput> Lighting<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            transitions: SlotTable::new(TRANSITION_NOTES),
            audio: SlotTable::new(AUDIO_NOTES),
            current: None,
            preview: None,
        }
    }

    pub fn transitions(&self) -> &SlotTable<TransitionId> {
        &self.transitions
    }

    pub fn audio(&self) -> &SlotTable<AudioId> {
        &self.audio
    }

    pub fn handle(&mut self, event: &MirrorEvent) {
        debug!(?event, "Lighting");

        match event {
            MirrorEvent::ScenesListChanged(ids) => self.scenes_list(ids),
            MirrorEvent::CurrentSceneChanged { previous, current } => {
                self.restore_scene(*previous);
                self.light_scene(self.preview, palette::SCENE_PREVIEW);
                self.light_scene(*current, palette::SCENE_CURRENT);
                self.current = *current;
            },
            MirrorEvent::PreviewSceneChanged { previous, current } => {
                self.restore_scene(*previous);
                self.light_scene(*current, palette::SCENE_PREVIEW);
                self.light_scene(self.current, palette::SCENE_CURRENT);
                self.preview = *current;
            },
            MirrorEvent::TransitionListChanged(ids) => self.transition_list(ids),
            MirrorEvent::AudioListChanged(ids) => {
                self.clear_notes(AUDIO_NOTES);
                self.audio.rebuild(ids);
            },
            MirrorEvent::AudioMuteChanged { id, muted } => {
                if let Some(note) = self.audio.note_of(id) {
                    let velocity = if *muted {
                        palette::AUDIO_MUTED
                    } else {
                        palette::AUDIO_UNMUTED
                    };
                    self.note_on(PRIMARY_CHANNEL, note, velocity);
                }
            },
            MirrorEvent::StreamingStatusChanged(state) => self.streaming(*state),
        }
    }

    /// Turn off every grid light on every channel
    pub fn clear_grid(&self) {
        for channel in 0..MIDI_CHANNELS {
            for id in SceneId::all() {
                self.note_on(channel, id.note(), palette::OFF);
            }
        }
    }

    fn scenes_list(&self, ids: &[SceneId]) {
        self.clear_grid();
        for id in ids {
            self.note_on(PRIMARY_CHANNEL, id.note(), palette::SCENE_EXISTS);
        }
    }

    fn transition_list(&mut self, ids: &[TransitionId]) {
        self.clear_notes(TRANSITION_NOTES);
        self.transitions.rebuild(ids);

        for (slot, (_, note)) in self.transitions.entries().into_iter().enumerate() {
            let velocity = if slot == 0 {
                palette::TRANSITION_DEFAULT
            } else {
                palette::TRANSITION_AVAILABLE
            };
            self.note_on(PRIMARY_CHANNEL, note, velocity);
        }
    }

    fn streaming(&self, state: StreamingState) {
        let channel = if state.is_transitional() {
            SECONDARY_CHANNEL
        } else {
            PRIMARY_CHANNEL
        };
        let value = if state.is_active() {
            palette::STREAM_ACTIVE
        } else {
            palette::STREAM_INACTIVE
        };
        self.send(&MidiMessage::ControlChange {
            channel,
            cc: STREAM_CC,
            value,
        });
    }

    /// Back to the plain "exists" color
    fn restore_scene(&self, id: Option<SceneId>) {
        self.light_scene(id, palette::SCENE_EXISTS);
    }

    fn light_scene(&self, id: Option<SceneId>, velocity: u8) {
        if let Some(id) = id {
            self.note_on(PRIMARY_CHANNEL, id.note(), velocity);
        }
    }

    fn clear_notes(&self, notes: [u8; 4]) {
        for note in notes {
            self.note_on(PRIMARY_CHANNEL, note, palette::OFF);
        }
    }

    fn note_on(&self, channel: u8, note: u8, velocity: u8) {
        self.send(&MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        });
    }

    fn send(&self, message: &MidiMessage) {
        if let Err(e) = self.output.send(message) {
            warn!("Launchpad write failed: {:#}", e);
        }
    }
}
