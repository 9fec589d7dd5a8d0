//! Launchpad button decoding
//!
//! Buttons act on release. Presses only light the pad on the device itself.

use super::lighting::SlotTable;
use super::STREAM_CC;
use crate::ids::{AudioId, SceneId, TransitionId};
use crate::midi::MidiMessage;
use crate::remote::MirrorHandle;
use tracing::{debug, trace};

/// What a button release asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    SelectPreviewScene(SceneId),
    ExecuteTransition(TransitionId),
    ToggleMute(AudioId),
    ToggleStreaming,
}

/// Receiver of decoded actions
pub trait CommandSink {
    fn select_preview_scene(&self, id: SceneId);
    fn execute_transition(&self, id: TransitionId);
    fn toggle_mute(&self, id: AudioId);
    fn toggle_streaming(&self);
}

impl<T: CommandSink + ?Sized> CommandSink for &T {
    fn select_preview_scene(&self, id: SceneId) {
        (**self).select_preview_scene(id);
    }

    fn execute_transition(&self, id: TransitionId) {
        (**self).execute_transition(id);
    }

    fn toggle_mute(&self, id: AudioId) {
        (**self).toggle_mute(id);
    }

    fn toggle_streaming(&self) {
        (**self).toggle_streaming();
    }
}

impl CommandSink for MirrorHandle {
    fn select_preview_scene(&self, id: SceneId) {
        MirrorHandle::select_preview_scene(self, id);
    }

    fn execute_transition(&self, id: TransitionId) {
        MirrorHandle::execute_transition(self, id);
    }

    fn toggle_mute(&self, id: AudioId) {
        MirrorHandle::toggle_mute(self, id);
    }

    fn toggle_streaming(&self) {
        MirrorHandle::toggle_streaming(self);
    }
}

/// Decode one input message against the current button tables
pub fn decode(
    message: &MidiMessage,
    transitions: &SlotTable<TransitionId>,
    audio: &SlotTable<AudioId>,
) -> Option<InputAction> {
    let (note, velocity) = message.key();
    if velocity != 0 {
        trace!("Press on {} ignored", note);
        return None;
    }

    if note == STREAM_CC {
        return Some(InputAction::ToggleStreaming);
    }
    if let Some(id) = SceneId::from_note(note) {
        return Some(InputAction::SelectPreviewScene(id));
    }
    if transitions.notes().contains(&note) {
        return transitions.id_at(note).map(InputAction::ExecuteTransition);
    }
    if audio.notes().contains(&note) {
        return audio.id_at(note).map(InputAction::ToggleMute);
    }
    None
}

/// Forward an action to the mirror
pub fn dispatch<S: CommandSink + ?Sized>(action: InputAction, sink: &S) {
    debug!(?action, "Launchpad action");

    match action {
        InputAction::SelectPreviewScene(id) => sink.select_preview_scene(id),
        InputAction::ExecuteTransition(id) => sink.execute_transition(id),
        InputAction::ToggleMute(id) => sink.toggle_mute(id),
        InputAction::ToggleStreaming => sink.toggle_streaming(),
    }
}
