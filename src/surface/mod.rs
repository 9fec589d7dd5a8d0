//! Control surface side - Launchpad I/O, button lighting and input decoding
//!
//! Note layout (Launchpad "programmer" numbering, bottom-left is 11):
//!
//! ```text
//!  111                       <- streaming indicator / toggle (CC)
//!  81 82 .. 88 | 89          <- scene row 1        | audio 1
//!  71 72 .. 78 | 79          <- scene row 2        | audio 2
//!  61 62 .. 68 | 69          <- scene row 3        | audio 3
//!  51 52 .. 58 | 59          <- scene row 4        | audio 4
//!  41 42 .. 48 | 49          <- scene row 5        | transition 4
//!  31 32 .. 38 | 39          <- scene row 6        | transition 3
//!  21 22 .. 28 | 29          <- scene row 7        | transition 2
//!  11 12 .. 18 | 19          <- scene row 8        | transition 1
//! ```

pub mod input;
pub mod launchpad;
pub mod lighting;

pub use input::{decode, dispatch, CommandSink, InputAction};
pub use launchpad::LaunchpadDevice;
pub use lighting::{Lighting, SlotTable};

use crate::midi::MidiMessage;
use anyhow::Result;
use std::sync::Arc;

/// Launchpad palette velocities
pub mod palette {
    pub const OFF: u8 = 0;
    pub const SCENE_EXISTS: u8 = 36;
    pub const SCENE_PREVIEW: u8 = 122;
    pub const SCENE_CURRENT: u8 = 5;
    pub const TRANSITION_DEFAULT: u8 = 36;
    pub const TRANSITION_AVAILABLE: u8 = 100;
    pub const AUDIO_MUTED: u8 = 5;
    pub const AUDIO_UNMUTED: u8 = 122;
    pub const STREAM_ACTIVE: u8 = 122;
    pub const STREAM_INACTIVE: u8 = 5;
}

/// Channel for steady lights
pub const PRIMARY_CHANNEL: u8 = 0;

/// Channel for transitional (flashing) lights
pub const SECONDARY_CHANNEL: u8 = 1;

/// Controller number of the streaming button
pub const STREAM_CC: u8 = 111;

/// Transition buttons, first slot at the bottom
pub const TRANSITION_NOTES: [u8; 4] = [19, 29, 39, 49];

/// Audio buttons, first slot at the top
pub const AUDIO_NOTES: [u8; 4] = [89, 79, 69, 59];

/// Sink for lighting commands
///
/// Implementations must treat a missing device as a silent no-op.
pub trait LedOutput {
    fn send(&self, message: &MidiMessage) -> Result<()>;
}

impl<T: LedOutput + ?Sized> LedOutput for &T {
    fn send(&self, message: &MidiMessage) -> Result<()> {
        (**self).send(message)
    }
}

impl<T: LedOutput + ?Sized> LedOutput for Arc<T> {
    fn send(&self, message: &MidiMessage) -> Result<()> {
        (**self).send(message)
    }
}
