//! MIDI message types
//!
//! The Launchpad only speaks short channel messages: note on/off for the grid
//! and side buttons, control change for the top row.

use std::fmt;

/// Channel messages exchanged with the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },
}

impl MidiMessage {
    /// Parse a three byte channel message; anything else is `None`
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 3 {
            return None;
        }

        let status = data[0];
        let channel = status & 0x0F;
        let data1 = data[1] & 0x7F;
        let data2 = data[2] & 0x7F;

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff {
                channel,
                note: data1,
                velocity: data2,
            }),
            // Note On with velocity 0 is a Note Off
            0x90 if data2 == 0 => Some(MidiMessage::NoteOff {
                channel,
                note: data1,
                velocity: 0,
            }),
            0x90 => Some(MidiMessage::NoteOn {
                channel,
                note: data1,
                velocity: data2,
            }),
            0xB0 => Some(MidiMessage::ControlChange {
                channel,
                cc: data1,
                value: data2,
            }),
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                [0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            },
            MidiMessage::NoteOn { channel, note, velocity } => {
                [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            },
            MidiMessage::ControlChange { channel, cc, value } => {
                [0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            },
        }
    }

    /// Button address and velocity carried by the message
    ///
    /// Note Off reports velocity 0 (release). Control changes report the
    /// controller number as the note.
    pub fn key(&self) -> (u8, u8) {
        match *self {
            MidiMessage::NoteOff { note, .. } => (note, 0),
            MidiMessage::NoteOn { note, velocity, .. } => (note, velocity),
            MidiMessage::ControlChange { cc, value, .. } => (cc, value),
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            },
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            },
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            },
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
