//! Identifier codec
//!
//! OBS entities take part in the Launchpad mapping only when their name starts
//! with a fixed prefix:
//!
//! - scenes: `"R.C."` with row and column in `1..=8` (e.g. `"2.5. Interview"`)
//! - transitions: `"N."` with `N` in `1..=3` (e.g. `"2.Fade"`), or a transition
//!   literally named "cut" / "обрезка" which takes slot `"1"`
//! - audio sources: `"N.audio."` with `N` in `1..=4` (e.g. `"1.audio.Mic"`)
//!
//! Everything after the prefix is free text. Names that do not match are simply
//! not mapped; decoding never fails loudly.

use std::fmt;

/// Grid size of the scene matrix (rows and columns)
pub const GRID_SIZE: u8 = 8;

/// Highest numbered transition slot
pub const MAX_TRANSITION_INDEX: u8 = 3;

/// Highest audio source slot
pub const MAX_AUDIO_INDEX: u8 = 4;

/// Transition names that map to the cut slot when they carry no prefix
const CUT_NAMES: [&str; 2] = ["cut", "обрезка"];

/// Scene position on the 8x8 grid (row 1 is the top row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId {
    pub row: u8,
    pub column: u8,
}

impl SceneId {
    /// Build a scene id, rejecting positions outside the grid
    pub fn new(row: u8, column: u8) -> Option<Self> {
        let valid = (1..=GRID_SIZE).contains(&row) && (1..=GRID_SIZE).contains(&column);
        valid.then_some(Self { row, column })
    }

    /// Launchpad note for this grid position: `(9 - row) * 10 + column`
    pub fn note(&self) -> u8 {
        (GRID_SIZE + 1 - self.row) * 10 + self.column
    }

    /// Inverse of [`SceneId::note`] for the 64 grid notes (11..=88)
    pub fn from_note(note: u8) -> Option<Self> {
        let band = note / 10;
        let column = note % 10;
        if !(1..=GRID_SIZE).contains(&band) {
            return None;
        }
        Self::new(GRID_SIZE + 1 - band, column)
    }

    /// Every position of the grid, row-major
    pub fn all() -> impl Iterator<Item = SceneId> {
        (1..=GRID_SIZE).flat_map(|row| (1..=GRID_SIZE).map(move |column| SceneId { row, column }))
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.", self.row, self.column)
    }
}

/// Transition slot
///
/// `Cut` is declared first so that the derived ordering matches the textual
/// ordering of the identifiers (`"1"` < `"1."` < `"2."` < `"3."`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransitionId {
    /// A transition named "cut" (any case) or "обрезка" without a numeric prefix
    Cut,
    /// A transition named `"N.<anything>"`
    Numbered(u8),
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionId::Cut => write!(f, "1"),
            TransitionId::Numbered(n) => write!(f, "{}.", n),
        }
    }
}

/// Audio source slot (`1..=4`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AudioId(pub u8);

impl fmt::Display for AudioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.audio.", self.0)
    }
}

/// Read a single ASCII digit within `1..=max` at `pos`
fn digit_at(bytes: &[u8], pos: usize, max: u8) -> Option<u8> {
    let b = *bytes.get(pos)?;
    if !b.is_ascii_digit() {
        return None;
    }
    let value = b - b'0';
    (1..=max).contains(&value).then_some(value)
}

fn dot_at(bytes: &[u8], pos: usize) -> bool {
    bytes.get(pos) == Some(&b'.')
}

/// Decode a scene name of the form `"R.C.<anything>"`
pub fn scene_id(name: &str) -> Option<SceneId> {
    let bytes = name.as_bytes();
    let row = digit_at(bytes, 0, GRID_SIZE)?;
    if !dot_at(bytes, 1) {
        return None;
    }
    let column = digit_at(bytes, 2, GRID_SIZE)?;
    if !dot_at(bytes, 3) {
        return None;
    }
    Some(SceneId { row, column })
}

/// Decode a transition name of the form `"N.<anything>"`, falling back to the
/// cut slot for an unprefixed "cut" / "обрезка"
pub fn transition_id(name: &str) -> Option<TransitionId> {
    let bytes = name.as_bytes();
    if let Some(n) = digit_at(bytes, 0, MAX_TRANSITION_INDEX) {
        if dot_at(bytes, 1) {
            return Some(TransitionId::Numbered(n));
        }
    }

    let lowered = name.to_lowercase();
    CUT_NAMES
        .iter()
        .any(|cut| lowered == *cut)
        .then_some(TransitionId::Cut)
}

/// Decode an audio source name of the form `"N.audio.<anything>"`
pub fn audio_source_id(name: &str) -> Option<AudioId> {
    let bytes = name.as_bytes();
    let n = digit_at(bytes, 0, MAX_AUDIO_INDEX)?;
    if bytes.get(1..8) != Some(b".audio.".as_slice()) {
        return None;
    }
    Some(AudioId(n))
}
