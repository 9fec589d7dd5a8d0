//! Launchpad GW - OBS Studio control from a Novation Launchpad
//!
//! Mirrors OBS scenes, transitions, audio mutes and streaming state onto the
//! Launchpad lights, and turns button releases back into OBS requests.

pub mod bridge;
pub mod config;
pub mod ids;
pub mod midi;
pub mod remote;
pub mod surface;
