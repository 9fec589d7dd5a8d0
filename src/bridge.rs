//! Bridge - the main event loop between the Launchpad and the OBS mirror
//!
//! One task owns the lighting driver. Mirror events update the lights, and
//! Launchpad input is decoded against the lighting tables and sent back to
//! the mirror as commands.

use crate::midi::MidiMessage;
use crate::remote::MirrorEvent;
use crate::surface::{decode, dispatch, CommandSink, LedOutput, Lighting};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

pub struct Bridge<O, S> {
    lighting: Lighting<O>,
    commands: S,
    events: mpsc::UnboundedReceiver<MirrorEvent>,
    input: mpsc::Receiver<MidiMessage>,
}

impl<O, S> Bridge<O, S>
where
    O: LedOutput,
    S: CommandSink,
{
    pub fn new(
        output: O,
        commands: S,
        events: mpsc::UnboundedReceiver<MirrorEvent>,
        input: mpsc::Receiver<MidiMessage>,
    ) -> Self {
        Self {
            lighting: Lighting::new(output),
            commands,
            events,
            input,
        }
    }

    /// Run until `shutdown` resolves or both event sources are gone
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        info!("Starting bridge loop...");

        self.lighting.clear_grid();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(event) = self.events.recv() => {
                    self.lighting.handle(&event);
                }

                Some(message) = self.input.recv() => {
                    self.on_input(&message);
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping bridge loop");
                    break;
                }

                else => {
                    debug!("Mirror and surface channels closed");
                    break;
                }
            }
        }
    }

    fn on_input(&self, message: &MidiMessage) {
        trace!("Launchpad input: {}", message);

        if let Some(action) = decode(
            message,
            self.lighting.transitions(),
            self.lighting.audio(),
        ) {
            dispatch(action, &self.commands);
        }
    }
}
