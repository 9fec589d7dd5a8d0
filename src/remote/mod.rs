//! Remote state mirror - OBS scenes, transitions, audio sources and streaming
//!
//! The mirror keeps an identifier-keyed copy of the parts of OBS that follow
//! the naming conventions in [`crate::ids`], publishes [`MirrorEvent`]s when
//! they change, and turns surface requests into OBS requests.
//!
//! All state lives in a single [`MirrorActor`](actor::MirrorActor) task;
//! everything else talks to it through a [`MirrorHandle`].

mod actor;
mod events;
mod handle;
mod names;
pub mod obs;
mod state;
mod transport;

#[cfg(test)]
mod tests;

pub use events::{MirrorEvent, StreamingState};
pub use handle::MirrorHandle;
pub use names::NameTable;
pub use obs::ObsConnector;
pub use state::{MirrorSnapshot, MirrorState};
pub use transport::{
    Connector, Notification, RemoteControl, RemoteError, RemoteResult, Session,
};
