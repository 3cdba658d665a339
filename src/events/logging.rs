//! Bridge from lifecycle events to `tracing`.
//!
//! [`TracingObserver`] turns every [`Event`] into a structured tracing event.
//! Unhandled messages are logged at `warn`, state changes at `debug` and the
//! chatty queue/match events at `trace`.
//!
//! ```bash
//! # Only unhandled messages
//! RUST_LOG=warn cargo run --example counter
//!
//! # Creation, removal, new data and snapshot restores
//! RUST_LOG=statetree=debug cargo run --example counter
//!
//! # Every queued and matched message as well
//! RUST_LOG=statetree=trace cargo run --example counter
//! ```

use super::{Event, Observer};
use tracing::{debug, trace, warn};

/// [`Observer`] logging every lifecycle event through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &Event<'_>) {
        match *event {
            Event::StateCreated { path, .. } => debug!(path = %path.join("/"), "State created"),
            Event::StateRemoved { path, .. } => debug!(path = %path.join("/"), "State removed"),
            Event::StateNewData { path, message, .. } => {
                debug!(path = %path.join("/"), tag = message.tag(), "State updated")
            }
            Event::MessageQueued { message, source } => {
                trace!(tag = message.tag(), source = %source.join("/"), "Message queued")
            }
            Event::MessageMatched {
                message,
                path,
                passive,
            } => trace!(
                tag = message.tag(),
                path = %path.join("/"),
                passive,
                "Message matched"
            ),
            Event::UnhandledMessage { message, source } => warn!(
                tag = message.tag(),
                source = %source.join("/"),
                payload = %message.payload(),
                "Unhandled message"
            ),
            Event::SnapshotRestore { snapshot } => {
                debug!(states = snapshot.len(), "Restoring snapshot")
            }
            Event::SnapshotRestored => debug!("Snapshot restored"),
        }
    }
}
