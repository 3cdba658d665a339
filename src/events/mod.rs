//! Lifecycle notifications.
//!
//! The tree reports everything it does through [`Event`]s delivered to the
//! [`Observer`]s registered on its `Storage`. The tree never depends on how
//! the events are transported; observers decide that.
//!
//! Data and init parameters are exposed as `&dyn Any`, observers downcast
//! them to the data type of the model they care about.

use crate::core::Message;
use crate::snapshot::Snapshot;
use std::any::Any;
use std::fmt;

mod logging;

pub use logging::TracingObserver;

/// A lifecycle notification emitted by a `Storage`.
#[derive(Clone, Copy)]
pub enum Event<'a> {
    /// A state was created.
    StateCreated {
        path: &'a [String],
        params: &'a dyn Any,
        data: &'a dyn Any,
    },
    /// A state and its whole subtree were removed.
    StateRemoved { path: &'a [String], data: &'a dyn Any },
    /// A state replaced its data while handling `message`.
    StateNewData {
        data: &'a dyn Any,
        path: &'a [String],
        message: &'a Message,
    },
    /// A message was queued; `source` is the closest state plus the source label.
    MessageQueued {
        message: &'a Message,
        source: &'a [String],
    },
    /// A state (or, with an empty path, a root subscriber) matched a message.
    MessageMatched {
        message: &'a Message,
        path: &'a [String],
        passive: bool,
    },
    /// No active subscription claimed the message.
    UnhandledMessage {
        message: &'a Message,
        source: &'a [String],
    },
    /// A snapshot is about to be restored.
    SnapshotRestore { snapshot: &'a Snapshot },
    /// A snapshot has been restored.
    SnapshotRestored,
}

impl Event<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StateCreated { .. } => "stateCreated",
            Self::StateRemoved { .. } => "stateRemoved",
            Self::StateNewData { .. } => "stateNewData",
            Self::MessageQueued { .. } => "messageQueued",
            Self::MessageMatched { .. } => "messageMatched",
            Self::UnhandledMessage { .. } => "unhandledMessage",
            Self::SnapshotRestore { .. } => "snapshotRestore",
            Self::SnapshotRestored => "snapshotRestored",
        }
    }
}

impl fmt::Debug for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateCreated { path, .. }
            | Self::StateRemoved { path, .. }
            | Self::StateNewData { path, .. } => {
                f.debug_struct(self.name()).field("path", path).finish()
            }
            Self::MessageQueued { message, source } | Self::UnhandledMessage { message, source } => f
                .debug_struct(self.name())
                .field("message", message)
                .field("source", source)
                .finish(),
            Self::MessageMatched {
                message,
                path,
                passive,
            } => f
                .debug_struct(self.name())
                .field("message", message)
                .field("path", path)
                .field("passive", passive)
                .finish(),
            Self::SnapshotRestore { snapshot } => f
                .debug_struct(self.name())
                .field("states", &snapshot.len())
                .finish(),
            Self::SnapshotRestored => f.write_str(self.name()),
        }
    }
}

/// Receiver of lifecycle events.
///
/// Observers run synchronously inside the operation that emitted the event
/// and may call back into the storage.
///
/// # Example
///
/// ```rust
/// use statetree::events::{Event, Observer};
/// use statetree::tree::Storage;
/// use std::rc::Rc;
///
/// let storage = Storage::new();
/// storage.add_observer(Rc::new(|event: &Event<'_>| {
///     if let Event::UnhandledMessage { message, .. } = event {
///         eprintln!("nobody wanted {}", message.tag());
///     }
/// }));
/// ```
pub trait Observer {
    fn on_event(&self, event: &Event<'_>);
}

impl<F> Observer for F
where
    F: Fn(&Event<'_>),
{
    fn on_event(&self, event: &Event<'_>) {
        self(event)
    }
}
