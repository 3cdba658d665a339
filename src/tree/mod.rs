//! The state tree.
//!
//! A [`Storage`] is the root container: it owns the top-level states, the
//! model registry and the root-level subscribers. Every [`State`] can in turn
//! supervise nested states. Messages sent from a state travel upward, one
//! level at a time, until the root; broadcasts visit every state.
//!
//! All operations are synchronous and single-threaded. Callbacks (model
//! updates, subscribers, observers) may re-enter the tree; such nested calls
//! run to completion before the outer one continues.

pub mod error;
mod ids;
pub(crate) mod node;
mod routing;
mod state;
pub(crate) mod storage;
mod supervisor;

pub use error::StorageError;
pub use ids::{ListenerId, ObserverId, SubscriberId};
pub use state::State;
pub use storage::Storage;
