//! Snapshot error types.

use thiserror::Error;

/// Errors that can occur while capturing or restoring snapshots
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SnapshotError {
    /// The snapshot references models which are not registered
    #[error("Missing model for state(s): {}", ids.join(", "))]
    MissingModels { ids: Vec<String> },

    /// State data could not be converted into its snapshot form
    #[error("Serialization of state '{path}' failed: {reason}")]
    SerializationFailed { path: String, reason: String },

    /// Snapshot data does not fit the data type of its model
    #[error("Deserialization of state '{path}' (model '{id}') failed: {reason}")]
    DeserializationFailed {
        path: String,
        id: String,
        reason: String,
    },

    /// Input is not a snapshot
    #[error("Invalid snapshot format: {0}")]
    InvalidFormat(String),
}
