//! Storage error types.

use crate::snapshot::SnapshotError;
use thiserror::Error;

/// Errors that can occur while manipulating the state tree
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    /// A different model is already registered under this id
    #[error("Model mismatch for '{id}': another model is registered under this id")]
    ModelConflict { id: String },

    /// The name is already taken by a state of another model
    #[error("State '{path}' already exists for model '{existing}', not '{requested}'")]
    NameTaken {
        path: String,
        existing: String,
        requested: String,
    },

    /// The storage owning this state has been dropped
    #[error("State '{path}' is no longer attached to a storage")]
    Detached { path: String },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}
