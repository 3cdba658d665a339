//! Snapshots of a whole state tree.
//!
//! A snapshot captures the shape of the tree (names and model ids) together
//! with the data of every state. It serializes as a plain JSON object keyed
//! by state name, preserving the order of the states:
//!
//! ```json
//! {
//!   "counter": { "id": "counter", "data": 3, "nested": {} }
//! }
//! ```
//!
//! Capturing never calls into models. Restoring requires every referenced
//! model to be registered and replaces the previous tree wholesale.

use crate::tree::node::{Nested, NodeInner, Scope, Supervisor};
use crate::tree::storage::StorageInner;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub mod error;

pub use error::SnapshotError;

/// Snapshot of a single state and its nested states.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Id of the model to restore the state with
    pub id: String,

    /// State data in its serialized form
    pub data: Value,

    /// Nested states
    #[serde(default)]
    pub nested: Snapshot,
}

/// Insertion-ordered mapping from state name to [`StateSnapshot`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    states: Vec<(String, StateSnapshot)>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the state called `name`.
    pub fn insert(&mut self, name: impl Into<String>, state: StateSnapshot) {
        let name = name.into();
        match self.states.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = state,
            None => self.states.push((name, state)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&StateSnapshot> {
        self.states
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, state)| state)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateSnapshot)> {
        self.states.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn names(&self) -> Vec<&str> {
        self.states.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of top-level states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of states in the whole snapshot, nested ones included.
    pub fn total_states(&self) -> usize {
        self.states
            .iter()
            .map(|(_, s)| 1 + s.nested.total_states())
            .sum()
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::InvalidFormat(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::InvalidFormat(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).map_err(|e| SnapshotError::InvalidFormat(e.to_string()))
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.states.len()))?;
        for (name, state) in &self.states {
            map.serialize_entry(name, state)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = Snapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of state name to state snapshot")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Snapshot, A::Error> {
                let mut snapshot = Snapshot::new();
                while let Some((name, state)) = access.next_entry::<String, StateSnapshot>()? {
                    snapshot.insert(name, state);
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

/// Capture every state below `nested`; `path` is the path of its owner.
pub(crate) fn capture(
    storage: &StorageInner,
    nested: &Nested,
    path: &[String],
) -> Result<Snapshot, SnapshotError> {
    let mut snapshot = Snapshot::new();

    for node in nested.nodes() {
        let mut node_path = path.to_vec();
        node_path.push(node.name.clone());

        let model = storage
            .model(&node.id)
            .ok_or_else(|| SnapshotError::MissingModels {
                ids: vec![node.id.clone()],
            })?;
        let data = model
            .encode_data(&*node.data())
            .map_err(|reason| SnapshotError::SerializationFailed {
                path: node_path.join("/"),
                reason,
            })?;

        snapshot.insert(
            node.name.clone(),
            StateSnapshot {
                id: node.id.clone(),
                data,
                nested: capture(storage, &node.nested, &node_path)?,
            },
        );
    }

    Ok(snapshot)
}

/// Replace every state below `scope` with the content of `snapshot`.
///
/// All model ids are validated up front and every missing one is reported.
/// The new subtree is built detached and swapped in at the very end, so a
/// failing restore leaves the tree as it was.
pub(crate) fn restore(
    storage: &StorageInner,
    scope: &Scope,
    snapshot: &Snapshot,
) -> Result<(), SnapshotError> {
    if let Validation::Failure(missing) = validate_models(storage, snapshot) {
        return Err(SnapshotError::MissingModels {
            ids: unique(missing),
        });
    }

    let states = build_states(storage, &scope.downgrade(), snapshot, &scope.path())?;
    scope.nested().replace(states);

    Ok(())
}

fn validate_models(storage: &StorageInner, snapshot: &Snapshot) -> Validation<(), NonEmptyVec<String>> {
    let mut checks = Vec::new();
    collect_model_checks(storage, snapshot, &mut checks);

    Validation::all_vec(checks).map(|_| ())
}

fn collect_model_checks(
    storage: &StorageInner,
    snapshot: &Snapshot,
    checks: &mut Vec<Validation<(), NonEmptyVec<String>>>,
) {
    for (_, state) in snapshot.iter() {
        let check = if storage.model(&state.id).is_some() {
            Validation::success(())
        } else {
            Validation::fail(state.id.clone())
        };
        checks.push(check);

        collect_model_checks(storage, &state.nested, checks);
    }
}

fn unique(ids: NonEmptyVec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for id in ids.iter() {
        if !seen.contains(id) {
            seen.push(id.clone());
        }
    }
    seen
}

fn build_states(
    storage: &StorageInner,
    supervisor: &Supervisor,
    snapshot: &Snapshot,
    path: &[String],
) -> Result<Vec<(String, Rc<NodeInner>)>, SnapshotError> {
    let mut states = Vec::with_capacity(snapshot.len());

    for (name, state) in snapshot.iter() {
        let mut node_path = path.to_vec();
        node_path.push(name.to_string());

        let model = storage
            .model(&state.id)
            .ok_or_else(|| SnapshotError::MissingModels {
                ids: vec![state.id.clone()],
            })?;
        let data = model
            .decode_data(&state.data)
            .map_err(|reason| SnapshotError::DeserializationFailed {
                path: node_path.join("/"),
                id: state.id.clone(),
                reason,
            })?;

        let node = NodeInner::new(state.id.clone(), name.to_string(), data, supervisor.clone());
        let nested = build_states(
            storage,
            &Supervisor::State(Rc::downgrade(&node)),
            &state.nested,
            &node_path,
        )?;
        node.nested.replace(nested);

        states.push((name.to_string(), node));
    }

    Ok(states)
}
