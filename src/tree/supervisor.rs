//! Operations shared by the root container and states.
//!
//! Both `Storage` and `State` supervise nested states; they delegate here
//! with their [`Scope`].

use super::error::StorageError;
use super::node::{NodeInner, Scope};
use super::routing::{create_inflight, process_instance_messages};
use super::state::State;
use crate::core::{AnyModel, Model, Message, StateData, Update};
use crate::events::Event;
use std::rc::Rc;
use tracing::{debug_span, warn};

/// State for `model` already living under `name`, if any.
///
/// Fails when the name is taken by a state of another model id, or when a
/// different model is registered under the id of `model`.
fn lookup<M: Model>(scope: &Scope, model: &Rc<M>, name: &str) -> Result<Option<State<M>>, StorageError> {
    let Some(node) = scope.nested().get(name) else {
        return Ok(None);
    };

    if node.id != model.id() {
        return Err(StorageError::NameTaken {
            path: node.path().join("/"),
            existing: node.id.clone(),
            requested: model.id().to_string(),
        });
    }

    // The id alone does not pin the data type, the registered model does
    let storage = scope.storage().ok_or_else(|| StorageError::Detached {
        path: scope.path().join("/"),
    })?;
    storage.ensure_model(&(Rc::clone(model) as Rc<dyn AnyModel>))?;

    Ok(Some(State::from_node(node)))
}

pub(crate) fn get_state<M: Model>(scope: &Scope, model: &Rc<M>, name: Option<&str>) -> Option<State<M>> {
    let name = name.unwrap_or_else(|| model.id());
    let found = lookup(scope, model, name);

    debug_assert!(
        !matches!(
            found,
            Err(StorageError::NameTaken { .. } | StorageError::ModelConflict { .. })
        ),
        "State '{}' does not belong to model '{}': {:?}",
        name,
        model.id(),
        found.as_ref().err()
    );

    found.ok().flatten()
}

pub(crate) fn create_state<M: Model>(
    scope: &Scope,
    model: &Rc<M>,
    params: M::Init,
    name: Option<&str>,
) -> Result<State<M>, StorageError> {
    let name = name.unwrap_or_else(|| model.id());

    if let Some(existing) = lookup(scope, model, name)? {
        return Ok(existing);
    }

    let storage = scope.storage().ok_or_else(|| StorageError::Detached {
        path: scope.path().join("/"),
    })?;

    storage.try_add_model(Rc::clone(model) as Rc<dyn AnyModel>)?;

    let Update { data, messages } = model.init(&params);
    let data: StateData = Rc::new(data);
    let node = NodeInner::new(
        model.id().to_string(),
        name.to_string(),
        Rc::clone(&data),
        scope.downgrade(),
    );

    if !scope.nested().insert(name.to_string(), Rc::clone(&node)) {
        let existing = scope.nested().get(name).map(|n| n.id.clone()).unwrap_or_default();
        return Err(StorageError::NameTaken {
            path: node.path().join("/"),
            existing,
            requested: model.id().to_string(),
        });
    }

    let path = node.path();
    storage.emit(&Event::StateCreated {
        path: &path,
        params: &params,
        data: &*data,
    });

    if !messages.is_empty() {
        let _span = debug_span!("init_messages", path = %path.join("/")).entered();
        let inflight = messages
            .into_iter()
            .map(|m| create_inflight(&storage, path.clone(), m))
            .collect();

        process_instance_messages(&storage, scope.clone(), inflight);
    }

    Ok(State::from_node(node))
}

pub(crate) fn remove_state<M: Model>(scope: &Scope, model: &Rc<M>, name: Option<&str>) {
    let name = name.unwrap_or_else(|| model.id());
    let state = match lookup(scope, model, name) {
        Ok(Some(state)) => state,
        Ok(None) => return,
        Err(error) => {
            warn!(%error, "State left in place");
            return;
        }
    };

    let path = state.path();
    scope.nested().remove(state.name());

    if let Some(storage) = scope.storage() {
        storage.emit(&Event::StateRemoved {
            path: &path,
            data: &*state.node().data(),
        });
    }
}

pub(crate) fn send_message(scope: &Scope, message: Message, source: &str) {
    let Some(storage) = scope.storage() else {
        warn!(
            path = %scope.path().join("/"),
            tag = message.tag(),
            "Dropping message sent from a detached state"
        );
        return;
    };

    let _span = debug_span!("send_message", tag = message.tag()).entered();

    let mut path = scope.path();
    path.push(source.to_string());

    let inflight = vec![create_inflight(&storage, path, message)];
    process_instance_messages(&storage, scope.clone(), inflight);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{update_none, Subscriptions};
    use crate::tree::node::Supervisor;
    use crate::tree::storage::Storage;
    use std::rc::Weak;

    struct Named(&'static str);

    impl Model for Named {
        type Data = u8;
        type Init = u8;

        fn id(&self) -> &str {
            self.0
        }

        fn init(&self, value: &u8) -> Update<u8> {
            Update::new(*value)
        }

        fn update(&self, _data: &u8, _message: &Message) -> Option<Update<u8>> {
            update_none()
        }

        fn subscribe(&self, _data: &u8) -> Subscriptions {
            Subscriptions::new()
        }
    }

    #[test]
    fn name_defaults_to_model_id() {
        let storage = Storage::new();
        let model = Rc::new(Named("alpha"));

        let created = create_state(&storage.scope(), &model, 3, None).unwrap();

        assert_eq!(created.name(), "alpha");
        assert_eq!(get_state(&storage.scope(), &model, None), Some(created));
    }

    #[test]
    fn lookup_reports_name_taken_by_other_model() {
        let storage = Storage::new();
        create_state(&storage.scope(), &Rc::new(Named("alpha")), 1, Some("slot")).unwrap();

        let result = lookup(&storage.scope(), &Rc::new(Named("beta")), "slot");

        assert_eq!(
            result.unwrap_err(),
            StorageError::NameTaken {
                path: "slot".into(),
                existing: "alpha".into(),
                requested: "beta".into(),
            }
        );
    }

    #[test]
    fn lookup_reports_foreign_model_under_same_id() {
        let storage = Storage::new();
        create_state(&storage.scope(), &Rc::new(Named("alpha")), 1, None).unwrap();

        let result = lookup(&storage.scope(), &Rc::new(Named("alpha")), "alpha");

        assert!(matches!(result, Err(StorageError::ModelConflict { .. })));
    }

    #[test]
    fn lookup_of_free_name_is_empty() {
        let storage = Storage::new();

        let result = lookup(&storage.scope(), &Rc::new(Named("alpha")), "alpha");

        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn detached_scope_cannot_create_and_drops_messages() {
        let orphan = NodeInner::new(
            "orphan".into(),
            "orphan".into(),
            Rc::new(0u8),
            Supervisor::State(Weak::new()),
        );
        let scope = Scope::State(orphan);

        let result = create_state(&scope, &Rc::new(Named("alpha")), 1, None);

        assert_eq!(
            result.unwrap_err(),
            StorageError::Detached {
                path: "orphan".into()
            }
        );
        send_message(&scope, Message::new("lost"), "$");
    }
}
