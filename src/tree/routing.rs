//! Message routing.
//!
//! A routing pass walks in-flight messages through the tree. Upward passes
//! start at an anchor and visit one level at a time until the root, broadcast
//! passes visit every node depth-first. Both finish by delivering every
//! queued message to the root-level subscribers.

use super::node::{NodeInner, Scope};
use super::storage::StorageInner;
use crate::core::{Message, StatePath};
use crate::events::Event;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{trace, warn};

/// A message during one routing pass.
pub(crate) struct Inflight {
    pub(crate) message: Message,
    pub(crate) source: StatePath,
    /// Set once an active subscription claimed the message.
    received: Cell<bool>,
}

impl Inflight {
    pub(crate) fn received(&self) -> bool {
        self.received.get()
    }
}

pub(crate) type InflightQueue = Vec<Rc<Inflight>>;

pub(crate) fn create_inflight(storage: &StorageInner, source: StatePath, message: Message) -> Rc<Inflight> {
    storage.emit(&Event::MessageQueued {
        message: &message,
        source: &source,
    });

    Rc::new(Inflight {
        message,
        source,
        received: Cell::new(false),
    })
}

/// Run an upward pass from `anchor` to the root, then deliver to subscribers.
pub(crate) fn process_instance_messages(storage: &StorageInner, anchor: Scope, mut inflight: InflightQueue) {
    let mut source_path = anchor.path();
    let mut current = anchor;

    while let Scope::State(node) = current {
        process_messages(storage, &node, &source_path, &mut inflight);

        source_path.pop();
        match node.supervisor.upgrade() {
            Some(parent) => current = parent,
            None => {
                warn!(state = %node.name, "Supervisor dropped during routing pass");
                break;
            }
        }
    }

    for message in &inflight {
        process_storage_message(storage, message);
    }
}

/// Let a single state consider every queued message.
///
/// Messages the state produces are appended to `inflight` but not considered
/// by the state itself, only by its supervisors.
pub(crate) fn process_messages(storage: &StorageInner, node: &Rc<NodeInner>, path: &[String], inflight: &mut InflightQueue) {
    let Some(model) = storage.model(&node.id) else {
        warn!(state = %node.name, model = %node.id, "No model registered for state, skipping");
        return;
    };

    let limit = inflight.len();
    let mut subscriptions = model.subscribe_any(&*node.data());

    for index in 0..limit {
        let current = Rc::clone(&inflight[index]);
        let Some(matched) = subscriptions.find_match(&current.message, current.received()) else {
            continue;
        };

        if !matched.passive {
            current.received.set(true);
        }

        storage.emit(&Event::MessageMatched {
            message: &current.message,
            path,
            passive: matched.passive,
        });

        let data = node.data();
        let Some(update) = model.update_any(&*data, &current.message) else {
            continue;
        };

        node.replace_data(Rc::clone(&update.data));

        storage.emit(&Event::StateNewData {
            data: &*update.data,
            path,
            message: &current.message,
        });
        node.notify_new_data(&*update.data, path, &current.message);

        for message in update.messages {
            inflight.push(create_inflight(storage, path.to_vec(), message));
        }

        subscriptions = model.subscribe_any(&*node.data());
    }
}

/// Deliver a message which reached the root to the root-level subscribers.
pub(crate) fn process_storage_message(storage: &StorageInner, inflight: &Inflight) {
    let mut received = inflight.received();

    for subscriber in storage.subscribers() {
        // Removed by an earlier listener of this same delivery
        if !storage.has_subscriber(subscriber.id) {
            continue;
        }

        let Some(matched) = subscriber
            .subscriptions
            .find_match(&inflight.message, received)
        else {
            continue;
        };

        if !matched.passive {
            received = true;
        }

        storage.emit(&Event::MessageMatched {
            message: &inflight.message,
            path: &[],
            passive: matched.passive,
        });

        (subscriber.listener)(&inflight.message, &inflight.source);
    }

    if !received {
        storage.emit(&Event::UnhandledMessage {
            message: &inflight.message,
            source: &inflight.source,
        });
    }
}

/// Broadcast `msg` depth-first into `nested`, children before their parent.
///
/// Every node evaluates the broadcast message as unclaimed; claims are merged
/// back afterwards so the root subscribers still see whether any node took it.
/// Returns `msg` followed by every message produced along the way, each once.
pub(crate) fn handle_broadcast(
    storage: &StorageInner,
    path: &[String],
    nested: Vec<Rc<NodeInner>>,
    msg: &Rc<Inflight>,
) -> InflightQueue {
    let mut returning = vec![Rc::clone(msg)];

    for node in nested {
        let mut node_path = path.to_vec();
        node_path.push(node.name.clone());

        let mut messages = handle_broadcast(storage, &node_path, node.nested.nodes(), msg);
        let has_been_received = msg.received();

        msg.received.set(false);
        trace!(path = %node_path.join("/"), queued = messages.len(), "Broadcast reached state");
        process_messages(storage, &node, &node_path, &mut messages);
        msg.received.set(msg.received() || has_been_received);

        // A message bubbling through several levels shows up once per level
        for message in messages {
            if !returning.iter().any(|m| Rc::ptr_eq(m, &message)) {
                returning.push(message);
            }
        }
    }

    returning
}

/// Deepest existing scope along `path`, stopping at the first missing name.
pub(crate) fn find_closest_supervisor(mut scope: Scope, path: &[String]) -> Scope {
    for name in path {
        let next = scope.nested().get(name);
        match next {
            Some(node) => scope = Scope::State(node),
            None => return scope,
        }
    }

    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{update_and_send, AnyModel, Model, Subscriptions, Update};
    use crate::tree::node::Supervisor;
    use std::rc::Weak;

    /// Counts the `tag` messages it handles, answering each with `reply`.
    struct Tap {
        tag: &'static str,
        reply: Option<&'static str>,
    }

    impl Model for Tap {
        type Data = u32;
        type Init = ();

        fn id(&self) -> &str {
            "tap"
        }

        fn init(&self, _: &()) -> Update<u32> {
            Update::new(0)
        }

        fn update(&self, data: &u32, _message: &Message) -> Option<Update<u32>> {
            let replies = self.reply.map(Message::new).into_iter().collect();
            update_and_send(data + 1, replies)
        }

        fn subscribe(&self, _data: &u32) -> Subscriptions {
            Subscriptions::new().on(self.tag)
        }
    }

    /// Top-level states all backed by one registered `model`.
    fn storage_with(model: Tap, names: &[&str]) -> Rc<StorageInner> {
        let storage = Rc::new(StorageInner::new());
        let model: Rc<dyn AnyModel> = Rc::new(model);
        assert!(storage.try_add_model(model).unwrap());

        for name in names {
            let node = NodeInner::new(
                "tap".into(),
                name.to_string(),
                Rc::new(0u32),
                Supervisor::Storage(Rc::downgrade(&storage)),
            );
            storage.nested.insert(name.to_string(), node);
        }
        storage
    }

    fn count(storage: &StorageInner, name: &str) -> u32 {
        *storage
            .nested
            .get(name)
            .unwrap()
            .data()
            .downcast_ref::<u32>()
            .unwrap()
    }

    fn tap(tag: &'static str) -> Tap {
        Tap { tag, reply: None }
    }

    #[test]
    fn broadcast_claim_in_one_branch_does_not_hide_siblings() {
        let storage = storage_with(tap("ping"), &["a", "b"]);
        let msg = create_inflight(&storage, vec!["@".into()], Message::new("ping"));

        let returning = handle_broadcast(&storage, &[], storage.nested.nodes(), &msg);

        assert_eq!(count(&storage, "a"), 1);
        assert_eq!(count(&storage, "b"), 1);
        assert_eq!(returning.len(), 1);
        assert!(msg.received());
    }

    #[test]
    fn broadcast_claim_survives_later_silent_branch() {
        let storage = storage_with(tap("ping"), &["a"]);
        storage.nested.insert(
            "quiet".into(),
            NodeInner::new(
                "missing".into(),
                "quiet".into(),
                Rc::new(0u32),
                Supervisor::Storage(Rc::downgrade(&storage)),
            ),
        );
        let msg = create_inflight(&storage, vec!["@".into()], Message::new("ping"));

        handle_broadcast(&storage, &[], storage.nested.nodes(), &msg);

        assert!(msg.received());
    }

    #[test]
    fn unclaimed_broadcast_stays_unreceived() {
        let storage = storage_with(tap("pong"), &["a"]);
        let msg = create_inflight(&storage, vec!["@".into()], Message::new("ping"));

        handle_broadcast(&storage, &[], storage.nested.nodes(), &msg);

        assert_eq!(count(&storage, "a"), 0);
        assert!(!msg.received());
    }

    #[test]
    fn produced_messages_are_not_reconsidered_at_their_level() {
        let storage = storage_with(
            Tap {
                tag: "go",
                reply: Some("go"),
            },
            &["echo"],
        );
        let node = storage.nested.get("echo").unwrap();
        let path = vec!["echo".to_string()];
        let mut inflight = vec![create_inflight(
            &storage,
            vec!["echo".into(), "$".into()],
            Message::new("go"),
        )];

        process_messages(&storage, &node, &path, &mut inflight);

        assert_eq!(count(&storage, "echo"), 1);
        assert_eq!(inflight.len(), 2);
        assert!(inflight[0].received());
        assert!(!inflight[1].received());
        assert_eq!(inflight[1].source, path);
    }

    #[test]
    fn closest_supervisor_stops_at_first_missing_name() {
        let root = NodeInner::new(
            "n".into(),
            "a".into(),
            Rc::new(()),
            Supervisor::State(Weak::new()),
        );
        let child = NodeInner::new(
            "n".into(),
            "b".into(),
            Rc::new(()),
            Supervisor::State(Rc::downgrade(&root)),
        );
        root.nested.insert("b".into(), Rc::clone(&child));

        let target: Vec<String> = ["b", "missing", "b"].iter().map(|s| s.to_string()).collect();

        match find_closest_supervisor(Scope::State(Rc::clone(&root)), &target) {
            Scope::State(found) => assert!(Rc::ptr_eq(&found, &child)),
            Scope::Storage(_) => panic!("expected a state"),
        }
    }
}
