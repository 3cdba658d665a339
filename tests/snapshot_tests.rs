//! Integration tests for snapshot capture and restore.

mod common;

use common::{named, path, record_events, Counter, Recorder};
use serde_json::json;
use statetree::{Message, Snapshot, SnapshotError, Storage, StorageBuilder, StorageError};
use std::rc::Rc;

fn board_storage(counter: &Rc<Counter>, board: &Rc<Recorder>) -> Storage {
    let storage = Storage::new();
    let main = storage.create_state(board, (), None).unwrap();
    let left = main.create_state(counter, 1, Some("left")).unwrap();
    main.create_state(counter, 5, Some("right")).unwrap();

    left.send_message(Message::new("inc"));
    storage
}

#[test]
fn snapshot_captures_names_ids_and_data() {
    let counter = Rc::new(Counter);
    let board = Rc::new(Recorder::new("board"));
    let storage = board_storage(&counter, &board);

    let snapshot = storage.get_snapshot().unwrap();

    assert_eq!(
        serde_json::to_value(&snapshot).unwrap(),
        json!({
            "board": {
                "id": "board",
                "data": [],
                "nested": {
                    "left": { "id": "counter", "data": 2, "nested": {} },
                    "right": { "id": "counter", "data": 5, "nested": {} }
                }
            }
        })
    );
    assert_eq!(snapshot.total_states(), 3);
}

#[test]
fn snapshot_round_trip_reproduces_the_tree() {
    let counter = Rc::new(Counter);
    let board = Rc::new(Recorder::new("board"));
    let original = board_storage(&counter, &board);
    let json = original.get_snapshot().unwrap().to_json().unwrap();

    let restored = Storage::new();
    restored.add_model(&counter).unwrap();
    restored.add_model(&board).unwrap();
    restored
        .restore_snapshot(&Snapshot::from_json(&json).unwrap())
        .unwrap();

    assert_eq!(
        restored.get_snapshot().unwrap(),
        original.get_snapshot().unwrap()
    );

    let main = restored.get_state(&board, None).unwrap();
    assert_eq!(main.state_names(), vec!["left", "right"]);

    let right = main.get_state(&counter, Some("right")).unwrap();
    assert_eq!(*right.data(), 5);
    assert_eq!(right.path(), path(&["board", "right"]));

    // Restored states take part in routing like created ones
    right.send_message(Message::new("inc"));
    assert_eq!(*right.data(), 6);
}

#[test]
fn restore_replaces_existing_states() {
    let counter = Rc::new(Counter);
    let storage = Storage::new();
    storage.create_state(&counter, 7, Some("old")).unwrap();

    let snapshot =
        Snapshot::from_json(r#"{"new":{"id":"counter","data":1,"nested":{}}}"#).unwrap();
    storage.restore_snapshot(&snapshot).unwrap();

    assert_eq!(storage.state_names(), vec!["new"]);
}

#[test]
fn restore_emits_only_before_and_after_events() {
    let counter = Rc::new(Counter);
    let board = Rc::new(Recorder::new("board"));
    let snapshot = board_storage(&counter, &board).get_snapshot().unwrap();

    let storage = StorageBuilder::new()
        .model(&counter)
        .model(&board)
        .build()
        .unwrap();
    let log = record_events(&storage);

    storage.restore_snapshot(&snapshot).unwrap();

    let names: Vec<_> = log.borrow().iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["snapshotRestore", "snapshotRestored"]);
}

#[test]
fn restore_with_missing_models_leaves_tree_untouched() {
    let counter = Rc::new(Counter);
    let storage = Storage::new();
    let kept = storage.create_state(&counter, 3, None).unwrap();
    let log = record_events(&storage);

    let snapshot = Snapshot::from_json(
        r#"{
            "a": {"id": "ghost", "data": null, "nested": {
                "b": {"id": "counter", "data": 1, "nested": {}},
                "c": {"id": "phantom", "data": null, "nested": {}}
            }},
            "d": {"id": "ghost", "data": null, "nested": {}}
        }"#,
    )
    .unwrap();

    let result = storage.restore_snapshot(&snapshot);

    assert_eq!(
        result,
        Err(SnapshotError::MissingModels {
            ids: vec!["ghost".to_string(), "phantom".to_string()]
        })
    );
    assert_eq!(storage.state_names(), vec!["counter"]);
    assert_eq!(storage.get_state(&counter, None).unwrap(), kept);
    assert!(named(&log, "snapshotRestored").is_empty());
}

#[test]
fn restore_reports_undecodable_data() {
    let counter = Rc::new(Counter);
    let storage = Storage::new();
    storage.add_model(&counter).unwrap();
    storage.create_state(&counter, 3, Some("kept")).unwrap();

    let snapshot = Snapshot::from_json(
        r#"{"outer":{"id":"counter","data":1,"nested":{"inner":{"id":"counter","data":"three","nested":{}}}}}"#,
    )
    .unwrap();

    let result = storage.restore_snapshot(&snapshot);

    match result {
        Err(SnapshotError::DeserializationFailed { path, id, .. }) => {
            assert_eq!(path, "outer/inner");
            assert_eq!(id, "counter");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(storage.state_names(), vec!["kept"]);
}

#[test]
fn builder_surfaces_restore_errors() {
    let snapshot = Snapshot::from_json(r#"{"a":{"id":"ghost","data":null}}"#).unwrap();

    let result = StorageBuilder::new()
        .model(&Rc::new(Counter))
        .snapshot(snapshot)
        .build();

    assert!(matches!(
        result,
        Err(StorageError::Snapshot(SnapshotError::MissingModels { ids })) if ids == vec!["ghost"]
    ));
}

#[test]
fn empty_tree_snapshot_is_empty_object() {
    let storage = Storage::new();

    let snapshot = storage.get_snapshot().unwrap();

    assert!(snapshot.is_empty());
    assert_eq!(snapshot.to_json().unwrap(), "{}");
}
