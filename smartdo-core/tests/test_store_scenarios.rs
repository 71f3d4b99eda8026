use chrono::{TimeZone, Utc};
use smartdo_core::{
    JsonFileStorage, MemoryStorage, Task, TaskId, TaskStorage, TaskStore, check_containment,
    encode_tasks,
};

// [Parent A(1), Sub A1(2), Sub A2(3), Parent B(4)]
fn seeded() -> TaskStore<MemoryStorage> {
    let at = Utc.with_ymd_and_hms(2026, 2, 19, 12, 0, 0).unwrap();
    let tasks = vec![
        Task::new(TaskId(1), "Parent A", at),
        Task::subtask(TaskId(2), TaskId(1), "Sub A1", at),
        Task::subtask(TaskId(3), TaskId(1), "Sub A2", at),
        Task::new(TaskId(4), "Parent B", at),
    ];
    let blob = encode_tasks(&tasks).unwrap();
    TaskStore::open(MemoryStorage::with_blob(blob)).unwrap()
}

fn ids(store: &TaskStore<MemoryStorage>) -> Vec<u64> {
    store.tasks().iter().map(|t| t.id.0).collect()
}

/// Completing both subtasks completes A, leaves B alone; deleting A takes its family.
#[test]
fn test_toggle_subtasks_then_delete_parent() {
    let mut store = seeded();

    store.toggle_task(TaskId(2)).unwrap();
    assert!(!store.get(TaskId(1)).unwrap().completed);

    store.toggle_task(TaskId(3)).unwrap();
    assert!(store.get(TaskId(1)).unwrap().completed);
    assert!(!store.get(TaskId(4)).unwrap().completed);

    assert_eq!(store.delete_task(TaskId(1)).unwrap(), 3);
    assert_eq!(ids(&store), vec![4]);
}

/// Dropping B onto A1 must not land between A and A2.
#[test]
fn test_drag_parent_onto_subtask_is_repaired() {
    let mut store = seeded();
    store.reorder(TaskId(4), Some(TaskId(2))).unwrap();
    assert_eq!(ids(&store), vec![1, 2, 3, 4]);
    assert_eq!(check_containment(store.tasks()), None);
}

#[test]
fn test_no_op_drops_keep_sequence() {
    let mut store = seeded();
    let before = ids(&store);
    assert!(!store.reorder(TaskId(4), Some(TaskId(4))).unwrap());
    assert!(!store.reorder(TaskId(4), None).unwrap());
    assert!(!store.reorder(TaskId(4), Some(TaskId(404))).unwrap());
    assert_eq!(ids(&store), before);
    assert_eq!(store.storage().save_count(), 0);
}

/// A family dropped onto the task right after it is already in that gap.
#[test]
fn test_drag_a_family_down_and_back() {
    let mut store = seeded();
    assert!(!store.reorder(TaskId(1), Some(TaskId(4))).unwrap());
    assert_eq!(ids(&store), vec![1, 2, 3, 4]);

    store.reorder(TaskId(4), Some(TaskId(1))).unwrap();
    assert_eq!(ids(&store), vec![4, 1, 2, 3]);

    // Onto A2: lands after the whole A family.
    store.reorder(TaskId(4), Some(TaskId(3))).unwrap();
    assert_eq!(ids(&store), vec![1, 2, 3, 4]);
    assert_eq!(store.storage().save_count(), 2);
}

/// Reopening from disk gives the same ids, order and fields.
#[test]
fn test_file_round_trip_after_mutations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let at = Utc.with_ymd_and_hms(2026, 4, 2, 7, 15, 0).unwrap();

    let mut store = TaskStore::open(JsonFileStorage::new(&path)).unwrap();
    let trip = store
        .add_parent_with_subtasks("Trip", &["Pack".to_string(), "Book".to_string()], at)
        .unwrap()
        .unwrap();
    store.add_task("Laundry", at).unwrap();
    let draft = store.add_subtask(trip, at).unwrap().unwrap();
    store.edit_task(draft, "Charge camera").unwrap();
    store.toggle_task(draft).unwrap();

    let mut reopened = JsonFileStorage::new(&path);
    assert_eq!(reopened.load().unwrap(), store.tasks());

    let raw = std::fs::read_to_string(&path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(v.is_array());
    assert_eq!(v[0]["text"], "Laundry");
    assert_eq!(v[1]["isParent"], true);
    assert_eq!(v[4]["parentId"], trip.0);
    assert_eq!(v[4]["completed"], true);
}
