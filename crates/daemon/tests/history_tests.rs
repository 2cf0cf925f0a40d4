use std::fs;

use readyboard_core::model::SubmissionEntry;
use readyboard_core::submission::{SubmissionStore, SUBMISSIONS_KEY};
use readyboard_daemon::history::FileSubmissionStore;
use serde_json::{json, Value};

fn entry(id: &str) -> SubmissionEntry {
    SubmissionEntry {
        id: id.into(),
        timestamp_ms: 1,
        status: "delivered".into(),
        endpoint: "https://example.invalid/submit".into(),
        name: Some("Amina".into()),
        http_status: Some(201),
    }
}

fn ids(store: &FileSubmissionStore) -> Vec<String> {
    store.list().unwrap().into_iter().map(|e| e.id).collect()
}

#[test]
fn missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSubmissionStore::open(dir.path().join("history.json"), 5).unwrap();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn appends_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("history.json");

    let store = FileSubmissionStore::open(&path, 5).unwrap();
    store.append(entry("a")).unwrap();
    store.append(entry("b")).unwrap();

    let on_disk: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk["key"], SUBMISSIONS_KEY);

    let reopened = FileSubmissionStore::open(&path, 5).unwrap();
    assert_eq!(ids(&reopened), vec!["b", "a"]);
}

#[test]
fn cap_applies_on_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    let store = FileSubmissionStore::open(&path, 5).unwrap();
    for id in ["a", "b", "c"] {
        store.append(entry(id)).unwrap();
    }

    let smaller = FileSubmissionStore::open(&path, 2).unwrap();
    assert_eq!(ids(&smaller), vec!["c", "b"]);
}

#[test]
fn foreign_key_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    fs::write(
        &path,
        json!({"key": "someone-else", "entries": [entry("x")]}).to_string(),
    )
    .unwrap();

    let store = FileSubmissionStore::open(&path, 5).unwrap();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    fs::write(&path, "{broken").unwrap();
    assert!(FileSubmissionStore::open(&path, 5).is_err());
}

#[test]
fn concurrent_appends_leave_disk_matching_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let store = FileSubmissionStore::open(&path, 50).unwrap();

    std::thread::scope(|scope| {
        for t in 0..8 {
            let store = &store;
            scope.spawn(move || {
                for i in 0..20 {
                    store.append(entry(&format!("{t}-{i}"))).unwrap();
                }
            });
        }
    });

    let in_memory = ids(&store);
    assert_eq!(in_memory.len(), 50);
    let reloaded = FileSubmissionStore::open(&path, 200).unwrap();
    assert_eq!(ids(&reloaded), in_memory);

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|name| name != "history.json")
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}
