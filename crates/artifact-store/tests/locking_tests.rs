//! Tests for store writer locking

use artifact_store::{ArtifactId, ArtifactType, CollectionEntry, Store, TxnScope};
use artifact_fs::FileSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

fn files(marker: &str) -> FileSet {
    let mut set = FileSet::new();
    set.insert("SKILL.md", format!("# {marker}\n").into_bytes());
    set
}

#[test]
fn concurrent_writers_serialize_without_losing_entries() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");

    // Two independent store handles, as two processes would hold
    let store_a = Store::open(root.clone()).unwrap();
    let store_b = Store::open(root.clone()).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let (b1, b2) = (barrier.clone(), barrier.clone());

    let t1 = thread::spawn(move || {
        b1.wait();
        store_a.with_txn(TxnScope::Entry, |txn| {
            let entry = CollectionEntry::new(ArtifactId::new("one", ArtifactType::Skill));
            txn.insert_entry(entry, &files("one")).map(|_| ())
        })
    });
    let t2 = thread::spawn(move || {
        b2.wait();
        store_b.with_txn(TxnScope::Entry, |txn| {
            let entry = CollectionEntry::new(ArtifactId::new("two", ArtifactType::Skill));
            txn.insert_entry(entry, &files("two")).map(|_| ())
        })
    });

    t1.join().unwrap().unwrap();
    t2.join().unwrap().unwrap();

    // Read-modify-write under the exclusive lock keeps both inserts
    let verify = Store::open(root).unwrap();
    let names: Vec<String> = verify
        .entries()
        .unwrap()
        .into_iter()
        .map(|e| e.id.name)
        .collect();
    assert_eq!(names, vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn reader_sees_committed_state_only() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("store");
    let store = Store::open(root.clone()).unwrap();

    let result: artifact_store::Result<()> = store.with_txn(TxnScope::Batch, |txn| {
        let entry = CollectionEntry::new(ArtifactId::new("phantom", ArtifactType::Agent));
        txn.insert_entry(entry, &files("phantom"))?;
        Err(artifact_store::Error::Transaction {
            message: "abort before commit".to_string(),
        })
    });
    assert!(result.is_err());

    let reader = Store::open(root).unwrap();
    assert!(reader.entries().unwrap().is_empty());
}
