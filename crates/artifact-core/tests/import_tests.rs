//! Bounded-batch import tests

use artifact_core::{CancelFlag, ImportCandidate, ImportOptions, SyncCoordinator};
use artifact_store::{ArtifactId, ArtifactType};
use artifact_test_utils::TestCollection;
use pretty_assertions::assert_eq;

fn candidate(name: &str) -> ImportCandidate {
    ImportCandidate::new(
        ArtifactId::new(name, ArtifactType::Skill),
        TestCollection::sample_files(name),
    )
}

#[test]
fn import_commits_in_batches_with_partial_success() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let coordinator = SyncCoordinator::new(&store);

    // 25 candidates, #17 malformed (name fails identifier validation)
    let candidates: Vec<ImportCandidate> = (1..=25)
        .map(|n| {
            if n == 17 {
                candidate("bad/name")
            } else {
                candidate(&format!("skill-{n:02}"))
            }
        })
        .collect();

    let report = coordinator
        .import(candidates, &ImportOptions::default())
        .unwrap();

    assert_eq!(report.imported.len(), 24);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id.name, "bad/name");
    assert_eq!(report.committed_batches, 3);
    assert!(!report.cancelled);

    // A subsequent read confirms exactly the 24 good entries exist
    assert_eq!(store.entries().unwrap().len(), 24);
}

#[test]
fn duplicate_entries_fail_without_aborting_their_batch() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("existing");
    fixture.seed_entry(&store, &id, "v1");

    let coordinator = SyncCoordinator::new(&store);
    let report = coordinator
        .import(
            vec![candidate("existing"), candidate("fresh")],
            &ImportOptions::default(),
        )
        .unwrap();

    assert_eq!(report.imported.len(), 1);
    assert_eq!(report.imported[0].name, "fresh");
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].error.contains("already exists"));
}

#[test]
fn cancellation_between_batches_keeps_committed_work() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let coordinator = SyncCoordinator::new(&store);

    let cancel = CancelFlag::new();
    cancel.cancel(); // cancelled before the first batch

    let report = coordinator
        .import(
            (1..=5).map(|n| candidate(&format!("skill-{n}"))).collect(),
            &ImportOptions {
                batch_size: 2,
                cancel,
            },
        )
        .unwrap();

    assert!(report.cancelled);
    assert!(report.imported.is_empty());
    assert!(store.entries().unwrap().is_empty());
}

#[test]
fn batch_size_floor_is_one() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let coordinator = SyncCoordinator::new(&store);

    let report = coordinator
        .import(
            vec![candidate("only")],
            &ImportOptions {
                batch_size: 0,
                cancel: CancelFlag::new(),
            },
        )
        .unwrap();
    assert_eq!(report.imported.len(), 1);
}
