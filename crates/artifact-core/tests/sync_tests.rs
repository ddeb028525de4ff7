//! End-to-end engine tests: deploy, drift, pull, push

use artifact_core::{
    DriftDetector, DriftStatus, Error, MergeStrategy, PullOptions, PushOutcome, SyncCoordinator,
};
use artifact_store::TxnScope;
use artifact_test_utils::TestCollection;
use pretty_assertions::assert_eq;

#[test]
fn deploy_then_check_is_synced() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    let entry = fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    let record = coordinator.deploy(&id, &project).unwrap();
    assert_eq!(record.deployed_hash, entry.content_hash);
    assert!(record.current_hash.is_none());

    let check = DriftDetector::new(&store).check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Synced);
    assert_eq!(check.current_hash, entry.content_hash);

    // The observation was persisted
    let record = store.deployment(&id, &project).unwrap().unwrap();
    assert_eq!(record.current_hash.as_deref(), Some(entry.content_hash.as_str()));
    assert!(record.last_checked_at.is_some());
    assert!(record.modification_detected_at.is_none());
}

#[test]
fn local_edit_reads_as_modified() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    let entry = fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();
    fixture.edit_deployed_file(&project, &id, "SKILL.md", "# locally edited\n");

    let check = DriftDetector::new(&store).check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Modified);
    assert_eq!(check.deployed_hash, entry.content_hash);
    assert_ne!(check.current_hash, entry.content_hash);

    let record = store.deployment(&id, &project).unwrap().unwrap();
    assert!(record.modification_detected_at.is_some());
}

#[test]
fn collection_update_reads_as_outdated_then_conflict_after_edit() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();

    // Collection moves, project does not: outdated
    fixture.seed_entry(&store, &id, "v2");
    let check = DriftDetector::new(&store).check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Outdated);

    // Project also moves: conflict
    fixture.edit_deployed_file(&project, &id, "SKILL.md", "# locally edited\n");
    let check = DriftDetector::new(&store).check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Conflict);
}

#[test]
fn pull_refuses_modified_without_force() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();
    fixture.edit_deployed_file(&project, &id, "SKILL.md", "# precious local edit\n");

    let err = coordinator
        .pull(&id, &project, PullOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::PullBlocked { .. }));

    // The local edit is still there
    let content = fixture.read_deployed_file(&project, &id, "SKILL.md");
    assert_eq!(content, "# precious local edit\n");
}

#[test]
fn forced_pull_overwrites_and_resyncs() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();
    fixture.edit_deployed_file(&project, &id, "SKILL.md", "# local edit\n");
    let entry = fixture.seed_entry(&store, &id, "v2");

    let record = coordinator
        .pull(&id, &project, PullOptions { force: true })
        .unwrap();
    assert_eq!(record.deployed_hash, entry.content_hash);

    let check = DriftDetector::new(&store).check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Synced);
    assert!(fixture
        .read_deployed_file(&project, &id, "SKILL.md")
        .contains("revision: v2"));
}

#[test]
fn pull_restores_a_deleted_tree() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();
    std::fs::remove_dir_all(std::path::Path::new(&project).join(id.deploy_path())).unwrap();

    coordinator
        .pull(&id, &project, PullOptions::default())
        .unwrap();
    let check = DriftDetector::new(&store).check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Synced);
}

#[test]
fn push_with_disjoint_edits_merges_both_sides() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();

    // Local edit touches line-a
    fixture.edit_deployed_file(
        &project,
        &id,
        "SKILL.md",
        "# sample skill\n\nrevision: v1\nline-a local\nline-b\nline-c\n",
    );

    // Collection edit touches line-c
    let mut upstream_files = TestCollection::sample_files("v1");
    upstream_files.insert(
        "SKILL.md",
        b"# sample skill\n\nrevision: v1\nline-a\nline-b\nline-c upstream\n".to_vec(),
    );
    let entry_before = store.entry(&id).unwrap().unwrap();
    store
        .with_txn(TxnScope::Entry, |txn| {
            txn.put_entry(entry_before.clone(), &upstream_files)
        })
        .unwrap();

    let outcome = coordinator
        .push(&id, &project, MergeStrategy::Merge)
        .unwrap();
    let PushOutcome::Committed { entry, deployment } = outcome else {
        panic!("expected a clean merge");
    };

    // Both edits survive in the new collection state
    let merged = store.load_object(&entry.content_hash).unwrap();
    let text = String::from_utf8(merged.get("SKILL.md").unwrap().to_vec()).unwrap();
    assert!(text.contains("line-a local"));
    assert!(text.contains("line-c upstream"));

    // Deployment advanced to the merged hash and project matches
    assert_eq!(deployment.deployed_hash, entry.content_hash);
    let check = DriftDetector::new(&store).check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Synced);
}

#[test]
fn push_with_overlapping_edits_returns_conflicts_and_persists_nothing() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();

    // Both sides rewrite the same revision line
    fixture.edit_deployed_file(
        &project,
        &id,
        "SKILL.md",
        "# sample skill\n\nrevision: local\nline-a\nline-b\nline-c\n",
    );
    let mut upstream_files = TestCollection::sample_files("v1");
    upstream_files.insert(
        "SKILL.md",
        b"# sample skill\n\nrevision: upstream\nline-a\nline-b\nline-c\n".to_vec(),
    );
    let entry_before = store.entry(&id).unwrap().unwrap();
    let entry_before = store
        .with_txn(TxnScope::Entry, |txn| {
            txn.put_entry(entry_before.clone(), &upstream_files)
        })
        .unwrap();
    let snapshots_before = store.snapshots().unwrap().len();

    let outcome = coordinator
        .push(&id, &project, MergeStrategy::Merge)
        .unwrap();
    let PushOutcome::Conflicts(conflicts) = outcome else {
        panic!("expected conflicts");
    };
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].path, "SKILL.md");

    // No persisted change: same entry hash, same snapshot count, still conflict
    let entry_after = store.entry(&id).unwrap().unwrap();
    assert_eq!(entry_after.content_hash, entry_before.content_hash);
    assert_eq!(store.snapshots().unwrap().len(), snapshots_before);
    let check = DriftDetector::new(&store).check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Conflict);
}

#[test]
fn push_keep_local_overwrites_collection() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();
    fixture.edit_deployed_file(&project, &id, "SKILL.md", "# my local truth\n");

    let outcome = coordinator
        .push(&id, &project, MergeStrategy::KeepLocal)
        .unwrap();
    let PushOutcome::Committed { entry, .. } = outcome else {
        panic!("keep_local cannot conflict");
    };

    let files = store.load_object(&entry.content_hash).unwrap();
    assert_eq!(files.get("SKILL.md"), Some("# my local truth\n".as_bytes()));
}

#[test]
fn push_on_synced_deployment_is_refused() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();

    let err = coordinator
        .push(&id, &project, MergeStrategy::Merge)
        .unwrap_err();
    assert!(matches!(err, Error::PushNotNeeded { .. }));
}

#[test]
fn redeploy_of_existing_pair_is_refused() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();
    let err = coordinator.deploy(&id, &project).unwrap_err();
    assert!(matches!(err, Error::AlreadyDeployed { .. }));
}

#[test]
fn undeploy_discards_lineage_but_keeps_entry() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();
    coordinator.undeploy(&id, &project, true).unwrap();

    assert!(store.deployment(&id, &project).unwrap().is_none());
    assert!(store.entry(&id).unwrap().is_some());
    assert!(!std::path::Path::new(&project).join(id.deploy_path()).exists());
}

#[test]
fn lineage_records_every_sync_operation() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let id = TestCollection::skill("pdf-tool");
    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj-a");

    let coordinator = SyncCoordinator::new(&store);
    coordinator.deploy(&id, &project).unwrap();
    fixture.seed_entry(&store, &id, "v2");
    coordinator
        .pull(&id, &project, PullOptions::default())
        .unwrap();

    let record = store.deployment(&id, &project).unwrap().unwrap();
    let events: Vec<_> = record.lineage.iter().map(|e| e.event).collect();
    assert_eq!(
        events,
        vec![
            artifact_core::LineageKind::Deployed,
            artifact_core::LineageKind::Pulled
        ]
    );
}
