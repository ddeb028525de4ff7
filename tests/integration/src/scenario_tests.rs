//! Full engine walkthrough: the life of one artifact across upstream,
//! collection, and a project deployment.

use artifact_core::{
    DriftDetector, DriftStatus, ImportCandidate, ImportOptions, MergeStrategy, PushOutcome,
    SyncCoordinator, VersionGraphBuilder,
};
use artifact_store::{ArtifactId, ArtifactType, TxnScope};
use artifact_test_utils::TestCollection;
use pretty_assertions::assert_eq;

/// Replace the collection state of `id` with new SKILL.md content, as an
/// upstream update would.
fn move_collection(store: &artifact_store::Store, id: &ArtifactId, skill_md: &str) {
    let entry = store.entry(id).unwrap().unwrap();
    let mut files = TestCollection::sample_files("v1");
    files.insert("SKILL.md", skill_md.as_bytes().to_vec());
    store
        .with_txn(TxnScope::Entry, |txn| txn.put_entry(entry, &files))
        .unwrap();
}

#[test]
fn three_tier_drift_and_merge_walkthrough() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let detector = DriftDetector::new(&store);
    let coordinator = SyncCoordinator::new(&store);
    let id = TestCollection::skill("pdf-tool");

    // Deploy H1 and verify synced
    let h1 = fixture.seed_entry(&store, &id, "v1").content_hash;
    let project = fixture.project("proj");
    coordinator.deploy(&id, &project).unwrap();
    let check = detector.check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Synced);
    assert_eq!(check.current_hash, h1);

    // Local edit produces H2: modified
    fixture.edit_deployed_file(
        &project,
        &id,
        "SKILL.md",
        "# sample skill\n\nrevision: v1\nline-a local\nline-b\nline-c\n",
    );
    let check = detector.check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Modified);
    assert_eq!(check.deployed_hash, h1);
    let h2 = check.current_hash.clone();
    assert_ne!(h2, h1);

    // Collection moves to H3 while the local edit stands: conflict
    move_collection(
        &store,
        &id,
        "# sample skill\n\nrevision: v1\nline-a\nline-b\nline-c upstream\n",
    );
    let check = detector.check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Conflict);

    // Disjoint edits merge cleanly into H4
    let outcome = coordinator.push(&id, &project, MergeStrategy::Merge).unwrap();
    let PushOutcome::Committed { entry, deployment } = outcome else {
        panic!("disjoint edits must merge");
    };
    let h4 = entry.content_hash.clone();
    assert!(![h1.as_str(), h2.as_str()].contains(&h4.as_str()));
    assert_eq!(deployment.deployed_hash, h4);

    let merged = store.load_object(&h4).unwrap();
    let text = String::from_utf8(merged.get("SKILL.md").unwrap().to_vec()).unwrap();
    assert!(text.contains("line-a local"));
    assert!(text.contains("line-c upstream"));

    // Everything converges
    let check = detector.check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Synced);
    let graph = VersionGraphBuilder::new(&store).build(&id).unwrap();
    assert_eq!(graph.stats.synced, 1);
}

#[test]
fn overlapping_edits_leave_all_tiers_untouched() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let coordinator = SyncCoordinator::new(&store);
    let id = TestCollection::skill("pdf-tool");

    fixture.seed_entry(&store, &id, "v1");
    let project = fixture.project("proj");
    coordinator.deploy(&id, &project).unwrap();

    // Both sides rewrite the same line
    fixture.edit_deployed_file(
        &project,
        &id,
        "SKILL.md",
        "# sample skill\n\nrevision: local\nline-a\nline-b\nline-c\n",
    );
    move_collection(
        &store,
        &id,
        "# sample skill\n\nrevision: upstream\nline-a\nline-b\nline-c\n",
    );
    let collection_hash = store.entry(&id).unwrap().unwrap().content_hash;
    let local_text = fixture.read_deployed_file(&project, &id, "SKILL.md");

    let outcome = coordinator.push(&id, &project, MergeStrategy::Merge).unwrap();
    let PushOutcome::Conflicts(conflicts) = outcome else {
        panic!("overlapping edits must conflict");
    };
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].path, "SKILL.md");
    assert!(conflicts[0].annotated.as_ref().unwrap().contains("<<<<<<< local"));

    // Collection unchanged, project untouched, status still conflict
    assert_eq!(
        store.entry(&id).unwrap().unwrap().content_hash,
        collection_hash
    );
    assert_eq!(
        fixture.read_deployed_file(&project, &id, "SKILL.md"),
        local_text
    );
    let check = DriftDetector::new(&store).check(&id, &project).unwrap();
    assert_eq!(check.status, DriftStatus::Conflict);
}

#[test]
fn bulk_import_with_engineered_failure() {
    let fixture = TestCollection::new();
    let store = fixture.store();
    let coordinator = SyncCoordinator::new(&store);

    let candidates: Vec<ImportCandidate> = (1..=25)
        .map(|n| {
            let name = if n == 17 {
                "broken name".to_string()
            } else {
                format!("cmd-{n:02}")
            };
            ImportCandidate::new(
                ArtifactId::new(name, ArtifactType::Command),
                TestCollection::sample_files(&format!("{n}")),
            )
        })
        .collect();

    let report = coordinator
        .import(candidates, &ImportOptions::default())
        .unwrap();

    assert_eq!(report.imported.len(), 24);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.committed_batches, 3);

    // Entries around the failure committed and are fully usable
    let entries = store.entries().unwrap();
    assert_eq!(entries.len(), 24);
    for entry in &entries {
        store.load_object(&entry.content_hash).unwrap();
    }
    let project = fixture.project("proj");
    coordinator
        .deploy(&ArtifactId::new("cmd-16", ArtifactType::Command), &project)
        .unwrap();
    coordinator
        .deploy(&ArtifactId::new("cmd-18", ArtifactType::Command), &project)
        .unwrap();
}
