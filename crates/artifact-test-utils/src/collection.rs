//! [`TestCollection`] fixture for engine test scenarios.

use artifact_fs::{FileSet, NormalizedPath};
use artifact_store::{ArtifactId, ArtifactType, CollectionEntry, Store, TxnScope};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary collection store plus project directories.
///
/// # Example
///
/// ```rust,no_run
/// use artifact_test_utils::TestCollection;
/// use artifact_store::{ArtifactId, ArtifactType};
///
/// let fixture = TestCollection::new();
/// let store = fixture.store();
/// let id = ArtifactId::new("pdf-tool", ArtifactType::Skill);
/// fixture.seed_entry(&store, &id, "v1");
/// let project = fixture.project("proj-a");
/// ```
pub struct TestCollection {
    temp: TempDir,
}

impl Default for TestCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCollection {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    /// Root of the store directory.
    pub fn store_root(&self) -> PathBuf {
        self.temp.path().join("store")
    }

    /// Open a store handle, as one process would.
    pub fn store(&self) -> Store {
        Store::open(self.store_root()).unwrap()
    }

    /// Create (if needed) and return a project directory.
    pub fn project(&self, name: &str) -> String {
        let dir = self.temp.path().join("projects").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        NormalizedPath::new(dir).to_string()
    }

    /// A small, realistic artifact file set; `marker` varies the content
    /// (and therefore the hash).
    pub fn sample_files(marker: &str) -> FileSet {
        let mut files = FileSet::new();
        files.insert(
            "SKILL.md",
            format!("# sample skill\n\nrevision: {marker}\nline-a\nline-b\nline-c\n").into_bytes(),
        );
        files.insert("scripts/run.sh", b"#!/bin/sh\necho run\n".to_vec());
        files
    }

    /// Insert a collection entry with [`TestCollection::sample_files`]
    /// content.
    pub fn seed_entry(&self, store: &Store, id: &ArtifactId, marker: &str) -> CollectionEntry {
        let files = Self::sample_files(marker);
        store
            .with_txn(TxnScope::Entry, |txn| {
                txn.put_entry(CollectionEntry::new(id.clone()), &files)
            })
            .unwrap()
    }

    /// Overwrite one file inside a deployed copy.
    pub fn edit_deployed_file(&self, project: &str, id: &ArtifactId, file: &str, content: &str) {
        let path = Path::new(project).join(id.deploy_path()).join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// Read one file from a deployed copy.
    pub fn read_deployed_file(&self, project: &str, id: &ArtifactId, file: &str) -> String {
        let path = Path::new(project).join(id.deploy_path()).join(file);
        std::fs::read_to_string(path).unwrap()
    }

    /// A skill id, the most common kind in tests.
    pub fn skill(name: &str) -> ArtifactId {
        ArtifactId::new(name, ArtifactType::Skill)
    }
}
