//! Local-directory source provider
//!
//! Serves a directory tree as an upstream source: the "SHA" is the tree
//! checksum of the directory's content at resolve time. Used for importing
//! locally authored artifacts and as the provider in engine tests.

use crate::provider::{ResolvedSource, SourceProvider, SourceRef};
use crate::{Error, Result};
use artifact_fs::{FileSet, NormalizedPath};
use std::collections::HashMap;
use std::sync::Mutex;

/// Source provider over local directories.
#[derive(Default)]
pub struct DirSource {
    /// Resolved SHA → materialized content
    resolved: Mutex<HashMap<String, FileSet>>,
}

impl DirSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SourceProvider for DirSource {
    fn resolve(&self, source: &SourceRef) -> Result<ResolvedSource> {
        let mut root = NormalizedPath::new(&source.url);
        if let Some(subdir) = &source.subdir {
            root = root.join(subdir);
        }

        let files = FileSet::from_dir(&root).map_err(|e| Error::Fetch {
            url: source.url.clone(),
            message: e.to_string(),
        })?;
        let sha = files.tree_checksum();
        let paths: Vec<String> = files.paths().map(str::to_string).collect();

        self.resolved
            .lock()
            .expect("resolved map poisoned")
            .insert(sha.clone(), files);

        Ok(ResolvedSource {
            sha,
            version: source.reference.clone(),
            files: paths,
        })
    }

    fn fetch_file(&self, sha: &str, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolved.lock().expect("resolved map poisoned");
        let files = resolved.get(sha).ok_or_else(|| Error::UnknownSha {
            sha: sha.to_string(),
        })?;
        files
            .get(path)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::FileMissing {
                sha: sha.to_string(),
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fetch_file_set;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_and_fetches_local_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::write(dir.path().join("SKILL.md"), "# skill\n").unwrap();
        std::fs::write(dir.path().join("scripts/run.sh"), "echo hi\n").unwrap();

        let provider = DirSource::new();
        let source = SourceRef::new(dir.path().to_string_lossy().to_string());

        let (resolved, files) = fetch_file_set(&provider, &source).unwrap();
        assert_eq!(resolved.files, vec!["SKILL.md", "scripts/run.sh"]);
        assert_eq!(files.get("SKILL.md"), Some("# skill\n".as_bytes()));
        assert_eq!(resolved.sha, files.tree_checksum());
    }

    #[test]
    fn fetch_before_resolve_is_an_error() {
        let provider = DirSource::new();
        let err = provider.fetch_file("sha256:unknown", "f").unwrap_err();
        assert!(matches!(err, Error::UnknownSha { .. }));
    }

    #[test]
    fn missing_directory_is_a_fetch_error() {
        let provider = DirSource::new();
        let source = SourceRef::new("/definitely/not/here");
        assert!(matches!(
            provider.resolve(&source),
            Err(Error::Fetch { .. })
        ));
    }
}
