//! Normalized path handling and identifier validation

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// A path stored with forward slashes regardless of platform.
///
/// All persisted records and in-memory keys use this form; conversion to
/// the platform-native representation happens only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Create a normalized path from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        Self { inner: raw }
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native `PathBuf` for I/O.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Canonicalize against the real filesystem, without UNC prefixes on
    /// Windows.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist.
    pub fn canonicalize(&self) -> Result<Self> {
        let native = self.to_native();
        let canonical = dunce::canonicalize(&native).map_err(|e| Error::io(&native, e))?;
        Ok(Self::new(canonical))
    }

    /// Join a relative segment onto this path.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        let segment = segment.trim_start_matches('/');
        let joined = if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment)
        } else {
            format!("{}/{}", self.inner, segment)
        };
        Self { inner: joined }
    }

    /// The parent directory, if any.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        let idx = trimmed.rfind('/')?;
        if idx == 0 {
            Some(Self {
                inner: "/".to_string(),
            })
        } else {
            Some(Self {
                inner: trimmed[..idx].to_string(),
            })
        }
    }

    /// The final path component, if any.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|s| !s.is_empty())
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

/// Validate that a name is safe to use as a single path component.
///
/// Accepts ASCII alphanumerics, `-`, `_` and `.`; rejects empty names,
/// path separators, and the `.`/`..` components.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] describing the first violation.
pub fn validate_identifier(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidIdentifier {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid("must not be a relative path component"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid(&format!("contains disallowed character {bad:?}")));
    }
    Ok(())
}
