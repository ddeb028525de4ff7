//! SHA-256 checksum utilities
//!
//! One canonical checksum format (`sha256:<hex>`) is used for all content
//! identity throughout the workspace. Hash equality is the only signal the
//! engine uses to decide whether two artifact states are identical.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Prefix for all checksums produced by this module
pub const PREFIX: &str = "sha256:";

/// Compute the checksum of a byte slice in canonical `sha256:<hex>` form.
pub fn checksum_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the checksum of a file's contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn checksum_file(path: &Path) -> std::io::Result<String> {
    let content = std::fs::read(path)?;
    Ok(checksum_bytes(&content))
}
