//! Filesystem layer for Artifact Manager
//!
//! Provides normalized path handling, atomic locked writes, SHA-256
//! checksums, and the [`FileSet`] content tree that the rest of the
//! workspace uses as the unit of artifact content.

pub mod checksum;
pub mod error;
pub mod fileset;
pub mod io;
pub mod path;

pub use checksum::{checksum_bytes, checksum_file};
pub use error::{Error, Result};
pub use fileset::FileSet;
pub use path::{NormalizedPath, validate_identifier};
