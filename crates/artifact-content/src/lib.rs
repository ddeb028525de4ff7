//! Diffing and merging for Artifact Manager
//!
//! Compares two artifact states file by file, produces line-level hunks for
//! modified text files, and reconciles divergent states with a three-way
//! merge. All output is deterministic: identical inputs always produce
//! identical diffs and merge results.

pub mod diff;
pub mod merge;

pub use diff::{DiffOptions, FileDiff, FileStatus, Hunk, HunkLine, LineTag, diff_file_sets};
pub use merge::{
    ConflictReason, ConflictedFile, MergeOutcome, MergeStrategy, MergedFile, merge_file_sets,
};
