//! Three-way merge over artifact states
//!
//! Reconciles a local copy (`ours`) and a collection/upstream copy
//! (`theirs`) against their last common ancestor (`base`). Files changed on
//! one side only take the other side's version; files changed on both sides
//! are spliced when the edited base line ranges are disjoint, and reported
//! as conflicts otherwise. Conflicts are data, never silently resolved.

use crate::diff::is_binary;
use artifact_fs::FileSet;
use serde::{Deserialize, Serialize};
use similar::{DiffTag, TextDiff};
use std::collections::BTreeSet;

/// Conflict-resolution strategy for a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Result is the collection/upstream state; local edits are discarded
    TakeUpstream,
    /// Result is the local state; the collection is updated to match
    KeepLocal,
    /// Per-file three-way merge with conflict detection
    Merge,
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TakeUpstream => write!(f, "take_upstream"),
            Self::KeepLocal => write!(f, "keep_local"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

impl std::str::FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "take_upstream" => Ok(Self::TakeUpstream),
            "keep_local" => Ok(Self::KeepLocal),
            "merge" => Ok(Self::Merge),
            other => Err(format!(
                "unknown merge strategy {other:?} (expected take_upstream, keep_local, or merge)"
            )),
        }
    }
}

/// Why a file could not be merged automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Both sides edited overlapping line ranges
    OverlappingHunks,
    /// File added on both sides with different content
    BothAdded,
    /// Deleted on one side, modified on the other
    DeletedAndModified,
    /// Both sides changed a file that is not line-mergeable
    Binary,
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OverlappingHunks => write!(f, "overlapping edits"),
            Self::BothAdded => write!(f, "added on both sides"),
            Self::DeletedAndModified => write!(f, "deleted and modified"),
            Self::Binary => write!(f, "binary content changed on both sides"),
        }
    }
}

/// A cleanly merged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFile {
    pub path: String,
    pub content: Vec<u8>,
}

/// A file excluded from the clean result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictedFile {
    pub path: String,
    pub reason: ConflictReason,
    /// Local version, if the file exists locally
    pub ours: Option<Vec<u8>>,
    /// Collection version, if the file exists there
    pub theirs: Option<Vec<u8>>,
    /// Both versions with conflict markers, for text content
    pub annotated: Option<String>,
}

impl ConflictedFile {
    fn new(
        path: &str,
        reason: ConflictReason,
        ours: Option<&[u8]>,
        theirs: Option<&[u8]>,
    ) -> Self {
        let annotated = match (ours, theirs) {
            (Some(o), Some(t)) if !is_binary(o) && !is_binary(t) => Some(format!(
                "<<<<<<< local\n{}=======\n{}>>>>>>> collection\n",
                ensure_trailing_newline(std::str::from_utf8(o).expect("checked by is_binary")),
                ensure_trailing_newline(std::str::from_utf8(t).expect("checked by is_binary")),
            )),
            _ => None,
        };
        Self {
            path: path.to_string(),
            reason,
            ours: ours.map(<[u8]>::to_vec),
            theirs: theirs.map(<[u8]>::to_vec),
            annotated,
        }
    }
}

/// Result of a merge
///
/// A non-empty `conflicts` list means the merge must not be committed;
/// callers surface the conflicts and leave persisted state untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub applied: Vec<MergedFile>,
    pub conflicts: Vec<ConflictedFile>,
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// The clean result as a file set.
    pub fn applied_set(&self) -> FileSet {
        self.applied
            .iter()
            .map(|f| (f.path.clone(), f.content.clone()))
            .collect()
    }
}

/// Merge `ours` and `theirs` against their common ancestor `base`.
pub fn merge_file_sets(
    base: &FileSet,
    ours: &FileSet,
    theirs: &FileSet,
    strategy: MergeStrategy,
) -> MergeOutcome {
    match strategy {
        MergeStrategy::TakeUpstream => whole_side(theirs),
        MergeStrategy::KeepLocal => whole_side(ours),
        MergeStrategy::Merge => three_way(base, ours, theirs),
    }
}

fn whole_side(side: &FileSet) -> MergeOutcome {
    MergeOutcome {
        applied: side
            .iter()
            .map(|(path, content)| MergedFile {
                path: path.to_string(),
                content: content.to_vec(),
            })
            .collect(),
        conflicts: Vec::new(),
    }
}

fn three_way(base: &FileSet, ours: &FileSet, theirs: &FileSet) -> MergeOutcome {
    let paths: BTreeSet<&str> = base
        .paths()
        .chain(ours.paths())
        .chain(theirs.paths())
        .collect();

    let mut outcome = MergeOutcome::default();
    for path in paths {
        let b = base.get(path);
        let o = ours.get(path);
        let t = theirs.get(path);

        match merge_path(path, b, o, t) {
            PathResult::Keep(content) => outcome.applied.push(MergedFile {
                path: path.to_string(),
                content,
            }),
            PathResult::Absent => {}
            PathResult::Conflict(conflict) => outcome.conflicts.push(conflict),
        }
    }
    outcome
}

enum PathResult {
    Keep(Vec<u8>),
    Absent,
    Conflict(ConflictedFile),
}

fn merge_path(
    path: &str,
    base: Option<&[u8]>,
    ours: Option<&[u8]>,
    theirs: Option<&[u8]>,
) -> PathResult {
    // Both sides agree, including both-deleted and both-added-identical.
    if ours == theirs {
        return match ours {
            Some(content) => PathResult::Keep(content.to_vec()),
            None => PathResult::Absent,
        };
    }
    // Unchanged on our side: take theirs (which may be a deletion).
    if base == ours {
        return match theirs {
            Some(content) => PathResult::Keep(content.to_vec()),
            None => PathResult::Absent,
        };
    }
    // Unchanged on their side: take ours.
    if base == theirs {
        return match ours {
            Some(content) => PathResult::Keep(content.to_vec()),
            None => PathResult::Absent,
        };
    }

    // Both sides changed, differently.
    let (Some(base), Some(ours), Some(theirs)) = (base, ours, theirs) else {
        let reason = if base.is_none() {
            ConflictReason::BothAdded
        } else {
            ConflictReason::DeletedAndModified
        };
        return PathResult::Conflict(ConflictedFile::new(path, reason, ours, theirs));
    };

    if is_binary(base) || is_binary(ours) || is_binary(theirs) {
        return PathResult::Conflict(ConflictedFile::new(
            path,
            ConflictReason::Binary,
            Some(ours),
            Some(theirs),
        ));
    }

    let base_text = std::str::from_utf8(base).expect("checked by is_binary");
    let ours_text = std::str::from_utf8(ours).expect("checked by is_binary");
    let theirs_text = std::str::from_utf8(theirs).expect("checked by is_binary");

    match splice_lines(base_text, ours_text, theirs_text) {
        Some(merged) => PathResult::Keep(merged.into_bytes()),
        None => PathResult::Conflict(ConflictedFile::new(
            path,
            ConflictReason::OverlappingHunks,
            Some(ours),
            Some(theirs),
        )),
    }
}

/// A side's edit: replace base lines `[start, end)` with `lines`.
#[derive(Debug, Clone)]
struct Replacement {
    start: usize,
    end: usize,
    lines: Vec<String>,
}

impl Replacement {
    fn is_insertion(&self) -> bool {
        self.start == self.end
    }

    fn overlaps(&self, other: &Self) -> bool {
        if self.start < other.end && other.start < self.end {
            return true;
        }
        // Two insertions at the same point have no defined order.
        self.is_insertion() && other.is_insertion() && self.start == other.start
    }
}

fn changed_regions(base: &str, side: &str) -> Vec<Replacement> {
    let diff = TextDiff::from_lines(base, side);
    let side_lines = split_lines(side);

    diff.ops()
        .iter()
        .filter(|op| op.tag() != DiffTag::Equal)
        .map(|op| Replacement {
            start: op.old_range().start,
            end: op.old_range().end,
            lines: side_lines[op.new_range()].to_vec(),
        })
        .collect()
}

/// Splice both sides' edits into the base when their line ranges are
/// disjoint. Returns `None` on any overlap.
fn splice_lines(base: &str, ours: &str, theirs: &str) -> Option<String> {
    let our_edits = changed_regions(base, ours);
    let their_edits = changed_regions(base, theirs);

    for a in &our_edits {
        for b in &their_edits {
            if a.overlaps(b) {
                return None;
            }
        }
    }

    let mut all: Vec<&Replacement> = our_edits.iter().chain(their_edits.iter()).collect();
    all.sort_by_key(|r| (r.start, r.end));

    let base_lines = split_lines(base);
    let mut merged = String::new();
    let mut cursor = 0usize;
    for r in all {
        for line in &base_lines[cursor..r.start] {
            merged.push_str(line);
        }
        for line in &r.lines {
            merged.push_str(line);
        }
        cursor = cursor.max(r.end);
    }
    for line in &base_lines[cursor..] {
        merged.push_str(line);
    }
    Some(merged)
}

/// Split into lines keeping terminators, matching `TextDiff::from_lines`
/// tokenization so op ranges index correctly.
fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

fn ensure_trailing_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}
