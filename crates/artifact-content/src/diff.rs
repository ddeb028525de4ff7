//! File-level diff computation
//!
//! Walks the union of paths across two artifact states and classifies each
//! file as added, modified, deleted, or unchanged. Modified text files get
//! unified-style line hunks; binary and oversized files report status only.

use artifact_fs::FileSet;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeSet;

/// Options controlling hunk generation
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Context lines around each hunk
    pub context_lines: usize,
    /// Files larger than this (either side) report status without hunks
    pub max_diff_bytes: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            max_diff_bytes: 1024 * 1024,
        }
    }
}

/// Per-file classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Unchanged,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// One line inside a hunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkLine {
    pub tag: LineTag,
    /// Line content including its terminator, if any
    pub content: String,
}

/// Classification of a hunk line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTag {
    Context,
    Added,
    Removed,
}

/// A contiguous group of changes with surrounding context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// 1-based first line of the hunk in the old file
    pub old_start: usize,
    pub old_lines: usize,
    /// 1-based first line of the hunk in the new file
    pub new_start: usize,
    pub new_lines: usize,
    pub lines: Vec<HunkLine>,
}

/// Diff result for a single path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    pub status: FileStatus,
    /// Line hunks; empty for unchanged, binary, or oversized files
    pub hunks: Vec<Hunk>,
    /// True when either side failed the text heuristic (NUL byte or
    /// invalid UTF-8)
    pub binary: bool,
    /// True when hunks were suppressed by the size threshold
    pub truncated: bool,
}

impl FileDiff {
    fn status_only(path: String, status: FileStatus) -> Self {
        Self {
            path,
            status,
            hunks: Vec::new(),
            binary: false,
            truncated: false,
        }
    }

    /// Render the hunks in unified-diff notation.
    pub fn to_unified(&self) -> String {
        let mut out = String::new();
        for hunk in &self.hunks {
            out.push_str(&format!(
                "@@ -{},{} +{},{} @@\n",
                hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
            ));
            for line in &hunk.lines {
                let sigil = match line.tag {
                    LineTag::Context => ' ',
                    LineTag::Added => '+',
                    LineTag::Removed => '-',
                };
                out.push(sigil);
                out.push_str(&line.content);
                if !line.content.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// Heuristic for non-text content: NUL byte or invalid UTF-8.
pub(crate) fn is_binary(content: &[u8]) -> bool {
    content.contains(&0) || std::str::from_utf8(content).is_err()
}

/// Diff two artifact states.
///
/// Walks the union of paths in order and emits one [`FileDiff`] per path,
/// so output for identical inputs is byte-identical.
pub fn diff_file_sets(old: &FileSet, new: &FileSet, options: &DiffOptions) -> Vec<FileDiff> {
    let paths: BTreeSet<&str> = old.paths().chain(new.paths()).collect();

    paths
        .into_iter()
        .map(|path| diff_path(path, old.get(path), new.get(path), options))
        .collect()
}

fn diff_path(
    path: &str,
    old: Option<&[u8]>,
    new: Option<&[u8]>,
    options: &DiffOptions,
) -> FileDiff {
    let path = path.to_string();
    match (old, new) {
        (None, None) => unreachable!("path comes from the union of both sets"),
        (Some(o), Some(n)) if o == n => FileDiff::status_only(path, FileStatus::Unchanged),
        (old, new) => {
            let status = match (old, new) {
                (None, Some(_)) => FileStatus::Added,
                (Some(_), None) => FileStatus::Deleted,
                _ => FileStatus::Modified,
            };
            let old = old.unwrap_or_default();
            let new = new.unwrap_or_default();

            if is_binary(old) || is_binary(new) {
                return FileDiff {
                    path,
                    status,
                    hunks: Vec::new(),
                    binary: true,
                    truncated: false,
                };
            }
            if old.len() > options.max_diff_bytes || new.len() > options.max_diff_bytes {
                return FileDiff {
                    path,
                    status,
                    hunks: Vec::new(),
                    binary: false,
                    truncated: true,
                };
            }

            let old_text = std::str::from_utf8(old).expect("checked by is_binary");
            let new_text = std::str::from_utf8(new).expect("checked by is_binary");
            FileDiff {
                path,
                status,
                hunks: text_hunks(old_text, new_text, options.context_lines),
                binary: false,
                truncated: false,
            }
        }
    }
}

fn text_hunks(old: &str, new: &str, context: usize) -> Vec<Hunk> {
    let diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();

    for group in diff.grouped_ops(context) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;

        let mut lines = Vec::new();
        for op in &group {
            for change in diff.iter_changes(op) {
                let tag = match change.tag() {
                    ChangeTag::Equal => LineTag::Context,
                    ChangeTag::Insert => LineTag::Added,
                    ChangeTag::Delete => LineTag::Removed,
                };
                lines.push(HunkLine {
                    tag,
                    content: change.value().to_string(),
                });
            }
        }

        hunks.push(Hunk {
            old_start: old_range.start + 1,
            old_lines: old_range.len(),
            new_start: new_range.start + 1,
            new_lines: new_range.len(),
            lines,
        });
    }

    hunks
}
