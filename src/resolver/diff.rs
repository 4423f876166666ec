//! Unified-diff interpretation for pinned line ranges.
//!
//! Given the hunks of one file's diff between a pinned commit and the
//! current tip, plus a line range in the pinned revision's numbering,
//! [`interpret_range`] computes where that range sits under the new
//! revision, captures representative "was"/"now" content, and classifies
//! the outcome. [`parse_diff`] parses whole `git diff` output into per-file
//! hunk sets (with rename detection); [`parse_hunks`] parses a single
//! file's hunk text.
//!
//! The range walk mirrors the inspection semantics exactly:
//! - a hunk entirely before the range shifts both endpoints by the hunk's
//!   net line delta;
//! - a hunk overlapping the range is walked line by line with an in/out
//!   cursor pair, capturing context and removals into the "was" buffer and
//!   context and additions into the "now" buffer;
//! - per hunk, both buffers are sliced down to the queried range, and
//!   captures from consecutive overlapping hunks are joined with `...` to
//!   mark elided unchanged territory;
//! - a range whose lines were all deleted keeps its old locator with a
//!   `<-lines deleted` marker appended.
//!
//! Known imprecision, kept deliberately: when adjacent removals are
//! immediately followed by their replacement additions, a single-line query
//! on the first removed line classifies as deleted rather than changed
//! (the walk stops before reaching the additions). Realigning
//! removal/addition pairs would change recorded annotations in existing
//! models.

use regex::Regex;
use std::sync::LazyLock;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -([0-9]+)(?:,([0-9]+))? \+([0-9]+)(?:,([0-9]+))? @@").expect("static regex")
});

/// One line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    /// Present in both revisions.
    Context(String),
    /// Present only in the old revision.
    Removed(String),
    /// Present only in the new revision.
    Added(String),
}

/// One `@@ -s,l +s',l' @@` hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// First line of the hunk in the old revision.
    pub old_start: u64,
    /// Number of old-revision lines the hunk covers.
    pub old_count: u64,
    /// First line of the hunk in the new revision.
    pub new_start: u64,
    /// Number of new-revision lines the hunk covers.
    pub new_count: u64,
    /// The hunk body.
    pub lines: Vec<HunkLine>,
}

/// The diff of one file between two commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Path of the file in the old revision.
    pub old_path: String,
    /// Path in the new revision; differs from `old_path` on rename.
    pub new_path: String,
    /// Hunks in file order. Empty for binary files.
    pub hunks: Vec<Hunk>,
}

/// Where a queried line range ended up, before URL rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeOutcome {
    /// The range is untouched: same locator, same content.
    Untouched,
    /// Identical content at a shifted position.
    Moved {
        /// The new line locator, e.g. `L3` or `L3-7`.
        fragment: String,
        /// The captured content, when the walk overlapped any hunk.
        now: Option<String>,
    },
    /// Content within the range differs.
    Changed {
        /// The new locator; the old locator plus `<-lines deleted` when
        /// every line in the range was removed.
        fragment: String,
        /// Content of the shifted range in the new revision.
        now: Option<String>,
        /// Content of the queried range in the old revision.
        was: Option<String>,
    },
}

/// Classifies how the range `[first, last]` (old-revision numbering, with
/// `fragment` its original locator text) fares under `hunks`.
pub fn interpret_range(hunks: &[Hunk], first: u64, last: u64, fragment: &str) -> RangeOutcome {
    let u1 = first as i64;
    let u2 = last as i64;
    let mut n1 = u1;
    let mut n2 = u2;
    let mut now_content: Option<String> = None;
    let mut was_content: Option<String> = None;

    for hunk in hunks {
        let s = hunk.old_start as i64;
        let l = hunk.old_count as i64;
        let s_new = hunk.new_start as i64;
        let l_new = hunk.new_count as i64;
        let shift = (s_new - s) + (l_new - l);

        if u1 >= s + l {
            // Hunk is entirely before the queried range.
            n1 = u1 + shift;
            n2 = u2 + shift;
            continue;
        }
        if u2 < s {
            // Hunk is entirely after the queried range.
            break;
        }

        let mut in_line = s;
        let mut out_line = s_new;
        let mut now_lines: Vec<&str> = Vec::new();
        let mut was_lines: Vec<&str> = Vec::new();

        for line in &hunk.lines {
            if in_line > u2 + 1 {
                break;
            }
            match line {
                HunkLine::Context(text) => {
                    now_lines.push(text);
                    was_lines.push(text);
                    if in_line == u1 {
                        n1 = out_line;
                    }
                    if in_line == u2 {
                        n2 = out_line;
                    }
                    in_line += 1;
                    out_line += 1;
                    if in_line > u2 {
                        break;
                    }
                }
                HunkLine::Removed(text) => {
                    was_lines.push(text);
                    if in_line == u1 {
                        n1 = out_line;
                    }
                    if in_line == u2 {
                        n2 = out_line - 1;
                    }
                    in_line += 1;
                }
                HunkLine::Added(text) => {
                    now_lines.push(text);
                    if u2 <= in_line {
                        n2 = out_line;
                    }
                    out_line += 1;
                }
            }
        }

        let captured = slice_to_range(&now_lines, n1 - s_new, n2 - s_new);
        now_content = Some(match now_content {
            Some(prev) => format!("{prev}...{captured}"),
            None => captured,
        });
        let captured = slice_to_range(&was_lines, u1 - s, u2 - s);
        was_content = Some(match was_content {
            Some(prev) => format!("{prev}...{captured}"),
            None => captured,
        });

        if u2 >= s + l {
            // The range extends past this hunk; realign the far endpoint so
            // the next hunk's fast path shifts both ends together.
            n2 = u2 + shift;
        }
    }

    let new_fragment = if n1 > n2 {
        format!("{fragment}<-lines deleted")
    } else if n2 > n1 {
        format!("L{n1}-{n2}")
    } else {
        format!("L{n1}")
    };

    if new_fragment == fragment && was_content == now_content {
        return RangeOutcome::Untouched;
    }
    if was_content == now_content {
        RangeOutcome::Moved {
            fragment: new_fragment,
            now: now_content,
        }
    } else {
        RangeOutcome::Changed {
            fragment: new_fragment,
            now: now_content,
            was: was_content,
        }
    }
}

/// Slices a captured buffer down to the queried range. Offsets may fall
/// outside the buffer (range starts before the hunk, or ends past it); out
/// of range on either side clamps, and an inverted window is empty.
fn slice_to_range(lines: &[&str], start_offset: i64, last_offset: i64) -> String {
    let len = lines.len() as i64;
    let lo = start_offset.max(0);
    let hi = if last_offset < len { last_offset + 1 } else { len };
    if lo >= hi || lo >= len {
        return String::new();
    }
    lines[lo as usize..hi as usize].join("\n")
}

/// Parses the hunk text of a single file (everything from the first `@@`
/// header on). Lines before the first header are ignored.
pub fn parse_hunks(text: &str) -> Vec<Hunk> {
    let mut hunks: Vec<Hunk> = Vec::new();
    for line in text.lines() {
        if let Some(caps) = HUNK_HEADER.captures(line) {
            hunks.push(Hunk {
                old_start: caps[1].parse().unwrap_or(0),
                old_count: caps.get(2).map_or(1, |m| m.as_str().parse().unwrap_or(1)),
                new_start: caps[3].parse().unwrap_or(0),
                new_count: caps.get(4).map_or(1, |m| m.as_str().parse().unwrap_or(1)),
                lines: Vec::new(),
            });
            continue;
        }
        let Some(hunk) = hunks.last_mut() else {
            continue;
        };
        hunk.lines.extend(parse_body_line(line));
    }
    hunks
}

/// Parses complete `git diff` output into per-file entries.
///
/// Understands rename headers and `--- a/` / `+++ b/` path lines; binary
/// files produce entries with no hunks. `\ No newline at end of file`
/// markers are dropped.
pub fn parse_diff(text: &str) -> Vec<FileDiff> {
    let mut files: Vec<FileDiff> = Vec::new();
    // Lines remaining in the current hunk body; while positive, +/- lines
    // are body content, not file headers.
    let mut old_remaining: i64 = 0;
    let mut new_remaining: i64 = 0;

    for line in text.lines() {
        if old_remaining <= 0 && new_remaining <= 0 {
            if let Some(rest) = line.strip_prefix("diff --git ") {
                let (old_path, new_path) = parse_git_header_paths(rest);
                files.push(FileDiff {
                    old_path,
                    new_path,
                    hunks: Vec::new(),
                });
                continue;
            }
            if let Some(file) = files.last_mut() {
                if let Some(path) = line.strip_prefix("rename from ") {
                    file.old_path = path.to_string();
                    continue;
                }
                if let Some(path) = line.strip_prefix("rename to ") {
                    file.new_path = path.to_string();
                    continue;
                }
                if let Some(path) = line.strip_prefix("--- a/") {
                    file.old_path = path.to_string();
                    continue;
                }
                if let Some(path) = line.strip_prefix("+++ b/") {
                    file.new_path = path.to_string();
                    continue;
                }
                if let Some(caps) = HUNK_HEADER.captures(line) {
                    let hunk = Hunk {
                        old_start: caps[1].parse().unwrap_or(0),
                        old_count: caps.get(2).map_or(1, |m| m.as_str().parse().unwrap_or(1)),
                        new_start: caps[3].parse().unwrap_or(0),
                        new_count: caps.get(4).map_or(1, |m| m.as_str().parse().unwrap_or(1)),
                        lines: Vec::new(),
                    };
                    old_remaining = hunk.old_count as i64;
                    new_remaining = hunk.new_count as i64;
                    file.hunks.push(hunk);
                    continue;
                }
            }
            continue;
        }

        // Inside a hunk body.
        let parsed = parse_body_line(line);
        if let Some(file) = files.last_mut() {
            if let Some(hunk) = file.hunks.last_mut() {
                if let Some(body_line) = parsed {
                    match &body_line {
                        HunkLine::Context(_) => {
                            old_remaining -= 1;
                            new_remaining -= 1;
                        }
                        HunkLine::Removed(_) => old_remaining -= 1,
                        HunkLine::Added(_) => new_remaining -= 1,
                    }
                    hunk.lines.push(body_line);
                }
            }
        }
    }
    files
}

fn parse_body_line(line: &str) -> Option<HunkLine> {
    match line.chars().next() {
        Some(' ') | None => Some(HunkLine::Context(line.get(1..).unwrap_or("").to_string())),
        Some('-') => Some(HunkLine::Removed(line[1..].to_string())),
        Some('\\') => None,
        // '+' and, matching the inspection semantics, anything unrecognized
        Some(_) => Some(HunkLine::Added(line.get(1..).unwrap_or("").to_string())),
    }
}

fn parse_git_header_paths(rest: &str) -> (String, String) {
    // Best-effort split of `a/<old> b/<new>`; the `---`/`+++`/rename lines
    // that follow are authoritative and overwrite these.
    if let Some(idx) = rest.find(" b/") {
        let old = rest[..idx].strip_prefix("a/").unwrap_or(&rest[..idx]);
        let new = &rest[idx + 3..];
        (old.to_string(), new.to_string())
    } else {
        (rest.to_string(), rest.to_string())
    }
}
