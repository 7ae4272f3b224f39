//! Unified diff rendering between two archives.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use similar::{Algorithm, TextDiff};

use crate::archive::Entry;

/// Label used for a side built from the live working tree.
pub const WORKING_TREE_LABEL: &str = "working tree";

/// How a single name differs between the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    /// Present only on the `from` side.
    Removed,
    /// Present only on the `to` side.
    Added,
    /// Present on both sides with different bytes.
    Modified,
}

/// One rendered file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub name: String,
    pub kind: DiffKind,
    pub text: String,
}

/// All differences between two entry lists, in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    pub entries: Vec<FileDiff>,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The full rendered diff.
    pub fn text(&self) -> String {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }
}

/// Compare `from` against `to`.
///
/// Names are visited in sorted order. Identical entries contribute nothing.
pub fn diff_entries(from: &[Entry], from_label: &str, to: &[Entry], to_label: &str) -> DiffReport {
    let old: BTreeMap<&str, &[u8]> = from
        .iter()
        .map(|e| (e.name.as_str(), e.content.as_slice()))
        .collect();
    let new: BTreeMap<&str, &[u8]> = to
        .iter()
        .map(|e| (e.name.as_str(), e.content.as_slice()))
        .collect();
    let names: BTreeSet<&str> = old.keys().chain(new.keys()).copied().collect();

    let mut entries = Vec::new();
    for name in names {
        let entry = match (old.get(name), new.get(name)) {
            (Some(a), Some(b)) if a == b => continue,
            (Some(a), Some(b)) => {
                let mut text = unified(name, from_label, a, to_label, b);
                if text.is_empty() {
                    // Only bytes that lossy UTF-8 decoding folds together differ.
                    text = format!(
                        "!!! file {name} differs between {from_label} and {to_label} (binary content)\n"
                    );
                }
                FileDiff {
                    name: name.to_string(),
                    kind: DiffKind::Modified,
                    text,
                }
            }
            (Some(a), None) => FileDiff {
                name: name.to_string(),
                kind: DiffKind::Removed,
                text: format!(
                    "!!! file {name} only in {from_label}\n{}",
                    unified(name, from_label, a, to_label, b"")
                ),
            },
            (None, Some(b)) => FileDiff {
                name: name.to_string(),
                kind: DiffKind::Added,
                text: format!(
                    "!!! file {name} only in {to_label}\n{}",
                    unified(name, from_label, b"", to_label, b)
                ),
            },
            (None, None) => continue,
        };
        entries.push(entry);
    }

    DiffReport { entries }
}

fn unified(name: &str, from_label: &str, old: &[u8], to_label: &str, new: &[u8]) -> String {
    let old: Cow<'_, str> = String::from_utf8_lossy(old);
    let new: Cow<'_, str> = String::from_utf8_lossy(new);
    let old_header = format!("{name} ({from_label})");
    let new_header = format!("{name} ({to_label})");

    TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(old.as_ref(), new.as_ref())
        .unified_diff()
        .context_radius(1)
        .header(&old_header, &new_header)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, content: &str) -> Entry {
        Entry::new(name, content)
    }

    #[test]
    fn identical_sides_are_empty() {
        let side = [entry("a", "1\n"), entry("b", "2\n")];
        let report = diff_entries(&side, "x", &side, "y");
        assert!(report.is_empty());
        assert_eq!(report.text(), "");
    }

    #[test]
    fn single_line_change_has_one_line_of_context() {
        let from = [entry("app.env", "1\n2\n3\n")];
        let to = [entry("app.env", "1\n2\n4\n")];
        let report = diff_entries(&from, "old", &to, "new");

        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].kind, DiffKind::Modified);
        let text = report.text();
        assert!(text.starts_with("--- app.env (old)\n+++ app.env (new)\n"), "{text}");
        assert!(text.contains("\n 2\n-3\n+4\n"), "{text}");
        assert!(!text.contains(" 1\n"), "context radius must be one line: {text}");
    }

    #[test]
    fn rendering_is_deterministic() {
        let from = [entry("b", "x\n"), entry("a", "1\n2\n3\n")];
        let to = [entry("a", "1\n2\n4\n"), entry("b", "y\n")];
        let first = diff_entries(&from, "l", &to, "r").text();
        let second = diff_entries(&from, "l", &to, "r").text();
        assert_eq!(first, second);
    }

    #[test]
    fn names_are_visited_in_sorted_order() {
        let from = [entry("z", "1\n"), entry("a", "1\n")];
        let to = [entry("z", "2\n"), entry("a", "2\n")];
        let names: Vec<_> = diff_entries(&from, "l", &to, "r")
            .entries
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["a", "z"]);
    }

    #[test]
    fn file_only_in_to_is_a_pure_addition() {
        let to = [entry("new.env", "A=1\nB=2\n")];
        let report = diff_entries(&[], "remote", &to, WORKING_TREE_LABEL);

        assert_eq!(report.entries[0].kind, DiffKind::Added);
        let text = report.text();
        assert!(text.starts_with("!!! file new.env only in working tree\n"), "{text}");
        assert!(text.contains("+A=1\n+B=2\n"), "{text}");
        assert!(!text.lines().any(|l| l.starts_with('-') && !l.starts_with("---")));
    }

    #[test]
    fn file_only_in_from_is_a_pure_deletion() {
        let from = [entry("old.env", "A=1\n")];
        let report = diff_entries(&from, "remote", &[], "local");

        assert_eq!(report.entries[0].kind, DiffKind::Removed);
        let text = report.text();
        assert!(text.starts_with("!!! file old.env only in remote\n"), "{text}");
        assert!(text.contains("-A=1\n"), "{text}");
    }

    #[test]
    fn bytes_hidden_by_lossy_decoding_still_report_a_difference() {
        let from = [Entry::new("bin", b"A\xff\n".to_vec())];
        let to = [Entry::new("bin", b"A\xfe\n".to_vec())];
        let report = diff_entries(&from, "l", &to, "r");

        assert!(!report.is_empty());
        assert_eq!(report.entries[0].kind, DiffKind::Modified);
        assert_eq!(
            report.text(),
            "!!! file bin differs between l and r (binary content)\n"
        );
    }

    #[test]
    fn invalid_utf8_is_rendered_lossily() {
        let from = [Entry::new("bin", vec![0xff, b'\n'])];
        let to = [Entry::new("bin", b"ok\n".to_vec())];
        let text = diff_entries(&from, "l", &to, "r").text();
        assert!(text.contains("-\u{fffd}\n"), "{text}");
        assert!(text.contains("+ok\n"), "{text}");
    }
}
