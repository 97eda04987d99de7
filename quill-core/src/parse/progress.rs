use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::Warning;
use crate::types::{
    Document, DocumentBody, DocumentKind, NodeId, ProgressEntry, content_hash,
};

/// Status-word tags (`#completed`, `#in-progress`, ...) recognized on progress
/// entry header lines.
const STATUS_VOCAB: &[&str] = &[
    "blocked",
    "completed",
    "done",
    "in-progress",
    "pending",
    "review",
    "started",
    "sync",
];

/// Parse the whole append-only progress log into one document per entry.
///
/// An entry is a top-level bullet starting with a timestamp
/// (`- 2026-01-02T03:04:05: text #tags`); indented bullets beneath it become
/// its next steps. Entries must be unique and monotonically non-decreasing;
/// a violation is a warning, never fatal — duplicates are disambiguated with
/// a stable ordinal so identity stays deterministic.
pub fn parse_progress(path: &Path, content: &str) -> (Vec<Document>, Vec<Warning>) {
    let path_str = path.display().to_string();
    let mut docs = Vec::new();
    let mut warnings = Vec::new();

    let mut raw_entries: Vec<(NaiveDateTime, String, Vec<String>, String)> = Vec::new();
    for line in content.lines() {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim_start();
        if let Some(rest) = bullet_rest(trimmed) {
            if indent == 0 {
                if let Some((ts, text)) = split_timestamp(rest) {
                    raw_entries.push((ts, text.to_string(), Vec::new(), line.to_string()));
                    continue;
                }
            } else if let Some(entry) = raw_entries.last_mut() {
                let step = rest.strip_prefix("next:").map_or(rest, str::trim_start);
                entry.2.push(step.trim().to_string());
                entry.3.push('\n');
                entry.3.push_str(line);
                continue;
            }
        }
        // Prose, headers, and non-entry bullets do not belong to any entry.
    }

    let mut last_ts: Option<NaiveDateTime> = None;
    let mut seen: BTreeMap<NaiveDateTime, u32> = BTreeMap::new();
    for (ts, text, next_steps, raw) in raw_entries {
        let ordinal = seen.entry(ts).and_modify(|n| *n += 1).or_insert(0);
        if *ordinal > 0 {
            warnings.push(Warning::MonotonicityViolation {
                path: path_str.clone(),
                previous: ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
                current: format!("{} (duplicate)", ts.format("%Y-%m-%dT%H:%M:%S")),
            });
        } else if let Some(prev) = last_ts {
            if ts < prev {
                warnings.push(Warning::MonotonicityViolation {
                    path: path_str.clone(),
                    previous: prev.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    current: ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
                });
            }
        }
        last_ts = Some(last_ts.map_or(ts, |prev| prev.max(ts)));

        let (entry, tags, tag_warnings) =
            build_entry(ts, &text, next_steps, &path_str);
        warnings.extend(tag_warnings);

        let title = if entry.summary.is_empty() {
            format!("Progress {}", ts.format("%Y-%m-%dT%H:%M:%S"))
        } else {
            entry.summary.clone()
        };
        docs.push(Document {
            id: NodeId::progress(ts, *ordinal),
            kind: DocumentKind::ProgressEntry,
            title,
            tags,
            raw_content_hash: content_hash(raw.as_bytes()),
            source_path: path.to_path_buf(),
            extensions: BTreeMap::new(),
            body: DocumentBody::ProgressEntry(entry),
        });
    }

    (docs, warnings)
}

fn build_entry(
    ts: NaiveDateTime,
    text: &str,
    next_steps: Vec<String>,
    path: &str,
) -> (ProgressEntry, BTreeSet<String>, Vec<Warning>) {
    let mut entry = ProgressEntry {
        timestamp: ts,
        phase_tag: None,
        component_tag: None,
        status_tags: BTreeSet::new(),
        summary: String::new(),
        next_steps,
    };
    let mut tags = BTreeSet::new();
    let mut warnings = Vec::new();
    let mut summary_words = Vec::new();

    for word in text.split_whitespace() {
        let Some(token) = word.strip_prefix('#') else {
            summary_words.push(word);
            continue;
        };
        let token = token.trim_end_matches(|c: char| !c.is_alphanumeric());
        if token.is_empty() {
            summary_words.push(word);
            continue;
        }
        // Every token is retained as a tag, recognized or not.
        tags.insert(token.to_string());
        if let Some(key) = phase_tag_key(token) {
            entry.phase_tag.get_or_insert(key);
        } else if STATUS_VOCAB.contains(&token) {
            entry.status_tags.insert(token.to_string());
        } else if is_slug_shaped(token) {
            entry.component_tag.get_or_insert_with(|| token.to_string());
        } else {
            warnings.push(Warning::TagPatternMismatch {
                path: path.to_string(),
                token: token.to_string(),
            });
        }
    }
    entry.summary = summary_words.join(" ").trim().to_string();
    (entry, tags, warnings)
}

fn bullet_rest(trimmed: &str) -> Option<&str> {
    trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .map(str::trim)
}

/// Split `2026-01-02T03:04:05: rest` (fractional seconds tolerated).
fn split_timestamp(rest: &str) -> Option<(NaiveDateTime, &str)> {
    // The timestamp runs up to the first `: ` after the time-of-day colon
    // pair, so scan for the separator from a fixed minimum width. Byte 19
    // may fall inside a multi-byte character when the bullet is not a
    // timestamp entry at all; such bullets are simply not entries.
    let tail = rest.get(19.min(rest.len())..)?;
    let sep = tail.find(':').map(|i| i + 19)?;
    let (stamp, tail) = rest.split_at(sep);
    let tail = tail.strip_prefix(':')?.trim();
    let stamp = stamp.trim();
    let ts = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S"))
        .ok()?;
    Some((ts, tail))
}

fn phase_tag_key(token: &str) -> Option<String> {
    let rest = token.strip_prefix("phase")?;
    let (phase, stage) = rest.split_once('.')?;
    if !phase.is_empty()
        && !stage.is_empty()
        && phase.bytes().all(|b| b.is_ascii_digit())
        && stage.bytes().all(|b| b.is_ascii_digit())
    {
        Some(format!("{phase}.{stage}"))
    } else {
        None
    }
}

fn is_slug_shaped(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "-._".contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
# Project Progress Log

## Activity Log
- 2026-01-02T03:04:05: Started directory work #phase1.1 #directory-structure #in-progress
  - next: wire the toolchain
- 2026-01-02T08:00:00: Finished directory work #phase1.1 #completed
";

    fn path() -> std::path::PathBuf {
        std::path::PathBuf::from("docs/progress.md")
    }

    #[test]
    fn parses_entries_with_tags_and_next_steps() {
        let (docs, warnings) = parse_progress(&path(), LOG);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(docs.len(), 2);

        let DocumentBody::ProgressEntry(entry) = &docs[0].body else {
            panic!("expected progress entry");
        };
        assert_eq!(entry.phase_tag.as_deref(), Some("1.1"));
        assert_eq!(entry.component_tag.as_deref(), Some("directory-structure"));
        assert!(entry.status_tags.contains("in-progress"));
        assert_eq!(entry.summary, "Started directory work");
        assert_eq!(entry.next_steps, vec!["wire the toolchain"]);
        assert!(docs[0].tags.contains("phase1.1"));
    }

    #[test]
    fn identity_is_the_timestamp() {
        let (docs, _) = parse_progress(&path(), LOG);
        assert_eq!(docs[0].id.as_str(), "progress:2026-01-02T03:04:05");
    }

    #[test]
    fn out_of_order_timestamps_warn_but_parse() {
        let log = "\
- 2026-01-02T08:00:00: later #completed
- 2026-01-02T03:00:00: earlier #completed
";
        let (docs, warnings) = parse_progress(&path(), log);
        assert_eq!(docs.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            warnings[0],
            Warning::MonotonicityViolation { .. }
        ));
    }

    #[test]
    fn duplicate_timestamps_warn_and_disambiguate() {
        let log = "\
- 2026-01-02T03:00:00: first #completed
- 2026-01-02T03:00:00: second #completed
";
        let (docs, warnings) = parse_progress(&path(), log);
        assert_eq!(docs.len(), 2);
        assert_ne!(docs[0].id, docs[1].id);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn unrecognized_tokens_are_retained_and_warned() {
        let log = "- 2026-01-02T03:00:00: odd token #WeIrD!\n";
        let (docs, warnings) = parse_progress(&path(), log);
        assert!(docs[0].tags.contains("WeIrD"));
        assert!(matches!(
            warnings[0],
            Warning::TagPatternMismatch { ref token, .. } if token == "WeIrD"
        ));
    }

    #[test]
    fn non_entry_bullets_are_ignored() {
        let log = "## Current Status\n- Current Phase: [Phase 1]\n";
        let (docs, warnings) = parse_progress(&path(), log);
        assert!(docs.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn non_ascii_bullets_are_ignored_without_panicking() {
        let log = "\
## Заметки
- ααααααααααα: не запись
- 2026-01-02T03:04:05: мультибайтовый текст #completed
";
        let (docs, warnings) = parse_progress(&path(), log);
        assert_eq!(docs.len(), 1);
        assert!(warnings.is_empty());
        assert_eq!(docs[0].id.as_str(), "progress:2026-01-02T03:04:05");
    }

    #[test]
    fn fractional_seconds_are_tolerated() {
        let log = "- 2026-01-02T03:04:05.123456: micro precision #sync\n";
        let (docs, _) = parse_progress(&path(), log);
        assert_eq!(docs.len(), 1);
        assert!(docs[0].tags.contains("sync"));
    }
}
