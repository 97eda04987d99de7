use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::ParseError;
use crate::types::{
    Decision, DecisionStatus, Document, DocumentBody, DocumentKind, NodeId, content_hash, slugify,
};

use super::sections::{bullet_items, split_sections};

/// Parse a decision record (`docs/decisions/*.md`, ADR style).
///
/// Identity is the normalized title; the title heading is required. Sections
/// (Status, Context, Decision, Consequences, Alternatives) are optional.
pub fn parse_decision(path: &Path, content: &str) -> Result<Document, ParseError> {
    let path_str = path.display().to_string();
    let split = split_sections(content);
    let title = split
        .title
        .as_deref()
        .map(strip_adr_prefix)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ParseError::MissingField {
            kind: "Decision",
            field: "title",
            path: path_str,
        })?;

    let mut decision = Decision {
        title: title.to_string(),
        status: DecisionStatus::Proposed,
        context: String::new(),
        decision_text: String::new(),
        consequences: String::new(),
        alternatives: Vec::new(),
    };
    let mut extensions = BTreeMap::new();

    for section in &split.sections {
        match section.key().as_str() {
            "status" => decision.status = parse_status(&section.body),
            "context" => decision.context = section.body.trim().to_string(),
            "decision" => decision.decision_text = section.body.trim().to_string(),
            "consequences" => decision.consequences = section.body.trim().to_string(),
            "alternatives" | "alternatives considered" => {
                decision.alternatives = bullet_items(&section.body);
            }
            _ => {
                extensions.insert(section.header.clone(), section.body.clone());
            }
        }
    }

    let slug = slugify(title);
    Ok(Document {
        id: NodeId::decision(title),
        kind: DocumentKind::Decision,
        title: title.to_string(),
        tags: BTreeSet::from([slug]),
        raw_content_hash: content_hash(content.as_bytes()),
        source_path: path.to_path_buf(),
        extensions,
        body: DocumentBody::Decision(decision),
    })
}

/// Titles like `ADR 003: Use SQLite` identify by the decision name alone.
fn strip_adr_prefix(title: &str) -> &str {
    let trimmed = title.trim();
    let lower = trimmed.to_lowercase();
    if lower.starts_with("adr") {
        if let Some((_, rest)) = trimmed.split_once(':') {
            return rest.trim();
        }
    }
    trimmed
}

fn parse_status(body: &str) -> DecisionStatus {
    let first = body
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_lowercase();
    if first.starts_with("accepted") {
        DecisionStatus::Accepted
    } else if first.starts_with("superseded") {
        DecisionStatus::Superseded
    } else {
        DecisionStatus::Proposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECISION_DOC: &str = "\
# ADR 003: Use SQLite

## Status
Accepted

## Context
We need embedded persistence for #phase1.1 artifacts.

## Decision
Use SQLite behind the store adapter.

## Consequences
Single-file deployment.

## Alternatives
- Flat JSONL files
- External graph service
";

    fn path() -> std::path::PathBuf {
        std::path::PathBuf::from("docs/decisions/003-use-sqlite.md")
    }

    #[test]
    fn parses_adr_sections() {
        let doc = parse_decision(&path(), DECISION_DOC).unwrap();
        assert_eq!(doc.id, NodeId::decision("Use SQLite"));
        assert_eq!(doc.title, "Use SQLite");
        let DocumentBody::Decision(decision) = &doc.body else {
            panic!("expected decision body");
        };
        assert_eq!(decision.status, DecisionStatus::Accepted);
        assert!(decision.context.contains("#phase1.1"));
        assert_eq!(decision.alternatives.len(), 2);
        assert!(doc.tags.contains("use-sqlite"));
    }

    #[test]
    fn identity_is_the_normalized_title() {
        let a = parse_decision(&path(), "# Use SQLite\n").unwrap();
        let b = parse_decision(&path(), "# ADR 9: use sqlite!\n").unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn missing_title_is_an_error() {
        let err = parse_decision(&path(), "## Status\nProposed\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingField { field: "title", .. }
        ));
    }

    #[test]
    fn superseded_status_is_detected() {
        let doc = parse_decision(
            &path(),
            "# Old Choice\n\n## Status\nSuperseded by a better plan\n",
        )
        .unwrap();
        let DocumentBody::Decision(decision) = &doc.body else {
            panic!("expected decision body");
        };
        assert_eq!(decision.status, DecisionStatus::Superseded);
    }

    #[test]
    fn unknown_status_defaults_to_proposed() {
        let doc = parse_decision(&path(), "# X\n\n## Status\nUnder discussion\n").unwrap();
        let DocumentBody::Decision(decision) = &doc.body else {
            panic!("expected decision body");
        };
        assert_eq!(decision.status, DecisionStatus::Proposed);
    }
}
