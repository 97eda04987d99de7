//! Parser — raw structured text into typed [`Document`]s.
//!
//! Tolerant of missing optional sections, strict on required identity fields.
//! Dispatch is by the kind each corpus directory declares; duplicate node
//! identities across the parsed set are a fatal data-integrity error.

pub mod decision;
pub mod progress;
pub mod report;
pub mod sections;
pub mod stage;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::corpus::ScannedFile;
use crate::error::{QuillError, Result, Warning};
use crate::types::{Document, DocumentKind, NodeId};

/// The full parsed document set for one sync pass.
#[derive(Debug, Default)]
pub struct ParsedCorpus {
    /// Sorted by [`NodeId`], so every downstream consumer iterates in a
    /// deterministic order.
    pub documents: Vec<Document>,
    pub warnings: Vec<Warning>,
}

/// Parse one scanned file into its documents (a stage plan yields the stage
/// plus its flattened segments; the progress log yields one document per
/// entry).
pub fn parse_file(file: &ScannedFile, content: &str) -> Result<(Vec<Document>, Vec<Warning>)> {
    let docs = match file.kind {
        DocumentKind::Stage => stage::parse_stage(&file.path, content)?,
        DocumentKind::Report => vec![report::parse_report(&file.path, content)?],
        DocumentKind::Decision => vec![decision::parse_decision(&file.path, content)?],
        DocumentKind::ProgressEntry => {
            let (docs, warnings) = progress::parse_progress(&file.path, content);
            return Ok((docs, warnings));
        }
        DocumentKind::Segment => unreachable!("segments are never scanned standalone"),
    };
    Ok((docs, Vec::new()))
}

/// Parse every scanned file and assemble the corpus-wide document set,
/// rejecting duplicate identities.
pub fn parse_corpus(files: &[(ScannedFile, String)]) -> Result<ParsedCorpus> {
    let mut corpus = ParsedCorpus::default();
    let mut seen: BTreeMap<NodeId, String> = BTreeMap::new();

    for (file, content) in files {
        let (docs, warnings) = parse_file(file, content)?;
        debug!(path = %file.path.display(), count = docs.len(), "Parsed document file");
        for doc in docs {
            let source = doc.source_path.display().to_string();
            if let Some(first) = seen.get(&doc.id) {
                return Err(QuillError::DuplicateIdentity {
                    node_id: doc.id,
                    first: first.clone(),
                    second: source,
                });
            }
            seen.insert(doc.id.clone(), source);
            corpus.documents.push(doc);
        }
        corpus.warnings.extend(warnings);
    }

    corpus.documents.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(corpus)
}

/// Extract `(phase, stage)` from a filename of the form
/// `{prefix}{phase}_{stage}-name.md`. Filename-encoded identity is
/// authoritative for stages and reports.
pub(crate) fn filename_identity(path: &Path, prefix: &str) -> Option<(u32, u32)> {
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix(prefix)?;
    let key = rest.split('-').next()?;
    let (phase, stage) = key.split_once('_')?;
    Some((phase.parse().ok()?, stage.parse().ok()?))
}

/// Extract `((phase, stage), name)` from a stage-style title heading such as
/// `🚧 STAGE 1.1: Setup`.
pub(crate) fn title_identity(title: &str) -> Option<((u32, u32), String)> {
    let stripped = title.trim_start_matches(|c: char| !c.is_alphanumeric());
    let head = stripped.get(..5)?;
    if !head.eq_ignore_ascii_case("stage") {
        return None;
    }
    let rest = stripped[5..].trim_start();
    let (key, name) = rest.split_once(':')?;
    let (phase, stage) = key.trim().split_once('.')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(((phase.parse().ok()?, stage.parse().ok()?), name.to_string()))
}
