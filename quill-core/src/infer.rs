//! Relationship inference — derives typed edges from the full parsed
//! document set of one sync pass.
//!
//! Rules run in a fixed order and later rules never retract earlier edges.
//! Given the same document set the produced edge set is byte-for-byte
//! identical across runs: documents arrive sorted by [`NodeId`], edges are
//! collected into an ordered set, and nothing here consults the clock or any
//! source of randomness.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::Warning;
use crate::types::{
    DecisionStatus, Document, DocumentBody, Edge, NodeId, RelationKind, slugify,
};

/// The candidate edge set and the warnings inference produced.
#[derive(Debug, Default)]
pub struct Inference {
    /// Sorted by (relation kind, from, to) — the stable apply order.
    pub edges: Vec<Edge>,
    pub warnings: Vec<Warning>,
}

/// Run all inference rules over a document set sorted by [`NodeId`].
pub fn infer_edges(documents: &[Document]) -> Inference {
    let index = CorpusIndex::build(documents);
    let mut edges: BTreeSet<Edge> = BTreeSet::new();
    let mut warnings = Vec::new();

    // Rule 1: Segment → owning Stage (structural, always present).
    for doc in documents {
        if let DocumentBody::Segment(segment) = &doc.body {
            edges.insert(Edge::new(
                RelationKind::BelongsToStage,
                doc.id.clone(),
                NodeId::stage(segment.phase, segment.stage),
            ));
        }
    }

    // Rule 2: Report → Stage sharing its (phase, stage) key.
    for doc in documents {
        let DocumentBody::Report(report) = &doc.body else {
            continue;
        };
        if let Some(stage_id) = index.stages_by_key.get(&report.key()) {
            edges.insert(Edge::new(
                RelationKind::ReportsOn,
                doc.id.clone(),
                stage_id.clone(),
            ));
        } else {
            warnings.push(Warning::DanglingReference {
                node: doc.id.clone(),
                relation: RelationKind::ReportsOn,
                target: format!("stage {}", report.key()),
            });
        }
    }

    // Rule 3: Report components matched against known segment names.
    // No match produces no edge and no warning.
    for doc in documents {
        let DocumentBody::Report(report) = &doc.body else {
            continue;
        };
        for component in &report.components_implemented {
            let needle = slugify(component);
            if needle.is_empty() {
                continue;
            }
            for (seg_id, seg_slug) in &index.segments {
                if names_match(&needle, seg_slug) {
                    edges.insert(Edge::new(
                        RelationKind::MentionsComponent,
                        doc.id.clone(),
                        seg_id.clone(),
                    ));
                }
            }
        }
    }

    // Rule 4: ProgressEntry → Stage/Decision named in its tags.
    for doc in documents {
        if !matches!(doc.body, DocumentBody::ProgressEntry(_)) {
            continue;
        }
        for tag in &doc.tags {
            for target in index.targets_for_token(tag) {
                edges.insert(Edge::new(
                    RelationKind::TaggedWith,
                    doc.id.clone(),
                    target.clone(),
                ));
            }
        }
    }

    // Rule 5: free-text `#token` references inside context/summary/next_steps.
    for doc in documents {
        for token in reference_tokens(doc) {
            for target in index.targets_for_token(&token) {
                if *target != doc.id {
                    edges.insert(Edge::new(
                        RelationKind::References,
                        doc.id.clone(),
                        target.clone(),
                    ));
                }
            }
        }
    }

    // Rule 6: a superseded Decision names the decision it replaces in its
    // context. Absence is a warning, never fatal.
    for doc in documents {
        let DocumentBody::Decision(decision) = &doc.body else {
            continue;
        };
        if decision.status != DecisionStatus::Superseded {
            continue;
        }
        let context_slug = slugify(&decision.context);
        let mut found = false;
        for (slug, target) in &index.decisions_by_slug {
            if *target != doc.id && context_slug.contains(slug.as_str()) {
                edges.insert(Edge::new(
                    RelationKind::Supersedes,
                    doc.id.clone(),
                    target.clone(),
                ));
                found = true;
            }
        }
        if !found {
            warnings.push(Warning::DanglingReference {
                node: doc.id.clone(),
                relation: RelationKind::Supersedes,
                target: "replaced decision (by title, in context)".to_string(),
            });
        }
    }

    debug!(
        edges = edges.len(),
        warnings = warnings.len(),
        "Relationship inference complete"
    );
    Inference {
        edges: edges.into_iter().collect(),
        warnings,
    }
}

/// Identity lookups built once per pass. All maps are ordered so iteration
/// stays deterministic.
#[derive(Debug, Default)]
struct CorpusIndex {
    /// `"1.1"` → stage node.
    stages_by_key: BTreeMap<String, NodeId>,
    /// (segment node, slugified segment name), in NodeId order.
    segments: Vec<(NodeId, String)>,
    /// normalized title → decision node.
    decisions_by_slug: BTreeMap<String, NodeId>,
}

impl CorpusIndex {
    fn build(documents: &[Document]) -> Self {
        let mut index = Self::default();
        for doc in documents {
            match &doc.body {
                DocumentBody::Stage(stage) => {
                    index.stages_by_key.insert(stage.key(), doc.id.clone());
                }
                DocumentBody::Segment(segment) => {
                    index
                        .segments
                        .push((doc.id.clone(), slugify(&segment.name)));
                }
                DocumentBody::Decision(decision) => {
                    index
                        .decisions_by_slug
                        .insert(slugify(&decision.title), doc.id.clone());
                }
                _ => {}
            }
        }
        index
    }

    /// Resolve a tag/reference token to the identities it names: `phaseX.Y`
    /// and bare `X.Y` name a stage; a normalized title names a decision.
    fn targets_for_token(&self, token: &str) -> Vec<&NodeId> {
        let mut targets = Vec::new();
        let key = token.strip_prefix("phase").unwrap_or(token);
        if let Some(stage_id) = self.stages_by_key.get(key) {
            targets.push(stage_id);
        }
        if let Some(decision_id) = self.decisions_by_slug.get(&slugify(token)) {
            targets.push(decision_id);
        }
        targets
    }
}

fn names_match(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a == b || a.contains(b) || b.contains(a))
}

/// The free-text fields rule 5 scans, per document kind.
fn reference_tokens(doc: &Document) -> Vec<String> {
    let mut text = String::new();
    match &doc.body {
        DocumentBody::Decision(decision) => text.push_str(&decision.context),
        DocumentBody::Report(report) => text.push_str(&report.summary),
        DocumentBody::ProgressEntry(entry) => {
            text.push_str(&entry.summary);
            for step in &entry.next_steps {
                text.push(' ');
                text.push_str(step);
            }
        }
        _ => {}
    }
    let mut tokens: Vec<String> = text
        .split_whitespace()
        .filter_map(|w| w.strip_prefix('#'))
        .map(|t| t.trim_end_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}
