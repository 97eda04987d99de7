use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::ParseError;
use crate::types::{Document, DocumentBody, DocumentKind, NodeId, Report, content_hash};

use super::sections::{bullet_items, split_sections};
use super::{filename_identity, title_identity};

const COMPLETION_SUFFIX: &str = "- Completion Report";

/// Parse a completion report (`report{p}_{s}-name.md`).
///
/// Filename identity is authoritative, same as stages. All sections are
/// optional; the summary is the prose of the `Summary` section.
pub fn parse_report(path: &Path, content: &str) -> Result<Document, ParseError> {
    let path_str = path.display().to_string();
    let (phase, stage) =
        filename_identity(path, "report").ok_or_else(|| ParseError::MissingField {
            kind: "Report",
            field: "filename identity (report{phase}_{stage}-name.md)",
            path: path_str.clone(),
        })?;

    let split = split_sections(content);

    // The title heading is optional for reports, but when present and carrying
    // a stage key it must agree with the filename.
    let mut title = format!("Stage {phase}.{stage} Completion Report");
    if let Some(heading) = &split.title {
        if let Some((body_key, name)) = title_identity(heading) {
            if body_key != (phase, stage) {
                return Err(ParseError::IdentityMismatch {
                    filename: format!("{phase}.{stage}"),
                    body: format!("{}.{}", body_key.0, body_key.1),
                    path: path_str,
                });
            }
            let name = name.trim_end_matches(COMPLETION_SUFFIX).trim();
            title = format!("Stage {phase}.{stage}: {name} - Completion Report");
        } else {
            title = heading.clone();
        }
    }

    let mut report = Report {
        phase,
        stage,
        summary: String::new(),
        components_implemented: Vec::new(),
        achievements: Vec::new(),
        lessons_learned: Vec::new(),
    };
    let mut extensions = BTreeMap::new();

    for section in &split.sections {
        match section.key().as_str() {
            "summary" => report.summary = section.body.trim().to_string(),
            "components implemented" => {
                report.components_implemented = bullet_items(&section.body);
            }
            "achievements" => report.achievements = bullet_items(&section.body),
            "lessons learned" => report.lessons_learned = bullet_items(&section.body),
            _ => {
                extensions.insert(section.header.clone(), section.body.clone());
            }
        }
    }

    Ok(Document {
        id: NodeId::report(phase, stage),
        kind: DocumentKind::Report,
        title,
        tags: BTreeSet::from([format!("phase{phase}.{stage}")]),
        raw_content_hash: content_hash(content.as_bytes()),
        source_path: path.to_path_buf(),
        extensions,
        body: DocumentBody::Report(report),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT_DOC: &str = "\
# Stage 1.1: Setup - Completion Report

## 📝 Summary
Implemented the initial directory layout.

## 🔧 Components Implemented
- Directory Structure
- Tooling

## 🧪 Testing Results
- All green

## 🎯 Achievements
- One-command bootstrap

## 📋 Lessons Learned
- Keep templates small
";

    fn path() -> std::path::PathBuf {
        std::path::PathBuf::from("docs/reports/report1_1-setup.md")
    }

    #[test]
    fn parses_report_fields() {
        let doc = parse_report(&path(), REPORT_DOC).unwrap();
        assert_eq!(doc.id, NodeId::report(1, 1));
        assert_eq!(doc.title, "Stage 1.1: Setup - Completion Report");
        let DocumentBody::Report(report) = &doc.body else {
            panic!("expected report body");
        };
        assert_eq!(report.summary, "Implemented the initial directory layout.");
        assert_eq!(
            report.components_implemented,
            vec!["Directory Structure", "Tooling"]
        );
        assert_eq!(report.achievements, vec!["One-command bootstrap"]);
        assert_eq!(report.lessons_learned, vec!["Keep templates small"]);
        assert!(doc.extensions.contains_key("🧪 Testing Results"));
    }

    #[test]
    fn title_mismatch_is_rejected() {
        let err = parse_report(Path::new("docs/reports/report2_2-setup.md"), REPORT_DOC)
            .unwrap_err();
        assert!(matches!(err, ParseError::IdentityMismatch { .. }));
    }

    #[test]
    fn headingless_report_takes_identity_from_filename() {
        let doc = parse_report(&path(), "## Summary\nDone.\n").unwrap();
        assert_eq!(doc.id, NodeId::report(1, 1));
        let DocumentBody::Report(report) = &doc.body else {
            panic!("expected report body");
        };
        assert_eq!(report.summary, "Done.");
        assert!(report.components_implemented.is_empty());
    }
}
