use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::ParseError;
use crate::types::{
    Document, DocumentBody, DocumentKind, NodeId, Segment, SegmentStatus, Stage, content_hash,
};

use super::sections::{labeled_lists, split_sections};
use super::{filename_identity, title_identity};

/// Parse a stage plan into its Stage document plus one flattened document per
/// implementation segment.
///
/// Identity comes from the filename (`stage{p}_{s}-name.md`), which is
/// authoritative; a body heading that disagrees is an error. The stage name is
/// required (from the title); every other section is optional.
pub fn parse_stage(path: &Path, content: &str) -> Result<Vec<Document>, ParseError> {
    let path_str = path.display().to_string();
    let (phase, stage) =
        filename_identity(path, "stage").ok_or_else(|| ParseError::MissingField {
            kind: "Stage",
            field: "filename identity (stage{phase}_{stage}-name.md)",
            path: path_str.clone(),
        })?;

    let split = split_sections(content);
    let title = split.title.clone().ok_or_else(|| ParseError::MissingField {
        kind: "Stage",
        field: "title heading",
        path: path_str.clone(),
    })?;

    let (body_key, name) = title_identity(&title).ok_or_else(|| ParseError::MissingField {
        kind: "Stage",
        field: "name",
        path: path_str.clone(),
    })?;
    if body_key != (phase, stage) {
        return Err(ParseError::IdentityMismatch {
            filename: format!("{phase}.{stage}"),
            body: format!("{}.{}", body_key.0, body_key.1),
            path: path_str,
        });
    }

    let mut objectives = Vec::new();
    let mut segments: Vec<(String, Segment, u64)> = Vec::new();
    let mut extensions = BTreeMap::new();
    let mut in_segments = false;

    for section in &split.sections {
        let key = section.key();
        if section.level == 2 {
            in_segments = false;
            match key.as_str() {
                "objectives" => {
                    objectives = super::sections::bullet_items(&section.body);
                }
                "implementation segments" => {
                    in_segments = true;
                }
                _ => {
                    extensions.insert(section.header.clone(), section.body.clone());
                }
            }
        } else if in_segments && key.starts_with("segment") {
            let segment = parse_segment(section, phase, stage, &path_str)?;
            let raw = format!("### {}\n{}", section.header, section.body);
            segments.push((segment.name.clone(), segment, content_hash(raw.as_bytes())));
        } else {
            extensions.insert(section.header.clone(), section.body.clone());
        }
    }

    let stage_body = Stage {
        phase,
        stage,
        name: name.clone(),
        objectives,
        segment_names: segments.iter().map(|(n, _, _)| n.clone()).collect(),
    };
    let mut tags = BTreeSet::new();
    tags.insert(format!("phase{phase}.{stage}"));

    let mut docs = vec![Document {
        id: NodeId::stage(phase, stage),
        kind: DocumentKind::Stage,
        title: format!("Stage {phase}.{stage}: {name}"),
        tags,
        raw_content_hash: content_hash(content.as_bytes()),
        source_path: path.to_path_buf(),
        extensions,
        body: DocumentBody::Stage(stage_body),
    }];

    for (seg_name, segment, seg_hash) in segments {
        docs.push(Document {
            id: NodeId::segment(phase, stage, &seg_name),
            kind: DocumentKind::Segment,
            title: seg_name,
            tags: BTreeSet::new(),
            raw_content_hash: seg_hash,
            source_path: path.to_path_buf(),
            extensions: BTreeMap::new(),
            body: DocumentBody::Segment(segment),
        });
    }
    Ok(docs)
}

fn parse_segment(
    section: &super::sections::Section,
    phase: u32,
    stage: u32,
    path: &str,
) -> Result<Segment, ParseError> {
    let name = section
        .header
        .split_once(':')
        .map(|(_, n)| n.trim())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ParseError::MalformedSection {
            section: section.header.clone(),
            detail: "segment header must be `SEGMENT N: <name>`".to_string(),
            path: path.to_string(),
        })?;

    let mut segment = Segment {
        phase,
        stage,
        name: name.to_string(),
        status: SegmentStatus::Pending,
        test_requirements: Vec::new(),
        implementation_tasks: Vec::new(),
        verification_criteria: Vec::new(),
    };

    for list in labeled_lists(&section.body) {
        match list.label.as_str() {
            "test requirements" => segment.test_requirements = list.items,
            "implementation tasks" => segment.implementation_tasks = list.items,
            "verification criteria" => segment.verification_criteria = list.items,
            "status" => segment.status = parse_status(&list.value),
            _ => {}
        }
    }
    Ok(segment)
}

fn parse_status(value: &str) -> SegmentStatus {
    match value.trim().to_lowercase().as_str() {
        "completed" | "done" => SegmentStatus::Completed,
        "in progress" | "in-progress" => SegmentStatus::InProgress,
        _ => SegmentStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE_DOC: &str = "\
# 🚧 STAGE 1.1: Setup

## 📝 OBJECTIVES
- Establish directory layout
- Wire the toolchain

## 🔧 IMPLEMENTATION SEGMENTS

### SEGMENT 1: Directory Structure
* 📝 **Test Requirements**:
  - Layout exists
* 🛠️ **Implementation Tasks**:
  - Create docs tree
* ✅ **Verification Criteria**:
  - All paths resolvable
* **Status**: Completed

### SEGMENT 2: Tooling
* 🛠️ **Implementation Tasks**:
  - Install hooks

## 🎯 SUCCESS CRITERIA
- Everything green
";

    fn path() -> std::path::PathBuf {
        std::path::PathBuf::from("docs/stages/stage1_1-setup.md")
    }

    #[test]
    fn parses_stage_and_flattens_segments() {
        let docs = parse_stage(&path(), STAGE_DOC).unwrap();
        assert_eq!(docs.len(), 3);

        let stage = &docs[0];
        assert_eq!(stage.id, NodeId::stage(1, 1));
        assert_eq!(stage.title, "Stage 1.1: Setup");
        let DocumentBody::Stage(body) = &stage.body else {
            panic!("expected stage body");
        };
        assert_eq!(body.objectives.len(), 2);
        assert_eq!(body.segment_names, vec!["Directory Structure", "Tooling"]);

        let seg = &docs[1];
        assert_eq!(seg.id, NodeId::segment(1, 1, "Directory Structure"));
        let DocumentBody::Segment(seg_body) = &seg.body else {
            panic!("expected segment body");
        };
        assert_eq!(seg_body.status, SegmentStatus::Completed);
        assert_eq!(seg_body.test_requirements, vec!["Layout exists"]);
        assert_eq!(seg_body.verification_criteria, vec!["All paths resolvable"]);
    }

    #[test]
    fn unrecognized_sections_land_in_extensions() {
        let docs = parse_stage(&path(), STAGE_DOC).unwrap();
        let body = docs[0].extensions.get("🎯 SUCCESS CRITERIA").unwrap();
        assert!(body.contains("Everything green"));
    }

    #[test]
    fn optional_sections_default_empty() {
        let minimal = "# STAGE 2.3: Bare\n";
        let docs = parse_stage(
            Path::new("docs/stages/stage2_3-bare.md"),
            minimal,
        )
        .unwrap();
        assert_eq!(docs.len(), 1);
        let DocumentBody::Stage(body) = &docs[0].body else {
            panic!("expected stage body");
        };
        assert!(body.objectives.is_empty());
        assert!(body.segment_names.is_empty());
    }

    #[test]
    fn filename_identity_is_authoritative() {
        let err = parse_stage(Path::new("docs/stages/stage9_9-setup.md"), STAGE_DOC).unwrap_err();
        assert!(matches!(err, ParseError::IdentityMismatch { .. }));
    }

    #[test]
    fn missing_name_is_an_error() {
        let err = parse_stage(&path(), "# STAGE 1.1:\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingField { field: "name", .. }
        ));
    }

    #[test]
    fn nonconventional_filename_is_an_error() {
        let err = parse_stage(Path::new("docs/stages/notes.md"), STAGE_DOC).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { .. }));
    }

    #[test]
    fn segment_hash_is_stable_and_local() {
        let a = parse_stage(&path(), STAGE_DOC).unwrap();
        let b = parse_stage(&path(), STAGE_DOC).unwrap();
        assert_eq!(a[1].raw_content_hash, b[1].raw_content_hash);
        assert_ne!(a[1].raw_content_hash, a[2].raw_content_hash);
    }
}
