//! Document templates and corpus scaffolding.
//!
//! Templates render with simple `{placeholder}` substitution and produce
//! documents the parser accepts as written, so a freshly scaffolded corpus
//! syncs cleanly.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::config::QuillConfig;
use crate::corpus::{CorpusLayout, append_log_entry};
use crate::error::{ConfigError, Result};
use crate::parse::title_identity;
use crate::types::slugify;

pub const STAGE_TEMPLATE: &str = "\
# 🚧 STAGE {phase}.{stage}: {name}

## 📝 OBJECTIVES
- [Objective 1]
- [Objective 2]

## 🔧 IMPLEMENTATION SEGMENTS

### SEGMENT 1: [Component Name]
* 📝 **Test Requirements**:
  - [Test 1]
* 🛠️ **Implementation Tasks**:
  - [Task 1]
* ✅ **Verification Criteria**:
  - [Criterion 1]
* **Status**: Pending

## 🎯 SUCCESS CRITERIA
- [Success criterion 1]

## 🚫 CONSTRAINTS
- [Constraint 1]

## 📋 DEPENDENCIES
- [Dependency 1]
";

pub const REPORT_TEMPLATE: &str = "\
# Stage {phase}.{stage}: {name} - Completion Report

## 📝 Summary
[Brief description of what was implemented]

## 🔧 Components Implemented
- [Component 1]

## 🧪 Testing Results
- [Test result 1]

## 🎯 Achievements
- [Achievement 1]

## 📋 Lessons Learned
- [Lesson 1]

## 🚀 Next Steps
- [Next step 1]
";

pub const PROGRESS_TEMPLATE: &str = "\
# Project Progress Log

## Current Status
- Current Phase: [Phase 1]
- Current Stage: [Not Started]

## Stage Completion Log

## Memory Sync Log

## Activity Log
- {timestamp}: Project initialized
";

pub const CLIENT_SPEC_TEMPLATE: &str = "\
---
title: \"Client Specification\"
updated: \"{timestamp}\"
---

# Client Specification

[Project requirements and objectives]

## Key Features

1. [Feature 1]
2. [Feature 2]
3. [Feature 3]
";

pub const ROADMAP_TEMPLATE: &str = "\
---
title: \"Project Roadmap\"
updated: \"{timestamp}\"
---

# Project Roadmap

## Phase 1: Foundation
- [Deliverable 1]
- [Deliverable 2]

## Phase 2: Core Implementation
- [Deliverable 3]
- [Deliverable 4]
";

fn render(template: &str, phase: u32, stage: u32, name: &str) -> String {
    template
        .replace("{phase}", &phase.to_string())
        .replace("{stage}", &stage.to_string())
        .replace("{name}", name)
        .replace("{timestamp}", &now())
}

fn now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn already_exists(path: &Path) -> crate::error::QuillError {
    std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("{} already exists", path.display()),
    )
    .into()
}

/// Scaffold a corpus root: document directories, the progress log, the
/// client spec and roadmap stubs, and `.quill/config.toml`. Existing files
/// are left alone, so `init` is safe to re-run.
pub fn scaffold(root: &Path, config: &QuillConfig) -> Result<Vec<PathBuf>> {
    let layout = CorpusLayout::new(root, config);
    let mut created = Vec::new();

    for dir in [
        &layout.docs_dir,
        &layout.stages_dir,
        &layout.reports_dir,
        &layout.decisions_dir,
        &layout.quill_dir,
    ] {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            created.push(dir.clone());
        }
    }

    for (path, template) in [
        (layout.progress_file.clone(), PROGRESS_TEMPLATE),
        (layout.spec_file(), CLIENT_SPEC_TEMPLATE),
        (layout.roadmap_file(), ROADMAP_TEMPLATE),
    ] {
        if !path.exists() {
            std::fs::write(&path, template.replace("{timestamp}", &now()))?;
            created.push(path);
        }
    }

    let config_path = layout.config_path();
    if !config_path.exists() {
        let raw = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(&config_path, raw)?;
        created.push(config_path);
    }

    info!(root = %root.display(), created = created.len(), "Corpus scaffolded");
    Ok(created)
}

/// Create a stage plan from the template. Fails when the file already exists.
pub fn create_stage(layout: &CorpusLayout, phase: u32, stage: u32, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(&layout.stages_dir)?;
    let path = layout
        .stages_dir
        .join(format!("stage{phase}_{stage}-{}.md", slugify(name)));
    if path.exists() {
        return Err(already_exists(&path));
    }
    std::fs::write(&path, render(STAGE_TEMPLATE, phase, stage, name))?;
    log_activity(
        layout,
        &format!("Created stage document: Stage {phase}.{stage}: {name}"),
    );
    info!(path = %path.display(), "Created stage document");
    Ok(path)
}

/// Create a completion report from the template. When `name` is not given it
/// is taken from the matching stage plan's title heading.
pub fn create_report(
    layout: &CorpusLayout,
    phase: u32,
    stage: u32,
    name: Option<&str>,
) -> Result<PathBuf> {
    let name = match name {
        Some(n) => n.to_string(),
        None => stage_name(layout, phase, stage)?,
    };
    std::fs::create_dir_all(&layout.reports_dir)?;
    let path = layout
        .reports_dir
        .join(format!("report{phase}_{stage}-{}.md", slugify(&name)));
    if path.exists() {
        return Err(already_exists(&path));
    }
    std::fs::write(&path, render(REPORT_TEMPLATE, phase, stage, &name))?;
    log_activity(
        layout,
        &format!("Created completion report for Stage {phase}.{stage}: {name}"),
    );
    info!(path = %path.display(), "Created completion report");
    Ok(path)
}

/// Look up a stage plan's name from its title heading, falling back to its
/// filename slug.
fn stage_name(layout: &CorpusLayout, phase: u32, stage: u32) -> Result<String> {
    let pattern = layout
        .stages_dir
        .join(format!("stage{phase}_{stage}-*.md"))
        .to_string_lossy()
        .to_string();
    let path = glob::glob(&pattern)
        .ok()
        .and_then(|mut paths| paths.next())
        .and_then(std::result::Result::ok)
        .ok_or_else(|| {
            crate::error::QuillError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no stage document found for Stage {phase}.{stage}"),
            ))
        })?;

    let content = std::fs::read_to_string(&path)?;
    if let Some(title) = content.lines().find_map(|l| l.strip_prefix("# ")) {
        if let Some((_, name)) = title_identity(title) {
            return Ok(name);
        }
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let slug = stem.split_once('-').map_or(stem.clone(), |(_, s)| s.to_string());
    Ok(slug.replace('-', " "))
}

fn log_activity(layout: &CorpusLayout, action: &str) {
    if layout.progress_file.is_file() {
        let line = format!("- {}: {action}", now());
        let _ = append_log_entry(&layout.progress_file, "Activity Log", &line);
    }
}
