//! Section-oriented markdown splitting.
//!
//! Documents are split on `##`/`###` headers. Each document kind recognizes a
//! fixed header vocabulary; unrecognized headers are preserved verbatim in the
//! document's `extensions` map so round-tripping never drops author content.
//! List items are recovered structurally from bullet markers and indentation,
//! never by semantic inference.

/// One `##` or `###` section, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Header depth: 2 for `##`, 3 for `###`.
    pub level: u8,
    /// Header text as written (emoji and all), without the `#` markers.
    pub header: String,
    /// Raw body up to the next header of any level.
    pub body: String,
}

impl Section {
    /// Normalized lookup key for vocabulary matching.
    pub fn key(&self) -> String {
        normalize_header(&self.header)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SplitDocument {
    /// Text of the first `#` heading, if any.
    pub title: Option<String>,
    pub sections: Vec<Section>,
}

/// Split raw markdown into its title and flat section list.
pub fn split_sections(content: &str) -> SplitDocument {
    let mut doc = SplitDocument::default();
    let mut current: Option<Section> = None;
    let mut in_fence = false;

    for line in content.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let header = if in_fence { None } else { parse_header(trimmed) };
        match header {
            Some((1, text)) => {
                if doc.title.is_none() {
                    doc.title = Some(text.to_string());
                }
            }
            Some((level, text)) => {
                if let Some(section) = current.take() {
                    doc.sections.push(section);
                }
                current = Some(Section {
                    level,
                    header: text.to_string(),
                    body: String::new(),
                });
            }
            None => {
                if let Some(section) = current.as_mut() {
                    section.body.push_str(line);
                    section.body.push('\n');
                }
            }
        }
    }
    if let Some(section) = current.take() {
        doc.sections.push(section);
    }
    doc
}

fn parse_header(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 || hashes > 3 {
        return None;
    }
    let rest = &line[hashes..];
    let text = rest.strip_prefix(' ')?;
    #[allow(clippy::cast_possible_truncation)]
    Some((hashes as u8, text.trim()))
}

/// Normalize a header for vocabulary lookup: strip leading emoji/symbol
/// decoration, lowercase, collapse whitespace.
pub fn normalize_header(header: &str) -> String {
    let stripped = header.trim_start_matches(|c: char| !c.is_alphanumeric());
    stripped
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Recover top-level bullet items (`-` or `*` markers at zero indent) from a
/// section body.
pub fn bullet_items(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| bullet_text(line).filter(|_| indent_of(line) == 0))
        .map(str::to_string)
        .collect()
}

/// A labeled sub-list inside a section body:
///
/// ```text
/// * **Test Requirements**:
///   - item one
///   - item two
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledList {
    /// Normalized label (lowercased bold text of the top-level bullet).
    pub label: String,
    /// Inline text following the label, with the `:` separator stripped.
    pub value: String,
    /// Indented bullet children.
    pub items: Vec<String>,
}

/// Recover labeled sub-lists from a section body. Top-level bullets without a
/// bold label are ignored here (callers use [`bullet_items`] for flat lists).
pub fn labeled_lists(body: &str) -> Vec<LabeledList> {
    let mut lists: Vec<LabeledList> = Vec::new();
    for line in body.lines() {
        let indent = indent_of(line);
        let Some(text) = bullet_text(line) else {
            continue;
        };
        if indent == 0 {
            if let Some((label, value)) = split_bold_label(text) {
                lists.push(LabeledList {
                    label: normalize_header(&label),
                    value,
                    items: Vec::new(),
                });
            } else {
                // Unlabeled top-level bullet closes the previous list.
                lists.push(LabeledList {
                    label: String::new(),
                    value: text.to_string(),
                    items: Vec::new(),
                });
            }
        } else if let Some(last) = lists.last_mut() {
            last.items.push(text.to_string());
        }
    }
    lists.retain(|l| !l.label.is_empty());
    lists
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn bullet_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn split_bold_label(text: &str) -> Option<(String, String)> {
    let start = text.find("**")?;
    let rest = &text[start + 2..];
    let end = rest.find("**")?;
    let label = rest[..end].trim().trim_end_matches(':').to_string();
    let value = rest[end + 2..].trim().trim_start_matches(':').trim().to_string();
    Some((label, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE_SNIPPET: &str = "\
# 🚧 STAGE 1.1: Setup

## 📝 OBJECTIVES
- First objective
- Second objective

## 🔧 IMPLEMENTATION SEGMENTS

### SEGMENT 1: Directory Structure
* 📝 **Test Requirements**:
  - Layout test
* 🛠️ **Implementation Tasks**:
  - Create dirs
* **Status**: Completed

## 🚫 CONSTRAINTS
- No network access
";

    #[test]
    fn splits_title_and_sections_in_order() {
        let doc = split_sections(STAGE_SNIPPET);
        assert_eq!(doc.title.as_deref(), Some("🚧 STAGE 1.1: Setup"));
        let keys: Vec<_> = doc.sections.iter().map(Section::key).collect();
        assert_eq!(
            keys,
            vec![
                "objectives",
                "implementation segments",
                "segment 1: directory structure",
                "constraints"
            ]
        );
        assert_eq!(doc.sections[2].level, 3);
    }

    #[test]
    fn normalize_header_strips_emoji_decoration() {
        assert_eq!(normalize_header("📝 OBJECTIVES"), "objectives");
        assert_eq!(normalize_header("  Lessons   Learned "), "lessons learned");
        assert_eq!(normalize_header("Plain"), "plain");
    }

    #[test]
    fn bullet_items_recovers_top_level_only() {
        let body = "- one\n  - nested\n* two\nprose line\n";
        assert_eq!(bullet_items(body), vec!["one", "two"]);
    }

    #[test]
    fn labeled_lists_groups_children_under_bold_labels() {
        let doc = split_sections(STAGE_SNIPPET);
        let segment = &doc.sections[2];
        let lists = labeled_lists(&segment.body);
        assert_eq!(lists.len(), 3);
        assert_eq!(lists[0].label, "test requirements");
        assert_eq!(lists[0].items, vec!["Layout test"]);
        assert_eq!(lists[2].label, "status");
        assert_eq!(lists[2].value, "Completed");
    }

    #[test]
    fn fenced_code_blocks_do_not_open_sections() {
        let content = "# T\n\n## Real\nbody\n```\n## not a header\n```\nmore\n";
        let doc = split_sections(content);
        assert_eq!(doc.sections.len(), 1);
        assert!(doc.sections[0].body.contains("## not a header"));
    }

    #[test]
    fn headerless_document_has_no_sections() {
        let doc = split_sections("just prose\nno headers\n");
        assert!(doc.title.is_none());
        assert!(doc.sections.is_empty());
    }
}
