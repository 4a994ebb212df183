//! Best-effort extraction of the Markdown sections the analysis template
//! asks for.
//!
//! The template requests four headed sections (Document Type, Summary, Key
//! Information & Localization, Category), but models vary the heading style:
//! `**Summary:**`, `## Summary`, `2. **Summary**`, `Summary:` all occur. The
//! parser is line based: a line is a section heading when its label matches
//! one of the four names after stripping list numbers, `#` and `*`. Content
//! on the heading line itself is kept, and the section runs until the next
//! heading-like line (a known label, a Markdown `#` heading, or a line that
//! starts with a bold label).
//!
//! This is a documented convention, not a schema: missing sections stay
//! `"N/A"` and the raw text is always returned alongside.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Placeholder for a section the model did not produce.
pub const NOT_AVAILABLE: &str = "N/A";

/// Sections parsed out of one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAnalysis {
    pub document_type: String,
    pub summary: String,
    pub key_info_localization: String,
    pub category: String,
    pub raw_text: String,
}

impl ParsedAnalysis {
    fn empty(raw_text: &str) -> Self {
        Self {
            document_type: NOT_AVAILABLE.to_string(),
            summary: NOT_AVAILABLE.to_string(),
            key_info_localization: NOT_AVAILABLE.to_string(),
            category: NOT_AVAILABLE.to_string(),
            raw_text: raw_text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    DocumentType,
    Summary,
    KeyInformation,
    Category,
}

static RE_KNOWN_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:\d+\.\s*)?(?:#{1,6}\s*)?\**\s*(document\s+type|summary|key\s+information(?:\s*(?:&|and)\s*locali[sz]ation)?(?:\s+extraction)?|category)\s*(?:\**\s*:\s*\**|\*\*\s*:?|$)\s*(.*)$",
    )
    .unwrap()
});

static RE_OTHER_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:#{1,6}\s+\S|\d+\.\s+\*\*|\*\*[^*\s][^*]*\*\*\s*:?)").unwrap());

fn classify_heading(line: &str) -> Option<(Section, &str)> {
    let caps = RE_KNOWN_HEADING.captures(line)?;
    let label = caps.get(1)?.as_str().to_ascii_lowercase();
    let rest = caps.get(2).map_or("", |m| m.as_str());
    let section = if label.starts_with("document") {
        Section::DocumentType
    } else if label.starts_with("summary") {
        Section::Summary
    } else if label.starts_with("key") {
        Section::KeyInformation
    } else {
        Section::Category
    };
    Some((section, rest))
}

/// Close the open section; the first occurrence of each section wins.
fn flush<'a>(current: &mut Option<(Section, Vec<&'a str>)>, found: &mut Vec<(Section, String)>) {
    if let Some((section, lines)) = current.take() {
        if !found.iter().any(|(s, _)| *s == section) {
            found.push((section, lines.join("\n").trim().to_string()));
        }
    }
}

/// Parse a successful analysis into its sections.
///
/// `Error:` / `Info:` strings and empty input are returned unparsed with
/// every section set to [`NOT_AVAILABLE`].
pub fn parse_analysis(text: &str) -> ParsedAnalysis {
    let mut parsed = ParsedAnalysis::empty(text);
    if text.trim().is_empty() || text.starts_with("Error:") || text.starts_with("Info:") {
        debug!("Analysis text is empty or a status message; skipping section parse");
        return parsed;
    }

    let mut current: Option<(Section, Vec<&str>)> = None;
    let mut found: Vec<(Section, String)> = Vec::new();

    for line in text.lines() {
        if let Some((section, rest)) = classify_heading(line) {
            flush(&mut current, &mut found);
            let rest = rest.trim().trim_matches('*').trim();
            let mut lines = Vec::new();
            if !rest.is_empty() {
                lines.push(rest);
            }
            current = Some((section, lines));
        } else if RE_OTHER_HEADING.is_match(line) {
            flush(&mut current, &mut found);
        } else if let Some((_, ref mut lines)) = current {
            lines.push(line);
        }
    }
    flush(&mut current, &mut found);

    for (section, body) in found {
        if body.is_empty() {
            continue;
        }
        match section {
            Section::DocumentType => parsed.document_type = body,
            Section::Summary => parsed.summary = body,
            Section::KeyInformation => parsed.key_info_localization = body,
            Section::Category => parsed.category = body,
        }
    }

    for (name, value) in [
        ("Document Type", &parsed.document_type),
        ("Summary", &parsed.summary),
        ("Key Information & Localization", &parsed.key_info_localization),
        ("Category", &parsed.category),
    ] {
        if value == NOT_AVAILABLE {
            warn!("Could not parse '{}' section", name);
        }
    }

    parsed
}

// ── Tests ────────────────────────────────────────────────────────────────────
