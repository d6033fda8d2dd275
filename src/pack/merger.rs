//! Context filtering, precedence ordering, override splicing, and heading
//! de-duplication of pack components.
//!
//! An override section is a markdown heading of the form
//! `# OVERRIDE: <name>`; its body replaces the body of the same-named
//! section in the system component. Splicing walks the system text line by
//! line as a small state machine (emitting vs. suppressing until the next
//! heading) so the algorithm stays auditable in isolation from I/O.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::pack::types::{ComponentType, CompositionContext, LoadedComponent};

static OVERRIDE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#\s+OVERRIDE:\s*(.+)$").expect("override pattern compiles")
});
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s+.+$").expect("heading pattern compiles"));

/// Merges pack components into a single prompt body.
#[derive(Debug, Clone, Copy)]
pub struct ComponentMerger {
    deduplicate_headings: bool,
}

impl Default for ComponentMerger {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ComponentMerger {
    /// Create a merger. Heading de-duplication is normally on.
    pub fn new(deduplicate_headings: bool) -> Self {
        Self {
            deduplicate_headings,
        }
    }

    /// Merge components filtered by `context` into one string.
    ///
    /// Components survive filtering iff they are System, or their
    /// type-specific metadata value matches the corresponding context field
    /// case-insensitively. Survivors are stably ordered System, Role,
    /// Language, Framework; override sections from non-system components
    /// are spliced into the system component; trimmed non-blank bodies are
    /// joined with a blank line.
    pub fn merge(&self, components: &[LoadedComponent], context: &CompositionContext) -> String {
        if components.is_empty() {
            return String::new();
        }

        let mut filtered: Vec<&LoadedComponent> = components
            .iter()
            .filter(|c| Self::matches_context(c, context))
            .collect();
        filtered.sort_by_key(|c| c.component_type.precedence());

        let merged = Self::merge_with_overrides(&filtered);

        if self.deduplicate_headings {
            remove_duplicate_headings(&merged)
        } else {
            merged
        }
    }

    fn matches_context(component: &LoadedComponent, context: &CompositionContext) -> bool {
        match component.component_type {
            ComponentType::System => true,
            ComponentType::Role => selector_matches(component.metadata_value("role"), context.role.as_deref()),
            ComponentType::Language => {
                selector_matches(component.metadata_value("language"), context.language.as_deref())
            }
            ComponentType::Framework => {
                selector_matches(component.metadata_value("framework"), context.framework.as_deref())
            }
            ComponentType::Custom => false,
        }
    }

    fn merge_with_overrides(components: &[&LoadedComponent]) -> String {
        if components.is_empty() {
            return String::new();
        }

        // Collect override sections from every non-system component,
        // keyed "OVERRIDE:<section name>" case-insensitively.
        let mut overrides: HashMap<String, String> = HashMap::new();
        for component in components {
            if component.component_type == ComponentType::System {
                continue;
            }
            for captures in OVERRIDE_HEADING.captures_iter(&component.content) {
                let section_name = captures[1].trim().to_string();
                let full = captures.get(0).expect("whole match exists");
                let body = extract_section_body(&component.content, full.end());
                overrides.insert(override_key(&section_name), body);
            }
        }

        let has_overrides = !overrides.is_empty();
        let mut parts: Vec<String> = Vec::new();

        for component in components {
            let mut content = component.content.trim().to_string();
            if content.is_empty() {
                continue;
            }

            if has_overrides && component.component_type == ComponentType::System {
                content = apply_overrides(&content, &overrides);
            } else if OVERRIDE_HEADING.is_match(&content) {
                // Consumed into the splice; strip the markers from this
                // component's own output so they are not emitted twice.
                content = strip_override_sections(&content);
                if content.is_empty() {
                    continue;
                }
            }

            parts.push(content);
        }

        parts.join("\n\n")
    }
}

/// `None == None` counts as a match: a role component with no `role`
/// metadata is kept when the context has no role either.
fn selector_matches(metadata: Option<&str>, selector: Option<&str>) -> bool {
    match (metadata, selector) {
        (None, None) => true,
        (Some(m), Some(s)) => m.eq_ignore_ascii_case(s),
        _ => false,
    }
}

fn override_key(section_name: &str) -> String {
    format!("OVERRIDE:{section_name}").to_ascii_lowercase()
}

/// Body of a section: everything after `start` up to the next `#` heading
/// line, or end of content, trimmed.
fn extract_section_body(content: &str, start: usize) -> String {
    let remaining = &content[start..];
    match HEADING.find(remaining) {
        Some(next) => remaining[..next.start()].trim().to_string(),
        None => remaining.trim().to_string(),
    }
}

/// Heading text of a line, if the line is a heading: strip leading `#`
/// markers and trim.
fn heading_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        Some(trimmed.trim_start_matches('#').trim())
    } else {
        None
    }
}

/// Splice override bodies into the system content.
///
/// State machine over lines: in the normal state lines pass through; when
/// a heading with a matching override key is seen, the heading is emitted
/// followed by a blank line and the replacement body, and the machine
/// suppresses every line until the next heading.
fn apply_overrides(system_content: &str, overrides: &HashMap<String, String>) -> String {
    let mut result: Vec<&str> = Vec::new();
    let mut suppressing = false;

    for line in system_content.split('\n') {
        if let Some(text) = heading_text(line) {
            if let Some(replacement) = overrides.get(&override_key(text)) {
                result.push(line);
                result.push("");
                result.push(replacement);
                suppressing = true;
                continue;
            }
            suppressing = false;
        }

        if !suppressing {
            result.push(line);
        }
    }

    result.join("\n")
}

/// Remove `# OVERRIDE:` sections (heading and body) from a component's own
/// content.
fn strip_override_sections(content: &str) -> String {
    let mut result: Vec<&str> = Vec::new();
    let mut skipping = false;

    for line in content.split('\n') {
        if OVERRIDE_HEADING.is_match(line) {
            skipping = true;
            continue;
        }

        if skipping && HEADING.is_match(line) {
            skipping = false;
        }

        if !skipping {
            result.push(line);
        }
    }

    result.join("\n").trim().to_string()
}

/// Keep only the first occurrence of each heading, by trimmed text,
/// case-insensitively. Only the duplicate heading line is dropped; body
/// lines beneath it are left alone.
fn remove_duplicate_headings(content: &str) -> String {
    let mut seen: HashSet<String> = HashSet::new();
    let mut result: Vec<&str> = Vec::new();

    for line in content.split('\n') {
        if let Some(text) = heading_text(line) {
            if !seen.insert(text.to_ascii_lowercase()) {
                continue;
            }
        }
        result.push(line);
    }

    result.join("\n")
}
