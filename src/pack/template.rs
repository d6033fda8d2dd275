//! `{{variable}}` substitution with bounded iterative expansion.
//!
//! A variable's value may itself contain placeholders; expansion repeats up
//! to a fixed depth so indirection chains resolve but true recursion is cut
//! off with an error.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Maximum allowed length of a single variable value, in characters.
pub const MAX_VARIABLE_VALUE_LENGTH: usize = 1024;

/// Default maximum number of re-expansion passes.
pub const DEFAULT_MAX_EXPANSION_DEPTH: usize = 3;

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("variable pattern compiles"));
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]*)\}\}").expect("placeholder pattern compiles"));

/// Template substitution failed.
#[derive(Debug, Clone, Error)]
pub enum TemplateError {
    /// A variable value exceeded [`MAX_VARIABLE_VALUE_LENGTH`]. The whole
    /// call fails, not just that variable.
    #[error("variable '{name}' exceeds maximum length ({length} > {MAX_VARIABLE_VALUE_LENGTH} characters)")]
    ValueTooLong {
        /// The offending variable name.
        name: String,
        /// Its value length in characters.
        length: usize,
    },
    /// Placeholders remained after the expansion depth limit was reached.
    #[error("template expansion depth limit ({limit}) exceeded: variables expand recursively")]
    RecursiveExpansion {
        /// The configured depth limit.
        limit: usize,
    },
}

/// Substitutes `{{name}}` placeholders in prompt text.
#[derive(Debug, Clone, Copy)]
pub struct TemplateEngine {
    max_expansion_depth: usize,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create an engine with the default expansion depth.
    pub fn new() -> Self {
        Self {
            max_expansion_depth: DEFAULT_MAX_EXPANSION_DEPTH,
        }
    }

    /// Create an engine with a custom expansion depth.
    pub fn with_max_depth(max_expansion_depth: usize) -> Self {
        Self {
            max_expansion_depth,
        }
    }

    /// Replace every `{{name}}` with its bound value, or the empty string
    /// if unbound.
    ///
    /// Runs repeated passes while substituted values introduce new
    /// placeholders, up to the depth limit.
    ///
    /// # Errors
    ///
    /// [`TemplateError::ValueTooLong`] if any bound value exceeds the size
    /// cap (checked before any substitution happens), or
    /// [`TemplateError::RecursiveExpansion`] if placeholders still remain
    /// once the depth is exhausted.
    pub fn substitute(
        &self,
        text: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        for (name, value) in variables {
            let length = value.chars().count();
            if length > MAX_VARIABLE_VALUE_LENGTH {
                return Err(TemplateError::ValueTooLong {
                    name: name.clone(),
                    length,
                });
            }
        }

        let mut current = text.to_string();
        let mut passes = 0usize;
        loop {
            if !VARIABLE.is_match(&current) {
                return Ok(current);
            }
            if passes > self.max_expansion_depth {
                return Err(TemplateError::RecursiveExpansion {
                    limit: self.max_expansion_depth,
                });
            }
            current = VARIABLE
                .replace_all(&current, |captures: &Captures<'_>| {
                    variables
                        .get(&captures[1])
                        .map(String::as_str)
                        .unwrap_or_default()
                        .to_string()
                })
                .into_owned();
            passes = passes.saturating_add(1);
        }
    }

    /// Check template syntax without substituting, returning all problems.
    ///
    /// Flags unbalanced `{{`/`}}` brace counts, empty variable names, and
    /// invalid characters (including whitespace) inside `{{...}}`.
    pub fn validate_template(text: &str) -> Vec<String> {
        let mut problems = Vec::new();

        let opening = text.matches("{{").count();
        let closing = text.matches("}}").count();
        if opening != closing {
            problems.push(format!(
                "unbalanced template braces: {opening} opening, {closing} closing"
            ));
        }

        for captures in PLACEHOLDER.captures_iter(text) {
            let name = &captures[1];
            if name.is_empty() {
                problems.push("empty variable name: {{}}".to_string());
            } else if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                problems.push(format!("invalid characters in variable name '{{{{{name}}}}}'"));
            }
        }

        problems
    }
}
