//! Top of the composition pipeline: merge, substitute, enforce length.

use tracing::warn;

use crate::pack::merger::ComponentMerger;
use crate::pack::template::{TemplateEngine, TemplateError};
use crate::pack::types::{CompositionContext, PromptPack};

/// Default maximum composed prompt length, in characters.
pub const DEFAULT_MAX_PROMPT_LENGTH: usize = 128_000;

/// Produces the final prompt string from a pack and a composition context.
#[derive(Debug, Clone, Copy)]
pub struct PromptComposer {
    merger: ComponentMerger,
    engine: TemplateEngine,
    max_length: usize,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptComposer {
    /// Create a composer with default merger, engine, and length limit.
    pub fn new() -> Self {
        Self {
            merger: ComponentMerger::default(),
            engine: TemplateEngine::new(),
            max_length: DEFAULT_MAX_PROMPT_LENGTH,
        }
    }

    /// Override the maximum prompt length.
    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Override the merger (e.g. to disable heading de-duplication).
    #[must_use]
    pub fn with_merger(mut self, merger: ComponentMerger) -> Self {
        self.merger = merger;
        self
    }

    /// Compose the final prompt. Never mutates the pack.
    ///
    /// # Errors
    ///
    /// Propagates [`TemplateError`] from variable substitution.
    pub fn compose(
        &self,
        pack: &PromptPack,
        context: &CompositionContext,
    ) -> Result<String, TemplateError> {
        let merged = self.merger.merge(&pack.components, context);
        let substituted = self.engine.substitute(&merged, &context.variables)?;

        let length = substituted.chars().count();
        if length <= self.max_length {
            return Ok(substituted);
        }

        warn!(
            pack_id = %pack.id(),
            original_length = length,
            truncated_length = self.max_length,
            "composed prompt exceeds maximum length; truncating"
        );
        Ok(substituted.chars().take(self.max_length).collect())
    }
}
