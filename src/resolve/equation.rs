//! Equation resolution through an image-to-markup transcriber.

use std::sync::Arc;
use std::time::Duration;

use super::{ContentResolver, ResolveRequest, ResolverFailure};
use crate::model::{ElementKind, EquationMarkup, ResolvedContent};
use crate::services::{call_with_timeout, EquationTranscriber};

/// Resolves `Equation` placeholders. There is no deterministic fallback.
pub struct EquationResolver {
    transcriber: Option<Arc<dyn EquationTranscriber>>,
    timeout: Duration,
}

impl Default for EquationResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl EquationResolver {
    /// Resolver without a transcriber; every equation fails locally.
    pub fn new() -> Self {
        Self {
            transcriber: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the transcriber and its deadline.
    pub fn with_transcriber(mut self, transcriber: Arc<dyn EquationTranscriber>, timeout: Duration) -> Self {
        self.transcriber = Some(transcriber);
        self.timeout = timeout;
        self
    }
}

impl ContentResolver for EquationResolver {
    fn name(&self) -> &'static str {
        "equation"
    }

    fn handles(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Equation
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<ResolvedContent, ResolverFailure> {
        let transcriber = self
            .transcriber
            .clone()
            .ok_or(ResolverFailure::NotConfigured("equation transcriber"))?;
        if request.region.is_none() {
            return Err(ResolverFailure::MissingRegion);
        }
        let image = request.region_image().ok_or(ResolverFailure::MissingImage)?;

        let output = call_with_timeout("equation", self.timeout, move || {
            transcriber.transcribe_equation(&image)
        })?;

        let markup = strip_delimiters(&output);
        if markup.is_empty() {
            return Err(ResolverFailure::InvalidOutput("empty transcription".into()));
        }
        Ok(ResolvedContent::Equation(EquationMarkup::latex(markup)))
    }
}

/// Trim and remove one layer of display-math delimiters.
fn strip_delimiters(output: &str) -> String {
    let trimmed = output.trim();
    let inner = trimmed
        .strip_prefix("$$")
        .and_then(|s| s.strip_suffix("$$"))
        .or_else(|| trimmed.strip_prefix("\\[").and_then(|s| s.strip_suffix("\\]")))
        .unwrap_or(trimmed);
    inner.trim().to_string()
}
