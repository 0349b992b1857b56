//! Table resolution: grid detection first, generative transcription second.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use super::{ContentResolver, GridDetector, ResolveRequest, ResolverFailure};
use crate::model::{ElementKind, Fragment, ResolvedContent, TableGrid};
use crate::services::{call_with_timeout, TableTranscriber};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolves `Table` placeholders.
///
/// The grid detector works on verified fragments inside the region. When
/// it finds nothing, the region is optionally sent to a transcriber and the
/// answer is accepted as an unverified grid.
pub struct TableResolver {
    grid: GridDetector,
    transcriber: Option<Arc<dyn TableTranscriber>>,
    fallback: bool,
    timeout: Duration,
}

impl Default for TableResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TableResolver {
    /// Grid detection only, fallback enabled but without a transcriber.
    pub fn new() -> Self {
        Self {
            grid: GridDetector::new(),
            transcriber: None,
            fallback: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a custom grid detector.
    pub fn with_grid(mut self, grid: GridDetector) -> Self {
        self.grid = grid;
        self
    }

    /// Transcriber for the generative fallback.
    pub fn with_transcriber(mut self, transcriber: Arc<dyn TableTranscriber>, timeout: Duration) -> Self {
        self.transcriber = Some(transcriber);
        self.timeout = timeout;
        self
    }

    /// Enable or disable the generative fallback.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    fn transcribe(
        &self,
        request: &ResolveRequest<'_>,
        inside: &[&Fragment],
    ) -> Result<ResolvedContent, ResolverFailure> {
        let transcriber = match (&self.transcriber, self.fallback) {
            (Some(t), true) => Arc::clone(t),
            _ => return Err(ResolverFailure::NoContent("no table grid detected".into())),
        };

        let image = request.region_image();
        let context = inside
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if image.is_none() && context.is_empty() {
            return Err(ResolverFailure::MissingImage);
        }

        info!(
            "table {}: no grid, falling back to transcription ({})",
            request.index,
            if image.is_some() { "image" } else { "text only" }
        );
        let markdown = call_with_timeout("table", self.timeout, move || {
            transcriber.transcribe_table(image.as_ref(), &context)
        })?;

        let rows = parse_markdown_table(&markdown);
        if rows.is_empty() {
            return Err(ResolverFailure::InvalidOutput(
                "transcriber returned no table rows".into(),
            ));
        }
        Ok(ResolvedContent::Table(TableGrid::generated(rows)))
    }
}

impl ContentResolver for TableResolver {
    fn name(&self) -> &'static str {
        "table"
    }

    fn handles(&self, kind: ElementKind) -> bool {
        kind == ElementKind::Table
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<ResolvedContent, ResolverFailure> {
        let region = request.region.ok_or(ResolverFailure::MissingRegion)?;
        let inside = request.fragments_in(&region.bbox);

        if let Some(rows) = self.grid.detect(&inside) {
            debug!("table {}: grid of {} rows", request.index, rows.len());
            return Ok(ResolvedContent::Table(TableGrid::detected(rows)));
        }
        self.transcribe(request, &inside)
    }
}

/// Parse a Markdown pipe table, or a LaTeX `tabular` body, into rows.
///
/// Separator rows (`|---|:--:|`) and LaTeX rules are dropped.
pub fn parse_markdown_table(text: &str) -> Vec<Vec<String>> {
    let pipe_rows: Vec<Vec<String>> = text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('|') || line.matches('|').count() >= 2)
        .filter(|line| !is_separator_row(line))
        .map(|line| {
            line.trim_matches('|')
                .split('|')
                .map(|cell| cell.trim().to_string())
                .collect()
        })
        .collect();
    if !pipe_rows.is_empty() {
        return pipe_rows;
    }

    // LaTeX tabular: rows end with \\, cells split on &
    text.split("\\\\")
        .map(|row| {
            row.lines()
                .map(str::trim)
                .filter(|line| {
                    !line.is_empty()
                        && !line.starts_with("\\begin")
                        && !line.starts_with("\\end")
                        && !line.starts_with("\\hline")
                        && !line.starts_with("\\toprule")
                        && !line.starts_with("\\midrule")
                        && !line.starts_with("\\bottomrule")
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|row| row.contains('&'))
        .map(|row| row.split('&').map(|cell| cell.trim().to_string()).collect())
        .collect()
}

fn is_separator_row(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}
