//! Output assembly: Markdown, JSON tree and TEI XML.
//!
//! Renderers only ever print verified text. Content that could not be
//! resolved is never dropped silently; it shows up as an explicit marker
//! naming its kind, page and region.

mod json;
mod markdown;
mod options;
mod tei;

pub use json::{to_json, JsonFormat};
pub use markdown::{to_markdown, MarkdownRenderer};
pub use options::{HeadingConfig, OutputFormat, RenderOptions};
pub use tei::to_tei;

use crate::error::Result;
use crate::model::{ReconciledElement, RegionSource, Resolution};
use crate::pipeline::ProcessedDocument;

/// Render a document in the format selected by `options`.
pub fn render(doc: &ProcessedDocument, options: &RenderOptions) -> Result<String> {
    match options.format {
        OutputFormat::Markdown => to_markdown(doc, options),
        OutputFormat::Json => {
            let format = if options.compact {
                JsonFormat::Compact
            } else {
                JsonFormat::Pretty
            };
            to_json(doc, options, format)
        }
        OutputFormat::Tei => to_tei(doc, options),
    }
}

/// Human-readable description of an element that carries no content,
/// e.g. `unresolved table, page 2, region [0, 104, 612, 272] (interpolated): no grid`.
///
/// Page numbers are 1-based here, unlike the 0-based indices in JSON.
pub(crate) fn marker_text(element: &ReconciledElement) -> String {
    let mut text = match element.resolution {
        Some(Resolution::Resolved { .. }) => element.kind.to_string(),
        _ if element.kind.is_resolvable() => format!("unresolved {}", element.kind),
        _ => element.kind.to_string(),
    };

    if let Some(page) = element.page() {
        text.push_str(&format!(", page {}", page + 1));
    }
    if let Some(region) = element.region {
        let b = region.bbox;
        text.push_str(&format!(
            ", region [{:.0}, {:.0}, {:.0}, {:.0}] ({})",
            b.x0,
            b.y0,
            b.x1,
            b.y1,
            source_name(region.source)
        ));
    }
    match &element.resolution {
        Some(Resolution::Unresolved { reason }) => {
            text.push_str(": ");
            text.push_str(reason);
        }
        None if element.kind.is_resolvable() => text.push_str(": resolver disabled"),
        _ => {}
    }
    text
}

fn source_name(source: RegionSource) -> &'static str {
    match source {
        RegionSource::Interpolated => "interpolated",
        RegionSource::Detected => "detected",
        RegionSource::PageFallback => "page fallback",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, ElementKind, InferredRegion};

    #[test]
    fn test_marker_text() {
        let region = InferredRegion::new(1, BBox::new(0.0, 104.0, 612.0, 272.0), RegionSource::Interpolated);
        let mut table = ReconciledElement::placeholder(ElementKind::Table, region, 3);
        assert_eq!(
            marker_text(&table),
            "unresolved table, page 2, region [0, 104, 612, 272] (interpolated): resolver disabled"
        );

        table
            .attach(
                0,
                Resolution::Unresolved {
                    reason: "no table grid detected".into(),
                },
            )
            .unwrap();
        assert!(marker_text(&table).ends_with("(interpolated): no table grid detected"));

        let figure = ReconciledElement::placeholder(ElementKind::Figure, region, 4);
        assert_eq!(
            marker_text(&figure),
            "figure, page 2, region [0, 104, 612, 272] (interpolated)"
        );
    }
}
