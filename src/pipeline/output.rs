//! The result of processing one document.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extract::FontStatistics;
use crate::model::{
    DocumentMetadata, DocumentReport, ElementKind, PageGeometry, ReconciledElement, Resolution,
};
use crate::render::{self, OutputFormat, RenderOptions};

/// Reconciled and resolved elements plus everything needed to render them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    /// Metadata from the PDF Info dictionary
    pub metadata: DocumentMetadata,
    /// Page geometry, indexed by page number
    pub pages: Vec<PageGeometry>,
    /// Output elements in document order
    pub elements: Vec<ReconciledElement>,
    /// Processing report
    pub report: DocumentReport,
}

impl ProcessedDocument {
    /// Assemble a processed document.
    pub fn new(
        metadata: DocumentMetadata,
        pages: Vec<PageGeometry>,
        elements: Vec<ReconciledElement>,
        report: DocumentReport,
    ) -> Self {
        Self {
            metadata,
            pages,
            elements,
            report,
        }
    }

    /// Render in the format named by `options`.
    pub fn render(&self, options: &RenderOptions) -> Result<String> {
        render::render(self, options)
    }

    /// Markdown with default options.
    pub fn to_markdown(&self) -> Result<String> {
        self.render(&RenderOptions::new())
    }

    /// Pretty-printed JSON tree.
    pub fn to_json(&self) -> Result<String> {
        self.render(&RenderOptions::new().with_format(OutputFormat::Json))
    }

    /// TEI XML.
    pub fn to_tei(&self) -> Result<String> {
        self.render(&RenderOptions::new().with_format(OutputFormat::Tei))
    }

    /// Font statistics over every supporting fragment.
    pub fn font_statistics(&self) -> FontStatistics {
        FontStatistics::from_sizes(
            self.elements
                .iter()
                .flat_map(|e| e.fragments.iter())
                .filter_map(|f| f.font_size),
        )
    }

    /// Verified text of all text elements, one block per element.
    pub fn plain_text(&self) -> String {
        self.elements
            .iter()
            .filter_map(|e| e.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Elements of one kind.
    pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = &ReconciledElement> {
        self.elements.iter().filter(move |e| e.kind == kind)
    }

    /// Resolvable elements left without content.
    pub fn unresolved_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| e.kind.is_resolvable())
            .filter(|e| !matches!(e.resolution, Some(Resolution::Resolved { .. })))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Fragment, InferredRegion, RegionSource};

    fn document() -> ProcessedDocument {
        let heading = ReconciledElement::matched(
            ElementKind::Heading,
            vec![Fragment::new(0, BBox::new(72.0, 72.0, 300.0, 90.0), "Introduction", 0).with_font_size(16.0)],
            1.0,
            0,
        );
        let body = ReconciledElement::matched(
            ElementKind::Paragraph,
            vec![
                Fragment::new(0, BBox::new(72.0, 100.0, 540.0, 110.0), "Body one.", 1).with_font_size(10.0),
                Fragment::new(0, BBox::new(72.0, 112.0, 540.0, 122.0), "Body two.", 2).with_font_size(10.0),
            ],
            0.95,
            1,
        );
        let table = ReconciledElement::placeholder(
            ElementKind::Table,
            InferredRegion::new(0, BBox::new(0.0, 122.0, 612.0, 792.0), RegionSource::Interpolated),
            2,
        );
        ProcessedDocument::new(
            DocumentMetadata::default(),
            vec![PageGeometry::letter(0)],
            vec![heading, body, table],
            DocumentReport::begin("paper.pdf"),
        )
    }

    #[test]
    fn test_plain_text_and_counts() {
        let doc = document();
        assert_eq!(doc.plain_text(), "Introduction\n\nBody one. Body two.");
        assert_eq!(doc.elements_of(ElementKind::Paragraph).count(), 1);
        assert_eq!(doc.unresolved_count(), 1);
    }

    #[test]
    fn test_font_statistics() {
        let stats = document().font_statistics();
        assert_eq!(stats.body_size, 10.0);
        assert_eq!(stats.heading_level(16.0), 1);
    }
}
