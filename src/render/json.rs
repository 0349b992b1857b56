//! JSON tree rendering.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{
    DocumentMetadata, DocumentReport, ElementKind, Fragment, InferredRegion, Origin, QualityFlag,
    ReconciledElement, Resolution,
};
use crate::pipeline::ProcessedDocument;

use super::RenderOptions;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    metadata: &'a DocumentMetadata,
    report: &'a DocumentReport,
    quality: Vec<QualityFlag>,
    elements: Vec<JsonElement<'a>>,
}

#[derive(Serialize)]
struct JsonElement<'a> {
    index: usize,
    kind: ElementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    confidence: f32,
    origin: Origin,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bbox: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<&'a InferredRegion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<&'a Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fragments: Option<&'a [Fragment]>,
}

impl<'a> JsonElement<'a> {
    fn new(index: usize, element: &'a ReconciledElement, options: &RenderOptions) -> Self {
        Self {
            index,
            kind: element.kind,
            text: element.text.as_deref(),
            confidence: element.confidence,
            origin: element.origin,
            page: element.page(),
            level: element.level,
            bbox: if options.include_bbox {
                element.bbox().map(|b| b.to_array())
            } else {
                None
            },
            region: element.region.as_ref(),
            resolution: element.resolution.as_ref(),
            fragments: if options.include_fragments {
                Some(element.fragments.as_slice())
            } else {
                None
            },
        }
    }
}

/// Convert a processed document to a JSON tree `{ metadata, report, quality, elements }`.
pub fn to_json(doc: &ProcessedDocument, options: &RenderOptions, format: JsonFormat) -> Result<String> {
    let tree = JsonDocument {
        metadata: &doc.metadata,
        report: &doc.report,
        quality: doc.report.quality_flags(),
        elements: doc
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| JsonElement::new(i, e, options))
            .collect(),
    };

    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(&tree),
        JsonFormat::Compact => serde_json::to_string(&tree),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}
