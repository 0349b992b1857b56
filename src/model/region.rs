//! Layout regions from the region detector and regions inferred during reconciliation.

use serde::{Deserialize, Serialize};

use super::{BBox, ElementKind};

/// Label assigned to a detected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionLabel {
    /// Document title
    Title,
    /// Abstract block
    Abstract,
    /// Body text
    Body,
    /// Figure
    Figure,
    /// Table
    Table,
    /// Reference list
    References,
    /// Display equation
    Equation,
}

impl RegionLabel {
    /// Label that corroborates a placeholder of the given kind.
    pub fn for_kind(kind: ElementKind) -> Option<RegionLabel> {
        match kind {
            ElementKind::Figure => Some(RegionLabel::Figure),
            ElementKind::Table => Some(RegionLabel::Table),
            ElementKind::Equation => Some(RegionLabel::Equation),
            ElementKind::ReferenceList => Some(RegionLabel::References),
            _ => None,
        }
    }

    /// Lowercase name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            RegionLabel::Title => "title",
            RegionLabel::Abstract => "abstract",
            RegionLabel::Body => "body",
            RegionLabel::Figure => "figure",
            RegionLabel::Table => "table",
            RegionLabel::References => "references",
            RegionLabel::Equation => "equation",
        }
    }
}

impl std::fmt::Display for RegionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labeled rectangle from the region detector. Auxiliary evidence only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Page index (0-based)
    pub page: u32,
    /// Bounding box in page space
    pub bbox: BBox,
    /// Region label
    pub label: RegionLabel,
    /// Detector confidence in [0, 1]
    pub confidence: f32,
}

impl Region {
    /// Create a region.
    pub fn new(page: u32, bbox: BBox, label: RegionLabel, confidence: f32) -> Self {
        Self {
            page,
            bbox,
            label,
            confidence,
        }
    }
}

/// Where an inferred region came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionSource {
    /// Vertical span between neighbouring matched text
    Interpolated,
    /// Replaced by an overlapping detector region
    Detected,
    /// No anchor available; whole page
    PageFallback,
}

/// Best-effort location of a non-text element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferredRegion {
    /// Page index (0-based)
    pub page: u32,
    /// Bounding box in page space
    pub bbox: BBox,
    /// How the region was obtained
    pub source: RegionSource,
}

impl InferredRegion {
    /// Create an inferred region.
    pub fn new(page: u32, bbox: BBox, source: RegionSource) -> Self {
        Self { page, bbox, source }
    }
}
