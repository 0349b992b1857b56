//! Region detector output read from JSON.
//!
//! Accepts either a bare array or `{ "regions": [...] }`. Each entry needs
//! `page` (0-based), `bbox` (`[x0, y0, x1, y1]` in page points, top-left
//! origin), a label under `label` or `type`, and an optional `confidence`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{RegionDetector, ServiceError};
use crate::model::{BBox, Region, RegionLabel};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegionFile {
    Bare(Vec<RawRegion>),
    Wrapped { regions: Vec<RawRegion> },
}

#[derive(Debug, Deserialize)]
struct RawRegion {
    page: u32,
    bbox: [f32; 4],
    #[serde(alias = "type")]
    label: String,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

/// Map detector label vocabularies (PubLayNet, DocBank and similar) onto ours.
fn parse_label(label: &str) -> Option<RegionLabel> {
    match label.trim().to_lowercase().as_str() {
        "title" | "section-header" | "header" => Some(RegionLabel::Title),
        "abstract" => Some(RegionLabel::Abstract),
        "text" | "body" | "paragraph" | "list" | "list-item" => Some(RegionLabel::Body),
        "figure" | "picture" | "image" => Some(RegionLabel::Figure),
        "table" => Some(RegionLabel::Table),
        "reference" | "references" | "bibliography" => Some(RegionLabel::References),
        "equation" | "formula" => Some(RegionLabel::Equation),
        _ => None,
    }
}

/// Parse region JSON. Entries with unknown labels are skipped.
pub fn parse_region_json(json: &str) -> Result<Vec<Region>, ServiceError> {
    let file: RegionFile =
        serde_json::from_str(json).map_err(|e| ServiceError::InvalidOutput(e.to_string()))?;
    let raw = match file {
        RegionFile::Bare(regions) | RegionFile::Wrapped { regions } => regions,
    };

    let mut regions = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some(label) = parse_label(&entry.label) else {
            log::debug!("ignoring region with label {:?}", entry.label);
            continue;
        };
        let [x0, y0, x1, y1] = entry.bbox;
        regions.push(Region::new(
            entry.page,
            BBox::new(x0, y0, x1, y1),
            label,
            entry.confidence,
        ));
    }
    Ok(regions)
}

/// Reads regions from a JSON file.
///
/// Without an explicit path, looks for `<stem>.regions.json` next to the PDF.
#[derive(Debug, Clone, Default)]
pub struct JsonRegionFile {
    path: Option<PathBuf>,
}

impl JsonRegionFile {
    /// Always read this file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Read the sibling of each PDF.
    pub fn sibling() -> Self {
        Self { path: None }
    }

    fn locate(&self, pdf: &Path) -> PathBuf {
        match self.path {
            Some(ref path) => path.clone(),
            None => pdf.with_extension("regions.json"),
        }
    }
}

impl RegionDetector for JsonRegionFile {
    fn detect_regions(&self, pdf: &Path) -> Result<Vec<Region>, ServiceError> {
        let path = self.locate(pdf);
        let json = std::fs::read_to_string(&path).map_err(|e| {
            ServiceError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        parse_region_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let regions = parse_region_json(
            r#"[
                {"page": 3, "bbox": [0, 400, 612, 600], "type": "Table", "confidence": 0.92},
                {"page": 0, "bbox": [72, 72, 540, 120], "label": "title"},
                {"page": 1, "bbox": [0, 0, 10, 10], "type": "Stamp"}
            ]"#,
        )
        .unwrap();

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].label, RegionLabel::Table);
        assert_eq!(regions[0].page, 3);
        assert_eq!(regions[0].bbox, BBox::new(0.0, 400.0, 612.0, 600.0));
        assert_eq!(regions[1].confidence, 1.0);
    }

    #[test]
    fn test_parse_wrapped() {
        let regions = parse_region_json(
            r#"{"regions": [{"page": 0, "bbox": [0, 0, 1, 1], "label": "formula", "confidence": 0.5}]}"#,
        )
        .unwrap();
        assert_eq!(regions[0].label, RegionLabel::Equation);
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_region_json("{not json").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOutput(_)));
    }

    #[test]
    fn test_sibling_path() {
        let locate = JsonRegionFile::sibling().locate(Path::new("/data/paper.pdf"));
        assert_eq!(locate, PathBuf::from("/data/paper.regions.json"));
    }
}
