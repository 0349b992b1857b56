//! Deterministic text extraction.
//!
//! The extractor is the only source of text in the pipeline: every string in
//! the output is built from the fragments produced here.

mod layout;
mod lopdf_extractor;
mod options;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{DocumentMetadata, Fragment, PageGeometry};

pub use layout::{detect_columns, group_lines, Column, FontStatistics, TextLine, TextSpan};
pub use lopdf_extractor::LopdfExtractor;
pub use options::ExtractOptions;

/// Positioned text and page geometry for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Page geometries, indexed by page number
    pub pages: Vec<PageGeometry>,
    /// Fragments in reading order with strictly increasing `seq`
    pub fragments: Vec<Fragment>,
    /// Document metadata
    pub metadata: DocumentMetadata,
}

impl ExtractedDocument {
    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Fragments on one page.
    pub fn page_fragments(&self, page: u32) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().filter(move |f| f.page == page)
    }

    /// Font statistics over every fragment with a known size.
    pub fn font_statistics(&self) -> FontStatistics {
        FontStatistics::from_sizes(self.fragments.iter().filter_map(|f| f.font_size))
    }
}

/// Produces positioned text fragments from a PDF.
pub trait Extractor: Send + Sync {
    /// Extract pages, fragments and metadata.
    fn extract(&self, path: &Path) -> Result<ExtractedDocument>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    #[test]
    fn test_page_fragments_filter() {
        let doc = ExtractedDocument {
            pages: vec![PageGeometry::letter(0), PageGeometry::letter(1)],
            fragments: vec![
                Fragment::new(0, BBox::new(0.0, 0.0, 10.0, 10.0), "a", 0).with_font_size(10.0),
                Fragment::new(1, BBox::new(0.0, 0.0, 10.0, 10.0), "b", 1).with_font_size(10.0),
                Fragment::new(1, BBox::new(0.0, 20.0, 10.0, 30.0), "c", 2).with_font_size(16.0),
            ],
            metadata: DocumentMetadata::default(),
        };

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_fragments(1).count(), 2);
        assert_eq!(doc.font_statistics().body_size, 10.0);
    }
}
