//! Deterministically extracted text fragments.

use serde::{Deserialize, Serialize};

use super::BBox;

/// An atomic, positionally exact piece of extracted text.
///
/// Fragments are produced once per document by the extractor and are never
/// mutated afterwards; reconciliation only reads them and copies them into
/// the supporting lists of the elements it emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Source page index (0-based)
    pub page: u32,
    /// Bounding box in page space
    pub bbox: BBox,
    /// Raw text, non-empty after trimming
    pub text: String,
    /// Dominant font size in points, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// Global extraction order
    pub seq: usize,
}

impl Fragment {
    /// Create a fragment.
    pub fn new(page: u32, bbox: BBox, text: impl Into<String>, seq: usize) -> Self {
        Self {
            page,
            bbox,
            text: text.into(),
            font_size: None,
            seq,
        }
    }

    /// Set the font size.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }
}

/// Join fragment texts the way verified element text is built.
///
/// Every verified text in the output is produced by this function, so the
/// text of an element can always be recomputed from its supporting fragments.
pub fn join_fragment_text<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = &'a Fragment>,
{
    let mut out = String::new();
    for (i, fragment) in fragments.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&fragment.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_fragment_text() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        let frags = vec![
            Fragment::new(0, bbox, "Deep", 0),
            Fragment::new(0, bbox, "learning", 1),
        ];
        assert_eq!(join_fragment_text(&frags), "Deep learning");
        assert_eq!(join_fragment_text(&frags[..0]), "");
    }

    #[test]
    fn test_font_size_skipped_when_absent() {
        let f = Fragment::new(1, BBox::new(0.0, 0.0, 1.0, 1.0), "x", 7);
        let json = serde_json::to_string(&f).unwrap();
        assert!(!json.contains("font_size"));
        let back: Fragment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }
}
