//! Reconciliation of the fragment stream with the scaffold.
//!
//! The scaffold says what the document is made of; fragments say what the
//! document actually contains. Every scaffold element of a text kind is
//! aligned to a contiguous run of fragments, consuming fragments left to
//! right, and the element is kept only when that run is similar enough. Runs
//! are chosen so that as many elements as possible are kept. Verified text
//! is always the text of the run, never the scaffold's. Fragments that no
//! element claims are kept as orphans, and non-text elements get a region
//! interpolated from their matched neighbours.
//!
//! # Example
//!
//! ```
//! use supergrobid::model::{BBox, Fragment, PageGeometry, ScaffoldElement};
//! use supergrobid::reconcile::{ReconcileInput, ReconcileOptions, Reconciler};
//!
//! let pages = vec![PageGeometry::letter(0)];
//! let fragments = vec![Fragment::new(0, BBox::new(72.0, 72.0, 300.0, 84.0), "Introduction", 0)];
//! let scaffold = vec![ScaffoldElement::heading("Introduction", 1, 0)];
//!
//! let reconciler = Reconciler::new(ReconcileOptions::default());
//! let result = reconciler
//!     .reconcile(&ReconcileInput::new(&pages, &fragments, &scaffold))
//!     .unwrap();
//! assert_eq!(result.elements[0].text.as_deref(), Some("Introduction"));
//! ```

mod options;
mod plan;
mod references;
mod region;
mod session;
mod similarity;
mod validate;

pub use options::{Lookahead, OrphanGrouping, ReconcileOptions, SimilarityMetric};
pub use references::is_reference_heading;
pub use similarity::{normalize, similarity, Scorer};
pub use validate::validate_input;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    Fragment, PageGeometry, ReconcileStats, ReconciledElement, Region, ScaffoldElement,
};
use session::Session;

/// Borrowed inputs for one document.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    /// Page geometry, indexed by page number
    pub pages: &'a [PageGeometry],
    /// Fragments in reading order
    pub fragments: &'a [Fragment],
    /// Scaffold elements in document order
    pub scaffold: &'a [ScaffoldElement],
    /// Detector regions, possibly empty
    pub regions: &'a [Region],
}

impl<'a> ReconcileInput<'a> {
    /// Input without detector regions.
    pub fn new(
        pages: &'a [PageGeometry],
        fragments: &'a [Fragment],
        scaffold: &'a [ScaffoldElement],
    ) -> Self {
        Self {
            pages,
            fragments,
            scaffold,
            regions: &[],
        }
    }

    /// Attach detector regions.
    pub fn with_regions(mut self, regions: &'a [Region]) -> Self {
        self.regions = regions;
        self
    }
}

/// Output of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Reconciled elements in document order
    pub elements: Vec<ReconciledElement>,
    /// Alignment counters
    pub stats: ReconcileStats,
}

/// The reconciliation engine.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ReconcileOptions,
}

impl Reconciler {
    /// Create a reconciler.
    pub fn new(options: ReconcileOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Reconcile one document.
    ///
    /// Fails only on invalid options or malformed input. Unsupported
    /// scaffold elements are discarded and counted, not reported as errors.
    pub fn reconcile(&self, input: &ReconcileInput<'_>) -> Result<Reconciliation> {
        self.options.validate()?;
        validate_input(input)?;

        let (mut elements, mut stats) = Session::new(&self.options, input.fragments).run(input.scaffold);

        region::infer_regions(
            &mut elements,
            input.pages,
            input.regions,
            self.options.region_min_confidence,
        );

        if self.options.detect_reference_sections {
            let (merged, blocks) = references::merge_reference_sections(
                elements,
                input.regions,
                self.options.region_min_confidence,
            );
            elements = merged;
            stats.reference_blocks = blocks;
        }

        stats.average_confidence = if elements.is_empty() {
            0.0
        } else {
            elements.iter().map(|e| e.confidence).sum::<f32>() / elements.len() as f32
        };

        info!(
            "reconciled {} scaffold elements against {} fragments: {} accepted, {} discarded, {} placeholders, {} orphan paragraphs",
            stats.scaffold_elements,
            input.fragments.len(),
            stats.accepted,
            stats.discarded,
            stats.non_text,
            stats.orphan_paragraphs
        );

        Ok(Reconciliation { elements, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{BBox, ElementKind, Origin, RegionSource};

    fn frag(line: usize, text: &str) -> Fragment {
        let y = 72.0 + line as f32 * 20.0;
        Fragment::new(0, BBox::new(72.0, y, 540.0, y + 12.0), text, line)
    }

    #[test]
    fn test_full_pass() {
        let pages = vec![PageGeometry::letter(0)];
        let fragments = vec![
            frag(0, "Method"),
            frag(1, "We train the model."),
            frag(10, "Table shows the results."),
            frag(11, "References"),
            frag(12, "[1] A. Author. Paper. 2020."),
        ];
        let scaffold = vec![
            ScaffoldElement::heading("Method", 1, 0),
            ScaffoldElement::paragraph("We train the model.", 1),
            ScaffoldElement::placeholder(ElementKind::Table, 2),
            ScaffoldElement::paragraph("Table shows the results.", 3),
            ScaffoldElement::heading("References", 1, 4),
            ScaffoldElement::new(ElementKind::ListItem, "[1] A. Author. Paper. 2020.", 5),
        ];

        let result = Reconciler::default()
            .reconcile(&ReconcileInput::new(&pages, &fragments, &scaffold))
            .unwrap();

        let kinds: Vec<ElementKind> = result.elements.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Heading,
                ElementKind::Paragraph,
                ElementKind::Table,
                ElementKind::Paragraph,
                ElementKind::Heading,
                ElementKind::ReferenceList
            ]
        );

        let table = &result.elements[2];
        let region = table.region.unwrap();
        assert_eq!(region.source, RegionSource::Interpolated);
        assert_eq!(region.bbox, BBox::new(0.0, 104.0, 612.0, 272.0));
        assert!(table.text.is_none());

        assert_eq!(result.stats.accepted, 5);
        assert_eq!(result.stats.non_text, 1);
        assert_eq!(result.stats.reference_blocks, 1);
        assert!(result.elements.iter().all(|e| e.is_traceable()));
        assert!(result.elements.iter().all(|e| e.origin == Origin::Matched));
    }

    #[test]
    fn test_reference_merging_can_be_disabled() {
        let pages = vec![PageGeometry::letter(0)];
        let fragments = vec![frag(0, "References"), frag(1, "Entry.")];
        let scaffold = vec![
            ScaffoldElement::heading("References", 1, 0),
            ScaffoldElement::paragraph("Entry.", 1),
        ];
        let options = ReconcileOptions::new().with_reference_sections(false);
        let result = Reconciler::new(options)
            .reconcile(&ReconcileInput::new(&pages, &fragments, &scaffold))
            .unwrap();
        assert_eq!(result.elements[1].kind, ElementKind::Paragraph);
        assert_eq!(result.stats.reference_blocks, 0);
    }

    #[test]
    fn test_malformed_input_is_fatal() {
        let pages = vec![PageGeometry::letter(0)];
        let fragments = vec![Fragment::new(3, BBox::new(0.0, 0.0, 1.0, 1.0), "x", 0)];
        let err = Reconciler::default()
            .reconcile(&ReconcileInput::new(&pages, &fragments, &[]))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_invalid_options() {
        let reconciler = Reconciler::new(ReconcileOptions::new().with_threshold(2.0));
        let err = reconciler
            .reconcile(&ReconcileInput::new(&[], &[], &[]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_inputs() {
        let result = Reconciler::default()
            .reconcile(&ReconcileInput::new(&[], &[], &[]))
            .unwrap();
        assert!(result.elements.is_empty());
        assert_eq!(result.stats.average_confidence, 0.0);
    }
}
