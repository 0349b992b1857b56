//! Specialized content resolvers.
//!
//! Tables, equations and reference lists come out of reconciliation as
//! placeholders or as verified text that still needs structure. Each
//! resolvable element is handed to exactly one resolver; resolvers are
//! independent of each other, run in parallel, and a failure only affects
//! the element it was working on.

mod equation;
mod grid;
mod reference;
mod table;

pub use equation::EquationResolver;
pub use grid::{GridConfig, GridDetector};
pub use reference::{segment_citations, ReferenceResolver};
pub use table::{parse_markdown_table, TableResolver};

use std::collections::HashMap;
use std::sync::Arc;

use image::DynamicImage;
use log::{debug, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::model::{
    BBox, ElementFailure, ElementKind, Fragment, InferredRegion, PageGeometry, ReconciledElement,
    Resolution, ResolvedContent,
};
use crate::services::{CitationClassifier, EquationTranscriber, ServiceError, TableTranscriber};

/// Element-level resolution failure. Never fatal to the document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolverFailure {
    /// The element has no region to work on
    #[error("element has no region")]
    MissingRegion,

    /// The resolver needs a page image and none was rendered
    #[error("no page image available")]
    MissingImage,

    /// A required service is not configured
    #[error("no {0} configured")]
    NotConfigured(&'static str),

    /// Deterministic methods found nothing usable
    #[error("{0}")]
    NoContent(String),

    /// A service call failed or timed out
    #[error("service {0}")]
    Service(#[from] ServiceError),

    /// A service answered with unusable output
    #[error("invalid output: {0}")]
    InvalidOutput(String),
}

/// Everything a resolver may look at for one element.
#[derive(Debug, Clone)]
pub struct ResolveRequest<'a> {
    /// Position of the element in the output sequence
    pub index: usize,
    /// The element being resolved
    pub element: &'a ReconciledElement,
    /// The element's region, if any
    pub region: Option<InferredRegion>,
    /// Geometry of the page the element is on
    pub page: PageGeometry,
    /// Rendered page, when the rasterizer produced one
    pub page_image: Option<&'a DynamicImage>,
    /// All fragments on the page
    pub page_fragments: Vec<&'a Fragment>,
}

impl<'a> ResolveRequest<'a> {
    /// Fragments on the page whose center lies inside `bbox`.
    pub fn fragments_in(&self, bbox: &BBox) -> Vec<&'a Fragment> {
        self.page_fragments
            .iter()
            .copied()
            .filter(|f| {
                let (x, y) = f.bbox.center();
                bbox.contains_point(x, y)
            })
            .collect()
    }

    /// Crop of the region from the page image.
    pub fn region_image(&self) -> Option<DynamicImage> {
        let region = self.region?;
        crop_region(self.page_image?, &self.page, &region.bbox)
    }
}

/// Crop a page-space box out of a page image rendered at any resolution.
pub fn crop_region(image: &DynamicImage, page: &PageGeometry, bbox: &BBox) -> Option<DynamicImage> {
    if page.width <= 0.0 || page.height <= 0.0 {
        return None;
    }
    let (width, height) = (image.width() as f32, image.height() as f32);
    let sx = width / page.width;
    let sy = height / page.height;

    let x0 = (bbox.x0 * sx).floor().clamp(0.0, width) as u32;
    let y0 = (bbox.y0 * sy).floor().clamp(0.0, height) as u32;
    let x1 = (bbox.x1 * sx).ceil().clamp(0.0, width) as u32;
    let y1 = (bbox.y1 * sy).ceil().clamp(0.0, height) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(image.crop_imm(x0, y0, x1 - x0, y1 - y0))
}

/// A resolver for one or more element kinds.
pub trait ContentResolver: Send + Sync {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// Whether this resolver handles the kind.
    fn handles(&self, kind: ElementKind) -> bool;

    /// Produce structured content for one element.
    fn resolve(&self, request: &ResolveRequest<'_>) -> std::result::Result<ResolvedContent, ResolverFailure>;
}

/// Shared document state for one resolution pass.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Page geometry, indexed by page number
    pub pages: &'a [PageGeometry],
    /// All fragments in reading order
    pub fragments: &'a [Fragment],
    /// Rendered pages by index
    pub page_images: &'a HashMap<u32, DynamicImage>,
}

impl<'a> ResolveContext<'a> {
    /// Build the request for one element.
    fn request(&self, index: usize, element: &'a ReconciledElement) -> ResolveRequest<'a> {
        let page_index = element.page().unwrap_or(0);
        let page = self
            .pages
            .get(page_index as usize)
            .copied()
            .unwrap_or_else(|| PageGeometry::letter(page_index));

        ResolveRequest {
            index,
            element,
            region: element.region,
            page,
            page_image: self.page_images.get(&page_index),
            page_fragments: self.fragments.iter().filter(|f| f.page == page_index).collect(),
        }
    }
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOutcome {
    /// Elements that received content
    pub resolved: usize,
    /// Tables accepted from generative transcription
    pub unverified_tables: usize,
    /// Element-level failures
    pub failures: Vec<ElementFailure>,
}

/// Dispatches resolvable elements to resolvers.
#[derive(Default)]
pub struct ResolverSet {
    resolvers: Vec<Box<dyn ContentResolver>>,
}

impl std::fmt::Debug for ResolverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|r| r.name()))
            .finish()
    }
}

impl ResolverSet {
    /// An empty set. Every resolvable element stays unresolved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolver. Earlier resolvers take precedence for a kind.
    pub fn with_resolver(mut self, resolver: impl ContentResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// The standard resolvers, as enabled by the configuration.
    pub fn from_config(
        config: &PipelineConfig,
        table_transcriber: Option<Arc<dyn TableTranscriber>>,
        equation_transcriber: Option<Arc<dyn EquationTranscriber>>,
        citation_classifier: Option<Arc<dyn CitationClassifier>>,
    ) -> Self {
        let toggles = &config.resolvers;
        let timeouts = &config.timeouts;
        let mut set = ResolverSet::new();

        if toggles.tables {
            let mut tables = TableResolver::new().with_fallback(toggles.table_fallback);
            if let Some(transcriber) = table_transcriber {
                tables = tables.with_transcriber(transcriber, timeouts.table());
            }
            set = set.with_resolver(tables);
        }
        if toggles.equations {
            let mut equations = EquationResolver::new();
            if let Some(transcriber) = equation_transcriber {
                equations = equations.with_transcriber(transcriber, timeouts.equation());
            }
            set = set.with_resolver(equations);
        }
        if toggles.references {
            let mut references = ReferenceResolver::new();
            if toggles.citation_classifier {
                if let Some(classifier) = citation_classifier {
                    references = references.with_classifier(classifier, timeouts.citation());
                }
            }
            set = set.with_resolver(references);
        }
        set
    }

    /// Names of the resolvers in precedence order.
    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    fn resolver_for(&self, kind: ElementKind) -> Option<&dyn ContentResolver> {
        self.resolvers
            .iter()
            .find(|r| r.handles(kind))
            .map(|r| r.as_ref())
    }

    /// Resolve every resolvable element that has no resolution yet.
    ///
    /// One job is built per element and jobs run in parallel; results are
    /// attached afterwards in element order. Elements whose kind no
    /// resolver handles are left untouched.
    pub fn resolve_all(
        &self,
        elements: &mut [ReconciledElement],
        context: &ResolveContext<'_>,
    ) -> Result<ResolveOutcome> {
        let jobs: Vec<(usize, &dyn ContentResolver)> = elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind.is_resolvable() && e.resolution.is_none())
            .filter_map(|(i, e)| self.resolver_for(e.kind).map(|r| (i, r)))
            .collect();

        debug!("resolving {} elements", jobs.len());

        let results: Vec<(usize, &'static str, std::result::Result<ResolvedContent, ResolverFailure>)> = {
            let shared: &[ReconciledElement] = elements;
            jobs.par_iter()
                .map(|&(index, resolver)| {
                    let request = context.request(index, &shared[index]);
                    (index, resolver.name(), resolver.resolve(&request))
                })
                .collect()
        };

        let mut outcome = ResolveOutcome::default();
        for (index, resolver, result) in results {
            let element = &mut elements[index];
            match result {
                Ok(content) => {
                    if let ResolvedContent::Table(ref grid) = content {
                        if !grid.verified {
                            outcome.unverified_tables += 1;
                        }
                    }
                    element.attach(index, Resolution::Resolved { content })?;
                    outcome.resolved += 1;
                }
                Err(failure) => {
                    let reason = failure.to_string();
                    warn!(
                        "{} resolver failed on {} element {}: {}",
                        resolver, element.kind, index, reason
                    );
                    element.attach(
                        index,
                        Resolution::Unresolved {
                            reason: reason.clone(),
                        },
                    )?;
                    outcome.failures.push(ElementFailure {
                        element: index,
                        kind: element.kind,
                        resolver: resolver.to_string(),
                        reason,
                    });
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EquationMarkup, RegionSource};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ContentResolver for CountingResolver {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn handles(&self, kind: ElementKind) -> bool {
            kind == ElementKind::Equation
        }

        fn resolve(&self, _request: &ResolveRequest<'_>) -> std::result::Result<ResolvedContent, ResolverFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ResolverFailure::MissingImage)
            } else {
                Ok(ResolvedContent::Equation(EquationMarkup::latex("x")))
            }
        }
    }

    fn equation(seq: usize) -> ReconciledElement {
        let region = InferredRegion::new(0, BBox::new(0.0, 100.0, 612.0, 200.0), RegionSource::Interpolated);
        ReconciledElement::placeholder(ElementKind::Equation, region, seq)
    }

    fn context<'a>(
        pages: &'a [PageGeometry],
        images: &'a HashMap<u32, DynamicImage>,
    ) -> ResolveContext<'a> {
        ResolveContext {
            pages,
            fragments: &[],
            page_images: images,
        }
    }

    #[test]
    fn test_each_element_resolved_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let set = ResolverSet::new().with_resolver(CountingResolver {
            calls: Arc::clone(&calls),
            fail: false,
        });
        let mut elements = vec![equation(0), equation(1), equation(2)];
        let pages = vec![PageGeometry::letter(0)];
        let images = HashMap::new();

        let outcome = set.resolve_all(&mut elements, &context(&pages, &images)).unwrap();
        assert_eq!(outcome.resolved, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // A second pass finds nothing left to do
        let outcome = set.resolve_all(&mut elements, &context(&pages, &images)).unwrap();
        assert_eq!(outcome.resolved, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failure_is_local() {
        let calls = Arc::new(AtomicUsize::new(0));
        let set = ResolverSet::new().with_resolver(CountingResolver {
            calls,
            fail: true,
        });
        let mut elements = vec![equation(0)];
        let pages = vec![PageGeometry::letter(0)];
        let images = HashMap::new();

        let outcome = set.resolve_all(&mut elements, &context(&pages, &images)).unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].resolver, "counting");
        assert!(matches!(
            elements[0].resolution,
            Some(Resolution::Unresolved { .. })
        ));
    }

    #[test]
    fn test_unhandled_kind_left_alone() {
        let set = ResolverSet::new();
        let mut elements = vec![equation(0)];
        let pages = vec![PageGeometry::letter(0)];
        let images = HashMap::new();
        let outcome = set.resolve_all(&mut elements, &context(&pages, &images)).unwrap();
        assert_eq!(outcome, ResolveOutcome::default());
        assert!(elements[0].resolution.is_none());
    }

    #[test]
    fn test_from_config_respects_toggles() {
        let mut config = PipelineConfig::default();
        assert_eq!(
            ResolverSet::from_config(&config, None, None, None).names(),
            vec!["table", "equation", "reference"]
        );
        config.resolvers.equations = false;
        assert_eq!(
            ResolverSet::from_config(&config, None, None, None).names(),
            vec!["table", "reference"]
        );
    }

    #[test]
    fn test_crop_region_scales_to_pixels() {
        // 612x792 points rendered at 144 dpi
        let image = DynamicImage::new_rgb8(1224, 1584);
        let page = PageGeometry::letter(0);
        let crop = crop_region(&image, &page, &BBox::new(0.0, 100.0, 306.0, 200.0)).unwrap();
        assert_eq!((crop.width(), crop.height()), (612, 200));

        assert!(crop_region(&image, &page, &BBox::new(10.0, 10.0, 10.0, 20.0)).is_none());
    }
}
