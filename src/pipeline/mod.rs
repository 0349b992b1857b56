//! End-to-end document processing.
//!
//! One document runs through these stages:
//!
//! 1. the scaffold generator and region detector start on helper threads,
//!    each with its own deadline;
//! 2. the extractor runs on the calling thread;
//! 3. both service calls are awaited; a failure or timeout degrades the
//!    document instead of failing it;
//! 4. reconciliation;
//! 5. pages holding tables or equations are rasterized, when an image
//!    consumer is configured;
//! 6. specialized resolution.
//!
//! Extraction errors and malformed input are the only fatal outcomes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use supergrobid::pipeline::Pipeline;
//! use supergrobid::services::MarkdownFileScaffold;
//!
//! fn main() -> supergrobid::Result<()> {
//!     let pipeline = Pipeline::builder()
//!         .with_scaffold(Arc::new(MarkdownFileScaffold::sibling()))
//!         .build()?;
//!     let doc = pipeline.process("paper.pdf")?;
//!     println!("{}", doc.to_markdown()?);
//!     Ok(())
//! }
//! ```

mod output;

pub use output::ProcessedDocument;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::extract::{Extractor, LopdfExtractor};
use crate::model::{
    Degradation, DocumentReport, ElementKind, ReconcileStats, ReconciledElement, ServiceStage,
};
use crate::reconcile::{ReconcileInput, Reconciler};
use crate::resolve::{ResolveContext, ResolverSet};
use crate::services::{
    call_with_timeout, spawn_call, CitationClassifier, EquationTranscriber, PageRasterizer,
    RegionDetector, ScaffoldGenerator, ServiceError, TableTranscriber,
};

/// Default rasterization resolution.
pub const DEFAULT_DPI: u32 = 150;

/// Configured pipeline. Cheap to share across threads.
pub struct Pipeline {
    config: PipelineConfig,
    extractor: Arc<dyn Extractor>,
    scaffold: Option<Arc<dyn ScaffoldGenerator>>,
    regions: Option<Arc<dyn RegionDetector>>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    table_transcriber: Option<Arc<dyn TableTranscriber>>,
    equation_transcriber: Option<Arc<dyn EquationTranscriber>>,
    resolvers: ResolverSet,
    dpi: u32,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("scaffold", &self.scaffold.is_some())
            .field("regions", &self.regions.is_some())
            .field("rasterizer", &self.rasterizer.is_some())
            .field("resolvers", &self.resolvers)
            .field("dpi", &self.dpi)
            .finish()
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    extractor: Option<Arc<dyn Extractor>>,
    scaffold: Option<Arc<dyn ScaffoldGenerator>>,
    regions: Option<Arc<dyn RegionDetector>>,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    table_transcriber: Option<Arc<dyn TableTranscriber>>,
    equation_transcriber: Option<Arc<dyn EquationTranscriber>>,
    citation_classifier: Option<Arc<dyn CitationClassifier>>,
    dpi: Option<u32>,
}

impl PipelineBuilder {
    /// Use a configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the lopdf extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Structural scaffold source.
    pub fn with_scaffold(mut self, scaffold: Arc<dyn ScaffoldGenerator>) -> Self {
        self.scaffold = Some(scaffold);
        self
    }

    /// Layout region source.
    pub fn with_region_detector(mut self, detector: Arc<dyn RegionDetector>) -> Self {
        self.regions = Some(detector);
        self
    }

    /// Page renderer for image-based resolvers.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Rasterization resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    /// Generative table fallback.
    pub fn with_table_transcriber(mut self, transcriber: Arc<dyn TableTranscriber>) -> Self {
        self.table_transcriber = Some(transcriber);
        self
    }

    /// Formula transcription.
    pub fn with_equation_transcriber(mut self, transcriber: Arc<dyn EquationTranscriber>) -> Self {
        self.equation_transcriber = Some(transcriber);
        self
    }

    /// Citation field segmentation.
    pub fn with_citation_classifier(mut self, classifier: Arc<dyn CitationClassifier>) -> Self {
        self.citation_classifier = Some(classifier);
        self
    }

    /// Validate the configuration and build the pipeline.
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;
        let extractor = self
            .extractor
            .unwrap_or_else(|| Arc::new(LopdfExtractor::with_options(self.config.extract.clone())));
        let resolvers = ResolverSet::from_config(
            &self.config,
            self.table_transcriber.clone(),
            self.equation_transcriber.clone(),
            self.citation_classifier,
        );

        Ok(Pipeline {
            config: self.config,
            extractor,
            scaffold: self.scaffold,
            regions: self.regions,
            rasterizer: self.rasterizer,
            table_transcriber: self.table_transcriber,
            equation_transcriber: self.equation_transcriber,
            resolvers,
            dpi: self.dpi.unwrap_or(DEFAULT_DPI),
        })
    }
}

impl Pipeline {
    /// Start building a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one document.
    pub fn process(&self, path: impl AsRef<Path>) -> Result<ProcessedDocument> {
        let path = path.as_ref();
        let timeouts = &self.config.timeouts;
        let mut report = DocumentReport::begin(path);
        info!("processing {}", path.display());

        let scaffold_call = self.scaffold.as_ref().map(|generator| {
            let generator = Arc::clone(generator);
            let pdf = path.to_path_buf();
            spawn_call("scaffold", timeouts.scaffold(), move || generator.infer_structure(&pdf))
        });
        let region_call = self.regions.as_ref().map(|detector| {
            let detector = Arc::clone(detector);
            let pdf = path.to_path_buf();
            spawn_call("regions", timeouts.regions(), move || detector.detect_regions(&pdf))
        });

        let extracted = self.extractor.extract(path)?;
        report.pages = extracted.pages.len();
        report.fragments = extracted.fragments.len();

        let scaffold = match scaffold_call {
            Some(call) => call.wait().unwrap_or_else(|e| {
                degrade(&mut report, ServiceStage::Scaffold, &e);
                Vec::new()
            }),
            None => {
                degrade_unconfigured(&mut report, ServiceStage::Scaffold);
                Vec::new()
            }
        };
        let regions = match region_call {
            Some(call) => call.wait().unwrap_or_else(|e| {
                degrade(&mut report, ServiceStage::RegionDetector, &e);
                Vec::new()
            }),
            None => {
                degrade_unconfigured(&mut report, ServiceStage::RegionDetector);
                Vec::new()
            }
        };
        report.scaffold_elements = scaffold.len();
        report.regions = regions.len();

        let reconciler = Reconciler::new(self.config.reconcile.clone());
        let input = ReconcileInput::new(&extracted.pages, &extracted.fragments, &scaffold)
            .with_regions(&regions);
        let reconciliation = reconciler.reconcile(&input)?;
        let mut elements = reconciliation.elements;
        report.reconcile = reconciliation.stats;

        let page_images = self.rasterize(path, &elements, &mut report);

        let context = ResolveContext {
            pages: &extracted.pages,
            fragments: &extracted.fragments,
            page_images: &page_images,
        };
        let outcome = self.resolvers.resolve_all(&mut elements, &context)?;
        report.resolved = outcome.resolved;
        report.unverified_tables = outcome.unverified_tables;
        report.resolver_failures = outcome.failures;

        report.finish();
        info!(
            "{}: {} elements, {} resolved, {} resolver failures in {}ms",
            path.display(),
            elements.len(),
            report.resolved,
            report.resolver_failures.len(),
            report.elapsed_ms
        );

        Ok(ProcessedDocument::new(
            extracted.metadata,
            extracted.pages,
            elements,
            report,
        ))
    }

    /// Process documents in parallel. Results keep the input order and one
    /// document's failure never affects another.
    pub fn process_batch<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Vec<BatchItem> {
        self.process_batch_with(paths, |_| {})
    }

    /// Like [`Pipeline::process_batch`], calling `on_done` as each document finishes.
    pub fn process_batch_with<P, F>(&self, paths: &[P], on_done: F) -> Vec<BatchItem>
    where
        P: AsRef<Path> + Sync,
        F: Fn(&BatchItem) + Sync,
    {
        paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                let item = BatchItem {
                    path: path.to_path_buf(),
                    result: self.process(path),
                };
                if let Err(ref e) = item.result {
                    warn!("{}: {}", path.display(), e);
                }
                on_done(&item);
                item
            })
            .collect()
    }

    /// Pages whose elements will ask for an image.
    fn pages_needing_images(&self, elements: &[ReconciledElement]) -> BTreeSet<u32> {
        let toggles = &self.config.resolvers;
        let tables = toggles.tables && toggles.table_fallback && self.table_transcriber.is_some();
        let equations = toggles.equations && self.equation_transcriber.is_some();

        elements
            .iter()
            .filter(|e| match e.kind {
                ElementKind::Table => tables,
                ElementKind::Equation => equations,
                _ => false,
            })
            .filter_map(|e| e.region.map(|r| r.page))
            .collect()
    }

    fn rasterize(
        &self,
        path: &Path,
        elements: &[ReconciledElement],
        report: &mut DocumentReport,
    ) -> HashMap<u32, DynamicImage> {
        let pages = self.pages_needing_images(elements);
        if pages.is_empty() {
            return HashMap::new();
        }
        let Some(rasterizer) = self.rasterizer.as_ref() else {
            degrade_unconfigured(report, ServiceStage::Rasterizer);
            return HashMap::new();
        };

        let timeout = self.config.timeouts.rasterizer();
        let dpi = self.dpi;
        let rendered: Vec<(u32, std::result::Result<DynamicImage, ServiceError>)> = pages
            .into_par_iter()
            .map(|page| {
                let rasterizer = Arc::clone(rasterizer);
                let pdf = path.to_path_buf();
                let result = call_with_timeout(format!("rasterizer-p{}", page), timeout, move || {
                    rasterizer.render_page(&pdf, page, dpi)
                });
                (page, result)
            })
            .collect();

        let mut images = HashMap::new();
        let mut first_error: Option<ServiceError> = None;
        let mut failed = 0;
        for (page, result) in rendered {
            match result {
                Ok(image) => {
                    images.insert(page, image);
                }
                Err(e) => {
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            report.degradations.push(Degradation {
                stage: ServiceStage::Rasterizer,
                timed_out: e.is_timeout(),
                message: format!("{} page(s) not rendered: {}", failed, e),
            });
            warn!("{}: rasterizer degraded: {}", path.display(), e);
        }
        images
    }
}

fn degrade(report: &mut DocumentReport, stage: ServiceStage, error: &ServiceError) {
    warn!("{}: {} degraded: {}", report.source.display(), stage, error);
    report.degradations.push(Degradation {
        stage,
        timed_out: error.is_timeout(),
        message: error.to_string(),
    });
}

fn degrade_unconfigured(report: &mut DocumentReport, stage: ServiceStage) {
    report.degradations.push(Degradation {
        stage,
        timed_out: false,
        message: format!("no {} configured", stage),
    });
}

/// One document of a batch.
#[derive(Debug)]
pub struct BatchItem {
    /// Input path
    pub path: PathBuf,
    /// Output or the fatal error
    pub result: Result<ProcessedDocument>,
}

/// Aggregate counts over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Documents attempted
    pub documents: usize,
    /// Documents processed
    pub succeeded: usize,
    /// Documents that failed fatally
    pub failed: usize,
    /// Documents with at least one degraded service
    pub degraded: usize,
    /// Element-level resolver failures
    pub resolver_failures: usize,
    /// Tables from generative transcription
    pub unverified_tables: usize,
    /// Reconciliation counters over all successful documents
    pub reconcile: ReconcileStats,
}

impl BatchSummary {
    /// Summarize batch results.
    pub fn from_items(items: &[BatchItem]) -> Self {
        let mut summary = BatchSummary {
            documents: items.len(),
            ..Default::default()
        };
        for item in items {
            match &item.result {
                Ok(doc) => {
                    summary.succeeded += 1;
                    if !doc.report.degradations.is_empty() {
                        summary.degraded += 1;
                    }
                    summary.resolver_failures += doc.report.resolver_failures.len();
                    summary.unverified_tables += doc.report.unverified_tables;
                    summary.reconcile.merge(&doc.report.reconcile);
                }
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::extract::ExtractedDocument;
    use crate::model::{
        BBox, CitationFields, DocumentMetadata, Fragment, PageGeometry, ResolvedContent, ScaffoldElement,
    };
    use crate::services::StaticScaffold;
    use std::thread;
    use std::time::Duration;

    struct FixedExtractor(ExtractedDocument);

    impl Extractor for FixedExtractor {
        fn extract(&self, path: &Path) -> Result<ExtractedDocument> {
            if path.ends_with("broken.pdf") {
                return Err(Error::UnknownFormat);
            }
            Ok(self.0.clone())
        }
    }

    fn extracted() -> ExtractedDocument {
        let frag = |text: &str, y: f32, seq: usize| {
            Fragment::new(0, BBox::new(72.0, y, 540.0, y + 10.0), text, seq).with_font_size(10.0)
        };
        ExtractedDocument {
            pages: vec![PageGeometry::letter(0)],
            fragments: vec![
                frag("Introduction", 72.0, 0),
                frag("We study reconciliation of text.", 90.0, 1),
                frag("Results follow.", 300.0, 2),
            ],
            metadata: DocumentMetadata::default(),
        }
    }

    fn scaffold() -> Vec<ScaffoldElement> {
        vec![
            ScaffoldElement::heading("Introduction", 1, 0),
            ScaffoldElement::paragraph("We study reconciliation of text.", 1),
            ScaffoldElement::placeholder(ElementKind::Table, 2),
            ScaffoldElement::paragraph("Results follow.", 3),
        ]
    }

    fn pipeline(scaffold: Option<Arc<dyn ScaffoldGenerator>>) -> Pipeline {
        let mut builder = Pipeline::builder().with_extractor(Arc::new(FixedExtractor(extracted())));
        if let Some(s) = scaffold {
            builder = builder.with_scaffold(s);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_process_end_to_end() {
        let doc = pipeline(Some(Arc::new(StaticScaffold(scaffold()))))
            .process("paper.pdf")
            .unwrap();

        let kinds: Vec<ElementKind> = doc.elements.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ElementKind::Heading, ElementKind::Paragraph, ElementKind::Table, ElementKind::Paragraph]
        );
        assert_eq!(doc.report.reconcile.accepted, 3);
        // No grid and no transcriber: a local failure, not a fatal one
        assert_eq!(doc.report.resolver_failures.len(), 1);
        assert_eq!(doc.report.resolver_failures[0].kind, ElementKind::Table);
        // Region detector was never configured
        assert!(doc.report.is_degraded(ServiceStage::RegionDetector));
        assert!(!doc.report.is_degraded(ServiceStage::Scaffold));
        assert!(!doc.report.is_degraded(ServiceStage::Rasterizer));
    }

    #[test]
    fn test_slow_scaffold_degrades() {
        let slow = |_: &Path| -> std::result::Result<Vec<ScaffoldElement>, ServiceError> {
            thread::sleep(Duration::from_millis(500));
            Ok(Vec::new())
        };
        let mut config = PipelineConfig::default();
        config.timeouts.scaffold_ms = Some(50);
        let pipeline = Pipeline::builder()
            .with_config(config)
            .with_extractor(Arc::new(FixedExtractor(extracted())))
            .with_scaffold(Arc::new(slow))
            .build()
            .unwrap();

        let doc = pipeline.process("paper.pdf").unwrap();
        let degradation = &doc.report.degradations[0];
        assert_eq!(degradation.stage, ServiceStage::Scaffold);
        assert!(degradation.timed_out);
        // Every fragment survives as an orphan paragraph
        assert_eq!(doc.report.reconcile.orphan_paragraphs, 1);
        assert_eq!(doc.elements[0].fragments.len(), 3);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let pipeline = pipeline(Some(Arc::new(StaticScaffold(scaffold()))));
        let items = pipeline.process_batch(&["a.pdf", "broken.pdf", "b.pdf"]);

        assert_eq!(items.len(), 3);
        assert_eq!(items[1].path, PathBuf::from("broken.pdf"));
        assert!(items[0].result.is_ok());
        assert!(matches!(items[1].result, Err(Error::UnknownFormat)));
        assert!(items[2].result.is_ok());

        let summary = BatchSummary::from_items(&items);
        assert_eq!(summary.documents, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.reconcile.accepted, 6);
        assert_eq!(summary.resolver_failures, 2);
    }

    struct YearClassifier;

    impl CitationClassifier for YearClassifier {
        fn classify(&self, citation: &str) -> std::result::Result<CitationFields, ServiceError> {
            Ok(CitationFields {
                year: citation
                    .split(|c: char| !c.is_ascii_digit())
                    .find(|t| t.len() == 4)
                    .map(str::to_string),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_classifier_reaches_reference_resolver() {
        let frag = |text: &str, y: f32, seq: usize| {
            Fragment::new(0, BBox::new(72.0, y, 540.0, y + 10.0), text, seq).with_font_size(10.0)
        };
        let extracted = ExtractedDocument {
            pages: vec![PageGeometry::letter(0)],
            fragments: vec![
                frag("References", 72.0, 0),
                frag("[1] A. 2017.", 90.0, 1),
                frag("[2] B. 2018.", 102.0, 2),
                frag("[3] C. 2019.", 114.0, 3),
            ],
            metadata: DocumentMetadata::default(),
        };
        let scaffold = vec![
            ScaffoldElement::heading("References", 1, 0),
            ScaffoldElement::new(ElementKind::ListItem, "[1] A. 2017.", 1),
            ScaffoldElement::new(ElementKind::ListItem, "[2] B. 2018.", 2),
            ScaffoldElement::new(ElementKind::ListItem, "[3] C. 2019.", 3),
        ];
        let pipeline = Pipeline::builder()
            .with_extractor(Arc::new(FixedExtractor(extracted)))
            .with_scaffold(Arc::new(StaticScaffold(scaffold)))
            .with_citation_classifier(Arc::new(YearClassifier))
            .build()
            .unwrap();

        let doc = pipeline.process("paper.pdf").unwrap();
        let list = doc
            .elements
            .iter()
            .find(|e| e.kind == ElementKind::ReferenceList)
            .unwrap();
        let Some(ResolvedContent::References { citations }) = list.resolved() else {
            panic!("reference list not resolved");
        };
        assert_eq!(citations.len(), 3);
        assert_eq!(
            citations[2].fields.as_ref().and_then(|f| f.year.as_deref()),
            Some("2019")
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PipelineConfig::default();
        config.reconcile.similarity_threshold = 0.0;
        assert!(Pipeline::builder().with_config(config).build().is_err());
    }
}
