//! # supergrobid
//!
//! Hybrid PDF structure extraction for Rust.
//!
//! A deterministic extractor knows exactly which text is on each page and
//! where, but little about structure. A generative model knows the
//! structure (headings, paragraphs, tables, equations) but may paraphrase
//! or invent text. This library aligns the two, keeps only scaffold
//! elements that the extracted text supports, re-attaches extracted text
//! the model left out, and locates non-text elements between their
//! verified neighbours.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use supergrobid::pipeline::Pipeline;
//! use supergrobid::services::{JsonRegionFile, MarkdownFileScaffold};
//!
//! fn main() -> supergrobid::Result<()> {
//!     // Scaffold from `paper.mmd`, regions from `paper.regions.json`
//!     let pipeline = Pipeline::builder()
//!         .with_scaffold(Arc::new(MarkdownFileScaffold::sibling()))
//!         .with_region_detector(Arc::new(JsonRegionFile::sibling()))
//!         .build()?;
//!
//!     let doc = pipeline.process("paper.pdf")?;
//!     println!("{}", doc.to_markdown()?);
//!     eprintln!("discarded {} scaffold elements", doc.report.reconcile.discarded);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Bounded hallucination**: every output string comes from extracted fragments
//! - **Graceful degradation**: slow or missing services lower fidelity, never fail a document
//! - **Specialized resolvers**: table grids, equation transcription, citation segmentation
//! - **Multiple output formats**: Markdown, JSON tree, TEI XML
//! - **Parallel processing**: Rayon for batches and resolver jobs

pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod render;
pub mod resolve;
pub mod services;

// Re-export commonly used types
pub use config::{PipelineConfig, ResolverToggles, TimeoutConfig};
pub use detect::{is_pdf, sniff_bytes, sniff_path, PdfHeader};
pub use error::{Error, Result};
pub use extract::{ExtractOptions, ExtractedDocument, Extractor, LopdfExtractor};
pub use model::{
    BBox, DocumentReport, ElementKind, Fragment, PageGeometry, ReconciledElement, Region,
    RegionLabel, ResolvedContent, ScaffoldElement,
};
pub use pipeline::{BatchItem, BatchSummary, Pipeline, PipelineBuilder, ProcessedDocument};
pub use reconcile::{Lookahead, OrphanGrouping, ReconcileInput, ReconcileOptions, Reconciler};
pub use render::{OutputFormat, RenderOptions};

use std::path::Path;

/// Extract positioned fragments from a PDF file with default options.
///
/// # Example
///
/// ```no_run
/// let doc = supergrobid::extract_file("paper.pdf").unwrap();
/// println!("{} fragments on {} pages", doc.fragments.len(), doc.page_count());
/// ```
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<ExtractedDocument> {
    LopdfExtractor::new().extract(path.as_ref())
}

/// Reconcile a PDF against a Markdown scaffold already in memory.
///
/// No region detector, rasterizer or transcriber is involved, so table and
/// equation placeholders stay unresolved unless a grid is detected.
///
/// # Example
///
/// ```no_run
/// let scaffold = std::fs::read_to_string("paper.mmd").unwrap();
/// let doc = supergrobid::reconcile_with_markdown("paper.pdf", &scaffold).unwrap();
/// println!("{}", doc.to_markdown().unwrap());
/// ```
pub fn reconcile_with_markdown<P: AsRef<Path>>(path: P, markdown: &str) -> Result<ProcessedDocument> {
    let scaffold = services::parse_markdown_scaffold(markdown);
    Pipeline::builder()
        .with_scaffold(std::sync::Arc::new(services::StaticScaffold(scaffold)))
        .build()?
        .process(path)
}
