//! Opaque external services.
//!
//! The scaffold generator, region detector, rasterizer and transcribers are
//! black boxes with latency and failure modes of their own. Every call goes
//! through [`timeout::spawn_call`] so a slow service degrades a document
//! instead of stalling it.

mod command;
mod markdown_scaffold;
mod region_file;
pub mod timeout;

use std::path::Path;
use std::time::Duration;

use image::DynamicImage;
use thiserror::Error;

use crate::model::{CitationFields, Region, ScaffoldElement};

pub use command::{
    CommandCitationClassifier, CommandEquationTranscriber, CommandRasterizer, CommandScaffold,
    CommandTableTranscriber,
};
pub use markdown_scaffold::{parse_markdown_scaffold, MarkdownFileScaffold};
pub use region_file::{parse_region_json, JsonRegionFile};
pub use timeout::{call_with_timeout, spawn_call, PendingCall};

/// Non-fatal failure of an external service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The call did not finish before its deadline
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The service is not installed or not configured
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The service ran and reported an error
    #[error("failed: {0}")]
    Failed(String),

    /// The service answered with something we could not use
    #[error("invalid output: {0}")]
    InvalidOutput(String),
}

impl ServiceError {
    /// Whether this is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::Timeout(_))
    }
}

/// Infers document structure (headings, paragraphs, placeholders).
pub trait ScaffoldGenerator: Send + Sync {
    /// Ordered structural elements for the whole document.
    fn infer_structure(&self, pdf: &Path) -> Result<Vec<ScaffoldElement>, ServiceError>;
}

/// Detects labeled layout regions.
pub trait RegionDetector: Send + Sync {
    /// Regions in page space, any order.
    fn detect_regions(&self, pdf: &Path) -> Result<Vec<Region>, ServiceError>;
}

/// Renders pages to images.
pub trait PageRasterizer: Send + Sync {
    /// Render one page (0-based) at the given resolution.
    fn render_page(&self, pdf: &Path, page: u32, dpi: u32) -> Result<DynamicImage, ServiceError>;
}

/// Transcribes a table image into a Markdown table.
pub trait TableTranscriber: Send + Sync {
    /// `image` is the cropped region when a page image exists; `context`
    /// is the verified text inside the region.
    fn transcribe_table(
        &self,
        image: Option<&DynamicImage>,
        context: &str,
    ) -> Result<String, ServiceError>;
}

/// Transcribes a formula image into markup.
pub trait EquationTranscriber: Send + Sync {
    /// LaTeX for the cropped formula.
    fn transcribe_equation(&self, image: &DynamicImage) -> Result<String, ServiceError>;
}

/// Segments one citation string into fields.
pub trait CitationClassifier: Send + Sync {
    /// Structured fields for a raw citation.
    fn classify(&self, citation: &str) -> Result<CitationFields, ServiceError>;
}

impl<F> ScaffoldGenerator for F
where
    F: Fn(&Path) -> Result<Vec<ScaffoldElement>, ServiceError> + Send + Sync,
{
    fn infer_structure(&self, pdf: &Path) -> Result<Vec<ScaffoldElement>, ServiceError> {
        self(pdf)
    }
}

impl<F> RegionDetector for F
where
    F: Fn(&Path) -> Result<Vec<Region>, ServiceError> + Send + Sync,
{
    fn detect_regions(&self, pdf: &Path) -> Result<Vec<Region>, ServiceError> {
        self(pdf)
    }
}

/// A fixed scaffold, for callers that already have one in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticScaffold(pub Vec<ScaffoldElement>);

impl ScaffoldGenerator for StaticScaffold {
    fn infer_structure(&self, _pdf: &Path) -> Result<Vec<ScaffoldElement>, ServiceError> {
        Ok(self.0.clone())
    }
}

/// A fixed region list.
#[derive(Debug, Clone, Default)]
pub struct StaticRegions(pub Vec<Region>);

impl RegionDetector for StaticRegions {
    fn detect_regions(&self, _pdf: &Path) -> Result<Vec<Region>, ServiceError> {
        Ok(self.0.clone())
    }
}
