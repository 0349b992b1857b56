//! Per-document processing report.
//!
//! Fatal errors abort a document; everything else that goes wrong is
//! accumulated here and delivered alongside the reconciled output.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ElementKind;

/// Counters collected during one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Scaffold elements examined
    pub scaffold_elements: usize,
    /// Text elements accepted with a supporting fragment run
    pub accepted: usize,
    /// Text elements discarded as unsupported
    pub discarded: usize,
    /// Non-text placeholders emitted
    pub non_text: usize,
    /// Orphan fragments appended to a preceding text element
    pub orphans_appended: usize,
    /// Paragraphs synthesized from orphan fragments
    pub orphan_paragraphs: usize,
    /// Reference sections merged into reference lists
    pub reference_blocks: usize,
    /// Mean confidence over all emitted elements
    pub average_confidence: f32,
}

impl ReconcileStats {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of text scaffold elements that were discarded.
    pub fn discard_rate(&self) -> f32 {
        let attempted = self.accepted + self.discarded;
        if attempted == 0 {
            0.0
        } else {
            self.discarded as f32 / attempted as f32
        }
    }

    /// Merge another stats instance into this one (averages are weighted by accepted count).
    pub fn merge(&mut self, other: &ReconcileStats) {
        let weight_self = self.accepted + self.orphan_paragraphs + self.non_text;
        let weight_other = other.accepted + other.orphan_paragraphs + other.non_text;
        let total = weight_self + weight_other;
        if total > 0 {
            self.average_confidence = (self.average_confidence * weight_self as f32
                + other.average_confidence * weight_other as f32)
                / total as f32;
        }
        self.scaffold_elements += other.scaffold_elements;
        self.accepted += other.accepted;
        self.discarded += other.discarded;
        self.non_text += other.non_text;
        self.orphans_appended += other.orphans_appended;
        self.orphan_paragraphs += other.orphan_paragraphs;
        self.reference_blocks += other.reference_blocks;
    }
}

/// External service whose failure degrades a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStage {
    /// Structural scaffold generator
    Scaffold,
    /// Layout region detector
    RegionDetector,
    /// Page rasterizer
    Rasterizer,
}

impl std::fmt::Display for ServiceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ServiceStage::Scaffold => "scaffold",
            ServiceStage::RegionDetector => "region detector",
            ServiceStage::Rasterizer => "rasterizer",
        })
    }
}

/// A pipeline-level degradation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    /// Degraded stage
    pub stage: ServiceStage,
    /// Whether the call hit its deadline
    pub timed_out: bool,
    /// Error description
    pub message: String,
}

/// An element-level resolver failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementFailure {
    /// Index of the element in the output sequence
    pub element: usize,
    /// Element kind
    pub kind: ElementKind,
    /// Resolver name
    pub resolver: String,
    /// Failure description
    pub reason: String,
}

/// Summary flag describing reduced output fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// No scaffold; all text is orphan paragraphs
    ScaffoldUnavailable,
    /// No detector regions; placeholders use interpolation only
    RegionsUnavailable,
    /// No page images; image-based resolvers could not run
    PageImagesUnavailable,
    /// At least one table came from unverified generative transcription
    UnverifiedTables,
}

impl QualityFlag {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            QualityFlag::ScaffoldUnavailable => "scaffold_unavailable",
            QualityFlag::RegionsUnavailable => "regions_unavailable",
            QualityFlag::PageImagesUnavailable => "page_images_unavailable",
            QualityFlag::UnverifiedTables => "unverified_tables",
        }
    }
}

/// Everything that happened to one document besides its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Input path
    pub source: PathBuf,
    /// When processing began
    pub started_at: DateTime<Utc>,
    /// Wall-clock processing time
    pub elapsed_ms: u64,
    /// Number of pages
    pub pages: usize,
    /// Number of extracted fragments
    pub fragments: usize,
    /// Number of scaffold elements received
    pub scaffold_elements: usize,
    /// Number of detector regions received
    pub regions: usize,
    /// Reconciliation counters
    pub reconcile: ReconcileStats,
    /// Degraded stages
    pub degradations: Vec<Degradation>,
    /// Element-level failures
    pub resolver_failures: Vec<ElementFailure>,
    /// Elements with resolved content
    pub resolved: usize,
    /// Tables accepted from generative transcription
    pub unverified_tables: usize,
}

impl DocumentReport {
    /// Empty report for a document starting now.
    pub fn begin(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            started_at: Utc::now(),
            elapsed_ms: 0,
            pages: 0,
            fragments: 0,
            scaffold_elements: 0,
            regions: 0,
            reconcile: ReconcileStats::default(),
            degradations: Vec::new(),
            resolver_failures: Vec::new(),
            resolved: 0,
            unverified_tables: 0,
        }
    }

    /// Record elapsed time since `started_at`.
    pub fn finish(&mut self) {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        self.elapsed_ms = elapsed.num_milliseconds().max(0) as u64;
    }

    /// Whether a stage was degraded.
    pub fn is_degraded(&self, stage: ServiceStage) -> bool {
        self.degradations.iter().any(|d| d.stage == stage)
    }

    /// Quality flags derived from degradations and resolver outcomes.
    pub fn quality_flags(&self) -> Vec<QualityFlag> {
        let mut flags = Vec::new();
        if self.is_degraded(ServiceStage::Scaffold) {
            flags.push(QualityFlag::ScaffoldUnavailable);
        }
        if self.is_degraded(ServiceStage::RegionDetector) {
            flags.push(QualityFlag::RegionsUnavailable);
        }
        if self.is_degraded(ServiceStage::Rasterizer) {
            flags.push(QualityFlag::PageImagesUnavailable);
        }
        if self.unverified_tables > 0 {
            flags.push(QualityFlag::UnverifiedTables);
        }
        flags
    }
}
