//! Data model shared by extraction, reconciliation, resolution and rendering.
//!
//! Fragments and scaffold elements are the two independent input streams;
//! reconciled elements are the single output stream. Regions are auxiliary
//! evidence and never a source of text.

mod document;
mod element;
mod fragment;
mod geometry;
mod region;
mod report;
mod resolved;
mod scaffold;

pub(crate) use document::escape_yaml;
pub use document::DocumentMetadata;
pub use element::{Origin, ReconciledElement, Resolution};
pub use fragment::{join_fragment_text, Fragment};
pub use geometry::{BBox, PageGeometry, DEFAULT_PAGE_HEIGHT, DEFAULT_PAGE_WIDTH};
pub use region::{InferredRegion, Region, RegionLabel, RegionSource};
pub use report::{
    Degradation, DocumentReport, ElementFailure, QualityFlag, ReconcileStats, ServiceStage,
};
pub use resolved::{
    Citation, CitationFields, EquationMarkup, ResolvedContent, TableGrid, TableMethod,
};
pub use scaffold::{ElementKind, ScaffoldElement};
