//! Reconciliation options.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How far past the cursor the run search may look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lookahead {
    /// Fragments on the cursor's page and the next `n` pages
    Pages(u32),
    /// The next `n` fragments
    Fragments(usize),
    /// Every remaining fragment
    RestOfDocument,
}

impl Default for Lookahead {
    fn default() -> Self {
        Lookahead::Pages(1)
    }
}

impl FromStr for Lookahead {
    type Err = Error;

    /// Accepts `N` (pages), `pages:N`, `fragments:N` and `rest`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        if matches!(s.as_str(), "rest" | "all" | "rest-of-document") {
            return Ok(Lookahead::RestOfDocument);
        }

        let parse_count = |n: &str| {
            n.trim()
                .parse::<usize>()
                .map_err(|_| Error::Config(format!("invalid lookahead count: {}", n)))
        };

        if let Some(n) = s.strip_prefix("fragments:") {
            let n = parse_count(n)?;
            if n == 0 {
                return Err(Error::Config("fragment lookahead must be positive".into()));
            }
            return Ok(Lookahead::Fragments(n));
        }
        let n = s.strip_prefix("pages:").unwrap_or(&s);
        Ok(Lookahead::Pages(parse_count(n)? as u32))
    }
}

/// How orphan fragments are grouped when no text element can absorb them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrphanGrouping {
    /// Consecutive orphans on one page share a paragraph
    #[default]
    PerPage,
    /// Each orphan becomes its own paragraph
    PerFragment,
}

/// Text similarity function used to score fragment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityMetric {
    /// Normalized Indel similarity over characters
    #[default]
    Indel,
    /// Dice coefficient over token multisets
    TokenOverlap,
}

/// Options for the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Minimum score for accepting a run
    pub similarity_threshold: f32,

    /// Search window past the cursor
    pub lookahead: Lookahead,

    /// Upper bound on fragments in one candidate run
    pub max_run_fragments: usize,

    /// Orphan grouping policy
    pub orphan_grouping: OrphanGrouping,

    /// Let orphans join a text element on an earlier page
    pub attach_orphans_across_pages: bool,

    /// Merge reference sections into reference lists
    pub detect_reference_sections: bool,

    /// Detector regions below this confidence are ignored
    pub region_min_confidence: f32,

    /// Similarity function
    pub metric: SimilarityMetric,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            lookahead: Lookahead::default(),
            max_run_fragments: 64,
            orphan_grouping: OrphanGrouping::default(),
            attach_orphans_across_pages: false,
            detect_reference_sections: true,
            region_min_confidence: 0.5,
            metric: SimilarityMetric::default(),
        }
    }
}

impl ReconcileOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acceptance threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the lookahead window.
    pub fn with_lookahead(mut self, lookahead: Lookahead) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Set the maximum run length.
    pub fn with_max_run_fragments(mut self, max: usize) -> Self {
        self.max_run_fragments = max;
        self
    }

    /// Set the orphan grouping policy.
    pub fn with_orphan_grouping(mut self, grouping: OrphanGrouping) -> Self {
        self.orphan_grouping = grouping;
        self
    }

    /// Allow orphans to attach across page breaks.
    pub fn attach_across_pages(mut self, attach: bool) -> Self {
        self.attach_orphans_across_pages = attach;
        self
    }

    /// Enable or disable reference-section merging.
    pub fn with_reference_sections(mut self, detect: bool) -> Self {
        self.detect_reference_sections = detect;
        self
    }

    /// Set the similarity metric.
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let t = self.similarity_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(Error::Config(format!(
                "similarity_threshold must be in (0, 1], got {}",
                t
            )));
        }
        if self.max_run_fragments == 0 {
            return Err(Error::Config("max_run_fragments must be positive".into()));
        }
        if let Lookahead::Fragments(0) = self.lookahead {
            return Err(Error::Config("fragment lookahead must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.region_min_confidence) {
            return Err(Error::Config(format!(
                "region_min_confidence must be in [0, 1], got {}",
                self.region_min_confidence
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ReconcileOptions::default();
        assert_eq!(opts.similarity_threshold, 0.8);
        assert_eq!(opts.lookahead, Lookahead::Pages(1));
        assert_eq!(opts.orphan_grouping, OrphanGrouping::PerPage);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let opts = ReconcileOptions::new()
            .with_threshold(0.9)
            .with_lookahead(Lookahead::RestOfDocument)
            .with_metric(SimilarityMetric::TokenOverlap);
        assert_eq!(opts.similarity_threshold, 0.9);
        assert_eq!(opts.lookahead, Lookahead::RestOfDocument);
        assert_eq!(opts.metric, SimilarityMetric::TokenOverlap);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        assert!(ReconcileOptions::new().with_threshold(0.0).validate().is_err());
        assert!(ReconcileOptions::new().with_threshold(1.5).validate().is_err());
        assert!(ReconcileOptions::new().with_threshold(1.0).validate().is_ok());
    }

    #[test]
    fn test_lookahead_from_str() {
        assert_eq!("2".parse::<Lookahead>().unwrap(), Lookahead::Pages(2));
        assert_eq!("pages:0".parse::<Lookahead>().unwrap(), Lookahead::Pages(0));
        assert_eq!(
            "fragments:40".parse::<Lookahead>().unwrap(),
            Lookahead::Fragments(40)
        );
        assert_eq!("rest".parse::<Lookahead>().unwrap(), Lookahead::RestOfDocument);
        assert!("fragments:0".parse::<Lookahead>().is_err());
        assert!("soon".parse::<Lookahead>().is_err());
    }

    #[test]
    fn test_lookahead_serde_shape() {
        let json = serde_json::to_value(Lookahead::Pages(1)).unwrap();
        assert_eq!(json, serde_json::json!({ "pages": 1 }));
        let json = serde_json::to_value(Lookahead::RestOfDocument).unwrap();
        assert_eq!(json, serde_json::json!("rest-of-document"));
    }
}
