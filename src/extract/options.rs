//! Extraction options.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options for the deterministic extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Skip pages that fail to decode instead of failing the document
    pub lenient: bool,

    /// A horizontal gap wider than this many font sizes splits a line
    pub cell_gap_factor: f32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            lenient: true,
            cell_gap_factor: 1.0,
        }
    }
}

impl ExtractOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the document on the first undecodable page.
    pub fn strict(mut self) -> Self {
        self.lenient = false;
        self
    }

    /// Set the fragment split factor.
    pub fn with_cell_gap_factor(mut self, factor: f32) -> Self {
        self.cell_gap_factor = factor;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_gap_factor.is_finite() && self.cell_gap_factor > 0.0) {
            return Err(Error::Config(format!(
                "cell_gap_factor must be positive, got {}",
                self.cell_gap_factor
            )));
        }
        Ok(())
    }
}
