//! Pipeline configuration.
//!
//! Every section carries `#[serde(default)]`, so a TOML file only has to
//! name the values it changes:
//!
//! ```toml
//! [reconcile]
//! similarity_threshold = 0.85
//! lookahead = { pages = 2 }
//!
//! [timeouts]
//! scaffold_ms = 120000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::ExtractOptions;
use crate::reconcile::ReconcileOptions;
use crate::render::RenderOptions;

/// Complete configuration for one pipeline instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reconciliation engine settings
    pub reconcile: ReconcileOptions,
    /// Per-service deadlines
    pub timeouts: TimeoutConfig,
    /// Resolver toggles
    pub resolvers: ResolverToggles,
    /// Extractor settings
    pub extract: ExtractOptions,
    /// Output settings
    pub output: RenderOptions,
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.reconcile.validate()?;
        self.extract.validate()?;
        self.timeouts.validate()?;
        if !(1..=6).contains(&self.output.max_heading_level) {
            return Err(Error::Config(format!(
                "max_heading_level must be in 1..=6, got {}",
                self.output.max_heading_level
            )));
        }
        Ok(())
    }
}

/// Deadlines for opaque service calls, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for any service without an override
    pub default_ms: u64,
    /// Scaffold generator override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaffold_ms: Option<u64>,
    /// Region detector override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions_ms: Option<u64>,
    /// Page rasterizer override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rasterizer_ms: Option<u64>,
    /// Table transcriber override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_ms: Option<u64>,
    /// Equation transcriber override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equation_ms: Option<u64>,
    /// Citation classifier override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_ms: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: 30_000,
            scaffold_ms: None,
            regions_ms: None,
            rasterizer_ms: None,
            table_ms: None,
            equation_ms: None,
            citation_ms: None,
        }
    }
}

impl TimeoutConfig {
    /// Same deadline for every service.
    pub fn uniform(ms: u64) -> Self {
        Self {
            default_ms: ms,
            ..Self::default()
        }
    }

    fn pick(&self, specific: Option<u64>) -> Duration {
        Duration::from_millis(specific.unwrap_or(self.default_ms))
    }

    /// Scaffold generator deadline.
    pub fn scaffold(&self) -> Duration {
        self.pick(self.scaffold_ms)
    }

    /// Region detector deadline.
    pub fn regions(&self) -> Duration {
        self.pick(self.regions_ms)
    }

    /// Page rasterizer deadline.
    pub fn rasterizer(&self) -> Duration {
        self.pick(self.rasterizer_ms)
    }

    /// Table transcriber deadline.
    pub fn table(&self) -> Duration {
        self.pick(self.table_ms)
    }

    /// Equation transcriber deadline.
    pub fn equation(&self) -> Duration {
        self.pick(self.equation_ms)
    }

    /// Citation classifier deadline.
    pub fn citation(&self) -> Duration {
        self.pick(self.citation_ms)
    }

    fn validate(&self) -> Result<()> {
        let all = [
            Some(self.default_ms),
            self.scaffold_ms,
            self.regions_ms,
            self.rasterizer_ms,
            self.table_ms,
            self.equation_ms,
            self.citation_ms,
        ];
        if all.iter().flatten().any(|&ms| ms == 0) {
            return Err(Error::Config("timeouts must be positive".into()));
        }
        Ok(())
    }
}

/// Which resolvers run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverToggles {
    /// Resolve table placeholders
    pub tables: bool,
    /// Resolve equation placeholders
    pub equations: bool,
    /// Segment reference lists
    pub references: bool,
    /// Fall back to generative transcription when grid detection fails
    pub table_fallback: bool,
    /// Use the citation classifier when one is configured
    pub citation_classifier: bool,
}

impl Default for ResolverToggles {
    fn default() -> Self {
        Self {
            tables: true,
            equations: true,
            references: true,
            table_fallback: true,
            citation_classifier: true,
        }
    }
}
