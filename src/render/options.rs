//! Rendering options and configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Output serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown with explicit markers for unresolved content
    #[default]
    Markdown,
    /// Structured JSON tree
    Json,
    /// TEI XML
    Tei,
}

impl OutputFormat {
    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Tei => "tei.xml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "tei" | "xml" => Ok(OutputFormat::Tei),
            other => Err(Error::Config(format!("unknown output format: {}", other))),
        }
    }
}

/// Options for rendering a processed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Output serialization
    pub format: OutputFormat,

    /// Include YAML frontmatter (Markdown only)
    #[serde(rename = "frontmatter")]
    pub include_frontmatter: bool,

    /// Include element bounding boxes
    pub include_bbox: bool,

    /// Include supporting fragments (JSON only)
    pub include_fragments: bool,

    /// Compact JSON instead of pretty-printed
    #[serde(rename = "compact_json")]
    pub compact: bool,

    /// Maximum heading level (1-6)
    pub max_heading_level: u8,

    /// Escape special Markdown characters
    pub escape_special_chars: bool,

    /// Levels for headings without a scaffold depth
    #[serde(skip)]
    pub heading_config: HeadingConfig,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the maximum heading level.
    pub fn with_max_heading(mut self, level: u8) -> Self {
        self.max_heading_level = level.clamp(1, 6);
        self
    }

    /// Enable or disable frontmatter.
    pub fn with_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    /// Enable or disable bounding boxes in output.
    pub fn with_bbox(mut self, include: bool) -> Self {
        self.include_bbox = include;
        self
    }

    /// Enable or disable per-element fragments in JSON output.
    pub fn with_fragments(mut self, include: bool) -> Self {
        self.include_fragments = include;
        self
    }

    /// Emit compact JSON.
    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }

    /// Enable or disable Markdown escaping.
    pub fn with_escaping(mut self, escape: bool) -> Self {
        self.escape_special_chars = escape;
        self
    }

    /// Set heading thresholds.
    pub fn with_heading_config(mut self, config: HeadingConfig) -> Self {
        self.heading_config = config;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Markdown,
            include_frontmatter: false,
            include_bbox: false,
            include_fragments: false,
            compact: false,
            max_heading_level: 6,
            escape_special_chars: true,
            heading_config: HeadingConfig::default(),
        }
    }
}

/// Heading levels for headings the scaffold gave no depth.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingConfig {
    /// Rank heading font sizes against body text
    pub use_font_sizes: bool,

    /// Level for headings whose size does not stand out
    pub fallback_level: u8,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            use_font_sizes: true,
            fallback_level: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_builder() {
        let options = RenderOptions::new()
            .with_frontmatter(true)
            .with_max_heading(9)
            .with_format(OutputFormat::Tei)
            .compact();

        assert!(options.include_frontmatter);
        assert_eq!(options.max_heading_level, 6);
        assert_eq!(options.format, OutputFormat::Tei);
        assert!(options.compact);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("tei".parse::<OutputFormat>().unwrap(), OutputFormat::Tei);
        assert!("docx".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Tei.extension(), "tei.xml");
    }
}
