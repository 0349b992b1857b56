//! Structured content attached to placeholder elements by the resolvers.

use serde::{Deserialize, Serialize};

/// Payload produced by exactly one resolver for one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedContent {
    /// Table grid
    Table(TableGrid),
    /// Formula markup
    Equation(EquationMarkup),
    /// Segmented citations
    References {
        /// Citations in document order
        citations: Vec<Citation>,
    },
}

/// How a table grid was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableMethod {
    /// Rule-based grid detection over verified fragments
    Grid,
    /// Generative transcription of the rasterized region
    Generative,
}

/// A table as ordered rows of ordered cell strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGrid {
    /// Cell text, row-major
    pub rows: Vec<Vec<String>>,
    /// Number of leading header rows
    pub header_rows: u8,
    /// Method that produced the grid
    pub method: TableMethod,
    /// Whether the cell text is backed by extracted fragments
    pub verified: bool,
}

impl TableGrid {
    /// Grid from rule-based detection.
    pub fn detected(rows: Vec<Vec<String>>) -> Self {
        let header_rows = u8::from(rows.len() > 1);
        Self {
            rows,
            header_rows,
            method: TableMethod::Grid,
            verified: true,
        }
    }

    /// Grid from generative transcription. Never verified.
    pub fn generated(rows: Vec<Vec<String>>) -> Self {
        let header_rows = u8::from(rows.len() > 1);
        Self {
            rows,
            header_rows,
            method: TableMethod::Generative,
            verified: false,
        }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row's cell count.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Whether the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

/// Formula transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationMarkup {
    /// Markup source
    pub markup: String,
    /// Markup language, e.g. "latex"
    pub notation: String,
}

impl EquationMarkup {
    /// LaTeX markup.
    pub fn latex(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            notation: "latex".to_string(),
        }
    }
}

/// One bibliography entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Citation string as segmented from verified text
    pub raw: String,
    /// Field segmentation, when a classifier was available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<CitationFields>,
}

impl Citation {
    /// Unsegmented citation.
    pub fn raw(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            fields: None,
        }
    }
}

/// Structured citation fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationFields {
    /// Author names in order
    pub authors: Vec<String>,
    /// Title
    pub title: Option<String>,
    /// Publication year
    pub year: Option<String>,
    /// Journal, proceedings or publisher
    pub venue: Option<String>,
    /// DOI
    pub doi: Option<String>,
}
