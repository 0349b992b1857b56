//! Document-level metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata read from the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Creator application
    pub creator: Option<String>,

    /// PDF producer
    pub producer: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Total number of pages
    pub page_count: u32,

    /// Whether the document is encrypted
    pub encrypted: bool,
}

impl DocumentMetadata {
    /// Create new metadata with PDF version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }

    /// YAML frontmatter lines (without the `---` fences).
    pub fn yaml_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(ref title) = self.title {
            lines.push(format!("title: \"{}\"", escape_yaml(title)));
        }
        if let Some(ref author) = self.author {
            lines.push(format!("author: \"{}\"", escape_yaml(author)));
        }
        if let Some(ref created) = self.created {
            lines.push(format!("created: {}", created.to_rfc3339()));
        }
        if !self.pdf_version.is_empty() {
            lines.push(format!("pdf_version: \"{}\"", self.pdf_version));
        }
        lines.push(format!("pages: {}", self.page_count));
        lines
    }
}

/// Escape special characters for YAML double-quoted strings.
pub(crate) fn escape_yaml(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_lines() {
        let mut metadata = DocumentMetadata::with_version("1.7");
        metadata.title = Some("Attention \"Is\" All".to_string());
        metadata.page_count = 10;

        let lines = metadata.yaml_lines();
        assert!(lines.contains(&"title: \"Attention \\\"Is\\\" All\"".to_string()));
        assert!(lines.contains(&"pdf_version: \"1.7\"".to_string()));
        assert!(lines.contains(&"pages: 10".to_string()));
    }
}
