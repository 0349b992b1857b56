//! Structural scaffold produced by the generative model.

use serde::{Deserialize, Serialize};

/// Kind of a structural element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    /// Section heading
    Heading,
    /// Body paragraph
    Paragraph,
    /// List item
    ListItem,
    /// Figure placeholder
    Figure,
    /// Table placeholder
    Table,
    /// Display equation placeholder
    Equation,
    /// References section, synthesized after alignment
    ReferenceList,
}

impl ElementKind {
    /// Kinds whose scaffold text is aligned against fragments.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            ElementKind::Heading | ElementKind::Paragraph | ElementKind::ListItem
        )
    }

    /// Kinds that a specialized resolver turns into structured content.
    pub fn is_resolvable(self) -> bool {
        matches!(
            self,
            ElementKind::Table | ElementKind::Equation | ElementKind::ReferenceList
        )
    }

    /// Short lowercase name used in logs and markers.
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Heading => "heading",
            ElementKind::Paragraph => "paragraph",
            ElementKind::ListItem => "list-item",
            ElementKind::Figure => "figure",
            ElementKind::Table => "table",
            ElementKind::Equation => "equation",
            ElementKind::ReferenceList => "references",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inferred structural unit. Its text may be paraphrased or invented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaffoldElement {
    /// Element kind
    pub kind: ElementKind,
    /// Inferred text (may be empty for non-text kinds)
    #[serde(default)]
    pub text: String,
    /// Scaffold-local sequence index
    pub seq: usize,
    /// Heading depth reported by the scaffold (1 = top level)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
}

impl ScaffoldElement {
    /// Create a scaffold element.
    pub fn new(kind: ElementKind, text: impl Into<String>, seq: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            seq,
            level: None,
        }
    }

    /// Heading element with a depth.
    pub fn heading(text: impl Into<String>, level: u8, seq: usize) -> Self {
        Self {
            level: Some(level),
            ..Self::new(ElementKind::Heading, text, seq)
        }
    }

    /// Paragraph element.
    pub fn paragraph(text: impl Into<String>, seq: usize) -> Self {
        Self::new(ElementKind::Paragraph, text, seq)
    }

    /// Non-text placeholder.
    pub fn placeholder(kind: ElementKind, seq: usize) -> Self {
        Self::new(kind, String::new(), seq)
    }
}
