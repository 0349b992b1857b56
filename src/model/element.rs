//! Reconciled output elements.

use serde::{Deserialize, Serialize};

use super::fragment::join_fragment_text;
use super::{BBox, ElementKind, Fragment, InferredRegion, ResolvedContent};
use crate::error::{Error, Result};

/// How an element entered the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A scaffold element supported by a fragment run
    Matched,
    /// Synthesized from fragments no scaffold element claimed
    Orphan,
}

/// Outcome of specialized resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// Structured content was produced
    Resolved {
        /// The resolver's payload
        content: ResolvedContent,
    },
    /// No content could be produced
    Unresolved {
        /// Why resolution failed or was skipped
        reason: String,
    },
}

/// The core output unit of reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledElement {
    /// Element kind
    pub kind: ElementKind,
    /// Verified text, always built from `fragments`
    pub text: Option<String>,
    /// Supporting fragments in document order
    pub fragments: Vec<Fragment>,
    /// Inferred location for non-text elements
    pub region: Option<InferredRegion>,
    /// Alignment score, 1.0 for orphan paragraphs
    pub confidence: f32,
    /// Matched or orphan
    pub origin: Origin,
    /// Sequence index of the originating scaffold element
    pub scaffold_seq: Option<usize>,
    /// Heading depth from the scaffold
    pub level: Option<u8>,
    /// Resolver outcome, attached at most once
    pub resolution: Option<Resolution>,
}

impl ReconciledElement {
    /// Text element backed by a fragment run.
    pub fn matched(
        kind: ElementKind,
        fragments: Vec<Fragment>,
        confidence: f32,
        scaffold_seq: usize,
    ) -> Self {
        Self {
            kind,
            text: Some(join_fragment_text(&fragments)),
            fragments,
            region: None,
            confidence,
            origin: Origin::Matched,
            scaffold_seq: Some(scaffold_seq),
            level: None,
            resolution: None,
        }
    }

    /// Paragraph synthesized from orphan fragments.
    pub fn orphan(fragments: Vec<Fragment>) -> Self {
        Self {
            kind: ElementKind::Paragraph,
            text: Some(join_fragment_text(&fragments)),
            fragments,
            region: None,
            confidence: 1.0,
            origin: Origin::Orphan,
            scaffold_seq: None,
            level: None,
            resolution: None,
        }
    }

    /// Non-text placeholder awaiting a region and a resolver.
    pub fn placeholder(kind: ElementKind, region: InferredRegion, scaffold_seq: usize) -> Self {
        Self {
            kind,
            text: None,
            fragments: Vec::new(),
            region: Some(region),
            confidence: 1.0,
            origin: Origin::Matched,
            scaffold_seq: Some(scaffold_seq),
            level: None,
            resolution: None,
        }
    }

    /// Append a fragment and rebuild the verified text.
    pub fn adopt(&mut self, fragment: Fragment) {
        if self.fragments.is_empty() {
            self.text = Some(fragment.text.clone());
        } else {
            let text = self.text.get_or_insert_with(String::new);
            text.push(' ');
            text.push_str(&fragment.text);
        }
        self.fragments.push(fragment);
    }

    /// Page of the first supporting fragment, or of the region.
    pub fn page(&self) -> Option<u32> {
        self.fragments
            .first()
            .map(|f| f.page)
            .or_else(|| self.region.map(|r| r.page))
    }

    /// Page of the last supporting fragment.
    pub fn last_page(&self) -> Option<u32> {
        self.fragments.last().map(|f| f.page).or_else(|| self.page())
    }

    /// Union of fragment boxes, or the inferred region.
    pub fn bbox(&self) -> Option<BBox> {
        BBox::merge_all(self.fragments.iter().map(|f| &f.bbox)).or(self.region.map(|r| r.bbox))
    }

    /// Whether `text` equals the joined text of the supporting fragments.
    pub fn is_traceable(&self) -> bool {
        match &self.text {
            Some(text) => !self.fragments.is_empty() && *text == join_fragment_text(&self.fragments),
            None => self.fragments.is_empty(),
        }
    }

    /// Resolved content, if any.
    pub fn resolved(&self) -> Option<&ResolvedContent> {
        match &self.resolution {
            Some(Resolution::Resolved { content }) => Some(content),
            _ => None,
        }
    }

    /// Attach a resolution. Fails if one is already present.
    pub fn attach(&mut self, index: usize, resolution: Resolution) -> Result<()> {
        if self.resolution.is_some() {
            return Err(Error::AlreadyResolved(index));
        }
        self.resolution = Some(resolution);
        Ok(())
    }
}
