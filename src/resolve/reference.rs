//! Reference list segmentation.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{ContentResolver, ResolveRequest, ResolverFailure};
use crate::model::{Citation, ElementKind, ResolvedContent};
use crate::services::{call_with_timeout, CitationClassifier, ServiceError};

static IEEE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)(?:^|\s)(\[(\d{1,3})\])\s").unwrap());
static NUMBERED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*((\d{1,3})\.)\s").unwrap());
static BULLET_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[•\-*–·]\s+(.*)$").unwrap());

/// Split reference-section text into citation strings.
///
/// Tries `[n]` markers, then `n.` line markers (both need at least three
/// markers numbered 1, 2, 3, ...), then bullets, then a line heuristic in
/// which a citation ends at a line ending in a period.
pub fn segment_citations(text: &str) -> Vec<String> {
    let citations = split_at_markers(text, &IEEE_MARKER)
        .or_else(|| split_at_markers(text, &NUMBERED_MARKER))
        .or_else(|| split_at_bullets(text))
        .unwrap_or_else(|| split_at_periods(text));
    citations
        .into_iter()
        .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|c| !c.is_empty())
        .collect()
}

/// Split before each marker of the sequence 1, 2, 3, ... Other matches
/// (inline citations, years) are ignored.
fn split_at_markers(text: &str, marker: &Regex) -> Option<Vec<String>> {
    let mut starts = Vec::new();
    let mut expected = 1u32;
    for caps in marker.captures_iter(text) {
        let (Some(whole), Some(number)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if number.as_str().parse::<u32>().ok() == Some(expected) {
            starts.push(whole.start());
            expected += 1;
        }
    }
    if starts.len() < 3 {
        return None;
    }

    let mut citations = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        citations.push(text[start..end].to_string());
    }
    Some(citations)
}

fn split_at_bullets(text: &str) -> Option<Vec<String>> {
    let bullets = text.lines().filter(|l| BULLET_LINE.is_match(l)).count();
    if bullets < 2 {
        return None;
    }

    let mut citations: Vec<String> = Vec::new();
    for line in text.lines() {
        if let Some(caps) = BULLET_LINE.captures(line) {
            citations.push(caps[1].to_string());
        } else if let Some(last) = citations.last_mut() {
            last.push(' ');
            last.push_str(line);
        } else {
            citations.push(line.to_string());
        }
    }
    Some(citations)
}

fn split_at_periods(text: &str) -> Vec<String> {
    let mut citations: Vec<String> = Vec::new();
    let mut open = false;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match citations.last_mut() {
            Some(last) if open => {
                last.push(' ');
                last.push_str(line);
            }
            _ => citations.push(line.to_string()),
        }
        open = !line.ends_with('.');
    }
    citations
}

/// Resolves `ReferenceList` elements into citations.
pub struct ReferenceResolver {
    classifier: Option<Arc<dyn CitationClassifier>>,
    timeout: Duration,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver {
    /// Segmentation only.
    pub fn new() -> Self {
        Self {
            classifier: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Add a field classifier with a per-citation deadline.
    pub fn with_classifier(mut self, classifier: Arc<dyn CitationClassifier>, timeout: Duration) -> Self {
        self.classifier = Some(classifier);
        self.timeout = timeout;
        self
    }

    fn section_text(request: &ResolveRequest<'_>) -> String {
        let element = request.element;
        if !element.fragments.is_empty() {
            return element
                .fragments
                .iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
        }
        // A bare placeholder: read the verified text inside its region
        match request.region {
            Some(region) => request
                .fragments_in(&region.bbox)
                .iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            None => String::new(),
        }
    }

    fn classify(&self, citations: Vec<String>) -> Vec<Citation> {
        let Some(classifier) = self.classifier.as_ref() else {
            return citations.into_iter().map(Citation::raw).collect();
        };

        let mut available = true;
        citations
            .into_iter()
            .map(|raw| {
                if !available {
                    return Citation::raw(raw);
                }
                let classifier = Arc::clone(classifier);
                let input = raw.clone();
                match call_with_timeout("citation", self.timeout, move || classifier.classify(&input)) {
                    Ok(fields) => Citation {
                        raw,
                        fields: Some(fields),
                    },
                    Err(err) => {
                        warn!("citation classifier: {}", err);
                        // Stop calling a service that is gone or too slow
                        if matches!(err, ServiceError::Unavailable(_) | ServiceError::Timeout(_)) {
                            available = false;
                        }
                        Citation::raw(raw)
                    }
                }
            })
            .collect()
    }
}

impl ContentResolver for ReferenceResolver {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn handles(&self, kind: ElementKind) -> bool {
        kind == ElementKind::ReferenceList
    }

    fn resolve(&self, request: &ResolveRequest<'_>) -> Result<ResolvedContent, ResolverFailure> {
        let text = Self::section_text(request);
        let citations = segment_citations(&text);
        if citations.is_empty() {
            return Err(ResolverFailure::NoContent("no citations found".into()));
        }
        debug!("reference list {}: {} citations", request.index, citations.len());

        Ok(ResolvedContent::References {
            citations: self.classify(citations),
        })
    }
}
