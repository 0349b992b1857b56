//! Merging of reference sections into reference lists.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{ElementKind, Origin, ReconciledElement, Region, RegionLabel};

static REFERENCE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:\d+(?:\.\d+)*|[ivxlc]+|[a-z])[.)]?\s+)?(?:references|bibliography|works\s+cited|literature\s+cited)\s*:?\s*$",
    )
    .unwrap()
});

/// Whether a heading opens a reference section.
pub fn is_reference_heading(text: &str) -> bool {
    REFERENCE_HEADING.is_match(text)
}

/// Whether every fragment of the element lies inside a confident
/// `References` region.
fn inside_reference_region(element: &ReconciledElement, regions: &[&Region]) -> bool {
    !element.fragments.is_empty()
        && element.fragments.iter().all(|fragment| {
            let (x, y) = fragment.bbox.center();
            regions
                .iter()
                .any(|r| r.page == fragment.page && r.bbox.contains_point(x, y))
        })
}

fn absorb(list: &mut ReconciledElement, element: ReconciledElement) {
    list.confidence = list.confidence.min(element.confidence);
    if element.origin == Origin::Matched {
        list.origin = Origin::Matched;
    }
    if list.scaffold_seq.is_none() {
        list.scaffold_seq = element.scaffold_seq;
    }
    for fragment in element.fragments {
        list.adopt(fragment);
    }
}

/// Merge reference sections into `ReferenceList` elements.
///
/// A section opens at a reference heading and runs over the following
/// paragraphs and list items until the next heading or non-text element.
/// Text elements inside a detected `References` region are merged the same
/// way. Returns the new sequence and the number of lists created.
pub(super) fn merge_reference_sections(
    elements: Vec<ReconciledElement>,
    detected: &[Region],
    min_confidence: f32,
) -> (Vec<ReconciledElement>, usize) {
    let regions: Vec<&Region> = detected
        .iter()
        .filter(|r| r.label == RegionLabel::References && r.confidence >= min_confidence)
        .collect();

    let mut merged: Vec<ReconciledElement> = Vec::with_capacity(elements.len());
    let mut in_section = false;
    let mut blocks = 0;

    for element in elements {
        match element.kind {
            ElementKind::Heading => {
                in_section = element.text.as_deref().map_or(false, is_reference_heading);
                merged.push(element);
            }
            ElementKind::Paragraph | ElementKind::ListItem => {
                if !(in_section || inside_reference_region(&element, &regions)) {
                    merged.push(element);
                    continue;
                }
                match merged.last_mut() {
                    Some(list) if list.kind == ElementKind::ReferenceList && list.text.is_some() => {
                        absorb(list, element);
                    }
                    _ => {
                        let mut list = element;
                        list.kind = ElementKind::ReferenceList;
                        list.level = None;
                        merged.push(list);
                        blocks += 1;
                    }
                }
            }
            _ => {
                in_section = false;
                merged.push(element);
            }
        }
    }

    (merged, blocks)
}
