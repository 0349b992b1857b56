//! Region inference for non-text placeholders.
//!
//! A placeholder sits between two matched text runs. Its region is the
//! full-width band from the bottom of the previous run to the top of the
//! next one, refined by a detector region when one corroborates it.

use log::debug;

use crate::model::{
    InferredRegion, Origin, PageGeometry, ReconciledElement, Region, RegionLabel, RegionSource,
};

/// A vertical position on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    page: u32,
    y: f32,
}

fn is_anchor(element: &ReconciledElement) -> bool {
    element.origin == Origin::Matched && element.kind.is_text() && !element.fragments.is_empty()
}

/// Bottom edge of the element on its last page.
fn bottom_of(element: &ReconciledElement) -> Option<Anchor> {
    let page = element.fragments.last()?.page;
    let y = element
        .fragments
        .iter()
        .filter(|f| f.page == page)
        .map(|f| f.bbox.y1)
        .fold(f32::NEG_INFINITY, f32::max);
    Some(Anchor { page, y })
}

/// Top edge of the element on its first page.
fn top_of(element: &ReconciledElement) -> Option<Anchor> {
    let page = element.fragments.first()?.page;
    let y = element
        .fragments
        .iter()
        .filter(|f| f.page == page)
        .map(|f| f.bbox.y0)
        .fold(f32::INFINITY, f32::min);
    Some(Anchor { page, y })
}

fn page_geometry(pages: &[PageGeometry], page: u32) -> PageGeometry {
    pages
        .get(page as usize)
        .copied()
        .unwrap_or_else(|| PageGeometry::letter(page))
}

/// Span between two anchors.
fn interpolate(pages: &[PageGeometry], prev: Option<Anchor>, next: Option<Anchor>) -> InferredRegion {
    match (prev, next) {
        (Some(prev), Some(next)) if prev.page == next.page && next.y > prev.y => {
            let page = page_geometry(pages, prev.page);
            InferredRegion::new(prev.page, page.band(prev.y, next.y), RegionSource::Interpolated)
        }
        (Some(prev), _) => {
            let page = page_geometry(pages, prev.page);
            InferredRegion::new(
                prev.page,
                page.band(prev.y, page.height),
                RegionSource::Interpolated,
            )
        }
        (None, Some(next)) => {
            let page = page_geometry(pages, next.page);
            InferredRegion::new(next.page, page.band(0.0, next.y), RegionSource::Interpolated)
        }
        (None, None) => {
            let page = page_geometry(pages, 0);
            InferredRegion::new(0, page.bbox(), RegionSource::PageFallback)
        }
    }
}

/// Assign a region to every placeholder in `elements`.
///
/// Detector regions must carry the placeholder's label, sit on the same
/// page, reach `min_confidence` and overlap the interpolated band
/// vertically. The largest overlap wins, and a detector region is claimed by
/// at most one placeholder.
pub(super) fn infer_regions(
    elements: &mut [ReconciledElement],
    pages: &[PageGeometry],
    detected: &[Region],
    min_confidence: f32,
) {
    let n = elements.len();

    let mut prev = vec![None; n];
    let mut last = None;
    for (i, element) in elements.iter().enumerate() {
        prev[i] = last;
        if is_anchor(element) {
            last = bottom_of(element);
        }
    }

    let mut next = vec![None; n];
    let mut upcoming = None;
    for (i, element) in elements.iter().enumerate().rev() {
        next[i] = upcoming;
        if is_anchor(element) {
            upcoming = top_of(element);
        }
    }

    let mut claimed = vec![false; detected.len()];
    for (i, element) in elements.iter_mut().enumerate() {
        if element.kind.is_text() || element.text.is_some() {
            continue;
        }

        let mut region = interpolate(pages, prev[i], next[i]);
        if let Some(label) = RegionLabel::for_kind(element.kind) {
            if let Some(found) = corroborate(&region, label, detected, &claimed, min_confidence) {
                claimed[found] = true;
                region = InferredRegion::new(detected[found].page, detected[found].bbox, RegionSource::Detected);
            }
        }

        debug!(
            "{} placeholder {:?} on page {} at {:?} ({:?})",
            element.kind,
            element.scaffold_seq,
            region.page,
            region.bbox.to_array(),
            region.source
        );
        element.region = Some(region);
    }
}

fn corroborate(
    inferred: &InferredRegion,
    label: RegionLabel,
    detected: &[Region],
    claimed: &[bool],
    min_confidence: f32,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, region) in detected.iter().enumerate() {
        if claimed[i]
            || region.label != label
            || region.page != inferred.page
            || region.confidence < min_confidence
        {
            continue;
        }
        let overlap = region.bbox.vertical_overlap(&inferred.bbox);
        if overlap <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, b)| overlap > b) {
            best = Some((i, overlap));
        }
    }
    best.map(|(i, _)| i)
}
