//! Structural checks on reconciliation input.

use super::ReconcileInput;
use crate::error::{Error, Result};
use crate::model::BBox;

fn malformed(message: String) -> Error {
    Error::MalformedInput(message)
}

fn check_bbox(bbox: &BBox, what: impl FnOnce() -> String) -> Result<()> {
    if bbox.is_valid() {
        Ok(())
    } else {
        Err(malformed(format!("{} has an invalid bounding box {:?}", what(), bbox.to_array())))
    }
}

/// Reject input that violates the model's structural guarantees.
pub fn validate_input(input: &ReconcileInput<'_>) -> Result<()> {
    let page_count = input.pages.len() as u32;

    for (i, page) in input.pages.iter().enumerate() {
        if page.index != i as u32 {
            return Err(malformed(format!(
                "page geometry {} is listed at position {}",
                page.index, i
            )));
        }
        if !(page.width.is_finite() && page.height.is_finite() && page.width > 0.0 && page.height > 0.0)
        {
            return Err(malformed(format!("page {} has non-positive size", page.index)));
        }
    }

    let mut prev_seq: Option<usize> = None;
    for fragment in input.fragments {
        if fragment.page >= page_count {
            return Err(malformed(format!(
                "fragment {} is on page {} but the document has {} pages",
                fragment.seq, fragment.page, page_count
            )));
        }
        check_bbox(&fragment.bbox, || format!("fragment {}", fragment.seq))?;
        if fragment.text.trim().is_empty() {
            return Err(malformed(format!("fragment {} has empty text", fragment.seq)));
        }
        if let Some(prev) = prev_seq {
            if fragment.seq <= prev {
                return Err(malformed(format!(
                    "fragment sequence is not increasing ({} after {})",
                    fragment.seq, prev
                )));
            }
        }
        prev_seq = Some(fragment.seq);
    }

    let mut prev_seq: Option<usize> = None;
    for element in input.scaffold {
        if let Some(prev) = prev_seq {
            if element.seq <= prev {
                return Err(malformed(format!(
                    "scaffold sequence is not increasing ({} after {})",
                    element.seq, prev
                )));
            }
        }
        prev_seq = Some(element.seq);
    }

    for region in input.regions {
        if region.page >= page_count {
            return Err(malformed(format!(
                "{:?} region is on page {} but the document has {} pages",
                region.label, region.page, page_count
            )));
        }
        check_bbox(&region.bbox, || format!("{:?} region on page {}", region.label, region.page))?;
        if !(0.0..=1.0).contains(&region.confidence) {
            return Err(malformed(format!(
                "{:?} region confidence {} is outside [0, 1]",
                region.label, region.confidence
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Fragment, PageGeometry, Region, RegionLabel, ScaffoldElement,
    };

    fn pages() -> Vec<PageGeometry> {
        vec![PageGeometry::letter(0), PageGeometry::letter(1)]
    }

    fn frag(page: u32, text: &str, seq: usize) -> Fragment {
        Fragment::new(page, BBox::new(72.0, 100.0, 300.0, 112.0), text, seq)
    }

    fn check(fragments: &[Fragment], scaffold: &[ScaffoldElement], regions: &[Region]) -> Result<()> {
        let pages = pages();
        validate_input(&ReconcileInput {
            pages: &pages,
            fragments,
            scaffold,
            regions,
        })
    }

    #[test]
    fn test_valid_input() {
        let fragments = vec![frag(0, "a", 0), frag(1, "b", 3)];
        let scaffold = vec![ScaffoldElement::paragraph("a", 0), ScaffoldElement::paragraph("b", 2)];
        assert!(check(&fragments, &scaffold, &[]).is_ok());
    }

    #[test]
    fn test_fragment_errors() {
        assert!(check(&[frag(2, "a", 0)], &[], &[]).is_err());
        assert!(check(&[frag(0, "  ", 0)], &[], &[]).is_err());
        assert!(check(&[frag(0, "a", 1), frag(0, "b", 1)], &[], &[]).is_err());

        let mut inverted = frag(0, "a", 0);
        inverted.bbox = BBox::new(10.0, 20.0, 5.0, 30.0);
        assert!(matches!(check(&[inverted], &[], &[]), Err(Error::MalformedInput(_))));

        let mut nan = frag(0, "a", 0);
        nan.bbox.x0 = f32::NAN;
        assert!(check(&[nan], &[], &[]).is_err());
    }

    #[test]
    fn test_scaffold_order() {
        let scaffold = vec![ScaffoldElement::paragraph("a", 3), ScaffoldElement::paragraph("b", 1)];
        assert!(check(&[], &scaffold, &[]).is_err());
    }

    #[test]
    fn test_region_errors() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(check(&[], &[], &[Region::new(5, bbox, RegionLabel::Table, 0.9)]).is_err());
        assert!(check(&[], &[], &[Region::new(0, bbox, RegionLabel::Table, 1.2)]).is_err());
        assert!(check(&[], &[], &[Region::new(0, bbox, RegionLabel::Table, 1.0)]).is_ok());
    }
}
