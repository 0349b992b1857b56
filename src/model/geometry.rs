//! Page-space geometry.
//!
//! All coordinates use a top-left origin with y growing downward, in PDF
//! points. The extractor converts from PDF user space on the way in.

use serde::{Deserialize, Serialize};

/// Width of a US Letter page in points, used when a page declares no MediaBox.
pub const DEFAULT_PAGE_WIDTH: f32 = 612.0;

/// Height of a US Letter page in points.
pub const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Center point.
    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Length of the overlap between the vertical extents of two boxes (0 if disjoint).
    pub fn vertical_overlap(&self, other: &BBox) -> f32 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }

    /// Whether a point lies inside the box (edges inclusive).
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Finite coordinates with `x0 <= x1` and `y0 <= y1`.
    pub fn is_valid(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite())
            && self.x0 <= self.x1
            && self.y0 <= self.y1
    }

    /// Merge a sequence of boxes, `None` when empty.
    pub fn merge_all<'a, I>(boxes: I) -> Option<BBox>
    where
        I: IntoIterator<Item = &'a BBox>,
    {
        boxes.into_iter().fold(None, |acc, b| match acc {
            None => Some(*b),
            Some(a) => Some(a.union(b)),
        })
    }

    /// Coordinates as an `[x0, y0, x1, y1]` array.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

/// Dimensions of one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Page index (0-based)
    pub index: u32,
    /// Width in points
    pub width: f32,
    /// Height in points
    pub height: f32,
}

impl PageGeometry {
    /// Create page geometry.
    pub fn new(index: u32, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
        }
    }

    /// A US Letter page.
    pub fn letter(index: u32) -> Self {
        Self::new(index, DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT)
    }

    /// The full page as a box.
    pub fn bbox(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width, self.height)
    }

    /// Full-width horizontal band between two vertical positions, clamped to the page.
    pub fn band(&self, top: f32, bottom: f32) -> BBox {
        let top = top.clamp(0.0, self.height);
        let bottom = bottom.clamp(top, self.height);
        BBox::new(0.0, top, self.width, bottom)
    }
}
