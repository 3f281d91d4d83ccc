//! Clipping of requested rectangles against image bounds.

use crate::core::types::{ClippedRegion, Rect};

/// Result of clipping a rectangle to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clip {
    /// The part of the rectangle that lies inside the image.
    Region(ClippedRegion),
    /// The rectangle does not overlap the image at all.
    Empty,
}

impl Clip {
    /// The clipped region, if any.
    pub fn region(self) -> Option<ClippedRegion> {
        match self {
            Clip::Region(region) => Some(region),
            Clip::Empty => None,
        }
    }

    /// Whether the intersection has zero area.
    pub fn is_empty(&self) -> bool {
        matches!(self, Clip::Empty)
    }
}

/// Intersect `rect` with the box `[0, width) x [0, height)`.
///
/// Arithmetic is done in `i64` so extreme `i32` coordinates cannot overflow.
pub fn clip(rect: Rect, width: u32, height: u32) -> Clip {
    if rect.width <= 0 || rect.height <= 0 {
        return Clip::Empty;
    }

    let left = (rect.x as i64).max(0);
    let top = (rect.y as i64).max(0);
    let right = (rect.x as i64 + rect.width as i64).min(width as i64);
    let bottom = (rect.y as i64 + rect.height as i64).min(height as i64);

    if right <= left || bottom <= top {
        return Clip::Empty;
    }

    // All four values are now within [0, max(width, height)], so they fit u32.
    Clip::Region(ClippedRegion {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}
