use bytemuck::{Pod, Zeroable};

use super::Point;

/// Axis-aligned rectangle (top-left origin), stored as its four edges.
///
/// Edges are kept as given so bounds computed from points reproduce the
/// extreme coordinates exactly.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::from_ltrb(x, y, x + w, y + h)
    }

    #[inline]
    pub fn from_origin_size(origin: Point, size: Point) -> Self {
        Self::new(origin.x, origin.y, size.x, size.y)
    }

    #[inline]
    pub const fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Tight bounds of `points`.
    ///
    /// An empty slice yields the zero rect. A NaN coordinate makes the matching
    /// edges NaN; infinities propagate as ordinary extremes.
    pub fn from_points(points: &[Point]) -> Self {
        let Some((first, rest)) = points.split_first() else {
            return Self::default();
        };

        let (mut l, mut t, mut r, mut b) = (first.x, first.y, first.x, first.y);
        for p in rest {
            l = nan_min(l, p.x);
            t = nan_min(t, p.y);
            r = nan_max(r, p.x);
            b = nan_max(b, p.y);
        }

        Self::from_ltrb(l, t, r, b)
    }

    #[inline]
    pub fn origin(self) -> Point {
        Point::new(self.left, self.top)
    }

    #[inline]
    pub fn width(self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(self) -> f32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        !(self.left < self.right && self.top < self.bottom)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.origin().is_finite() && self.right.is_finite() && self.bottom.is_finite()
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: Point) -> bool {
        p.x >= self.left && p.y >= self.top && p.x < self.right && p.y < self.bottom
    }
}

// `f32::min`/`max` drop a NaN operand; bounds must not.
#[inline]
fn nan_min(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() { f32::NAN } else { a.min(b) }
}

#[inline]
fn nan_max(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() { f32::NAN } else { a.max(b) }
}
