/// Integer rectangle in device pixels, stored as left/top/right/bottom.
///
/// Used for content bounds, scissors and clear regions.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct IRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IRect {
    #[inline]
    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    #[inline]
    pub const fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::from_ltrb(x, y, x + w, y + h)
    }

    #[inline]
    pub const fn from_size(w: i32, h: i32) -> Self {
        Self::from_ltrb(0, 0, w, h)
    }

    #[inline]
    pub const fn width(self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub const fn height(self) -> i32 {
        self.bottom - self.top
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Mirrors the rect vertically inside a surface of `surface_height` rows.
    ///
    /// Converts between top-left and bottom-left origin conventions.
    #[inline]
    pub const fn flipped_y(self, surface_height: i32) -> Self {
        Self::from_ltrb(
            self.left,
            surface_height - self.bottom,
            self.right,
            surface_height - self.top,
        )
    }

    pub fn intersect(self, other: IRect) -> Option<IRect> {
        let r = IRect::from_ltrb(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if r.is_empty() { None } else { Some(r) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipped_y_mirrors_rows() {
        let r = IRect::from_xywh(10, 0, 20, 5);
        assert_eq!(r.flipped_y(100), IRect::from_ltrb(10, 95, 30, 100));
        assert_eq!(r.flipped_y(100).flipped_y(100), r);
    }

    #[test]
    fn intersect_touching_edge_returns_none() {
        let a = IRect::from_size(10, 10);
        let b = IRect::from_xywh(10, 0, 10, 10);
        assert!(a.intersect(b).is_none());
        assert_eq!(a.intersect(IRect::from_xywh(5, 5, 10, 10)), Some(IRect::from_ltrb(5, 5, 10, 10)));
    }
}
