use core::mem::size_of;

use crate::coords::{PackedColor, Point};

use super::VertexMode;

/// Byte range of one logical array inside the shared allocation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct Section {
    pub offset: usize,
    pub len: usize,
}

impl Section {
    #[inline]
    pub fn end(self) -> usize {
        self.offset + self.len
    }
}

/// Offsets of every array stored in a geometry allocation.
///
/// Arrays are packed back to back in this order:
/// positions, tex coords, colors, indices, staged fan indices.
/// Every section starts on a 4-byte boundary so the backing `u32` storage can
/// be reinterpreted as any of the element types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    pub vertex_count: usize,
    /// Final index count (after fan expansion).
    pub index_count: usize,
    pub positions: Section,
    pub tex_coords: Option<Section>,
    pub colors: Option<Section>,
    pub indices: Option<Section>,
    /// Caller-written fan indices; only present while building an indexed fan.
    pub fan_indices: Option<Section>,
}

const ALIGN: usize = 4;

#[inline]
fn align_up(n: usize) -> Option<usize> {
    n.checked_add(ALIGN - 1).map(|v| v & !(ALIGN - 1))
}

struct Cursor {
    at: usize,
}

impl Cursor {
    fn take(&mut self, count: usize, elem: usize) -> Option<Section> {
        let len = count.checked_mul(elem)?;
        let section = Section { offset: self.at, len };
        self.at = align_up(self.at.checked_add(len)?)?;
        Some(section)
    }
}

impl Layout {
    /// Computes the layout for the requested arrays.
    ///
    /// Returns `None` when the sizes overflow, a count does not fit the
    /// 32-bit wire format, or an indexed fan has fewer than three indices.
    pub fn compute(
        mode: VertexMode,
        vertex_count: usize,
        index_count: usize,
        has_tex_coords: bool,
        has_colors: bool,
    ) -> Option<Self> {
        let (final_index_count, fan_count) = if mode == VertexMode::TriangleFan && index_count > 0 {
            if index_count < 3 {
                return None;
            }
            ((index_count - 2).checked_mul(3)?, index_count)
        } else {
            (index_count, 0)
        };

        if u32::try_from(vertex_count).is_err() || u32::try_from(final_index_count).is_err() {
            return None;
        }

        let mut cursor = Cursor { at: 0 };
        let positions = cursor.take(vertex_count, size_of::<Point>())?;
        let tex_coords = if has_tex_coords {
            Some(cursor.take(vertex_count, size_of::<Point>())?)
        } else {
            None
        };
        let colors = if has_colors {
            Some(cursor.take(vertex_count, size_of::<PackedColor>())?)
        } else {
            None
        };
        let indices = match final_index_count {
            0 => None,
            n => Some(cursor.take(n, size_of::<u16>())?),
        };
        let fan_indices = match fan_count {
            0 => None,
            n => Some(cursor.take(n, size_of::<u16>())?),
        };

        Some(Self {
            vertex_count,
            index_count: final_index_count,
            positions,
            tex_coords,
            colors,
            indices,
            fan_indices,
        })
    }

    /// Bytes needed while building (includes staged fan indices).
    pub fn building_bytes(&self) -> usize {
        self.sections().map(|s| s.end()).max().map_or(0, |end| end.next_multiple_of(ALIGN))
    }

    /// Bytes retained once built (staged fan indices dropped).
    pub fn retained_bytes(&self) -> usize {
        self.sections()
            .filter(|s| Some(*s) != self.fan_indices)
            .map(|s| s.end())
            .max()
            .map_or(0, |end| end.next_multiple_of(ALIGN))
    }

    fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        core::iter::once(self.positions)
            .chain(self.tex_coords)
            .chain(self.colors)
            .chain(self.indices)
            .chain(self.fan_indices)
    }
}
