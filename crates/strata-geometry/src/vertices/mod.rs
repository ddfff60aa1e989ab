//! Immutable geometry buffers.
//!
//! A [`GeometryBuffer`] owns the vertex and index data for one draw in a single
//! allocation. Buffers are created once (via [`GeometryBuffer::make_copy`] or a
//! [`Builder`]), never mutated, and shared as `Arc<GeometryBuffer>`.

mod builder;
mod codec;
mod layout;

use core::fmt;
use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::coords::{PackedColor, Point, Rect};

pub use builder::{Builder, BuilderArrays, BuilderFlags};
pub use codec::{DecodeError, HEADER_SIZE};

use layout::{Layout, Section};

/// Primitive topology of a geometry buffer.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexMode {
    Triangles = 0,
    TriangleStrip = 1,
    TriangleFan = 2,
}

impl VertexMode {
    pub const LAST: VertexMode = VertexMode::TriangleFan;

    #[inline]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Triangles),
            1 => Some(Self::TriangleStrip),
            2 => Some(Self::TriangleFan),
            _ => None,
        }
    }
}

fn next_unique_id() -> NonZeroU32 {
    static NEXT: AtomicU32 = AtomicU32::new(1);
    loop {
        // Zero is reserved as "no id"; skip it when the counter wraps.
        if let Some(id) = NonZeroU32::new(NEXT.fetch_add(1, Ordering::Relaxed)) {
            return id;
        }
    }
}

/// Immutable vertex/index data for one draw.
///
/// Invariants:
/// - every present per-vertex array holds exactly `vertex_count` elements
/// - `indices` (when present) holds exactly `index_count` elements
/// - `bounds` is the tight union of `positions`
/// - indexed triangle fans never appear here; they are expanded to triangle
///   lists when built
pub struct GeometryBuffer {
    unique_id: NonZeroU32,
    mode: VertexMode,
    is_volatile: bool,
    bounds: Rect,
    layout: Layout,
    /// Single backing allocation. `u32` words keep every section 4-byte aligned.
    storage: Box<[u32]>,
}

impl GeometryBuffer {
    /// Creates a buffer by copying the given arrays.
    ///
    /// `tex_coords` and `colors`, when present, must be as long as `positions`.
    /// Returns `None` on a length mismatch or when the allocation cannot be made.
    pub fn make_copy(
        mode: VertexMode,
        positions: &[Point],
        tex_coords: Option<&[Point]>,
        colors: Option<&[PackedColor]>,
        is_volatile: bool,
    ) -> Option<Arc<Self>> {
        Self::make_copy_indexed(mode, positions, tex_coords, colors, &[], is_volatile)
    }

    /// Like [`make_copy`](Self::make_copy) with an index list.
    ///
    /// An empty `indices` slice produces a non-indexed buffer.
    pub fn make_copy_indexed(
        mode: VertexMode,
        positions: &[Point],
        tex_coords: Option<&[Point]>,
        colors: Option<&[PackedColor]>,
        indices: &[u16],
        is_volatile: bool,
    ) -> Option<Arc<Self>> {
        let vertex_count = positions.len();
        if tex_coords.is_some_and(|t| t.len() != vertex_count)
            || colors.is_some_and(|c| c.len() != vertex_count)
        {
            log::debug!("GeometryBuffer::make_copy: per-vertex array length mismatch");
            return None;
        }

        let mut flags = BuilderFlags::empty();
        flags.set(BuilderFlags::HAS_TEX_COORDS, tex_coords.is_some());
        flags.set(BuilderFlags::HAS_COLORS, colors.is_some());
        flags.set(BuilderFlags::IS_NON_VOLATILE, !is_volatile);

        let mut builder = Builder::new(mode, vertex_count, indices.len(), flags);
        let arrays = builder.arrays_mut()?;

        arrays.positions.copy_from_slice(positions);
        if let (Some(dst), Some(src)) = (arrays.tex_coords, tex_coords) {
            dst.copy_from_slice(src);
        }
        if let (Some(dst), Some(src)) = (arrays.colors, colors) {
            dst.copy_from_slice(src);
        }
        if let Some(dst) = arrays.indices {
            dst.copy_from_slice(indices);
        }

        builder.detach()
    }

    /// Process-wide unique, non-zero identity. Stable for the buffer's lifetime.
    #[inline]
    pub fn unique_id(&self) -> NonZeroU32 {
        self.unique_id
    }

    #[inline]
    pub fn mode(&self) -> VertexMode {
        self.mode
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    pub fn is_volatile(&self) -> bool {
        self.is_volatile
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.layout.vertex_count
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.layout.index_count
    }

    #[inline]
    pub fn has_tex_coords(&self) -> bool {
        self.layout.tex_coords.is_some()
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        self.layout.colors.is_some()
    }

    #[inline]
    pub fn has_indices(&self) -> bool {
        self.layout.indices.is_some()
    }

    pub fn positions(&self) -> &[Point] {
        self.view(self.layout.positions)
    }

    pub fn tex_coords(&self) -> Option<&[Point]> {
        self.layout.tex_coords.map(|s| self.view(s))
    }

    pub fn colors(&self) -> Option<&[PackedColor]> {
        self.layout.colors.map(|s| self.view(s))
    }

    pub fn indices(&self) -> Option<&[u16]> {
        self.layout.indices.map(|s| self.view(s))
    }

    /// Byte footprint of this object: the header plus the array allocation.
    ///
    /// Intended for memory-budget accounting.
    pub fn approximate_size(&self) -> usize {
        core::mem::size_of::<Self>() + core::mem::size_of_val(&*self.storage)
    }

    #[inline]
    fn view<T: bytemuck::Pod>(&self, section: Section) -> &[T] {
        let bytes: &[u8] = bytemuck::cast_slice(&self.storage);
        bytemuck::cast_slice(&bytes[section.offset..section.end()])
    }
}

impl fmt::Debug for GeometryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryBuffer")
            .field("unique_id", &self.unique_id)
            .field("mode", &self.mode)
            .field("vertex_count", &self.vertex_count())
            .field("index_count", &self.index_count())
            .field("has_tex_coords", &self.has_tex_coords())
            .field("has_colors", &self.has_colors())
            .field("is_volatile", &self.is_volatile)
            .field("bounds", &self.bounds)
            .finish()
    }
}
