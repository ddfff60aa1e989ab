use std::sync::Arc;

use crate::coords::{PackedColor, Point, Rect};

use super::layout::{Layout, Section};
use super::{GeometryBuffer, VertexMode, next_unique_id};

bitflags::bitflags! {
    /// Optional arrays and hints requested from a [`Builder`].
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct BuilderFlags: u32 {
        const HAS_TEX_COORDS = 1 << 0;
        const HAS_COLORS = 1 << 1;
        const IS_NON_VOLATILE = 1 << 2;
    }
}

/// Mutable views over every array of a building geometry buffer.
///
/// Returned by [`Builder::arrays_mut`] so callers can fill several arrays
/// without re-borrowing the builder for each one.
pub struct BuilderArrays<'a> {
    pub positions: &'a mut [Point],
    pub tex_coords: Option<&'a mut [Point]>,
    pub colors: Option<&'a mut [PackedColor]>,
    /// For indexed fans this is the caller's fan index list, not the final list.
    pub indices: Option<&'a mut [u16]>,
}

struct Staging {
    mode: VertexMode,
    is_volatile: bool,
    layout: Layout,
    storage: Vec<u32>,
}

enum State {
    Building(Staging),
    Invalid,
    Detached,
}

/// Incremental, single-allocation construction of a [`GeometryBuffer`].
///
/// Callers write directly into the exposed arrays, then call [`detach`] once.
/// Bounds are computed at detach time from the written positions.
///
/// When the requested sizes overflow or the allocation fails, the builder is
/// invalid: [`is_valid`] is false, counts read as zero and array accessors
/// return `None`.
///
/// [`detach`]: Builder::detach
/// [`is_valid`]: Builder::is_valid
pub struct Builder {
    state: State,
}

impl Builder {
    pub fn new(mode: VertexMode, vertex_count: usize, index_count: usize, flags: BuilderFlags) -> Self {
        let Some(layout) = Layout::compute(
            mode,
            vertex_count,
            index_count,
            flags.contains(BuilderFlags::HAS_TEX_COORDS),
            flags.contains(BuilderFlags::HAS_COLORS),
        ) else {
            log::debug!(
                "geometry builder invalid: mode={mode:?} vertices={vertex_count} indices={index_count}"
            );
            return Self { state: State::Invalid };
        };

        let words = layout.building_bytes() / 4;
        let mut storage = Vec::new();
        if storage.try_reserve_exact(words).is_err() {
            log::warn!("geometry builder: failed to allocate {} bytes", words * 4);
            return Self { state: State::Invalid };
        }
        storage.resize(words, 0);

        Self {
            state: State::Building(Staging {
                mode,
                is_volatile: !flags.contains(BuilderFlags::IS_NON_VOLATILE),
                layout,
                storage,
            }),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self.state, State::Building(_))
    }

    /// Number of vertices; zero if the builder is invalid.
    pub fn vertex_count(&self) -> usize {
        self.staging().map_or(0, |s| s.layout.vertex_count)
    }

    /// Number of caller-visible indices; zero if the builder is invalid.
    ///
    /// For indexed fans this is the fan index count, which matches the length
    /// of [`indices_mut`](Self::indices_mut).
    pub fn index_count(&self) -> usize {
        self.staging().map_or(0, |s| caller_indices(&s.layout).map_or(0, |sec| sec.len / 2))
    }

    pub fn is_volatile(&self) -> bool {
        self.staging().is_some_and(|s| s.is_volatile)
    }

    /// Positions; empty if the builder is invalid.
    pub fn positions_mut(&mut self) -> &mut [Point] {
        match self.arrays_mut() {
            Some(a) => a.positions,
            None => &mut [],
        }
    }

    pub fn tex_coords_mut(&mut self) -> Option<&mut [Point]> {
        self.arrays_mut()?.tex_coords
    }

    pub fn colors_mut(&mut self) -> Option<&mut [PackedColor]> {
        self.arrays_mut()?.colors
    }

    pub fn indices_mut(&mut self) -> Option<&mut [u16]> {
        self.arrays_mut()?.indices
    }

    /// Borrows every array at once. `None` if the builder is invalid or detached.
    pub fn arrays_mut(&mut self) -> Option<BuilderArrays<'_>> {
        let State::Building(staging) = &mut self.state else {
            return None;
        };
        let layout = &staging.layout;
        let mut carver = Carver {
            rest: bytemuck::cast_slice_mut(&mut staging.storage),
            consumed: 0,
        };

        let positions = carver.carve(layout.positions);
        let tex_coords = layout.tex_coords.map(|s| carver.carve(s));
        let colors = layout.colors.map(|s| carver.carve(s));
        let final_indices = layout.indices.map(|s| carver.carve(s));
        let fan_indices = layout.fan_indices.map(|s| carver.carve(s));

        Some(BuilderArrays {
            positions: bytemuck::cast_slice_mut(positions),
            tex_coords: tex_coords.map(bytemuck::cast_slice_mut),
            colors: colors.map(bytemuck::cast_slice_mut),
            indices: fan_indices.or(final_indices).map(bytemuck::cast_slice_mut),
        })
    }

    /// Finalizes and returns the geometry buffer.
    ///
    /// Only the first call on a valid builder yields a buffer; every later call
    /// (and any call on an invalid builder) returns `None`.
    pub fn detach(&mut self) -> Option<Arc<GeometryBuffer>> {
        match core::mem::replace(&mut self.state, State::Detached) {
            State::Building(staging) => Some(Arc::new(staging.finish())),
            State::Invalid => {
                self.state = State::Invalid;
                None
            }
            State::Detached => {
                log::warn!("geometry builder detached more than once");
                None
            }
        }
    }

    fn staging(&self) -> Option<&Staging> {
        match &self.state {
            State::Building(s) => Some(s),
            _ => None,
        }
    }
}

/// Splits the storage into disjoint per-section slices, in storage order.
struct Carver<'a> {
    rest: &'a mut [u8],
    consumed: usize,
}

impl<'a> Carver<'a> {
    fn carve(&mut self, section: Section) -> &'a mut [u8] {
        let tail = core::mem::take(&mut self.rest);
        let (_, tail) = tail.split_at_mut(section.offset - self.consumed);
        let (head, tail) = tail.split_at_mut(section.len);
        self.consumed = section.end();
        self.rest = tail;
        head
    }
}

fn caller_indices(layout: &Layout) -> Option<Section> {
    layout.fan_indices.or(layout.indices)
}

impl Staging {
    fn finish(self) -> GeometryBuffer {
        let Staging {
            mut mode,
            is_volatile,
            mut layout,
            mut storage,
        } = self;

        if let (Some(fan), Some(dst)) = (layout.fan_indices.take(), layout.indices) {
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut storage);
            let (head, tail) = bytes.split_at_mut(fan.offset);
            let fan: &[u16] = bytemuck::cast_slice(&tail[..fan.len]);
            let out: &mut [u16] = bytemuck::cast_slice_mut(&mut head[dst.offset..dst.end()]);
            expand_fan(fan, out);

            mode = VertexMode::Triangles;
            storage.truncate(layout.retained_bytes() / 4);
            storage.shrink_to_fit();
        }

        let bounds = {
            let bytes: &[u8] = bytemuck::cast_slice(&storage);
            Rect::from_points(bytemuck::cast_slice(&bytes[layout.positions.offset..layout.positions.end()]))
        };

        GeometryBuffer {
            unique_id: next_unique_id(),
            mode,
            is_volatile,
            bounds,
            layout,
            storage: storage.into_boxed_slice(),
        }
    }
}

/// Rewrites fan `[i0, i1, .., in-1]` as triangles `(i0, ik, ik+1)` for `k in 1..n-1`.
fn expand_fan(fan: &[u16], out: &mut [u16]) {
    debug_assert_eq!(out.len(), (fan.len() - 2) * 3);
    let center = fan[0];
    for (tri, edge) in out.chunks_exact_mut(3).zip(fan[1..].windows(2)) {
        tri.copy_from_slice(&[center, edge[0], edge[1]]);
    }
}
