//! Opaque resource handles consumed by render passes.
//!
//! Backends map these ids onto their own device objects; the render pass only
//! compares and forwards them.

use core::num::NonZeroU32;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use strata_geometry::{IRect, VertexMode};

static NEXT_BUFFER_ID: AtomicU32 = AtomicU32::new(1);

fn next_buffer_id() -> BufferId {
    loop {
        if let Some(id) = NonZeroU32::new(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed)) {
            return BufferId(id);
        }
    }
}

// ── buffers ───────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferId(NonZeroU32);

#[derive(Debug)]
enum BufferStorage {
    Device,
    Host(Box<[u8]>),
}

/// Vertex, instance or index buffer handle.
///
/// A buffer either lives in device memory (contents invisible to the pass) or
/// is host-addressable, in which case draws may read indices straight from
/// `host_data`.
#[derive(Debug)]
pub struct GpuBuffer {
    id: BufferId,
    size: usize,
    storage: BufferStorage,
}

impl GpuBuffer {
    /// Handle for a device-resident buffer of `size` bytes.
    pub fn device(size: usize) -> Arc<Self> {
        Arc::new(Self {
            id: next_buffer_id(),
            size,
            storage: BufferStorage::Device,
        })
    }

    /// Host-addressable buffer holding `data`.
    pub fn host(data: impl Into<Box<[u8]>>) -> Arc<Self> {
        let data = data.into();
        Arc::new(Self {
            id: next_buffer_id(),
            size: data.len(),
            storage: BufferStorage::Host(data),
        })
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Host bytes, or `None` for device-resident buffers.
    #[inline]
    pub fn host_data(&self) -> Option<&[u8]> {
        match &self.storage {
            BufferStorage::Host(data) => Some(data),
            BufferStorage::Device => None,
        }
    }
}

// ── textures & targets ────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureProxy {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RenderTargetId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub id: RenderTargetId,
    pub width: i32,
    pub height: i32,
    pub has_stencil: bool,
}

impl RenderTarget {
    #[inline]
    pub fn bounds(&self) -> IRect {
        IRect::from_size(self.width, self.height)
    }
}

/// Row order of a render target's pixel storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SurfaceOrigin {
    #[default]
    TopLeft,
    BottomLeft,
}

// ── load / store ──────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LoadOp {
    Load,
    /// Clear to the given premultiplied color.
    Clear([f32; 4]),
    Discard,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    Discard,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LoadAndStore {
    pub load: LoadOp,
    pub store: StoreOp,
}

impl Default for LoadAndStore {
    fn default() -> Self {
        Self { load: LoadOp::Load, store: StoreOp::Store }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StencilLoadOp {
    Load,
    Clear,
    Discard,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StencilLoadAndStore {
    pub load: StencilLoadOp,
    pub store: StoreOp,
}

impl Default for StencilLoadAndStore {
    fn default() -> Self {
        Self { load: StencilLoadOp::Load, store: StoreOp::Store }
    }
}

// ── primitives & attributes ───────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Triangles,
    TriangleStrip,
    TriangleFan,
    Points,
    Lines,
    LineStrip,
}

impl From<VertexMode> for PrimitiveType {
    fn from(mode: VertexMode) -> Self {
        match mode {
            VertexMode::Triangles => Self::Triangles,
            VertexMode::TriangleStrip => Self::TriangleStrip,
            VertexMode::TriangleFan => Self::TriangleFan,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PrimitiveRestart {
    #[default]
    No,
    Yes,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float,
    Float2,
    Float4,
    /// Four normalized bytes (packed colors).
    Unorm8x4,
    Uint16x2,
}

impl VertexFormat {
    #[inline]
    pub const fn size(self) -> u32 {
        match self {
            Self::Float | Self::Unorm8x4 | Self::Uint16x2 => 4,
            Self::Float2 => 8,
            Self::Float4 => 16,
        }
    }
}

/// One shader input fed from a buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub location: u32,
    pub format: VertexFormat,
    /// Byte offset within one element; assigned by [`AttributeSet`].
    pub offset: u32,
}

/// Tightly packed attributes sharing one buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    attributes: Vec<Attribute>,
    stride: u32,
}

impl AttributeSet {
    /// Packs `(location, format)` pairs in order; offsets follow each other.
    pub fn new(inputs: &[(u32, VertexFormat)]) -> Self {
        let mut stride = 0;
        let attributes = inputs
            .iter()
            .map(|&(location, format)| {
                let attr = Attribute { location, format, offset: stride };
                stride += format.size();
                attr
            })
            .collect();
        Self { attributes, stride }
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }
}

// ── programs ──────────────────────────────────────────────────────────────

/// Geometry-side half of a program: vertex/instance inputs and samplers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimitiveProcessor {
    pub vertex_attributes: AttributeSet,
    pub instance_attributes: AttributeSet,
    pub num_texture_samplers: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PipelineId(pub u32);

/// Fixed-function half of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Identifies the compiled program and its vertex layout on the device.
    pub id: PipelineId,
    pub scissor_test: bool,
}

/// Everything needed to realize a program on the device for a draw.
#[derive(Debug, Clone)]
pub struct ProgramInfo {
    pub pipeline: Arc<Pipeline>,
    pub processor: Arc<PrimitiveProcessor>,
    pub primitive_type: PrimitiveType,
}

// ── clip ──────────────────────────────────────────────────────────────────

/// Clip applied by clears: an optional scissor in target coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FixedClip {
    pub scissor: Option<IRect>,
}

impl FixedClip {
    #[inline]
    pub const fn disabled() -> Self {
        Self { scissor: None }
    }

    #[inline]
    pub const fn scissored(rect: IRect) -> Self {
        Self { scissor: Some(rect) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_set_packs_offsets() {
        let set = AttributeSet::new(&[
            (0, VertexFormat::Float2),
            (1, VertexFormat::Unorm8x4),
            (2, VertexFormat::Float4),
        ]);
        let offsets: Vec<u32> = set.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 12]);
        assert_eq!(set.stride(), 28);
        assert_eq!(AttributeSet::default().stride(), 0);
    }

    #[test]
    fn buffer_ids_are_unique_across_storage_kinds() {
        let a = GpuBuffer::device(16);
        let b = GpuBuffer::device(16);
        let c = GpuBuffer::host(vec![0u8; 4]);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert!(a.host_data().is_none());
        assert_eq!(c.host_data(), Some(&[0u8; 4][..]));
        assert_eq!(c.size(), 4);
    }

    #[test]
    fn primitive_type_follows_vertex_mode() {
        assert_eq!(PrimitiveType::from(VertexMode::Triangles), PrimitiveType::Triangles);
        assert_eq!(PrimitiveType::from(VertexMode::TriangleStrip), PrimitiveType::TriangleStrip);
        assert_eq!(PrimitiveType::from(VertexMode::TriangleFan), PrimitiveType::TriangleFan);
    }

    #[test]
    fn target_bounds_cover_whole_surface() {
        let t = RenderTarget { id: RenderTargetId(1), width: 64, height: 32, has_stencil: false };
        assert_eq!(t.bounds(), IRect::from_ltrb(0, 0, 64, 32));
    }
}
