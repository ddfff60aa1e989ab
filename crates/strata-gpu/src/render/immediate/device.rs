use strata_geometry::IRect;

use crate::render::{
    BufferId, DeviceError, FixedClip, GpuBuffer, LoadAndStore, Pipeline, PipelineId,
    PrimitiveProcessor, PrimitiveRestart, PrimitiveType, ProgramInfo, RenderTarget,
    StencilLoadAndStore, SurfaceOrigin, TextureProxy, UploadTarget, VertexFormat,
};

/// What an immediate-mode device can express natively.
///
/// The default describes the conservative device: no base vertex or base
/// instance on draws, so the backend emulates them by offsetting attribute
/// pointers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceCaps {
    /// Draw calls accept non-zero base vertex / base instance.
    pub base_vertex_base_instance_support: bool,
    /// `draw_arrays` with a non-zero first vertex misbehaves; rebind instead.
    pub draw_arrays_base_vertex_is_broken: bool,
    /// `draw_range_elements` is available.
    pub draw_range_elements_support: bool,
    /// Upper bound on instances per draw call, if the driver needs one.
    pub max_instances_per_draw: Option<u32>,
}

impl DeviceCaps {
    /// Instances to issue per draw call for a request of `instance_count`.
    #[inline]
    pub fn max_instances_per_draw(&self, instance_count: u32) -> u32 {
        self.max_instances_per_draw.map_or(instance_count, |max| max.clamp(1, instance_count.max(1)))
    }
}

/// Device-side description of one vertex attribute array.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttribBinding {
    pub buffer: BufferId,
    pub format: VertexFormat,
    pub stride: u32,
    /// Byte offset of the first element, including any emulated base offset.
    pub offset: u64,
    /// 0 = per vertex, 1 = per instance.
    pub divisor: u32,
}

/// Where an indexed draw reads its indices from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IndexSource<'a> {
    /// Host bytes, already advanced to the first index.
    Host(&'a [u8]),
    /// Byte offset into the bound device index buffer.
    DeviceOffset(u64),
}

/// Synchronous, GL-style device driven by [`ImmediateBackend`].
///
/// Every call takes effect in call order. Vertex array objects are addressed
/// by pipeline id; attribute state set through `set_vertex_attrib` belongs to
/// the vertex array bound last.
///
/// [`ImmediateBackend`]: super::ImmediateBackend
pub trait ImmediateDevice: UploadTarget {
    fn caps(&self) -> &DeviceCaps;

    fn begin_command_sequence(
        &mut self,
        target: &RenderTarget,
        bounds: IRect,
        origin: SurfaceOrigin,
        color: &LoadAndStore,
        stencil: &StencilLoadAndStore,
    );

    fn end_command_sequence(&mut self, target: &RenderTarget, color: &LoadAndStore, stencil: &StencilLoadAndStore);

    /// Makes `program` current, compiling it on first use.
    fn flush_pipeline(&mut self, target: &RenderTarget, program: &ProgramInfo) -> Result<(), DeviceError>;

    /// Scissor in device rows (already flipped for bottom-left targets).
    fn set_scissor(&mut self, rect: IRect);

    fn bind_textures(
        &mut self,
        processor: &PrimitiveProcessor,
        pipeline: &Pipeline,
        textures: &[TextureProxy],
    ) -> Result<(), DeviceError>;

    /// Binds the vertex array of `pipeline` with `attrib_count` enabled
    /// arrays, plus its index buffer.
    fn bind_vertex_array(
        &mut self,
        pipeline: PipelineId,
        attrib_count: usize,
        index_buffer: Option<&GpuBuffer>,
        primitive_restart: PrimitiveRestart,
    );

    fn set_vertex_attrib(&mut self, location: u32, binding: &AttribBinding);

    fn draw_arrays(&mut self, primitive: PrimitiveType, first_vertex: u32, vertex_count: u32);

    fn draw_arrays_instanced(
        &mut self,
        primitive: PrimitiveType,
        first_vertex: u32,
        vertex_count: u32,
        instance_count: u32,
        base_instance: u32,
    );

    fn draw_elements(&mut self, primitive: PrimitiveType, index_count: u32, indices: IndexSource<'_>, base_vertex: u32);

    fn draw_range_elements(
        &mut self,
        primitive: PrimitiveType,
        min_index_value: u16,
        max_index_value: u16,
        index_count: u32,
        indices: IndexSource<'_>,
    );

    fn draw_elements_instanced(
        &mut self,
        primitive: PrimitiveType,
        index_count: u32,
        indices: IndexSource<'_>,
        instance_count: u32,
        base_vertex: u32,
        base_instance: u32,
    );

    /// `clip` is in device rows.
    fn clear(&mut self, clip: &FixedClip, color: [f32; 4], target: &RenderTarget);

    /// `clip` is in device rows.
    fn clear_stencil_clip(&mut self, clip: &FixedClip, inside_stencil_mask: bool, target: &RenderTarget);
}
