//! Fake immediate device that records every call.

use std::collections::HashSet;
use std::sync::Arc;

use strata_geometry::{IRect, Rect};

use super::immediate::{AttribBinding, DeviceCaps, ImmediateDevice, IndexSource};
use super::{
    AttributeSet, BufferId, DeviceError, FixedClip, GpuBuffer, LoadAndStore, PassConfig, Pipeline,
    PipelineId, PrimitiveProcessor, PrimitiveRestart, PrimitiveType, ProgramInfo, RenderTarget,
    RenderTargetId, StencilLoadAndStore, SurfaceOrigin, TextureId, TextureProxy, UploadTarget,
    VertexFormat,
};

/// Index source captured by value so calls can be compared after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedIndices {
    Host(Vec<u16>),
    DeviceOffset(u64),
}

impl From<IndexSource<'_>> for RecordedIndices {
    fn from(src: IndexSource<'_>) -> Self {
        match src {
            IndexSource::Host(bytes) => Self::Host(
                bytes.chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]])).collect(),
            ),
            IndexSource::DeviceOffset(off) => Self::DeviceOffset(off),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Begin { target: RenderTargetId, bounds: IRect, origin: SurfaceOrigin },
    End { target: RenderTargetId },
    FlushPipeline(PipelineId),
    Scissor(IRect),
    BindTextures(Vec<TextureId>),
    BindVertexArray { pipeline: PipelineId, attrib_count: usize, index: Option<BufferId>, restart: PrimitiveRestart },
    SetAttrib { location: u32, binding: AttribBinding },
    DrawArrays { primitive: PrimitiveType, first: u32, count: u32 },
    DrawArraysInstanced { first: u32, count: u32, instances: u32, base_instance: u32 },
    DrawElements { count: u32, indices: RecordedIndices, base_vertex: u32 },
    DrawRangeElements { min: u16, max: u16, count: u32, indices: RecordedIndices },
    DrawElementsInstanced { count: u32, indices: RecordedIndices, instances: u32, base_vertex: u32, base_instance: u32 },
    Clear { clip: FixedClip, color: [f32; 4] },
    ClearStencil { clip: FixedClip, inside: bool },
    WriteBuffer { buffer: BufferId, offset: usize, len: usize },
    WriteTexture { texture: TextureId, region: IRect },
}

#[derive(Default)]
pub struct RecordingDevice {
    pub caps: DeviceCaps,
    pub calls: Vec<Call>,
    pub failing_pipelines: HashSet<PipelineId>,
    pub fail_textures: bool,
}

impl RecordingDevice {
    pub fn with_caps(caps: DeviceCaps) -> Self {
        Self { caps, ..Self::default() }
    }

    pub fn attrib_calls(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::SetAttrib { .. })).count()
    }

    pub fn draw_calls(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::DrawArrays { .. }
                        | Call::DrawArraysInstanced { .. }
                        | Call::DrawElements { .. }
                        | Call::DrawRangeElements { .. }
                        | Call::DrawElementsInstanced { .. }
                )
            })
            .collect()
    }
}

impl UploadTarget for RecordingDevice {
    fn write_buffer(&mut self, buffer: &GpuBuffer, offset: usize, data: &[u8]) -> Result<(), DeviceError> {
        if offset + data.len() > buffer.size() {
            return Err(DeviceError::InvalidResource);
        }
        self.calls.push(Call::WriteBuffer { buffer: buffer.id(), offset, len: data.len() });
        Ok(())
    }

    fn write_texture(&mut self, texture: &TextureProxy, region: IRect, _data: &[u8]) -> Result<(), DeviceError> {
        self.calls.push(Call::WriteTexture { texture: texture.id, region });
        Ok(())
    }
}

impl ImmediateDevice for RecordingDevice {
    fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    fn begin_command_sequence(
        &mut self,
        target: &RenderTarget,
        bounds: IRect,
        origin: SurfaceOrigin,
        _color: &LoadAndStore,
        _stencil: &StencilLoadAndStore,
    ) {
        self.calls.push(Call::Begin { target: target.id, bounds, origin });
    }

    fn end_command_sequence(&mut self, target: &RenderTarget, _color: &LoadAndStore, _stencil: &StencilLoadAndStore) {
        self.calls.push(Call::End { target: target.id });
    }

    fn flush_pipeline(&mut self, _target: &RenderTarget, program: &ProgramInfo) -> Result<(), DeviceError> {
        let id = program.pipeline.id;
        if self.failing_pipelines.contains(&id) {
            return Err(DeviceError::PipelineCreation(format!("shader {} failed to compile", id.0)));
        }
        self.calls.push(Call::FlushPipeline(id));
        Ok(())
    }

    fn set_scissor(&mut self, rect: IRect) {
        self.calls.push(Call::Scissor(rect));
    }

    fn bind_textures(
        &mut self,
        _processor: &PrimitiveProcessor,
        _pipeline: &Pipeline,
        textures: &[TextureProxy],
    ) -> Result<(), DeviceError> {
        if self.fail_textures {
            return Err(DeviceError::OutOfMemory);
        }
        self.calls.push(Call::BindTextures(textures.iter().map(|t| t.id).collect()));
        Ok(())
    }

    fn bind_vertex_array(
        &mut self,
        pipeline: PipelineId,
        attrib_count: usize,
        index_buffer: Option<&GpuBuffer>,
        primitive_restart: PrimitiveRestart,
    ) {
        self.calls.push(Call::BindVertexArray {
            pipeline,
            attrib_count,
            index: index_buffer.map(GpuBuffer::id),
            restart: primitive_restart,
        });
    }

    fn set_vertex_attrib(&mut self, location: u32, binding: &AttribBinding) {
        self.calls.push(Call::SetAttrib { location, binding: *binding });
    }

    fn draw_arrays(&mut self, primitive: PrimitiveType, first_vertex: u32, vertex_count: u32) {
        self.calls.push(Call::DrawArrays { primitive, first: first_vertex, count: vertex_count });
    }

    fn draw_arrays_instanced(
        &mut self,
        _primitive: PrimitiveType,
        first_vertex: u32,
        vertex_count: u32,
        instance_count: u32,
        base_instance: u32,
    ) {
        self.calls.push(Call::DrawArraysInstanced {
            first: first_vertex,
            count: vertex_count,
            instances: instance_count,
            base_instance,
        });
    }

    fn draw_elements(&mut self, _primitive: PrimitiveType, index_count: u32, indices: IndexSource<'_>, base_vertex: u32) {
        self.calls.push(Call::DrawElements { count: index_count, indices: indices.into(), base_vertex });
    }

    fn draw_range_elements(
        &mut self,
        _primitive: PrimitiveType,
        min_index_value: u16,
        max_index_value: u16,
        index_count: u32,
        indices: IndexSource<'_>,
    ) {
        self.calls.push(Call::DrawRangeElements {
            min: min_index_value,
            max: max_index_value,
            count: index_count,
            indices: indices.into(),
        });
    }

    fn draw_elements_instanced(
        &mut self,
        _primitive: PrimitiveType,
        index_count: u32,
        indices: IndexSource<'_>,
        instance_count: u32,
        base_vertex: u32,
        base_instance: u32,
    ) {
        self.calls.push(Call::DrawElementsInstanced {
            count: index_count,
            indices: indices.into(),
            instances: instance_count,
            base_vertex,
            base_instance,
        });
    }

    fn clear(&mut self, clip: &FixedClip, color: [f32; 4], _target: &RenderTarget) {
        self.calls.push(Call::Clear { clip: *clip, color });
    }

    fn clear_stencil_clip(&mut self, clip: &FixedClip, inside_stencil_mask: bool, _target: &RenderTarget) {
        self.calls.push(Call::ClearStencil { clip: *clip, inside: inside_stencil_mask });
    }
}

// ── fixtures ──────────────────────────────────────────────────────────────

pub fn target() -> RenderTarget {
    RenderTarget { id: RenderTargetId(7), width: 200, height: 100, has_stencil: true }
}

pub fn config(origin: SurfaceOrigin) -> PassConfig {
    PassConfig {
        target: target(),
        content_bounds: IRect::from_size(200, 100),
        origin,
        color: LoadAndStore::default(),
        stencil: StencilLoadAndStore::default(),
    }
}

/// Position (float2) + color (unorm8x4) per vertex, stride 12.
pub fn program(id: u32) -> ProgramInfo {
    ProgramInfo {
        pipeline: Arc::new(Pipeline { id: PipelineId(id), scissor_test: false }),
        processor: Arc::new(PrimitiveProcessor {
            vertex_attributes: AttributeSet::new(&[(0, VertexFormat::Float2), (1, VertexFormat::Unorm8x4)]),
            instance_attributes: AttributeSet::default(),
            num_texture_samplers: 0,
        }),
        primitive_type: PrimitiveType::Triangles,
    }
}

/// Per-vertex position plus a per-instance float4 transform row, stride 16.
pub fn instanced_program(id: u32) -> ProgramInfo {
    ProgramInfo {
        pipeline: Arc::new(Pipeline { id: PipelineId(id), scissor_test: false }),
        processor: Arc::new(PrimitiveProcessor {
            vertex_attributes: AttributeSet::new(&[(0, VertexFormat::Float2)]),
            instance_attributes: AttributeSet::new(&[(1, VertexFormat::Float4)]),
            num_texture_samplers: 0,
        }),
        primitive_type: PrimitiveType::TriangleStrip,
    }
}

pub fn no_bounds() -> Rect {
    Rect::default()
}
