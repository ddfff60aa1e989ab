//! Immediate-mode render pass backend.
//!
//! Nothing is batched: every contract call becomes device calls before it
//! returns, so call order is device order.
//!
//! The device may not accept a base vertex or base instance on draws. In that
//! case vertex and instance buffers are not programmed at `bind_buffers` time;
//! they are recorded and bound at each draw with the base folded into the
//! attribute byte offsets. A per-pipeline attribute cache keeps repeated draws
//! from re-issuing identical pointers.

mod attrib;
mod device;

use std::collections::HashMap;
use std::sync::Arc;

use strata_geometry::{IRect, Rect};

use super::{
    AttributeSet, FixedClip, GpuBuffer, PassConfig, Pipeline, PipelineId, PrimitiveProcessor,
    PrimitiveRestart, PrimitiveType, ProgramInfo, RenderPassBackend, SurfaceOrigin, TextureProxy,
    UploadTarget,
};

use attrib::AttribArrayState;

pub use device::{AttribBinding, DeviceCaps, ImmediateDevice, IndexSource};

#[derive(Debug)]
enum IndexBinding {
    None,
    Device,
    Host(Arc<GpuBuffer>),
}

/// Backend that executes each operation synchronously on an [`ImmediateDevice`].
pub struct ImmediateBackend<D: ImmediateDevice> {
    device: D,

    // Per-pipeline state.
    primitive_type: PrimitiveType,
    program: Option<ProgramInfo>,
    vertex_arrays: HashMap<PipelineId, AttribArrayState>,

    index: IndexBinding,
    deferred_vertex_buffer: Option<Arc<GpuBuffer>>,
    deferred_instance_buffer: Option<Arc<GpuBuffer>>,
}

impl<D: ImmediateDevice> ImmediateBackend<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            primitive_type: PrimitiveType::Triangles,
            program: None,
            vertex_arrays: HashMap::new(),
            index: IndexBinding::None,
            deferred_vertex_buffer: None,
            deferred_instance_buffer: None,
        }
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[inline]
    pub fn into_device(self) -> D {
        self.device
    }

    fn native_base_offsets(&self) -> bool {
        self.device.caps().base_vertex_base_instance_support
    }

    /// Points the vertex attributes at `base_vertex` within the deferred buffer.
    fn bind_vertex_buffer(&mut self, base_vertex: u32) {
        let Some(program) = &self.program else { return };
        bind_attributes(
            &mut self.device,
            &mut self.vertex_arrays,
            program,
            &program.processor.vertex_attributes,
            self.deferred_vertex_buffer.as_deref(),
            base_vertex,
            0,
        );
    }

    /// Points the instance attributes at `base_instance` within the deferred buffer.
    fn bind_instance_buffer(&mut self, base_instance: u32) {
        let Some(program) = &self.program else { return };
        bind_attributes(
            &mut self.device,
            &mut self.vertex_arrays,
            program,
            &program.processor.instance_attributes,
            self.deferred_instance_buffer.as_deref(),
            base_instance,
            1,
        );
    }

    /// Binds vertex attributes for a non-indexed draw and returns the first
    /// vertex to pass to the device.
    fn setup_array_draw(&mut self, base_vertex: u32) -> u32 {
        let caps = self.device.caps();
        let (native, broken) = (caps.base_vertex_base_instance_support, caps.draw_arrays_base_vertex_is_broken);
        if broken {
            // The quirk applies even when draws could carry a base vertex.
            self.bind_vertex_buffer(base_vertex);
            0
        } else if native {
            base_vertex
        } else {
            self.bind_vertex_buffer(0);
            base_vertex
        }
    }

    fn release_pass_state(&mut self) {
        self.program = None;
        self.index = IndexBinding::None;
        self.deferred_vertex_buffer = None;
        self.deferred_instance_buffer = None;
    }
}

fn bind_attributes<D: ImmediateDevice>(
    device: &mut D,
    vertex_arrays: &mut HashMap<PipelineId, AttribArrayState>,
    program: &ProgramInfo,
    attributes: &AttributeSet,
    buffer: Option<&GpuBuffer>,
    base: u32,
    divisor: u32,
) {
    let stride = attributes.stride();
    if stride == 0 {
        return;
    }
    let Some(buffer) = buffer else {
        debug_assert!(false, "pipeline {:?} has attributes but no buffer was bound", program.pipeline.id);
        return;
    };

    let state = vertex_arrays.entry(program.pipeline.id).or_default();
    let base_offset = u64::from(base) * u64::from(stride);
    for attr in attributes.iter() {
        state.set(
            device,
            attr.location,
            AttribBinding {
                buffer: buffer.id(),
                format: attr.format,
                stride,
                offset: base_offset + u64::from(attr.offset),
                divisor,
            },
        );
    }
}

fn index_source(binding: &IndexBinding, base_index: u32) -> IndexSource<'_> {
    let byte_offset = u64::from(base_index) * 2;
    match binding {
        IndexBinding::Host(buffer) => match buffer.host_data() {
            Some(data) => IndexSource::Host(&data[(byte_offset as usize).min(data.len())..]),
            None => IndexSource::DeviceOffset(byte_offset),
        },
        IndexBinding::Device | IndexBinding::None => IndexSource::DeviceOffset(byte_offset),
    }
}

/// Converts a target-space rect to device rows.
fn to_device_rect(config: &PassConfig, rect: IRect) -> IRect {
    match config.origin {
        SurfaceOrigin::TopLeft => rect,
        SurfaceOrigin::BottomLeft => rect.flipped_y(config.target.height),
    }
}

fn to_device_clip(config: &PassConfig, clip: &FixedClip) -> FixedClip {
    FixedClip {
        scissor: clip.scissor.map(|r| to_device_rect(config, r)),
    }
}

impl<D: ImmediateDevice> RenderPassBackend for ImmediateBackend<D> {
    fn on_begin(&mut self, config: &PassConfig) {
        // Vertex arrays may have been touched outside this pass.
        self.vertex_arrays.clear();
        self.device.begin_command_sequence(
            &config.target,
            config.content_bounds,
            config.origin,
            &config.color,
            &config.stencil,
        );
    }

    fn on_end(&mut self, config: &PassConfig) {
        self.device
            .end_command_sequence(&config.target, &config.color, &config.stencil);
        self.release_pass_state();
    }

    fn upload_target(&mut self) -> &mut dyn UploadTarget {
        &mut self.device
    }

    fn on_bind_pipeline(&mut self, config: &PassConfig, program: &ProgramInfo, _draw_bounds: Rect) -> bool {
        self.primitive_type = program.primitive_type;
        match self.device.flush_pipeline(&config.target, program) {
            Ok(()) => {
                self.program = Some(program.clone());
                true
            }
            Err(err) => {
                log::warn!("immediate pass: pipeline {:?}: {err}", program.pipeline.id);
                self.program = None;
                false
            }
        }
    }

    fn on_set_scissor(&mut self, config: &PassConfig, scissor: IRect) {
        self.device.set_scissor(to_device_rect(config, scissor));
    }

    fn on_bind_textures(
        &mut self,
        processor: &PrimitiveProcessor,
        pipeline: &Pipeline,
        textures: &[TextureProxy],
    ) -> bool {
        match self.device.bind_textures(processor, pipeline, textures) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("immediate pass: textures for pipeline {:?}: {err}", pipeline.id);
                false
            }
        }
    }

    fn on_bind_buffers(
        &mut self,
        index_buffer: Option<&Arc<GpuBuffer>>,
        instance_buffer: Option<&Arc<GpuBuffer>>,
        vertex_buffer: Option<&Arc<GpuBuffer>>,
        primitive_restart: PrimitiveRestart,
    ) {
        let Some(program) = &self.program else {
            debug_assert!(false, "bind_buffers reached the backend without a program");
            return;
        };
        let attrib_count = program.processor.vertex_attributes.len() + program.processor.instance_attributes.len();
        self.device.bind_vertex_array(
            program.pipeline.id,
            attrib_count,
            index_buffer.map(|b| &**b),
            primitive_restart,
        );

        self.index = match index_buffer {
            Some(b) if b.host_data().is_some() => IndexBinding::Host(Arc::clone(b)),
            Some(_) => IndexBinding::Device,
            None => IndexBinding::None,
        };
        self.deferred_vertex_buffer = vertex_buffer.cloned();
        self.deferred_instance_buffer = instance_buffer.cloned();

        if self.native_base_offsets() {
            // Draws carry their own base offsets; program the arrays once here.
            // Array draws on a broken driver still rebind per draw.
            if !self.device.caps().draw_arrays_base_vertex_is_broken {
                self.bind_vertex_buffer(0);
            }
            self.bind_instance_buffer(0);
        }
    }

    fn on_draw(&mut self, vertex_count: u32, base_vertex: u32) {
        let first = self.setup_array_draw(base_vertex);
        self.device.draw_arrays(self.primitive_type, first, vertex_count);
    }

    fn on_draw_indexed(
        &mut self,
        index_count: u32,
        base_index: u32,
        min_index_value: u16,
        max_index_value: u16,
        base_vertex: u32,
    ) {
        let primitive = self.primitive_type;
        if self.native_base_offsets() {
            // An array draw on a broken driver may have left the arrays offset.
            self.bind_vertex_buffer(0);
            if base_vertex != 0 {
                let indices = index_source(&self.index, base_index);
                self.device.draw_elements(primitive, index_count, indices, base_vertex);
                return;
            }
        } else {
            self.bind_vertex_buffer(base_vertex);
        }

        let indices = index_source(&self.index, base_index);
        if self.device.caps().draw_range_elements_support {
            self.device
                .draw_range_elements(primitive, min_index_value, max_index_value, index_count, indices);
        } else {
            self.device.draw_elements(primitive, index_count, indices, 0);
        }
    }

    fn on_draw_instanced(&mut self, instance_count: u32, base_instance: u32, vertex_count: u32, base_vertex: u32) {
        let first = self.setup_array_draw(base_vertex);
        let native = self.native_base_offsets();
        let chunk = self.device.caps().max_instances_per_draw(instance_count);

        let mut done = 0;
        while done < instance_count {
            let n = chunk.min(instance_count - done);
            let base = base_instance.wrapping_add(done);
            if native {
                self.device
                    .draw_arrays_instanced(self.primitive_type, first, vertex_count, n, base);
            } else {
                self.bind_instance_buffer(base);
                self.device
                    .draw_arrays_instanced(self.primitive_type, first, vertex_count, n, 0);
            }
            done += n;
        }
    }

    fn on_draw_indexed_instanced(
        &mut self,
        index_count: u32,
        base_index: u32,
        instance_count: u32,
        base_instance: u32,
        base_vertex: u32,
    ) {
        let primitive = self.primitive_type;
        let native = self.native_base_offsets();
        let chunk = self.device.caps().max_instances_per_draw(instance_count);
        self.bind_vertex_buffer(if native { 0 } else { base_vertex });

        let mut done = 0;
        while done < instance_count {
            let n = chunk.min(instance_count - done);
            let base = base_instance.wrapping_add(done);
            if native {
                let indices = index_source(&self.index, base_index);
                self.device
                    .draw_elements_instanced(primitive, index_count, indices, n, base_vertex, base);
            } else {
                self.bind_instance_buffer(base);
                let indices = index_source(&self.index, base_index);
                self.device
                    .draw_elements_instanced(primitive, index_count, indices, n, 0, 0);
            }
            done += n;
        }
    }

    fn on_clear(&mut self, config: &PassConfig, clip: &FixedClip, color: [f32; 4]) {
        self.device
            .clear(&to_device_clip(config, clip), color, &config.target);
    }

    fn on_clear_stencil_clip(&mut self, config: &PassConfig, clip: &FixedClip, inside_stencil_mask: bool) {
        self.device
            .clear_stencil_clip(&to_device_clip(config, clip), inside_stencil_mask, &config.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::{
        Call, RecordedIndices, RecordingDevice, config, instanced_program, no_bounds, program,
    };
    use crate::render::{BufferId, RenderPass, VertexFormat};

    type Pass = RenderPass<ImmediateBackend<RecordingDevice>>;

    fn begun(caps: DeviceCaps, origin: SurfaceOrigin) -> Pass {
        let mut pass = RenderPass::new(ImmediateBackend::new(RecordingDevice::with_caps(caps)));
        pass.set(config(origin));
        pass.begin();
        pass
    }

    fn device(pass: &Pass) -> &RecordingDevice {
        pass.backend().device()
    }

    fn attribs(pass: &Pass) -> Vec<(u32, AttribBinding)> {
        device(pass)
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SetAttrib { location, binding } => Some((*location, *binding)),
                _ => None,
            })
            .collect()
    }

    fn vertex_binding(buffer: BufferId, format: VertexFormat, offset: u64) -> AttribBinding {
        AttribBinding { buffer, format, stride: 12, offset, divisor: 0 }
    }

    // ── deferred vertex binding ───────────────────────────────────────────

    #[test]
    fn single_draw_binds_attributes_once() {
        let mut pass = begun(DeviceCaps::default(), SurfaceOrigin::TopLeft);
        let vb = GpuBuffer::device(36);
        assert!(pass.bind_pipeline(&program(1), no_bounds()));
        pass.bind_buffers(None, None, Some(&vb), PrimitiveRestart::No);
        // Nothing is programmed until the draw knows its base vertex.
        assert_eq!(device(&pass).attrib_calls(), 0);

        pass.draw(3, 0);
        pass.end();

        assert_eq!(
            device(&pass).draw_calls(),
            vec![&Call::DrawArrays { primitive: PrimitiveType::Triangles, first: 0, count: 3 }]
        );
        assert_eq!(
            attribs(&pass),
            vec![
                (0, vertex_binding(vb.id(), VertexFormat::Float2, 0)),
                (1, vertex_binding(vb.id(), VertexFormat::Unorm8x4, 8)),
            ]
        );
        assert!(matches!(device(&pass).calls.last(), Some(Call::End { .. })));
    }

    #[test]
    fn identical_draws_reuse_cached_attributes() {
        let mut pass = begun(DeviceCaps::default(), SurfaceOrigin::TopLeft);
        let vb = GpuBuffer::device(72);
        pass.bind_pipeline(&program(1), no_bounds());
        pass.bind_buffers(None, None, Some(&vb), PrimitiveRestart::No);
        pass.draw(3, 0);
        pass.draw(3, 0);
        // Without the broken-first-vertex quirk the base goes to the draw call.
        pass.draw(3, 3);

        assert_eq!(device(&pass).attrib_calls(), 2);
        assert_eq!(
            device(&pass).draw_calls().last(),
            Some(&&Call::DrawArrays { primitive: PrimitiveType::Triangles, first: 3, count: 3 })
        );
    }

    #[test]
    fn broken_first_vertex_rebinds_with_byte_offset() {
        let caps = DeviceCaps { draw_arrays_base_vertex_is_broken: true, ..DeviceCaps::default() };
        let mut pass = begun(caps, SurfaceOrigin::TopLeft);
        let vb = GpuBuffer::device(72);
        pass.bind_pipeline(&program(1), no_bounds());
        pass.bind_buffers(None, None, Some(&vb), PrimitiveRestart::No);
        pass.draw(3, 3);

        assert_eq!(
            attribs(&pass),
            vec![
                (0, vertex_binding(vb.id(), VertexFormat::Float2, 36)),
                (1, vertex_binding(vb.id(), VertexFormat::Unorm8x4, 44)),
            ]
        );
        assert_eq!(
            device(&pass).draw_calls(),
            vec![&Call::DrawArrays { primitive: PrimitiveType::Triangles, first: 0, count: 3 }]
        );
    }

    #[test]
    fn native_base_vertex_binds_at_bind_time() {
        let caps = DeviceCaps { base_vertex_base_instance_support: true, ..DeviceCaps::default() };
        let mut pass = begun(caps, SurfaceOrigin::TopLeft);
        let vb = GpuBuffer::device(72);
        pass.bind_pipeline(&program(1), no_bounds());
        pass.bind_buffers(None, None, Some(&vb), PrimitiveRestart::No);
        assert_eq!(device(&pass).attrib_calls(), 2);

        pass.draw(3, 3);
        assert_eq!(device(&pass).attrib_calls(), 2);
        assert_eq!(
            device(&pass).draw_calls(),
            vec![&Call::DrawArrays { primitive: PrimitiveType::Triangles, first: 3, count: 3 }]
        );
    }

    #[test]
    fn broken_first_vertex_wins_over_native_base_vertex() {
        let caps = DeviceCaps {
            base_vertex_base_instance_support: true,
            draw_arrays_base_vertex_is_broken: true,
            ..DeviceCaps::default()
        };
        let mut pass = begun(caps, SurfaceOrigin::TopLeft);
        let ib = GpuBuffer::device(12);
        let vb = GpuBuffer::device(120);
        pass.bind_pipeline(&program(1), no_bounds());
        pass.bind_buffers(Some(&ib), None, Some(&vb), PrimitiveRestart::No);
        assert_eq!(device(&pass).attrib_calls(), 0);

        pass.draw(3, 3);
        // Indexed draws still take the base vertex natively from offset zero.
        pass.draw_indexed(3, 0, 0, 2, 5);

        assert_eq!(
            attribs(&pass),
            vec![
                (0, vertex_binding(vb.id(), VertexFormat::Float2, 36)),
                (1, vertex_binding(vb.id(), VertexFormat::Unorm8x4, 44)),
                (0, vertex_binding(vb.id(), VertexFormat::Float2, 0)),
                (1, vertex_binding(vb.id(), VertexFormat::Unorm8x4, 8)),
            ]
        );
        assert_eq!(
            device(&pass).draw_calls(),
            vec![
                &Call::DrawArrays { primitive: PrimitiveType::Triangles, first: 0, count: 3 },
                &Call::DrawElements { count: 3, indices: RecordedIndices::DeviceOffset(0), base_vertex: 5 },
            ]
        );
    }

    #[test]
    fn attribute_cache_is_cleared_by_begin() {
        let mut pass = begun(DeviceCaps::default(), SurfaceOrigin::TopLeft);
        let vb = GpuBuffer::device(36);
        for _ in 0..2 {
            pass.bind_pipeline(&program(1), no_bounds());
            pass.bind_buffers(None, None, Some(&vb), PrimitiveRestart::No);
            pass.draw(3, 0);
            pass.end();
            pass.set(config(SurfaceOrigin::TopLeft));
            pass.begin();
        }
        assert_eq!(device(&pass).attrib_calls(), 4);
    }

    #[test]
    fn vertex_arrays_are_per_pipeline() {
        let mut pass = begun(DeviceCaps::default(), SurfaceOrigin::TopLeft);
        let vb = GpuBuffer::device(36);
        for id in [1, 2, 1] {
            pass.bind_pipeline(&program(id), no_bounds());
            pass.bind_buffers(None, None, Some(&vb), PrimitiveRestart::No);
            pass.draw(3, 0);
        }
        // Pipeline 1's array still holds its bindings on the second visit.
        assert_eq!(device(&pass).attrib_calls(), 4);
        let arrays: Vec<PipelineId> = device(&pass)
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::BindVertexArray { pipeline, attrib_count, .. } => {
                    assert_eq!(*attrib_count, 2);
                    Some(*pipeline)
                }
                _ => None,
            })
            .collect();
        assert_eq!(arrays, vec![PipelineId(1), PipelineId(2), PipelineId(1)]);
    }

    // ── indexed ───────────────────────────────────────────────────────────

    #[test]
    fn indexed_draw_uses_range_when_supported() {
        let caps = DeviceCaps { draw_range_elements_support: true, ..DeviceCaps::default() };
        let mut pass = begun(caps, SurfaceOrigin::TopLeft);
        let ib = GpuBuffer::device(12);
        let vb = GpuBuffer::device(120);
        pass.bind_pipeline(&program(1), no_bounds());
        pass.bind_buffers(Some(&ib), None, Some(&vb), PrimitiveRestart::No);
        pass.draw_indexed(3, 3, 0, 2, 4);

        assert_eq!(attribs(&pass)[0].1.offset, 48);
        assert_eq!(
            device(&pass).draw_calls(),
            vec![&Call::DrawRangeElements {
                min: 0,
                max: 2,
                count: 3,
                indices: RecordedIndices::DeviceOffset(6),
            }]
        );
        assert!(device(&pass).calls.iter().any(|c| matches!(
            c,
            Call::BindVertexArray { index: Some(id), .. } if *id == ib.id()
        )));
    }

    #[test]
    fn indexed_draw_reads_host_indices_from_base() {
        let mut pass = begun(DeviceCaps::default(), SurfaceOrigin::TopLeft);
        let indices: Vec<u8> = [0u16, 1, 2, 2, 1, 3].iter().flat_map(|i| i.to_le_bytes()).collect();
        let ib = GpuBuffer::host(indices);
        let vb = GpuBuffer::device(48);
        pass.bind_pipeline(&program(1), no_bounds());
        pass.bind_buffers(Some(&ib), None, Some(&vb), PrimitiveRestart::No);
        pass.draw_indexed(3, 3, 1, 3, 0);

        assert_eq!(
            device(&pass).draw_calls(),
            vec![&Call::DrawElements { count: 3, indices: RecordedIndices::Host(vec![2, 1, 3]), base_vertex: 0 }]
        );
    }

    #[test]
    fn native_indexed_draw_passes_base_vertex() {
        let caps = DeviceCaps { base_vertex_base_instance_support: true, ..DeviceCaps::default() };
        let mut pass = begun(caps, SurfaceOrigin::TopLeft);
        let ib = GpuBuffer::device(12);
        let vb = GpuBuffer::device(120);
        pass.bind_pipeline(&program(1), no_bounds());
        pass.bind_buffers(Some(&ib), None, Some(&vb), PrimitiveRestart::Yes);
        pass.draw_indexed(6, 0, 0, 3, 5);

        assert!(attribs(&pass).iter().all(|(_, b)| b.offset < 12));
        assert_eq!(
            device(&pass).draw_calls(),
            vec![&Call::DrawElements { count: 6, indices: RecordedIndices::DeviceOffset(0), base_vertex: 5 }]
        );
    }

    #[test]
    fn native_indexed_draw_without_base_vertex_uses_range() {
        let caps = DeviceCaps {
            base_vertex_base_instance_support: true,
            draw_range_elements_support: true,
            ..DeviceCaps::default()
        };
        let mut pass = begun(caps, SurfaceOrigin::TopLeft);
        let ib = GpuBuffer::device(12);
        let vb = GpuBuffer::device(120);
        pass.bind_pipeline(&program(1), no_bounds());
        pass.bind_buffers(Some(&ib), None, Some(&vb), PrimitiveRestart::No);
        pass.draw_indexed(3, 0, 0, 2, 0);
        pass.draw_indexed(3, 3, 1, 3, 5);

        assert_eq!(device(&pass).attrib_calls(), 2);
        assert_eq!(
            device(&pass).draw_calls(),
            vec![
                &Call::DrawRangeElements { min: 0, max: 2, count: 3, indices: RecordedIndices::DeviceOffset(0) },
                &Call::DrawElements { count: 3, indices: RecordedIndices::DeviceOffset(6), base_vertex: 5 },
            ]
        );
    }

    // ── instanced ─────────────────────────────────────────────────────────

    #[test]
    fn instanced_draw_is_chunked_and_advances_instance_offset() {
        let caps = DeviceCaps { max_instances_per_draw: Some(4), ..DeviceCaps::default() };
        let mut pass = begun(caps, SurfaceOrigin::TopLeft);
        let vb = GpuBuffer::device(32);
        let inst = GpuBuffer::device(16 * 20);
        pass.bind_pipeline(&instanced_program(3), no_bounds());
        pass.bind_buffers(None, Some(&inst), Some(&vb), PrimitiveRestart::No);
        pass.draw_instanced(10, 2, 4, 0);

        let instance_offsets: Vec<u64> = attribs(&pass)
            .iter()
            .filter(|(_, b)| b.divisor == 1)
            .map(|(_, b)| b.offset)
            .collect();
        assert_eq!(instance_offsets, vec![32, 96, 160]);

        let counts: Vec<u32> = device(&pass)
            .draw_calls()
            .iter()
            .map(|c| match c {
                Call::DrawArraysInstanced { instances, base_instance, .. } => {
                    assert_eq!(*base_instance, 0);
                    *instances
                }
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(counts, vec![4, 4, 2]);
    }

    #[test]
    fn native_instanced_draw_passes_base_instance() {
        let caps = DeviceCaps {
            base_vertex_base_instance_support: true,
            max_instances_per_draw: Some(3),
            ..DeviceCaps::default()
        };
        let mut pass = begun(caps, SurfaceOrigin::TopLeft);
        let ib = GpuBuffer::device(8);
        let vb = GpuBuffer::device(32);
        let inst = GpuBuffer::device(16 * 8);
        pass.bind_pipeline(&instanced_program(3), no_bounds());
        pass.bind_buffers(Some(&ib), Some(&inst), Some(&vb), PrimitiveRestart::No);
        pass.draw_indexed_instanced(4, 0, 5, 1, 2);

        assert_eq!(
            device(&pass).draw_calls(),
            vec![
                &Call::DrawElementsInstanced {
                    count: 4,
                    indices: RecordedIndices::DeviceOffset(0),
                    instances: 3,
                    base_vertex: 2,
                    base_instance: 1,
                },
                &Call::DrawElementsInstanced {
                    count: 4,
                    indices: RecordedIndices::DeviceOffset(0),
                    instances: 2,
                    base_vertex: 2,
                    base_instance: 4,
                },
            ]
        );
    }

    #[test]
    fn chunked_base_instance_wraps_instead_of_overflowing() {
        let caps = DeviceCaps {
            base_vertex_base_instance_support: true,
            max_instances_per_draw: Some(2),
            ..DeviceCaps::default()
        };
        let mut pass = begun(caps, SurfaceOrigin::TopLeft);
        let vb = GpuBuffer::device(32);
        let inst = GpuBuffer::device(16 * 4);
        pass.bind_pipeline(&instanced_program(3), no_bounds());
        pass.bind_buffers(None, Some(&inst), Some(&vb), PrimitiveRestart::No);
        pass.draw_instanced(4, u32::MAX - 1, 3, 0);

        let bases: Vec<u32> = device(&pass)
            .draw_calls()
            .iter()
            .map(|c| match c {
                Call::DrawArraysInstanced { base_instance, .. } => *base_instance,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(bases, vec![u32::MAX - 1, 0]);
    }

    // ── coordinates ───────────────────────────────────────────────────────

    #[test]
    fn bottom_left_targets_flip_scissor_and_clear() {
        let mut pass = begun(DeviceCaps::default(), SurfaceOrigin::BottomLeft);
        let mut prog = program(1);
        prog.pipeline = Arc::new(Pipeline { id: PipelineId(1), scissor_test: true });
        pass.bind_pipeline(&prog, no_bounds());
        pass.set_scissor(IRect::from_xywh(10, 0, 20, 30));
        pass.clear(&FixedClip::scissored(IRect::from_xywh(0, 90, 5, 10)), [1.0, 0.0, 0.0, 1.0]);

        let calls = &device(&pass).calls;
        assert!(calls.contains(&Call::Scissor(IRect::from_ltrb(10, 70, 30, 100))));
        assert!(calls.contains(&Call::Clear {
            clip: FixedClip::scissored(IRect::from_ltrb(0, 0, 5, 10)),
            color: [1.0, 0.0, 0.0, 1.0],
        }));
    }

    #[test]
    fn top_left_targets_pass_rects_through() {
        let mut pass = begun(DeviceCaps::default(), SurfaceOrigin::TopLeft);
        let rect = IRect::from_xywh(1, 2, 3, 4);
        pass.clear(&FixedClip::scissored(rect), [0.0; 4]);
        assert!(device(&pass).calls.contains(&Call::Clear { clip: FixedClip::scissored(rect), color: [0.0; 4] }));
    }

    #[test]
    fn end_releases_bound_buffers() {
        let mut pass = begun(DeviceCaps::default(), SurfaceOrigin::TopLeft);
        let vb = GpuBuffer::device(36);
        pass.bind_pipeline(&program(1), no_bounds());
        pass.bind_buffers(None, None, Some(&vb), PrimitiveRestart::No);
        assert_eq!(Arc::strong_count(&vb), 2);
        pass.end();
        assert_eq!(Arc::strong_count(&vb), 1);
    }

    #[test]
    fn max_instances_per_draw_defaults_to_whole_request() {
        let caps = DeviceCaps::default();
        assert_eq!(caps.max_instances_per_draw(17), 17);
        let capped = DeviceCaps { max_instances_per_draw: Some(0), ..caps };
        assert_eq!(capped.max_instances_per_draw(5), 1);
    }
}
