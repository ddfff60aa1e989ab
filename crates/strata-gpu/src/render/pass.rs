use std::sync::Arc;

use strata_geometry::{IRect, Rect};

use super::{
    FixedClip, GpuBuffer, LoadAndStore, Pipeline, PrimitiveProcessor, PrimitiveRestart,
    ProgramInfo, RenderTarget, StencilLoadAndStore, SurfaceOrigin, TextureProxy, UploadTarget,
};

/// Attachment binding for one pass: fixed from `begin` to `end`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassConfig {
    pub target: RenderTarget,
    /// Region of the target the pass is expected to touch.
    pub content_bounds: IRect,
    pub origin: SurfaceOrigin,
    pub color: LoadAndStore,
    pub stencil: StencilLoadAndStore,
}

/// Device-specific half of a render pass.
///
/// [`RenderPass`] validates call order and tracks draw state, then forwards
/// each operation here. Implementations may assume the calls they receive are
/// legal: a pipeline is bound before buffers, buffers before draws, and nothing
/// arrives outside `on_begin`/`on_end`.
pub trait RenderPassBackend {
    fn on_begin(&mut self, config: &PassConfig);

    fn on_end(&mut self, config: &PassConfig);

    fn upload_target(&mut self) -> &mut dyn UploadTarget;

    /// Returns false if the program cannot be realized on the device.
    fn on_bind_pipeline(&mut self, config: &PassConfig, program: &ProgramInfo, draw_bounds: Rect) -> bool;

    fn on_set_scissor(&mut self, config: &PassConfig, scissor: IRect);

    fn on_bind_textures(
        &mut self,
        processor: &PrimitiveProcessor,
        pipeline: &Pipeline,
        textures: &[TextureProxy],
    ) -> bool;

    fn on_bind_buffers(
        &mut self,
        index_buffer: Option<&Arc<GpuBuffer>>,
        instance_buffer: Option<&Arc<GpuBuffer>>,
        vertex_buffer: Option<&Arc<GpuBuffer>>,
        primitive_restart: PrimitiveRestart,
    );

    fn on_draw(&mut self, vertex_count: u32, base_vertex: u32);

    fn on_draw_indexed(
        &mut self,
        index_count: u32,
        base_index: u32,
        min_index_value: u16,
        max_index_value: u16,
        base_vertex: u32,
    );

    fn on_draw_instanced(&mut self, instance_count: u32, base_instance: u32, vertex_count: u32, base_vertex: u32);

    fn on_draw_indexed_instanced(
        &mut self,
        index_count: u32,
        base_index: u32,
        instance_count: u32,
        base_instance: u32,
        base_vertex: u32,
    );

    fn on_clear(&mut self, config: &PassConfig, clip: &FixedClip, color: [f32; 4]);

    fn on_clear_stencil_clip(&mut self, config: &PassConfig, clip: &FixedClip, inside_stencil_mask: bool);
}

impl RenderPassBackend for Box<dyn RenderPassBackend> {
    fn on_begin(&mut self, config: &PassConfig) {
        (**self).on_begin(config)
    }

    fn on_end(&mut self, config: &PassConfig) {
        (**self).on_end(config)
    }

    fn upload_target(&mut self) -> &mut dyn UploadTarget {
        (**self).upload_target()
    }

    fn on_bind_pipeline(&mut self, config: &PassConfig, program: &ProgramInfo, draw_bounds: Rect) -> bool {
        (**self).on_bind_pipeline(config, program, draw_bounds)
    }

    fn on_set_scissor(&mut self, config: &PassConfig, scissor: IRect) {
        (**self).on_set_scissor(config, scissor)
    }

    fn on_bind_textures(
        &mut self,
        processor: &PrimitiveProcessor,
        pipeline: &Pipeline,
        textures: &[TextureProxy],
    ) -> bool {
        (**self).on_bind_textures(processor, pipeline, textures)
    }

    fn on_bind_buffers(
        &mut self,
        index_buffer: Option<&Arc<GpuBuffer>>,
        instance_buffer: Option<&Arc<GpuBuffer>>,
        vertex_buffer: Option<&Arc<GpuBuffer>>,
        primitive_restart: PrimitiveRestart,
    ) {
        (**self).on_bind_buffers(index_buffer, instance_buffer, vertex_buffer, primitive_restart)
    }

    fn on_draw(&mut self, vertex_count: u32, base_vertex: u32) {
        (**self).on_draw(vertex_count, base_vertex)
    }

    fn on_draw_indexed(
        &mut self,
        index_count: u32,
        base_index: u32,
        min_index_value: u16,
        max_index_value: u16,
        base_vertex: u32,
    ) {
        (**self).on_draw_indexed(index_count, base_index, min_index_value, max_index_value, base_vertex)
    }

    fn on_draw_instanced(&mut self, instance_count: u32, base_instance: u32, vertex_count: u32, base_vertex: u32) {
        (**self).on_draw_instanced(instance_count, base_instance, vertex_count, base_vertex)
    }

    fn on_draw_indexed_instanced(
        &mut self,
        index_count: u32,
        base_index: u32,
        instance_count: u32,
        base_instance: u32,
        base_vertex: u32,
    ) {
        (**self).on_draw_indexed_instanced(index_count, base_index, instance_count, base_instance, base_vertex)
    }

    fn on_clear(&mut self, config: &PassConfig, clip: &FixedClip, color: [f32; 4]) {
        (**self).on_clear(config, clip, color)
    }

    fn on_clear_stencil_clip(&mut self, config: &PassConfig, clip: &FixedClip, inside_stencil_mask: bool) {
        (**self).on_clear_stencil_clip(config, clip, inside_stencil_mask)
    }
}

/// Lifecycle of a pass object.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PassPhase {
    /// No target configured (fresh or after `reset`).
    Uninitialized,
    /// Configured by `set`, waiting for `begin`.
    Created,
    Begun,
    Ended,
}

/// Whether draws may be issued against the current pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawPipelineStatus {
    Ok,
    /// No pipeline bound since `begin` or the last clear.
    NotConfigured,
    /// The last bind failed; draws are dropped until the next successful bind.
    FailedToBind,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ScissorStatus {
    Disabled,
    NotConfigured,
    Configured,
}

/// Ordered command submission against one render target.
///
/// Legal sequence: `set` → `begin` → (`bind_pipeline` → `set_scissor`? →
/// `bind_textures`? → `bind_buffers` → `draw*` | `clear*` | `inline_upload`)* →
/// `end`. Calls outside `begin`/`end`, or draws with no pipeline bound, are
/// programming errors and panic.
///
/// There is no internal locking: the order of calls is the order the device
/// observes them.
pub struct RenderPass<B: RenderPassBackend> {
    backend: B,
    config: Option<PassConfig>,
    phase: PassPhase,
    pipeline_status: DrawPipelineStatus,
    scissor_status: ScissorStatus,
    has_index_buffer: bool,
    needs_instance_buffer: bool,
    warned_failed_bind: bool,
}

/// Render pass whose backend is only known through the interface.
pub type DynRenderPass = RenderPass<Box<dyn RenderPassBackend>>;

impl<B: RenderPassBackend> RenderPass<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: None,
            phase: PassPhase::Uninitialized,
            pipeline_status: DrawPipelineStatus::NotConfigured,
            scissor_status: ScissorStatus::Disabled,
            has_index_buffer: false,
            needs_instance_buffer: false,
            warned_failed_bind: false,
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn into_backend(self) -> B {
        self.backend
    }

    #[inline]
    pub fn phase(&self) -> PassPhase {
        self.phase
    }

    #[inline]
    pub fn pipeline_status(&self) -> DrawPipelineStatus {
        self.pipeline_status
    }

    #[inline]
    pub fn config(&self) -> Option<&PassConfig> {
        self.config.as_ref()
    }

    /// Configures the attachment for the next `begin`.
    ///
    /// # Panics
    /// Panics if the pass is currently begun.
    pub fn set(&mut self, config: PassConfig) {
        assert!(self.phase != PassPhase::Begun, "RenderPass::set called on a begun pass");
        self.config = Some(config);
        self.phase = PassPhase::Created;
    }

    /// Returns the pass to the uninitialized state so it can be reused.
    ///
    /// # Panics
    /// Panics if the pass is currently begun.
    pub fn reset(&mut self) {
        assert!(self.phase != PassPhase::Begun, "RenderPass::reset called on a begun pass");
        self.config = None;
        self.phase = PassPhase::Uninitialized;
        self.reset_draw_state();
    }

    pub fn begin(&mut self) {
        let Some(config) = self.config.filter(|_| self.phase == PassPhase::Created) else {
            panic!("RenderPass::begin in phase {:?}", self.phase);
        };
        self.backend.on_begin(&config);
        self.phase = PassPhase::Begun;
        self.reset_draw_state();
        self.warned_failed_bind = false;
    }

    pub fn end(&mut self) {
        let config = self.begun_config();
        self.backend.on_end(&config);
        self.phase = PassPhase::Ended;
        self.reset_draw_state();
    }

    /// Runs `upload` now, before any later draw can read the written data.
    pub fn inline_upload(&mut self, upload: impl FnOnce(&mut dyn UploadTarget)) {
        self.begun_config();
        upload(self.backend.upload_target());
    }

    /// Binds a program for subsequent draws.
    ///
    /// Returns false if the device could not realize it. Draws are then
    /// skipped until a later bind succeeds; the pass itself stays usable.
    pub fn bind_pipeline(&mut self, program: &ProgramInfo, draw_bounds: Rect) -> bool {
        let config = self.begun_config();
        self.has_index_buffer = false;
        self.needs_instance_buffer = !program.processor.instance_attributes.is_empty();

        if !self.backend.on_bind_pipeline(&config, program, draw_bounds) {
            self.pipeline_status = DrawPipelineStatus::FailedToBind;
            if !self.warned_failed_bind {
                log::warn!("render pass: pipeline {:?} failed to bind; dropping its draws", program.pipeline.id);
                self.warned_failed_bind = true;
            }
            return false;
        }

        self.pipeline_status = DrawPipelineStatus::Ok;
        self.scissor_status = if program.pipeline.scissor_test {
            ScissorStatus::NotConfigured
        } else {
            ScissorStatus::Disabled
        };
        true
    }

    /// Sets the scissor for a pipeline that has scissor testing enabled.
    pub fn set_scissor(&mut self, scissor: IRect) {
        let config = self.begun_config();
        assert!(
            self.pipeline_status != DrawPipelineStatus::NotConfigured,
            "RenderPass::set_scissor without a bound pipeline"
        );
        if self.pipeline_status != DrawPipelineStatus::Ok {
            return;
        }
        debug_assert!(
            self.scissor_status != ScissorStatus::Disabled,
            "scissor set on a pipeline without scissor testing"
        );
        self.backend.on_set_scissor(&config, scissor);
        self.scissor_status = ScissorStatus::Configured;
    }

    /// Binds the processor's textures. Returns false on device failure, after
    /// which draws are skipped as for a failed pipeline bind.
    pub fn bind_textures(
        &mut self,
        processor: &PrimitiveProcessor,
        pipeline: &Pipeline,
        textures: &[TextureProxy],
    ) -> bool {
        self.begun_config();
        assert!(
            self.pipeline_status != DrawPipelineStatus::NotConfigured,
            "RenderPass::bind_textures without a bound pipeline"
        );
        if self.pipeline_status != DrawPipelineStatus::Ok {
            return false;
        }
        debug_assert_eq!(textures.len(), processor.num_texture_samplers);

        if !self.backend.on_bind_textures(processor, pipeline, textures) {
            log::warn!("render pass: texture bind failed for pipeline {:?}", pipeline.id);
            self.pipeline_status = DrawPipelineStatus::FailedToBind;
            return false;
        }
        true
    }

    pub fn bind_buffers(
        &mut self,
        index_buffer: Option<&Arc<GpuBuffer>>,
        instance_buffer: Option<&Arc<GpuBuffer>>,
        vertex_buffer: Option<&Arc<GpuBuffer>>,
        primitive_restart: PrimitiveRestart,
    ) {
        self.begun_config();
        assert!(
            self.pipeline_status != DrawPipelineStatus::NotConfigured,
            "RenderPass::bind_buffers without a bound pipeline"
        );
        if self.pipeline_status != DrawPipelineStatus::Ok {
            return;
        }
        debug_assert!(
            !self.needs_instance_buffer || instance_buffer.is_some(),
            "pipeline has instance attributes but no instance buffer was bound"
        );
        debug_assert!(
            index_buffer.is_some() || primitive_restart == PrimitiveRestart::No,
            "primitive restart requires an index buffer"
        );

        self.has_index_buffer = index_buffer.is_some();
        self.backend
            .on_bind_buffers(index_buffer, instance_buffer, vertex_buffer, primitive_restart);
    }

    pub fn draw(&mut self, vertex_count: u32, base_vertex: u32) {
        if self.prepare_to_draw() {
            self.backend.on_draw(vertex_count, base_vertex);
        }
    }

    /// `min_index_value`/`max_index_value` bound the indices read by the draw.
    /// They are a hint for range-restricted draws and are not checked against
    /// the buffer contents.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        base_index: u32,
        min_index_value: u16,
        max_index_value: u16,
        base_vertex: u32,
    ) {
        if self.prepare_to_draw() {
            assert!(self.has_index_buffer, "RenderPass::draw_indexed without an index buffer");
            debug_assert!(min_index_value <= max_index_value);
            self.backend
                .on_draw_indexed(index_count, base_index, min_index_value, max_index_value, base_vertex);
        }
    }

    pub fn draw_instanced(&mut self, instance_count: u32, base_instance: u32, vertex_count: u32, base_vertex: u32) {
        if self.prepare_to_draw() {
            self.backend
                .on_draw_instanced(instance_count, base_instance, vertex_count, base_vertex);
        }
    }

    pub fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        base_index: u32,
        instance_count: u32,
        base_instance: u32,
        base_vertex: u32,
    ) {
        if self.prepare_to_draw() {
            assert!(self.has_index_buffer, "RenderPass::draw_indexed_instanced without an index buffer");
            self.backend
                .on_draw_indexed_instanced(index_count, base_index, instance_count, base_instance, base_vertex);
        }
    }

    /// Clears color within `clip`. The bound pipeline must be re-bound afterwards.
    pub fn clear(&mut self, clip: &FixedClip, color: [f32; 4]) {
        let config = self.begun_config();
        self.backend.on_clear(&config, clip, color);
        self.pipeline_status = DrawPipelineStatus::NotConfigured;
    }

    /// Clears the stencil clip bit within `clip`. The bound pipeline must be
    /// re-bound afterwards.
    pub fn clear_stencil_clip(&mut self, clip: &FixedClip, inside_stencil_mask: bool) {
        let config = self.begun_config();
        debug_assert!(config.target.has_stencil, "stencil clear on a target without stencil");
        self.backend.on_clear_stencil_clip(&config, clip, inside_stencil_mask);
        self.pipeline_status = DrawPipelineStatus::NotConfigured;
    }

    fn prepare_to_draw(&mut self) -> bool {
        self.begun_config();
        match self.pipeline_status {
            DrawPipelineStatus::Ok => {}
            DrawPipelineStatus::NotConfigured => panic!("RenderPass draw without a bound pipeline"),
            DrawPipelineStatus::FailedToBind => {
                log::trace!("render pass: draw skipped after failed bind");
                return false;
            }
        }
        debug_assert!(
            self.scissor_status != ScissorStatus::NotConfigured,
            "pipeline enables scissor testing but no scissor was set"
        );
        true
    }

    /// Config of a begun pass.
    ///
    /// # Panics
    /// Panics outside `begin`/`end`, which is a contract violation.
    fn begun_config(&self) -> PassConfig {
        match (self.phase, self.config) {
            (PassPhase::Begun, Some(config)) => config,
            (phase, _) => panic!("RenderPass operation outside begin/end (phase {phase:?})"),
        }
    }

    fn reset_draw_state(&mut self) {
        self.pipeline_status = DrawPipelineStatus::NotConfigured;
        self.scissor_status = ScissorStatus::Disabled;
        self.has_index_buffer = false;
        self.needs_instance_buffer = false;
    }
}
