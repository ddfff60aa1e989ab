//! Draw submission.
//!
//! [`RenderPass`] is the backend-independent command contract: it owns the
//! begin/bind/draw/end state machine and validates call order. Backends
//! implement [`RenderPassBackend`]; [`immediate`] is the synchronous one.

mod error;
pub mod immediate;
mod pass;
mod resource;
mod upload;

#[cfg(test)]
mod testing;

pub use error::DeviceError;
pub use pass::{DrawPipelineStatus, DynRenderPass, PassConfig, PassPhase, RenderPass, RenderPassBackend};
pub use resource::{
    Attribute, AttributeSet, BufferId, FixedClip, GpuBuffer, LoadAndStore, LoadOp, Pipeline,
    PipelineId, PrimitiveProcessor, PrimitiveRestart, PrimitiveType, ProgramInfo, RenderTarget,
    RenderTargetId, StencilLoadAndStore, StencilLoadOp, StoreOp, SurfaceOrigin, TextureId,
    TextureProxy, VertexFormat,
};
pub use upload::UploadTarget;
