//! wgpu device management and geometry upload.
//!
//! This module is responsible for:
//! - creating a headless wgpu Instance/Adapter/Device/Queue
//! - uploading `GeometryBuffer` arrays into device buffers

mod geometry;
mod gpu;
mod init;

pub use geometry::GpuGeometry;
pub use gpu::Gpu;
pub use init::GpuInit;
