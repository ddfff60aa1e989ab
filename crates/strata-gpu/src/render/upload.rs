use strata_geometry::IRect;

use super::{DeviceError, GpuBuffer, TextureProxy};

/// Synchronous write access handed to inline uploads.
///
/// Writes complete before the call returns, so any draw recorded afterwards
/// observes the new contents.
pub trait UploadTarget {
    fn write_buffer(&mut self, buffer: &GpuBuffer, offset: usize, data: &[u8]) -> Result<(), DeviceError>;

    fn write_texture(&mut self, texture: &TextureProxy, region: IRect, data: &[u8]) -> Result<(), DeviceError>;
}
