//! Strata GPU crate.
//!
//! This crate submits `strata-geometry` data to a device: the render pass
//! contract and its immediate-mode backend, plus wgpu upload and caching.

pub mod cache;
pub mod device;
pub mod logging;
pub mod render;

pub use cache::{CacheConfig, GeometryCache};
pub use device::{Gpu, GpuGeometry, GpuInit};
