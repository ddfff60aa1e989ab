//! Geometry containers for the strata drawing layer.
//!
//! This crate is GPU-agnostic: it owns vertex/index storage and its binary
//! encoding. The `strata-gpu` crate uploads and draws it.

pub mod coords;
pub mod vertices;

pub use coords::{IRect, PackedColor, Point, Rect};
pub use vertices::{Builder, BuilderArrays, BuilderFlags, DecodeError, GeometryBuffer, VertexMode};
