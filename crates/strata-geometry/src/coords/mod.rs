//! Coordinate and color types shared by geometry and the GPU layer.
//!
//! Canonical CPU space:
//! - Device-independent units, origin top-left
//! - +X right, +Y down
//!
//! Every type here is `#[repr(C)]` + `Pod` so arrays of them can be viewed
//! directly as bytes for encoding and GPU upload.

mod color;
mod irect;
mod point;
mod rect;

pub use color::PackedColor;
pub use irect::IRect;
pub use point::Point;
pub use rect::Rect;
