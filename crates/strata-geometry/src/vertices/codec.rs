//! Binary encoding of geometry buffers.
//!
//! Layout (all multi-byte fields little-endian):
//!
//! ```text
//! [mode: u8][flags: u8][is_volatile: u8]
//! [vertex_count: u32][index_count: u32]
//! [bounds: left, top, right, bottom as f32]
//! [positions: vertex_count x (f32, f32)]
//! [tex coords: same as positions, if flagged]
//! [colors: vertex_count x u32, if flagged]
//! [indices: index_count x u16]
//! ```
//!
//! Bounds are written for readers that want them without scanning positions;
//! decoding recomputes them.

use core::fmt;
use std::sync::Arc;

use crate::coords::{PackedColor, Point};

use super::{Builder, BuilderFlags, GeometryBuffer, VertexMode};

/// Size of the fixed header preceding the array payload.
pub const HEADER_SIZE: usize = 1 + 1 + 1 + 4 + 4 + 4 * 4;

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    struct ArrayFlags: u8 {
        const TEX_COORDS = 1 << 0;
        const COLORS = 1 << 1;
    }
}

/// Reason an encoded geometry buffer was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input shorter than [`HEADER_SIZE`].
    Truncated { len: usize },
    /// Declared counts imply a payload of a different size.
    LengthMismatch { expected: u64, actual: u64 },
    InvalidMode(u8),
    InvalidFlags(u8),
    InvalidVolatile(u8),
    /// Counts are well formed but do not describe buildable geometry
    /// (e.g. an indexed fan with fewer than three indices).
    InvalidGeometry,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { len } => {
                write!(f, "geometry data truncated: {len} bytes, header needs {HEADER_SIZE}")
            }
            Self::LengthMismatch { expected, actual } => {
                write!(f, "geometry payload is {actual} bytes, counts require {expected}")
            }
            Self::InvalidMode(v) => write!(f, "invalid vertex mode {v}"),
            Self::InvalidFlags(v) => write!(f, "invalid array flags {v:#04x}"),
            Self::InvalidVolatile(v) => write!(f, "invalid volatile marker {v}"),
            Self::InvalidGeometry => write!(f, "counts do not describe valid geometry"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl GeometryBuffer {
    /// Serializes this buffer. See the module docs for the layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut flags = ArrayFlags::empty();
        flags.set(ArrayFlags::TEX_COORDS, self.has_tex_coords());
        flags.set(ArrayFlags::COLORS, self.has_colors());

        let payload = self.vertex_count() * 8 * (1 + usize::from(self.has_tex_coords()))
            + self.vertex_count() * 4 * usize::from(self.has_colors())
            + self.index_count() * 2;
        let mut out = Vec::with_capacity(HEADER_SIZE + payload);

        out.push(self.mode() as u8);
        out.push(flags.bits());
        out.push(u8::from(self.is_volatile()));
        // Counts fit in u32: enforced when the layout was computed.
        out.extend_from_slice(&(self.vertex_count() as u32).to_le_bytes());
        out.extend_from_slice(&(self.index_count() as u32).to_le_bytes());

        let b = self.bounds();
        for v in [b.left, b.top, b.right, b.bottom] {
            out.extend_from_slice(&v.to_le_bytes());
        }

        write_points(&mut out, self.positions());
        if let Some(texs) = self.tex_coords() {
            write_points(&mut out, texs);
        }
        if let Some(colors) = self.colors() {
            for c in colors {
                out.extend_from_slice(&c.0.to_le_bytes());
            }
        }
        if let Some(indices) = self.indices() {
            for i in indices {
                out.extend_from_slice(&i.to_le_bytes());
            }
        }

        debug_assert_eq!(out.len(), HEADER_SIZE + payload);
        out
    }

    /// Recreates a buffer from bytes produced by [`encode`](Self::encode).
    ///
    /// Decoding is all-or-nothing: on error no buffer is built. The input length
    /// must match the header's counts exactly.
    pub fn decode(data: &[u8]) -> Result<Arc<GeometryBuffer>, DecodeError> {
        if data.len() < HEADER_SIZE {
            return Err(DecodeError::Truncated { len: data.len() });
        }
        let (header, payload) = data.split_at(HEADER_SIZE);

        let mode = VertexMode::from_u8(header[0]).ok_or(DecodeError::InvalidMode(header[0]))?;
        let flags = ArrayFlags::from_bits(header[1]).ok_or(DecodeError::InvalidFlags(header[1]))?;
        let is_volatile = match header[2] {
            0 => false,
            1 => true,
            v => return Err(DecodeError::InvalidVolatile(v)),
        };
        let vertex_count = read_u32(&header[3..7]);
        let index_count = read_u32(&header[7..11]);
        // header[11..27] holds the encoded bounds; they are recomputed below.

        let has_texs = flags.contains(ArrayFlags::TEX_COORDS);
        let has_colors = flags.contains(ArrayFlags::COLORS);

        let vc = u64::from(vertex_count);
        let expected = vc * 8 * (1 + u64::from(has_texs)) + vc * 4 * u64::from(has_colors)
            + u64::from(index_count) * 2;
        let actual = payload.len() as u64;
        if expected != actual {
            log::debug!("geometry decode rejected: payload {actual} bytes, expected {expected}");
            return Err(DecodeError::LengthMismatch { expected, actual });
        }

        let mut builder_flags = BuilderFlags::empty();
        builder_flags.set(BuilderFlags::HAS_TEX_COORDS, has_texs);
        builder_flags.set(BuilderFlags::HAS_COLORS, has_colors);
        builder_flags.set(BuilderFlags::IS_NON_VOLATILE, !is_volatile);

        let mut builder = Builder::new(mode, vertex_count as usize, index_count as usize, builder_flags);
        let arrays = builder.arrays_mut().ok_or(DecodeError::InvalidGeometry)?;

        let mut rest = payload;
        read_points(&mut rest, arrays.positions);
        if let Some(texs) = arrays.tex_coords {
            read_points(&mut rest, texs);
        }
        if let Some(colors) = arrays.colors {
            let src = take(&mut rest, colors.len() * 4);
            for (dst, src) in colors.iter_mut().zip(src.chunks_exact(4)) {
                *dst = PackedColor(read_u32(src));
            }
        }
        if let Some(indices) = arrays.indices {
            let src = take(&mut rest, indices.len() * 2);
            for (dst, src) in indices.iter_mut().zip(src.chunks_exact(2)) {
                *dst = u16::from_le_bytes([src[0], src[1]]);
            }
        }
        debug_assert!(rest.is_empty());

        builder.detach().ok_or(DecodeError::InvalidGeometry)
    }
}

fn write_points(out: &mut Vec<u8>, points: &[Point]) {
    for p in points {
        out.extend_from_slice(&p.x.to_le_bytes());
        out.extend_from_slice(&p.y.to_le_bytes());
    }
}

fn read_points(rest: &mut &[u8], dst: &mut [Point]) {
    let src = take(rest, dst.len() * 8);
    for (p, src) in dst.iter_mut().zip(src.chunks_exact(8)) {
        *p = Point::new(
            f32::from_le_bytes([src[0], src[1], src[2], src[3]]),
            f32::from_le_bytes([src[4], src[5], src[6], src[7]]),
        );
    }
}

#[inline]
fn read_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Splits `n` bytes off the front of `rest`. Callers have validated the length.
#[inline]
fn take<'a>(rest: &mut &'a [u8], n: usize) -> &'a [u8] {
    let (head, tail) = rest.split_at(n);
    *rest = tail;
    head
}
