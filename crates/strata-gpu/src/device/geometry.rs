use core::num::NonZeroU32;

use anyhow::{Result, ensure};
use strata_geometry::{GeometryBuffer, VertexMode};
use wgpu::util::DeviceExt;

/// Device-resident copy of a [`GeometryBuffer`].
///
/// Each present array gets its own buffer. wgpu has no fan topology, so a
/// non-indexed fan is uploaded with generated triangle-list indices; indexed
/// fans were already expanded when the geometry was built.
#[derive(Debug)]
pub struct GpuGeometry {
    source_id: NonZeroU32,
    topology: wgpu::PrimitiveTopology,
    vertex_count: u32,
    index_count: u32,

    positions: wgpu::Buffer,
    tex_coords: Option<wgpu::Buffer>,
    colors: Option<wgpu::Buffer>,
    indices: Option<wgpu::Buffer>,
}

impl GpuGeometry {
    pub fn upload(device: &wgpu::Device, geometry: &GeometryBuffer) -> Result<Self> {
        let vertex_count = u32::try_from(geometry.vertex_count())?;

        let create = |label: &str, contents: &[u8], usage: wgpu::BufferUsages| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: usage | wgpu::BufferUsages::COPY_DST,
            })
        };

        let positions = create(
            "strata geometry positions",
            bytemuck::cast_slice(geometry.positions()),
            wgpu::BufferUsages::VERTEX,
        );
        let tex_coords = geometry.tex_coords().map(|t| {
            create("strata geometry tex coords", bytemuck::cast_slice(t), wgpu::BufferUsages::VERTEX)
        });
        let colors = geometry
            .colors()
            .map(|c| create("strata geometry colors", bytemuck::cast_slice(c), wgpu::BufferUsages::VERTEX));

        let fan_indices;
        let index_data = match (geometry.mode(), geometry.indices()) {
            (_, Some(indices)) => Some(indices),
            (VertexMode::TriangleFan, None) => {
                ensure!(
                    vertex_count <= u32::from(u16::MAX) + 1,
                    "triangle fan with {vertex_count} vertices exceeds 16-bit indices"
                );
                fan_indices = fan_to_list(vertex_count);
                Some(fan_indices.as_slice())
            }
            (_, None) => None,
        };
        let index_count = index_data.map_or(0, |i| i.len() as u32);
        let indices = index_data
            .map(|i| create("strata geometry indices", bytemuck::cast_slice(i), wgpu::BufferUsages::INDEX));

        let topology = match geometry.mode() {
            VertexMode::Triangles | VertexMode::TriangleFan => wgpu::PrimitiveTopology::TriangleList,
            VertexMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        };

        log::trace!(
            "uploaded geometry {} ({vertex_count} vertices, {index_count} indices)",
            geometry.unique_id()
        );

        Ok(Self {
            source_id: geometry.unique_id(),
            topology,
            vertex_count,
            index_count,
            positions,
            tex_coords,
            colors,
            indices,
        })
    }

    /// Unique id of the geometry this was uploaded from.
    #[inline]
    pub fn source_id(&self) -> NonZeroU32 {
        self.source_id
    }

    #[inline]
    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    #[inline]
    pub fn index_format(&self) -> wgpu::IndexFormat {
        wgpu::IndexFormat::Uint16
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn positions(&self) -> &wgpu::Buffer {
        &self.positions
    }

    pub fn tex_coords(&self) -> Option<&wgpu::Buffer> {
        self.tex_coords.as_ref()
    }

    pub fn colors(&self) -> Option<&wgpu::Buffer> {
        self.colors.as_ref()
    }

    pub fn indices(&self) -> Option<&wgpu::Buffer> {
        self.indices.as_ref()
    }

    /// Bytes held in device buffers.
    pub fn device_size(&self) -> u64 {
        [Some(&self.positions), self.tex_coords.as_ref(), self.colors.as_ref(), self.indices.as_ref()]
            .into_iter()
            .flatten()
            .map(wgpu::Buffer::size)
            .sum()
    }
}

/// Triangle-list indices for a fan over `vertex_count` vertices.
fn fan_to_list(vertex_count: u32) -> Vec<u16> {
    (1..vertex_count.saturating_sub(1))
        .flat_map(|k| [0, k as u16, (k + 1) as u16])
        .collect()
}
