use std::mem::offset_of;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::geometry::Geometry;
use crate::material::{Material, MaterialKind};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// One point sprite, drawn as an instanced quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PointInstance {
    pub position: Vec3,
    pub color: Vec3,
}

pub const MESH_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(MeshVertex, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(MeshVertex, normal) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
    ],
};

pub const POINT_INSTANCE_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<PointInstance>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Instance,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(PointInstance, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(PointInstance, color) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Mesh,
    Points,
}

/// GPU copy of a [`Geometry`]. Re-uploaded when the geometry's version moves.
pub struct RenderGeometry {
    pub kind: DrawKind,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<(wgpu::Buffer, u32)>,
    pub vertex_count: u32,
    version: u64,
    vertex_colors: bool,
}

impl RenderGeometry {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        geometry: &Geometry,
        kind: DrawKind,
        vertex_colors: bool,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Vertex buffer ({})", label)),
            contents: &Self::vertex_bytes(geometry, kind, vertex_colors),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let index_buffer = match (kind, geometry.indices()) {
            (DrawKind::Mesh, Some(indices)) => {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Index buffer ({})", label)),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                Some((buffer, indices.len() as u32))
            }
            _ => None,
        };

        Self {
            kind,
            vertex_buffer,
            index_buffer,
            vertex_count: geometry.vertex_count() as u32,
            version: geometry.version(),
            vertex_colors,
        }
    }

    pub fn has_layout(&self, kind: DrawKind, vertex_colors: bool) -> bool {
        self.kind == kind && self.vertex_colors == vertex_colors
    }

    pub fn is_current(&self, geometry: &Geometry, kind: DrawKind, vertex_colors: bool) -> bool {
        self.has_layout(kind, vertex_colors) && self.version == geometry.version()
    }

    /// Updates the buffer in place when the layout still fits, which is the
    /// case for per-frame vertex animation.
    pub fn try_update(&mut self, queue: &wgpu::Queue, geometry: &Geometry) -> bool {
        if geometry.vertex_count() as u32 != self.vertex_count {
            return false;
        }

        queue.write_buffer(
            &self.vertex_buffer,
            0,
            &Self::vertex_bytes(geometry, self.kind, self.vertex_colors),
        );
        self.version = geometry.version();
        true
    }

    fn vertex_bytes(geometry: &Geometry, kind: DrawKind, vertex_colors: bool) -> Vec<u8> {
        let positions = geometry.positions();

        match kind {
            DrawKind::Mesh => {
                let normals = geometry.normals();
                let vertices: Vec<MeshVertex> = positions
                    .iter()
                    .enumerate()
                    .map(|(i, &position)| MeshVertex {
                        position,
                        normal: normals.get(i).copied().unwrap_or(Vec3::Y),
                    })
                    .collect();
                bytemuck::cast_slice(&vertices).to_vec()
            }
            DrawKind::Points => {
                let colors = geometry.colors().filter(|_| vertex_colors);
                let instances: Vec<PointInstance> = positions
                    .iter()
                    .enumerate()
                    .map(|(i, &position)| PointInstance {
                        position,
                        color: colors
                            .and_then(|colors| colors.get(i).copied())
                            .unwrap_or(Vec3::ONE),
                    })
                    .collect();
                bytemuck::cast_slice(&instances).to_vec()
            }
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ObjectUniformState {
    pub model: Mat4,
    pub normal_matrix: Mat4,
    /// rgb and opacity.
    pub color: Vec4,
    /// rgb premultiplied by intensity, w is the size attenuation flag.
    pub emissive: Vec4,
    /// Metalness, roughness, material kind, alpha test.
    pub surface: Vec4,
    /// Iridescence, transmission, clearcoat, point size.
    pub extra: Vec4,
}

impl ObjectUniformState {
    pub const KIND_STANDARD: f32 = 0.0;
    pub const KIND_PHYSICAL: f32 = 1.0;
    pub const KIND_POINTS: f32 = 2.0;

    pub fn new(world: Mat4, material: &Material) -> Self {
        let mut state = Self {
            model: world,
            normal_matrix: world.inverse().transpose(),
            color: Vec4::ONE,
            emissive: Vec4::ZERO,
            surface: Vec4::new(0.0, 1.0, Self::KIND_STANDARD, 0.0),
            extra: Vec4::ZERO,
        };

        match &material.kind {
            MaterialKind::Standard(standard) => {
                state.color = standard.color.extend(1.0);
                state.emissive = standard
                    .emissive
                    .map_or(Vec3::ZERO, |emissive| emissive * standard.emissive_intensity)
                    .extend(0.0);
                state.surface.x = standard.metalness;
                state.surface.y = standard.roughness;
            }
            MaterialKind::Physical(physical) => {
                state.color = physical.color.extend(1.0);
                state.surface = Vec4::new(
                    physical.metalness,
                    physical.roughness,
                    Self::KIND_PHYSICAL,
                    0.0,
                );
                state.extra = Vec4::new(
                    physical.iridescence,
                    physical.transmission,
                    physical.clearcoat,
                    0.0,
                );
            }
            MaterialKind::Points(points) => {
                let opacity = if points.transparent { points.opacity } else { 1.0 };
                state.color = Vec4::new(1.0, 1.0, 1.0, opacity);
                state.emissive.w = if points.size_attenuation { 1.0 } else { 0.0 };
                state.surface = Vec4::new(0.0, 1.0, Self::KIND_POINTS, points.alpha_test);
                state.extra.w = points.size;
            }
        }

        state
    }
}

pub struct ObjectUniform {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl ObjectUniform {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Object uniform buffer"),
            contents: bytemuck::cast_slice(&[ObjectUniformState::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object uniform"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self { buffer, bind_group }
    }

    pub fn update(&self, queue: &wgpu::Queue, state: ObjectUniformState) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}
