use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::camera::PerspectiveCamera;
use crate::rendering::backend::{RendererOptions, ToneMapping};
use crate::rendering::texture::Resolution;
use crate::scene_graph::{Light, LightKind};

pub const MAX_LIGHTS: usize = 4;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct LightUniform {
    /// xyz position, w is 0 for directional and 1 for point lights.
    pub position: Vec4,
    /// rgb premultiplied by intensity, w is the point light range.
    pub color: Vec4,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GlobalUniformState {
    pub view_proj: Mat4,
    pub view: Mat4,
    pub camera_position: Vec4,
    pub ambient: Vec4,
    pub lights: [LightUniform; MAX_LIGHTS],
    /// Light count, exposure, tone mapping flag, pixel ratio.
    pub params: Vec4,
    pub resolution: Vec4,
}

impl GlobalUniformState {
    pub fn new(
        camera: &PerspectiveCamera,
        lights: &[(Light, Vec3)],
        options: &RendererOptions,
        resolution: Resolution,
        pixel_ratio: f32,
    ) -> Self {
        let mut ambient = Vec3::ZERO;
        let mut packed = [LightUniform::default(); MAX_LIGHTS];
        let mut count = 0;

        for (light, position) in lights {
            let color = light.color * light.intensity;

            let (position, range) = match light.kind {
                LightKind::Ambient => {
                    ambient += color;
                    continue;
                }
                LightKind::Directional => (position.extend(0.0), 0.0),
                LightKind::Point { range } => (position.extend(1.0), range),
            };

            if count == MAX_LIGHTS {
                log::warn!("Scene has more than {} lights, ignoring the rest", MAX_LIGHTS);
                break;
            }

            packed[count] = LightUniform {
                position,
                color: color.extend(range),
            };
            count += 1;
        }

        let tone_mapping = match options.tone_mapping {
            ToneMapping::None => 0.0,
            ToneMapping::AcesFilmic => 1.0,
        };

        Self {
            view_proj: camera.view_projection(),
            view: camera.view_matrix(),
            camera_position: camera.position.extend(1.0),
            ambient: ambient.extend(1.0),
            lights: packed,
            params: Vec4::new(count as f32, options.exposure, tone_mapping, pixel_ratio),
            resolution: Vec4::new(resolution.width as f32, resolution.height as f32, 0.0, 0.0),
        }
    }
}

pub struct GlobalUniform {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl GlobalUniform {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Global uniform buffer"),
            contents: bytemuck::cast_slice(&[GlobalUniformState::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = uniform_bind_group_layout(device, "Global uniform");

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global uniform"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, state: GlobalUniformState) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}

/// One uniform buffer at binding 0, visible to both stages.
pub fn uniform_bind_group_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lights_are_packed_and_ambient_is_summed() {
        let camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        let lights = [
            (Light::ambient(0xffffff, 0.4), Vec3::ZERO),
            (Light::directional(0xffffff, 2.0), Vec3::splat(10.0)),
            (Light::point(0xff00ff, 3.0, 20.0), Vec3::new(-5.0, 5.0, 5.0)),
        ];

        let state = GlobalUniformState::new(
            &camera,
            &lights,
            &RendererOptions::default(),
            Resolution::new(800, 600),
            2.0,
        );

        assert_eq!(state.params.x, 2.0);
        assert!((state.ambient.x - 0.4).abs() < 1e-5);
        assert_eq!(state.lights[0].position.w, 0.0);
        assert_eq!(state.lights[1].position.w, 1.0);
        assert_eq!(state.lights[1].color.w, 20.0);
        assert_eq!(state.params.w, 2.0);
    }

    #[test]
    fn test_extra_lights_are_dropped() {
        let camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        let lights: Vec<_> = (0..6)
            .map(|i| (Light::point(0xffffff, 1.0, 0.0), Vec3::splat(i as f32)))
            .collect();

        let state = GlobalUniformState::new(
            &camera,
            &lights,
            &RendererOptions::default(),
            Resolution::new(1, 1),
            1.0,
        );

        assert_eq!(state.params.x, MAX_LIGHTS as f32);
    }
}
