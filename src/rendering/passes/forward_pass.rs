use wgpu::{
    DepthBiasState, MultisampleState, PipelineCompilationOptions, RenderPassDescriptor,
    ShaderSource, StencilState,
};

use crate::rendering::{
    global_uniform::GlobalUniform,
    render_model::{DrawKind, ObjectUniform, RenderGeometry, MESH_VBL, POINT_INSTANCE_VBL},
    texture::DepthTexture,
};

const COMMON_WGSL: &str = include_str!("../shaders/common.wgsl");
const MESH_WGSL: &str = include_str!("../shaders/mesh.wgsl");
const POINTS_WGSL: &str = include_str!("../shaders/points.wgsl");

const PRIMITIVE_STATE: wgpu::PrimitiveState = wgpu::PrimitiveState {
    topology: wgpu::PrimitiveTopology::TriangleList,
    strip_index_format: None,
    front_face: wgpu::FrontFace::Ccw,
    cull_mode: None,
    unclipped_depth: false,
    polygon_mode: wgpu::PolygonMode::Fill,
    conservative: false,
};

pub struct ForwardTargets<'a> {
    pub color: &'a wgpu::TextureView,
    pub resolve: Option<&'a wgpu::TextureView>,
    pub depth: &'a wgpu::TextureView,
    pub clear: wgpu::Color,
}

pub struct DrawItem<'a> {
    pub geometry: &'a RenderGeometry,
    pub object: &'a ObjectUniform,
    pub sprite: Option<&'a wgpu::BindGroup>,
}

/// Draws meshes first, then point sprites, into a single color target.
pub struct ForwardPass {
    mesh_pipeline: wgpu::RenderPipeline,
    points_pipeline: wgpu::RenderPipeline,
}

pub struct ForwardPassLayouts<'a> {
    pub global: &'a wgpu::BindGroupLayout,
    pub object: &'a wgpu::BindGroupLayout,
    pub sprite: &'a wgpu::BindGroupLayout,
}

impl ForwardPass {
    pub fn create(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        sample_count: u32,
        layouts: &ForwardPassLayouts,
    ) -> Self {
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh pipeline layout"),
            bind_group_layouts: &[layouts.global, layouts.object],
            push_constant_ranges: &[],
        });

        let points_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Points pipeline layout"),
            bind_group_layouts: &[layouts.global, layouts.object, layouts.sprite],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = Self::create_pipeline(
            device,
            "Mesh",
            MESH_WGSL,
            &mesh_layout,
            MESH_VBL,
            format,
            sample_count,
        );

        let points_pipeline = Self::create_pipeline(
            device,
            "Points",
            POINTS_WGSL,
            &points_layout,
            POINT_INSTANCE_VBL,
            format,
            sample_count,
        );

        Self {
            mesh_pipeline,
            points_pipeline,
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        name: &str,
        source: &str,
        layout: &wgpu::PipelineLayout,
        vertex_layout: wgpu::VertexBufferLayout<'static>,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(format!("{}\n{}", COMMON_WGSL, source).into()),
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} render pipeline", name)),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PRIMITIVE_STATE,
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthTexture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState {
                count: sample_count,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        })
    }

    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &ForwardTargets,
        global: &GlobalUniform,
        items: &[DrawItem],
    ) {
        let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Forward pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: targets.color,
                resolve_target: targets.resolve,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(targets.clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: targets.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_bind_group(0, &global.bind_group, &[]);

        render_pass.set_pipeline(&self.mesh_pipeline);
        for item in items.iter().filter(|item| item.geometry.kind == DrawKind::Mesh) {
            render_pass.set_bind_group(1, &item.object.bind_group, &[]);
            render_pass.set_vertex_buffer(0, item.geometry.vertex_buffer.slice(..));

            match &item.geometry.index_buffer {
                Some((indices, count)) => {
                    render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..*count, 0, 0..1);
                }
                None => render_pass.draw(0..item.geometry.vertex_count, 0..1),
            }
        }

        render_pass.set_pipeline(&self.points_pipeline);
        for item in items.iter().filter(|item| item.geometry.kind == DrawKind::Points) {
            let Some(sprite) = item.sprite else {
                continue;
            };

            render_pass.set_bind_group(1, &item.object.bind_group, &[]);
            render_pass.set_bind_group(2, sprite, &[]);
            render_pass.set_vertex_buffer(0, item.geometry.vertex_buffer.slice(..));
            render_pass.draw(0..6, 0..item.geometry.vertex_count);
        }
    }
}
