use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use wgpu::CommandEncoderDescriptor;
use winit::window::Window;

use crate::camera::PerspectiveCamera;
use crate::error::RenderError;
use crate::geometry::GeometryId;
use crate::material::MaterialKind;
use crate::platform::NodeId;
use crate::rendering::{
    backend::{RenderBackend, Renderer, RendererOptions},
    global_uniform::{uniform_bind_group_layout, GlobalUniform, GlobalUniformState},
    passes::forward_pass::{DrawItem, ForwardPass, ForwardPassLayouts, ForwardTargets},
    render_model::{DrawKind, ObjectUniform, ObjectUniformState, RenderGeometry},
    texture::{AttachmentTexture, DepthTexture, Resolution, SpriteTexture},
};
use crate::scene_graph::{ObjectId, ObjectKind, Scene};
use crate::texture::TextureId;

const MSAA_SAMPLES: u32 = 4;

/// Owns the GPU device and hands out renderers that draw into the window.
pub struct WgpuBackend {
    window: Arc<Window>,
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let probe = instance
            .create_surface(window.clone())
            .map_err(|err| RenderError::ContextUnavailable(err.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&probe),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| RenderError::ContextUnavailable(err.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|err| RenderError::ContextUnavailable(err.to_string()))?;

        log::info!("Using adapter {}", adapter.get_info().name);

        Ok(Self {
            window,
            instance,
            adapter,
            device,
            queue,
        })
    }

    fn surface_configuration(
        &self,
        surface: &wgpu::Surface,
        options: &RendererOptions,
    ) -> Result<wgpu::SurfaceConfiguration, RenderError> {
        let caps = surface.get_capabilities(&self.adapter);

        let format = caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or(caps.formats.first())
            .copied()
            .ok_or_else(|| {
                RenderError::ContextUnavailable("surface reports no formats".to_string())
            })?;

        let alpha_mode = if options.alpha
            && caps
                .alpha_modes
                .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            caps.alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };

        Ok(wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: 1,
            height: 1,
            present_mode: caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        })
    }
}

impl RenderBackend for WgpuBackend {
    fn create_renderer(
        &self,
        options: &RendererOptions,
    ) -> Result<Box<dyn Renderer>, RenderError> {
        let surface = self
            .instance
            .create_surface(self.window.clone())
            .map_err(|err| RenderError::ContextUnavailable(err.to_string()))?;

        let config = self.surface_configuration(&surface, options)?;
        surface.configure(&self.device, &config);

        let sample_count = if options.antialias
            && self
                .adapter
                .get_texture_format_features(config.format)
                .flags
                .sample_count_supported(MSAA_SAMPLES)
        {
            MSAA_SAMPLES
        } else {
            1
        };

        Ok(Box::new(WgpuRenderer::new(
            self.device.clone(),
            self.queue.clone(),
            surface,
            config,
            *options,
            sample_count,
        )))
    }
}

struct CachedObject {
    uniform: ObjectUniform,
    geometry: GeometryId,
}

pub struct WgpuRenderer {
    node: NodeId,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: Option<wgpu::Surface<'static>>,
    config: wgpu::SurfaceConfiguration,
    options: RendererOptions,
    sample_count: u32,

    css_size: (u32, u32),
    pixel_ratio: f32,

    depth_texture: AttachmentTexture,
    msaa_texture: Option<AttachmentTexture>,

    global_uniform: GlobalUniform,
    object_layout: wgpu::BindGroupLayout,
    sprite_layout: wgpu::BindGroupLayout,
    forward_pass: ForwardPass,

    geometries: HashMap<GeometryId, RenderGeometry>,
    objects: HashMap<ObjectId, CachedObject>,
    sprites: HashMap<TextureId, SpriteTexture>,
    white_sprite: SpriteTexture,
}

impl WgpuRenderer {
    fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        options: RendererOptions,
        sample_count: u32,
    ) -> Self {
        let resolution = Resolution::new(config.width, config.height);

        let global_uniform = GlobalUniform::new(&device);
        let object_layout = uniform_bind_group_layout(&device, "Object uniform");
        let sprite_layout = SpriteTexture::bind_group_layout(&device);

        let forward_pass = ForwardPass::create(
            &device,
            config.format,
            sample_count,
            &ForwardPassLayouts {
                global: &global_uniform.bind_group_layout,
                object: &object_layout,
                sprite: &sprite_layout,
            },
        );

        let depth_texture = DepthTexture::new(&device, resolution, sample_count, "Depth texture");
        let msaa_texture = (sample_count > 1).then(|| {
            AttachmentTexture::new(
                &device,
                resolution,
                config.format,
                sample_count,
                "Multisampled color",
            )
        });
        let white_sprite = SpriteTexture::white(&device, &queue, &sprite_layout);

        Self {
            node: NodeId::next(),
            device,
            queue,
            surface: Some(surface),
            config,
            options,
            sample_count,
            css_size: (1, 1),
            pixel_ratio: 1.0,
            depth_texture,
            msaa_texture,
            global_uniform,
            object_layout,
            sprite_layout,
            forward_pass,
            geometries: HashMap::new(),
            objects: HashMap::new(),
            sprites: HashMap::new(),
            white_sprite,
        }
    }

    fn drawing_buffer_size(&self) -> Resolution {
        let scale = |value: u32| (value as f32 * self.pixel_ratio).round() as u32;
        Resolution::new(scale(self.css_size.0), scale(self.css_size.1))
    }

    fn reconfigure(&mut self) {
        let Some(surface) = &self.surface else {
            return;
        };

        let size = self.drawing_buffer_size();
        if size.width == self.config.width && size.height == self.config.height {
            return;
        }

        self.config.width = size.width;
        self.config.height = size.height;
        surface.configure(&self.device, &self.config);
        self.depth_texture.resize(&self.device, size);
        if let Some(msaa) = &mut self.msaa_texture {
            msaa.resize(&self.device, size);
        }
    }

    /// Uploads whatever changed since the previous frame and drops GPU copies
    /// of objects that are no longer drawn.
    fn sync_scene(&mut self, scene: &Scene, drawables: &[ObjectId]) {
        let mut live_geometries = HashSet::new();

        for &id in drawables {
            let Some(object) = scene.get_object(id) else {
                continue;
            };
            let (geometry_id, material_id, kind) = match object.kind {
                ObjectKind::Mesh { geometry, material } => (geometry, material, DrawKind::Mesh),
                ObjectKind::Points { geometry, material } => {
                    (geometry, material, DrawKind::Points)
                }
                _ => continue,
            };
            let (Some(geometry), Some(material)) =
                (scene.geometry(geometry_id), scene.material(material_id))
            else {
                continue;
            };

            let vertex_colors = match &material.kind {
                MaterialKind::Points(points) => points.vertex_colors,
                _ => false,
            };

            let reusable = self.geometries.get_mut(&geometry_id).is_some_and(|cached| {
                cached.is_current(geometry, kind, vertex_colors)
                    || (cached.has_layout(kind, vertex_colors)
                        && cached.try_update(&self.queue, geometry))
            });
            if !reusable {
                let label = format!("{} geometry", object.name);
                let render_geometry =
                    RenderGeometry::new(&self.device, &label, geometry, kind, vertex_colors);
                self.geometries.insert(geometry_id, render_geometry);
            }
            live_geometries.insert(geometry_id);

            if let MaterialKind::Points(points) = &material.kind {
                if let Some(texture_id) = points.map {
                    if !self.sprites.contains_key(&texture_id) {
                        if let Some(texture) = scene.texture(texture_id) {
                            let sprite = SpriteTexture::from_texture(
                                &self.device,
                                &self.queue,
                                &self.sprite_layout,
                                texture,
                            );
                            self.sprites.insert(texture_id, sprite);
                        }
                    }
                }
            }

            let state =
                ObjectUniformState::new(*object.transform.get_world_matrix(), material);
            let cached = self.objects.entry(id).or_insert_with(|| CachedObject {
                uniform: ObjectUniform::new(&self.device, &self.object_layout),
                geometry: geometry_id,
            });
            cached.geometry = geometry_id;
            cached.uniform.update(&self.queue, state);
        }

        let drawn: HashSet<ObjectId> = drawables.iter().copied().collect();
        self.objects.retain(|id, _| drawn.contains(id));
        self.geometries.retain(|id, _| live_geometries.contains(id));
    }

    fn sprite_for(&self, scene: &Scene, id: ObjectId) -> Option<&wgpu::BindGroup> {
        let object = scene.get_object(id)?;
        let (_, material_id) = object.drawable()?;

        match &scene.material(material_id)?.kind {
            MaterialKind::Points(points) => match points.map {
                Some(texture_id) => self.sprites.get(&texture_id).map(|s| &s.bind_group),
                None => Some(&self.white_sprite.bind_group),
            },
            _ => None,
        }
    }
}

impl Renderer for WgpuRenderer {
    fn output_node(&self) -> NodeId {
        self.node
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio.max(0.1);
        self.reconfigure();
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.css_size = (width, height);
        self.reconfigure();
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        if self.surface.is_none() {
            return Err(RenderError::ContextUnavailable(
                "renderer already disposed".to_string(),
            ));
        }

        scene.update_transforms();
        let drawables = scene.visible_drawables();
        self.sync_scene(scene, &drawables);

        let resolution = Resolution::new(self.config.width, self.config.height);
        self.global_uniform.update(
            &self.queue,
            GlobalUniformState::new(
                camera,
                &scene.visible_lights(),
                &self.options,
                resolution,
                self.pixel_ratio,
            ),
        );

        let Some(surface) = &self.surface else {
            return Err(RenderError::SurfaceLost);
        };

        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.configure(&self.device, &self.config);
                return Err(RenderError::SurfaceLost);
            }
            Err(err) => return Err(RenderError::Frame(err.to_string())),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let items: Vec<DrawItem> = drawables
            .iter()
            .filter_map(|id| {
                let cached = self.objects.get(id)?;
                Some(DrawItem {
                    geometry: self.geometries.get(&cached.geometry)?,
                    object: &cached.uniform,
                    sprite: self.sprite_for(scene, *id),
                })
            })
            .collect();

        let (color, resolve) = match &self.msaa_texture {
            Some(msaa) => (msaa.view(), Some(&view)),
            None => (&view, None),
        };

        let clear = if self.options.alpha {
            wgpu::Color::TRANSPARENT
        } else {
            wgpu::Color::BLACK
        };

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.forward_pass.render(
            &mut encoder,
            &ForwardTargets {
                color,
                resolve,
                depth: self.depth_texture.view(),
                clear,
            },
            &self.global_uniform,
            &items,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn dispose(&mut self) {
        if self.surface.take().is_some() {
            log::debug!(
                "Disposing renderer with {} geometries and {} sprites ({}x MSAA)",
                self.geometries.len(),
                self.sprites.len(),
                self.sample_count
            );
            self.objects.clear();
            self.geometries.clear();
            self.sprites.clear();
        }
    }
}
