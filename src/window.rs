use std::{rc::Rc, sync::Arc, time::Instant};

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use showreel::{
    asset::{AssetSource, TokioAssetSource},
    config::ViewerConfig,
    platform::{Container, FrameScheduler, PointerEvent, SystemClock, Viewport},
    rendering::WgpuBackend,
    Environment, HeroSection, MenuOverlay, SceneKind,
};

/// Everything that exists once the window does.
struct Viewer {
    window: Arc<Window>,
    started: Instant,
    assets: Rc<TokioAssetSource>,
    viewport: Rc<Viewport>,
    frames: Rc<FrameScheduler>,
    container: Rc<Container>,
    hero: HeroSection,
    menu: MenuOverlay,
}

impl Viewer {
    fn new(window: Arc<Window>, config: &ViewerConfig) -> anyhow::Result<Self> {
        let backend = pollster::block_on(WgpuBackend::new(window.clone()))
            .context("Failed to set up the GPU backend")?;
        let assets = Rc::new(
            TokioAssetSource::new(config.asset_dir.clone())
                .context("Failed to start the asset loader")?,
        );

        let scale = window.scale_factor();
        let size = window.inner_size().to_logical::<f64>(scale);

        let viewport = Rc::new(Viewport::new(
            size.width as f32,
            size.height as f32,
            scale as f32,
        ));
        let frames = Rc::new(FrameScheduler::new());
        let container = Rc::new(Container::new(size.width as u32, size.height as u32));

        let env = Environment {
            viewport: viewport.clone(),
            frames: frames.clone(),
            backend: Rc::new(backend),
            assets: assets.clone() as Rc<dyn AssetSource>,
            clock: Rc::new(SystemClock),
        };

        let mut hero = HeroSection::new(config.hero, container.clone(), env.clone());
        hero.show();
        let menu = MenuOverlay::new(container.clone(), env, config.menu_delay_ms);

        Ok(Self {
            window,
            started: Instant::now(),
            assets,
            viewport,
            frames,
            container,
            hero,
            menu,
        })
    }

    fn toggle_menu(&mut self) {
        if self.menu.is_open() {
            self.menu.close();
            self.hero.show();
        } else {
            // the window has one surface, so the hero gives it up first
            self.hero.hide();
            self.menu.open();
        }
    }

    fn toggle_hero(&mut self) {
        let next = match self.hero.kind() {
            SceneKind::ParticleCloud => SceneKind::DeformableMesh,
            _ => SceneKind::ParticleCloud,
        };
        log::info!("Switching hero to {}", next.name());
        self.hero.set_kind(next);
    }

    fn resize(&mut self) {
        let scale = self.window.scale_factor();
        let size = self.window.inner_size().to_logical::<f64>(scale);

        self.viewport.set_device_pixel_ratio(scale as f32);
        self.viewport
            .set_inner_size(size.width as f32, size.height as f32);
        self.container
            .set_client_size(size.width as u32, size.height as u32);
        self.viewport.dispatch_resize();
    }

    fn redraw(&mut self) {
        self.assets.pump();
        self.menu.tick();
        self.frames
            .run_frame(self.started.elapsed().as_secs_f64() * 1000.0);
        self.window.request_redraw();
    }
}

struct App {
    config: ViewerConfig,
    viewer: Option<Viewer>,
    error: Option<anyhow::Error>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes().with_title("showreel");
        let viewer = event_loop
            .create_window(window_attributes)
            .context("Failed to create window")
            .and_then(|window| Viewer::new(Arc::new(window), &self.config));

        match viewer {
            Ok(viewer) => {
                viewer.window.request_redraw();
                self.viewer = Some(viewer);
            }
            Err(err) => {
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                viewer.resize();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = position.to_logical::<f64>(viewer.window.scale_factor());
                viewer.viewport.dispatch_pointer_move(PointerEvent {
                    client_x: position.x as f32,
                    client_y: position.y as f32,
                });
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                match event.logical_key.as_ref() {
                    Key::Character(text) if text.eq_ignore_ascii_case("m") => viewer.toggle_menu(),
                    Key::Character(text) if text.eq_ignore_ascii_case("h") => viewer.toggle_hero(),
                    Key::Named(NamedKey::Escape) => event_loop.exit(),
                    _ => (),
                }
            }
            WindowEvent::RedrawRequested => {
                viewer.redraw();
            }
            _ => (),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // scenes release their surfaces before the window goes away
        if let Some(mut viewer) = self.viewer.take() {
            viewer.menu.close();
            viewer.hero.hide();
        }
    }
}

pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App {
        config,
        viewer: None,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
