//! The scene lifecycle shared by every hero and overlay scene.
//!
//! A [`SceneController`] owns one renderer, one scene graph and one camera.
//! It registers exactly one resize and one pointer listener on the viewport,
//! drives a self-rescheduling frame loop and tears everything down again in
//! [`SceneController::dispose`]. What a scene actually draws is left to its
//! [`SceneStrategy`].

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use glam::{Vec2, Vec3};

use crate::asset::{AssetRequest, AssetSource, LoadProgress};
use crate::camera::PerspectiveCamera;
use crate::error::{AssetError, SceneError};
use crate::model::ModelData;
use crate::platform::{Clock, Container, FrameHandle, FrameScheduler, ListenerId, NodeId, Viewport};
use crate::rendering::{RenderBackend, Renderer, RendererOptions};
use crate::scene_graph::Scene;

pub type ReadyCallback = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLoadState {
    NotRequested,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    pub aspect: f32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            pixel_ratio: 1.0,
            aspect: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
        }
    }
}

/// Everything a strategy may read while advancing one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Timestamp handed to the frame callback.
    pub time_ms: f64,
    /// Wall clock at the time of the frame.
    pub wall_ms: f64,
    /// Latest pointer position in [-1, 1], +y up.
    pub pointer: Vec2,
}

/// The handles a host passes to every controller it constructs.
#[derive(Clone)]
pub struct Environment {
    pub viewport: Rc<Viewport>,
    pub frames: Rc<FrameScheduler>,
    pub backend: Rc<dyn RenderBackend>,
    pub assets: Rc<dyn AssetSource>,
    pub clock: Rc<dyn Clock>,
}

/// What differs between scenes. The controller calls these with its state
/// borrowed, so implementations must not reach back into the controller.
pub trait SceneStrategy: 'static {
    const NAME: &'static str;

    fn camera(&self) -> CameraSettings {
        CameraSettings::default()
    }

    fn renderer_options(&self) -> RendererOptions {
        RendererOptions::default()
    }

    /// Upper bound for the renderer pixel ratio. `None` uses the device ratio.
    fn max_pixel_ratio(&self) -> Option<f32> {
        None
    }

    fn build(&mut self, scene: &mut Scene) -> Result<(), SceneError>;

    /// Path of the model to stream in after the scene is built.
    fn asset_path(&self) -> Option<&str> {
        None
    }

    fn asset_loaded(&mut self, _scene: &mut Scene, _result: Result<ModelData, AssetError>) {}

    fn pointer_moved(&mut self, _pointer: Vec2, _now_ms: f64) {}

    fn update(&mut self, scene: &mut Scene, frame: &FrameContext);
}

/// Object-safe view of a controller, for hosts that hold any variant.
pub trait SceneLifecycle {
    fn name(&self) -> &'static str;
    fn initialize(&self);
    fn start(&self);
    fn dispose(&self);
    fn state(&self) -> LifecycleState;
    fn asset_state(&self) -> AssetLoadState;
    fn viewport_state(&self) -> ViewportState;
}

struct SceneResources {
    scene: Scene,
    camera: PerspectiveCamera,
    renderer: Box<dyn Renderer>,
    node: NodeId,
}

struct Inner<S> {
    strategy: S,
    state: LifecycleState,
    asset_state: AssetLoadState,
    resources: Option<SceneResources>,
    viewport: ViewportState,
    pointer: Vec2,
    listeners: Vec<ListenerId>,
    frame: Option<FrameHandle>,
    start_requested: bool,
    on_ready: Option<ReadyCallback>,
}

struct Shared<S> {
    inner: RefCell<Inner<S>>,
    /// Cleared by dispose. Continuations that outlive the controller check it
    /// before touching anything.
    alive: Rc<Cell<bool>>,
    container: Rc<Container>,
    env: Environment,
}

pub struct SceneController<S: SceneStrategy> {
    shared: Rc<Shared<S>>,
}

impl<S: SceneStrategy> SceneController<S> {
    pub fn new(
        strategy: S,
        container: Rc<Container>,
        env: Environment,
        on_ready: Option<ReadyCallback>,
    ) -> Self {
        let inner = Inner {
            strategy,
            state: LifecycleState::Uninitialized,
            asset_state: AssetLoadState::NotRequested,
            resources: None,
            viewport: ViewportState::default(),
            pointer: Vec2::ZERO,
            listeners: Vec::new(),
            frame: None,
            start_requested: false,
            on_ready,
        };

        Self {
            shared: Rc::new(Shared {
                inner: RefCell::new(inner),
                alive: Rc::new(Cell::new(true)),
                container,
                env,
            }),
        }
    }

    pub fn pointer(&self) -> Vec2 {
        self.shared.inner.borrow().pointer
    }

    pub fn listener_count(&self) -> usize {
        self.shared.inner.borrow().listeners.len()
    }

    pub fn output_node(&self) -> Option<NodeId> {
        self.shared
            .inner
            .borrow()
            .resources
            .as_ref()
            .map(|resources| resources.node)
    }

    /// Runs `f` against the live scene and camera, if there are any.
    pub fn with_scene<R>(&self, f: impl FnOnce(&Scene, &PerspectiveCamera) -> R) -> Option<R> {
        let inner = self.shared.inner.borrow();
        inner
            .resources
            .as_ref()
            .map(|resources| f(&resources.scene, &resources.camera))
    }

    pub fn with_strategy<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.shared.inner.borrow().strategy)
    }
}

impl<S: SceneStrategy> Shared<S> {
    fn initialize(self: &Rc<Self>) {
        if self.inner.borrow().state != LifecycleState::Uninitialized {
            return;
        }

        if !self.container.has_area() {
            log::warn!(
                "{}: container has no area yet, deferring initialization",
                S::NAME
            );
            self.ensure_listeners();
            return;
        }

        self.inner.borrow_mut().state = LifecycleState::Initializing;
        log::debug!("{}: initializing", S::NAME);

        let mut fire_ready = false;
        let mut asset_path = None;

        {
            let mut inner = self.inner.borrow_mut();
            let inner = &mut *inner;

            match self.create_resources(&mut inner.strategy) {
                Ok((resources, viewport)) => {
                    inner.viewport = viewport;
                    asset_path = inner.strategy.asset_path().map(str::to_owned);
                    if asset_path.is_some() {
                        inner.asset_state = AssetLoadState::Loading;
                    } else {
                        fire_ready = true;
                    }
                    inner.resources = Some(resources);
                }
                Err(err) => {
                    log::error!("{}: could not set up the scene: {:#}", S::NAME, err);
                    if inner.strategy.asset_path().is_some() {
                        inner.asset_state = AssetLoadState::Failed;
                    }
                    fire_ready = true;
                }
            }
        }

        if let Some(path) = asset_path {
            self.begin_asset_load(&path);
        }

        if fire_ready {
            self.fire_ready();
        }

        if self.inner.borrow().start_requested {
            self.start();
        }
    }

    fn create_resources(
        &self,
        strategy: &mut S,
    ) -> anyhow::Result<(SceneResources, ViewportState)> {
        let (width, height) = self.container.client_size();
        let aspect = width as f32 / height as f32;

        let settings = strategy.camera();
        let mut camera = PerspectiveCamera::new(
            settings.fov_degrees,
            aspect,
            settings.near,
            settings.far,
        );
        camera.position = settings.position;
        camera.look_at(settings.target);

        let mut renderer = self.env.backend.create_renderer(&strategy.renderer_options())?;

        let device_ratio = self.env.viewport.device_pixel_ratio();
        let pixel_ratio = strategy
            .max_pixel_ratio()
            .map_or(device_ratio, |max| device_ratio.min(max));
        renderer.set_pixel_ratio(pixel_ratio);
        renderer.set_size(width, height);

        let mut scene = Scene::new();
        if let Err(err) = strategy.build(&mut scene) {
            scene.dispose_resources();
            renderer.dispose();
            return Err(err.into());
        }

        let node = renderer.output_node();
        self.container.append_child(node);

        Ok((
            SceneResources {
                scene,
                camera,
                renderer,
                node,
            },
            ViewportState {
                width,
                height,
                pixel_ratio,
                aspect,
            },
        ))
    }

    fn start(self: &Rc<Self>) {
        let state = {
            let mut inner = self.inner.borrow_mut();
            inner.start_requested = true;
            inner.state
        };

        match state {
            LifecycleState::Uninitialized => {
                if self.container.has_area() {
                    // initialize starts the loop since the start is recorded
                    self.initialize();
                } else {
                    // picked up again once a resize gives the container an area
                    self.ensure_listeners();
                }
                return;
            }
            LifecycleState::Ready | LifecycleState::Disposed => return,
            LifecycleState::Initializing => {}
        }

        if self.inner.borrow().resources.is_none() {
            log::debug!("{}: nothing to render, loop not started", S::NAME);
            return;
        }

        self.ensure_listeners();
        self.inner.borrow_mut().state = LifecycleState::Ready;
        log::debug!("{}: ready", S::NAME);

        self.render_frame(0.0);
        self.schedule_frame();
    }

    fn ensure_listeners(self: &Rc<Self>) {
        if !self.inner.borrow().listeners.is_empty() {
            return;
        }

        let viewport = &self.env.viewport;

        let weak: Weak<Self> = Rc::downgrade(self);
        let resize = viewport.add_resize_listener(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_resize();
            }
        });

        let weak: Weak<Self> = Rc::downgrade(self);
        let pointer = viewport.add_pointer_move_listener(move |event| {
            if let Some(shared) = weak.upgrade() {
                let position = shared.env.viewport.normalize_pointer(event);
                shared.on_pointer_move(position);
            }
        });

        self.inner.borrow_mut().listeners.extend([resize, pointer]);
    }

    fn on_resize(self: &Rc<Self>) {
        let state = self.inner.borrow().state;

        match state {
            LifecycleState::Uninitialized => {
                if self.container.has_area() {
                    self.initialize();
                }
            }
            LifecycleState::Initializing | LifecycleState::Ready => self.resize(),
            LifecycleState::Disposed => {}
        }
    }

    fn resize(&self) {
        let (width, height) = self.container.client_size();
        if width == 0 || height == 0 {
            return;
        }

        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;
        let Some(resources) = &mut inner.resources else {
            return;
        };

        let aspect = width as f32 / height as f32;
        resources.camera.set_aspect(aspect);
        resources.renderer.set_size(width, height);

        inner.viewport.width = width;
        inner.viewport.height = height;
        inner.viewport.aspect = aspect;
    }

    fn on_pointer_move(&self, position: Vec2) {
        let now_ms = self.env.clock.now_ms();
        let mut inner = self.inner.borrow_mut();

        if inner.state == LifecycleState::Disposed {
            return;
        }

        inner.pointer = position;
        inner.strategy.pointer_moved(position, now_ms);
    }

    fn schedule_frame(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        let handle = self.env.frames.request_frame(Box::new(move |timestamp| {
            if let Some(shared) = weak.upgrade() {
                shared.on_frame(timestamp);
            }
        }));

        self.inner.borrow_mut().frame = Some(handle);
    }

    fn on_frame(self: &Rc<Self>, timestamp_ms: f64) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.frame = None;
            if inner.state != LifecycleState::Ready {
                return;
            }
        }

        self.render_frame(timestamp_ms);
        self.schedule_frame();
    }

    fn render_frame(&self, timestamp_ms: f64) {
        let wall_ms = self.env.clock.now_ms();
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;

        let Some(resources) = &mut inner.resources else {
            return;
        };

        let frame = FrameContext {
            time_ms: timestamp_ms,
            wall_ms,
            pointer: inner.pointer,
        };
        inner.strategy.update(&mut resources.scene, &frame);

        if let Err(err) = resources.renderer.render(&resources.scene, &resources.camera) {
            log::error!("{}: frame failed: {}", S::NAME, err);
        }
    }

    fn begin_asset_load(self: &Rc<Self>, path: &str) {
        log::debug!("{}: loading {}", S::NAME, path);

        let alive = self.alive.clone();
        let progress_alive = self.alive.clone();
        let weak = Rc::downgrade(self);

        let request = AssetRequest::new(
            move |progress: LoadProgress| {
                if !progress_alive.get() {
                    return;
                }
                if let Some(percent) = progress.percent() {
                    log::debug!("{}: {:.0}% loaded", S::NAME, percent);
                }
            },
            move |result| {
                if !alive.get() {
                    log::debug!("{}: load settled after dispose, ignoring", S::NAME);
                    return;
                }
                if let Some(shared) = weak.upgrade() {
                    shared.finish_asset_load(result);
                }
            },
        );

        self.env.assets.fetch(path, request);
    }

    fn finish_asset_load(&self, result: Result<ModelData, AssetError>) {
        let result = result.and_then(ModelData::into_renderable);

        {
            let mut inner = self.inner.borrow_mut();
            let inner = &mut *inner;

            if inner.state == LifecycleState::Disposed {
                return;
            }

            let loaded = match &result {
                Ok(model) => {
                    log::info!("{}: loaded model {}", S::NAME, model.name);
                    true
                }
                Err(err) => {
                    log::error!("{}: model failed to load: {}", S::NAME, err);
                    false
                }
            };

            if let Some(resources) = &mut inner.resources {
                inner.strategy.asset_loaded(&mut resources.scene, result);
            }

            inner.asset_state = if loaded {
                AssetLoadState::Loaded
            } else {
                AssetLoadState::Failed
            };
        }

        self.fire_ready();
    }

    fn fire_ready(&self) {
        let on_ready = self.inner.borrow_mut().on_ready.take();
        if let Some(on_ready) = on_ready {
            on_ready();
        }
    }

    fn dispose(&self) {
        self.alive.set(false);

        let on_ready = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == LifecycleState::Disposed {
                return;
            }
            inner.state = LifecycleState::Disposed;

            if let Some(handle) = inner.frame.take() {
                self.env.frames.cancel_frame(handle);
            }

            for id in inner.listeners.drain(..) {
                self.env.viewport.remove_listener(id);
            }

            if let Some(mut resources) = inner.resources.take() {
                let report = resources.scene.dispose_resources();
                resources.renderer.dispose();
                self.container.remove_child(resources.node);

                log::debug!(
                    "{}: disposed {} geometries, {} materials, {} textures",
                    S::NAME,
                    report.geometries,
                    report.materials,
                    report.textures
                );
            }

            inner.on_ready.take()
        };

        drop(on_ready);
    }
}

impl<S: SceneStrategy> SceneLifecycle for SceneController<S> {
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn initialize(&self) {
        self.shared.initialize();
    }

    fn start(&self) {
        self.shared.start();
    }

    fn dispose(&self) {
        self.shared.dispose();
    }

    fn state(&self) -> LifecycleState {
        self.shared.inner.borrow().state
    }

    fn asset_state(&self) -> AssetLoadState {
        self.shared.inner.borrow().asset_state
    }

    fn viewport_state(&self) -> ViewportState {
        self.shared.inner.borrow().viewport
    }
}

impl<S: SceneStrategy> Drop for SceneController<S> {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::ManualAssetSource;
    use crate::platform::{ManualClock, PointerEvent};
    use crate::rendering::HeadlessBackend;
    use crate::scene_graph::Object3D;

    #[derive(Default)]
    struct Probe {
        updates: usize,
        last_pointer: Vec2,
    }

    impl SceneStrategy for Probe {
        const NAME: &'static str = "probe";

        fn build(&mut self, scene: &mut Scene) -> Result<(), SceneError> {
            scene.add(Object3D::group("probe"));
            Ok(())
        }

        fn pointer_moved(&mut self, pointer: Vec2, _now_ms: f64) {
            self.last_pointer = pointer;
        }

        fn update(&mut self, _scene: &mut Scene, _frame: &FrameContext) {
            self.updates += 1;
        }
    }

    fn environment() -> Environment {
        Environment {
            viewport: Rc::new(Viewport::new(800.0, 600.0, 1.0)),
            frames: Rc::new(FrameScheduler::new()),
            backend: Rc::new(HeadlessBackend::new()),
            assets: Rc::new(ManualAssetSource::new()),
            clock: Rc::new(ManualClock::new(0.0)),
        }
    }

    #[test]
    fn test_start_renders_first_frame_synchronously() {
        let env = environment();
        let container = Rc::new(Container::new(800, 600));
        let controller = SceneController::new(Probe::default(), container, env.clone(), None);

        controller.initialize();
        assert_eq!(controller.state(), LifecycleState::Initializing);

        controller.start();
        assert_eq!(controller.state(), LifecycleState::Ready);
        assert_eq!(controller.with_strategy(|probe| probe.updates), 1);
        assert_eq!(env.frames.pending_count(), 1);

        env.frames.run_frame(16.0);
        assert_eq!(controller.with_strategy(|probe| probe.updates), 2);
    }

    #[test]
    fn test_pointer_reaches_strategy() {
        let env = environment();
        let container = Rc::new(Container::new(800, 600));
        let controller = SceneController::new(Probe::default(), container, env.clone(), None);

        controller.initialize();
        controller.start();
        env.viewport.dispatch_pointer_move(PointerEvent {
            client_x: 800.0,
            client_y: 0.0,
        });

        assert_eq!(controller.pointer(), Vec2::new(1.0, 1.0));
        assert_eq!(
            controller.with_strategy(|probe| probe.last_pointer),
            Vec2::new(1.0, 1.0)
        );
    }

    #[test]
    fn test_drop_disposes() {
        let env = environment();
        let container = Rc::new(Container::new(800, 600));

        {
            let controller =
                SceneController::new(Probe::default(), container.clone(), env.clone(), None);
            controller.initialize();
            controller.start();
            assert_eq!(container.child_count(), 1);
        }

        assert_eq!(container.child_count(), 0);
        assert_eq!(env.viewport.listener_count(), 0);
        assert_eq!(env.frames.pending_count(), 0);
    }
}
