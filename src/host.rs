//! The UI elements that own scene controllers: the hero section on the landing
//! page and the full-screen menu overlay.

use std::{cell::Cell, rc::Rc};

use crate::controller::{Environment, SceneLifecycle};
use crate::platform::Container;
use crate::scenes::{mount, SceneKind};

/// Mounts its hero scene while shown. Hiding, switching variant or dropping
/// the section disposes the scene.
pub struct HeroSection {
    kind: SceneKind,
    container: Rc<Container>,
    env: Environment,
    scene: Option<Box<dyn SceneLifecycle>>,
}

impl HeroSection {
    pub fn new(kind: SceneKind, container: Rc<Container>, env: Environment) -> Self {
        Self {
            kind,
            container,
            env,
            scene: None,
        }
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    pub fn is_visible(&self) -> bool {
        self.scene.is_some()
    }

    pub fn scene(&self) -> Option<&dyn SceneLifecycle> {
        self.scene.as_deref()
    }

    pub fn show(&mut self) {
        if self.scene.is_some() {
            return;
        }

        log::debug!("Showing {} hero", self.kind.name());
        self.scene = Some(mount(self.kind, self.container.clone(), &self.env, None));
    }

    pub fn hide(&mut self) {
        if let Some(scene) = self.scene.take() {
            scene.dispose();
        }
    }

    /// Switches the hero variant, remounting if the section is visible.
    pub fn set_kind(&mut self, kind: SceneKind) {
        if kind == self.kind {
            return;
        }

        let visible = self.is_visible();
        self.hide();
        self.kind = kind;
        if visible {
            self.show();
        }
    }
}

impl Drop for HeroSection {
    fn drop(&mut self) {
        self.hide();
    }
}

/// The navigation overlay. Opening it schedules the model scene to mount once
/// the reveal animation had time to finish; closing it cancels that and
/// disposes whatever was mounted.
pub struct MenuOverlay {
    container: Rc<Container>,
    env: Environment,
    open_delay_ms: f64,
    open: bool,
    mount_at: Option<f64>,
    loading: Rc<Cell<bool>>,
    scene: Option<Box<dyn SceneLifecycle>>,
}

impl MenuOverlay {
    pub const DEFAULT_OPEN_DELAY_MS: f64 = 1000.0;

    pub fn new(container: Rc<Container>, env: Environment, open_delay_ms: f64) -> Self {
        Self {
            container,
            env,
            open_delay_ms,
            open: false,
            mount_at: None,
            loading: Rc::new(Cell::new(true)),
            scene: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn has_pending_mount(&self) -> bool {
        self.mount_at.is_some()
    }

    pub fn scene(&self) -> Option<&dyn SceneLifecycle> {
        self.scene.as_deref()
    }

    pub fn open(&mut self) {
        if self.open {
            return;
        }

        self.open = true;
        self.loading.set(true);
        self.mount_at = Some(self.env.clock.now_ms() + self.open_delay_ms);
        log::debug!("Menu opened, scene mounts in {} ms", self.open_delay_ms);
    }

    pub fn close(&mut self) {
        self.open = false;

        if self.mount_at.take().is_some() {
            log::debug!("Menu closed before its scene mounted");
        }

        if let Some(scene) = self.scene.take() {
            scene.dispose();
        }
    }

    pub fn toggle(&mut self) {
        if self.open {
            self.close();
        } else {
            self.open();
        }
    }

    /// Mounts the scene once the open delay has elapsed. Hosts call this once
    /// per frame.
    pub fn tick(&mut self) {
        let Some(mount_at) = self.mount_at else {
            return;
        };
        if self.env.clock.now_ms() < mount_at {
            return;
        }

        self.mount_at = None;
        if !self.open || self.scene.is_some() {
            return;
        }

        let loading = self.loading.clone();
        self.scene = Some(mount(
            SceneKind::LoadedAsset,
            self.container.clone(),
            &self.env,
            Some(Box::new(move || loading.set(false))),
        ));
    }
}

impl Drop for MenuOverlay {
    fn drop(&mut self) {
        self.close();
    }
}
