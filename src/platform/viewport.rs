use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Pointer position in client (CSS pixel) coordinates, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub client_x: f32,
    pub client_y: f32,
}

enum Listener {
    Resize(Rc<dyn Fn()>),
    PointerMove(Rc<dyn Fn(PointerEvent)>),
}

/// The global window: its size, pixel density and the `resize` /
/// `pointermove` listeners registered on it.
pub struct Viewport {
    inner_width: Cell<f32>,
    inner_height: Cell<f32>,
    device_pixel_ratio: Cell<f32>,
    next_listener: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
}

impl Viewport {
    pub fn new(inner_width: f32, inner_height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            inner_width: Cell::new(inner_width),
            inner_height: Cell::new(inner_height),
            device_pixel_ratio: Cell::new(device_pixel_ratio),
            next_listener: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn inner_size(&self) -> (f32, f32) {
        (self.inner_width.get(), self.inner_height.get())
    }

    pub fn set_inner_size(&self, width: f32, height: f32) {
        self.inner_width.set(width);
        self.inner_height.set(height);
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio.get()
    }

    pub fn set_device_pixel_ratio(&self, ratio: f32) {
        self.device_pixel_ratio.set(ratio);
    }

    fn register(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn add_resize_listener(&self, listener: impl Fn() + 'static) -> ListenerId {
        self.register(Listener::Resize(Rc::new(listener)))
    }

    pub fn add_pointer_move_listener(
        &self,
        listener: impl Fn(PointerEvent) + 'static,
    ) -> ListenerId {
        self.register(Listener::PointerMove(Rc::new(listener)))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn dispatch_resize(&self) {
        // Snapshot first: a listener is allowed to unregister listeners
        let handlers: Vec<Rc<dyn Fn()>> = self
            .listeners
            .borrow()
            .iter()
            .filter_map(|(_, listener)| match listener {
                Listener::Resize(handler) => Some(handler.clone()),
                Listener::PointerMove(_) => None,
            })
            .collect();

        for handler in handlers {
            handler();
        }
    }

    pub fn dispatch_pointer_move(&self, event: PointerEvent) {
        let handlers: Vec<Rc<dyn Fn(PointerEvent)>> = self
            .listeners
            .borrow()
            .iter()
            .filter_map(|(_, listener)| match listener {
                Listener::PointerMove(handler) => Some(handler.clone()),
                Listener::Resize(_) => None,
            })
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    /// Maps client coordinates to [-1, 1] on both axes, +y up.
    pub fn normalize_pointer(&self, event: PointerEvent) -> Vec2 {
        let (width, height) = self.inner_size();

        if width <= 0.0 || height <= 0.0 {
            return Vec2::ZERO;
        }

        let x = (event.client_x / width) * 2.0 - 1.0;
        let y = -(event.client_y / height) * 2.0 + 1.0;
        Vec2::new(x, y).clamp(Vec2::NEG_ONE, Vec2::ONE)
    }
}
