use std::cell::{Cell, RefCell};

pub type FrameCallback = Box<dyn FnOnce(f64)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// Stand-in for `requestAnimationFrame`: callbacks queued with
/// [`FrameScheduler::request_frame`] run once, on the next [`run_frame`].
///
/// [`run_frame`]: FrameScheduler::run_frame
#[derive(Default)]
pub struct FrameScheduler {
    next_handle: Cell<u64>,
    pending: RefCell<Vec<(FrameHandle, FrameCallback)>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let handle = FrameHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.pending.borrow_mut().push((handle, callback));
        handle
    }

    pub fn cancel_frame(&self, handle: FrameHandle) -> bool {
        let mut pending = self.pending.borrow_mut();
        let before = pending.len();
        pending.retain(|(pending_handle, _)| *pending_handle != handle);
        pending.len() != before
    }

    /// Runs every callback that was queued before this call. Callbacks queued
    /// while running are left for the next frame.
    pub fn run_frame(&self, timestamp_ms: f64) -> usize {
        let due = std::mem::take(&mut *self.pending.borrow_mut());
        let count = due.len();

        for (_, callback) in due {
            callback(timestamp_ms);
        }

        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}
