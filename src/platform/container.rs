use std::{
    cell::{Cell, RefCell},
    sync::atomic::{AtomicU64, Ordering},
};

/// Identifies a renderer's output node (its canvas or surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub fn next() -> NodeId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The element a scene renders into. Width and height are the element's
/// client size in CSS pixels.
#[derive(Debug)]
pub struct Container {
    width: Cell<u32>,
    height: Cell<u32>,
    children: RefCell<Vec<NodeId>>,
}

impl Container {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Cell::new(width),
            height: Cell::new(height),
            children: RefCell::new(Vec::new()),
        }
    }

    pub fn client_size(&self) -> (u32, u32) {
        (self.width.get(), self.height.get())
    }

    pub fn has_area(&self) -> bool {
        self.width.get() > 0 && self.height.get() > 0
    }

    pub fn set_client_size(&self, width: u32, height: u32) {
        self.width.set(width);
        self.height.set(height);
    }

    pub fn append_child(&self, node: NodeId) {
        let mut children = self.children.borrow_mut();
        children.retain(|&child| child != node);
        children.push(node);
    }

    pub fn remove_child(&self, node: NodeId) -> bool {
        let mut children = self.children.borrow_mut();
        let before = children.len();
        children.retain(|&child| child != node);
        children.len() != before
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.children.borrow().contains(&node)
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }
}
