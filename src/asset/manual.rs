use std::{cell::RefCell, collections::VecDeque};

use crate::asset::{AssetRequest, AssetSource, LoadProgress};
use crate::error::AssetError;
use crate::model::ModelData;

/// Keeps every request pending until the owner decides how it ends. Lets a
/// host (or a test) model any load latency, including "never".
#[derive(Default)]
pub struct ManualAssetSource {
    pending: RefCell<VecDeque<(String, AssetRequest)>>,
}

impl ManualAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn pending_paths(&self) -> Vec<String> {
        self.pending
            .borrow()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Reports progress on the oldest pending request.
    pub fn report_progress(&self, loaded: u64, total: u64) -> bool {
        let Some((path, mut request)) = self.pending.borrow_mut().pop_front() else {
            return false;
        };

        (request.on_progress)(LoadProgress { loaded, total });
        self.pending.borrow_mut().push_front((path, request));
        true
    }

    /// Completes the oldest pending request. Returns false if none was
    /// pending.
    pub fn resolve_next(&self, result: Result<ModelData, AssetError>) -> bool {
        let Some((_, request)) = self.pending.borrow_mut().pop_front() else {
            return false;
        };

        (request.on_complete)(result);
        true
    }
}

impl AssetSource for ManualAssetSource {
    fn fetch(&self, path: &str, request: AssetRequest) {
        self.pending.borrow_mut().push_back((path.to_string(), request));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, rc::Rc};

    #[test]
    fn test_requests_resolve_in_order() {
        let source = ManualAssetSource::new();
        let completed = Rc::new(RefCell::new(Vec::new()));
        let progress = Rc::new(Cell::new(0));

        for path in ["a.glb", "b.glb"] {
            let completed = completed.clone();
            let progress = progress.clone();
            source.fetch(
                path,
                AssetRequest::new(
                    move |_| progress.set(progress.get() + 1),
                    move |result: Result<ModelData, AssetError>| {
                        completed.borrow_mut().push(result.is_ok())
                    },
                ),
            );
        }

        assert_eq!(source.pending_paths(), vec!["a.glb", "b.glb"]);
        assert!(source.report_progress(5, 10));
        assert!(source.resolve_next(Err(AssetError::Empty("a.glb".into()))));
        assert_eq!(source.pending_count(), 1);
        assert_eq!(progress.get(), 1);
        assert_eq!(*completed.borrow(), vec![false]);
    }
}
