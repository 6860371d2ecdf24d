//! Where loaded-asset scenes get their binary models from.
//!
//! A fetch reports through callbacks that always run on the host thread, and
//! never from inside the `fetch` call itself.

pub mod manual;
pub mod tokio_source;

use crate::error::AssetError;
use crate::model::ModelData;

pub use manual::ManualAssetSource;
pub use tokio_source::TokioAssetSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl LoadProgress {
    pub fn percent(&self) -> Option<f64> {
        (self.total > 0).then(|| self.loaded as f64 / self.total as f64 * 100.0)
    }
}

pub type ProgressCallback = Box<dyn FnMut(LoadProgress)>;
pub type CompletionCallback = Box<dyn FnOnce(Result<ModelData, AssetError>)>;

pub struct AssetRequest {
    pub on_progress: ProgressCallback,
    pub on_complete: CompletionCallback,
}

impl AssetRequest {
    pub fn new(
        on_progress: impl FnMut(LoadProgress) + 'static,
        on_complete: impl FnOnce(Result<ModelData, AssetError>) + 'static,
    ) -> Self {
        Self {
            on_progress: Box::new(on_progress),
            on_complete: Box::new(on_complete),
        }
    }
}

pub trait AssetSource {
    fn fetch(&self, path: &str, request: AssetRequest);
}
