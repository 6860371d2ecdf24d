use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::{Path, PathBuf},
};

use tokio::sync::mpsc;

use crate::asset::{AssetRequest, AssetSource, LoadProgress};
use crate::error::AssetError;
use crate::model::ModelData;

enum LoadEvent {
    Progress(LoadProgress),
    Finished(Result<ModelData, AssetError>),
}

/// Reads and parses models on a tokio runtime. Results queue up until the
/// host thread calls [`TokioAssetSource::pump`].
pub struct TokioAssetSource {
    runtime: tokio::runtime::Runtime,
    root: PathBuf,
    next_request: Cell<u64>,
    sender: mpsc::UnboundedSender<(u64, LoadEvent)>,
    receiver: RefCell<mpsc::UnboundedReceiver<(u64, LoadEvent)>>,
    requests: RefCell<HashMap<u64, AssetRequest>>,
}

impl TokioAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("showreel-assets")
            .build()?;
        let (sender, receiver) = mpsc::unbounded_channel();

        Ok(Self {
            runtime,
            root: root.into(),
            next_request: Cell::new(0),
            sender,
            receiver: RefCell::new(receiver),
            requests: RefCell::new(HashMap::new()),
        })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    pub fn in_flight(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Delivers every event that has arrived since the last call. Returns the
    /// number of events delivered.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;

        loop {
            let Ok((id, event)) = self.receiver.borrow_mut().try_recv() else {
                break;
            };
            delivered += 1;

            // Callbacks run with no borrow held so they may start new fetches
            match event {
                LoadEvent::Progress(progress) => {
                    let request = self.requests.borrow_mut().remove(&id);
                    if let Some(mut request) = request {
                        (request.on_progress)(progress);
                        self.requests.borrow_mut().insert(id, request);
                    }
                }
                LoadEvent::Finished(result) => {
                    let request = self.requests.borrow_mut().remove(&id);
                    if let Some(request) = request {
                        (request.on_complete)(result);
                    }
                }
            }
        }

        delivered
    }
}

async fn load(
    path: PathBuf,
    sender: &mpsc::UnboundedSender<(u64, LoadEvent)>,
    id: u64,
) -> Result<ModelData, AssetError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| AssetError::Io {
            path: path.display().to_string(),
            source,
        })?;

    let size = bytes.len() as u64;
    let _ = sender.send((
        id,
        LoadEvent::Progress(LoadProgress {
            loaded: size,
            total: size,
        }),
    ));

    let name = model_name(&path);
    tokio::task::spawn_blocking(move || ModelData::from_glb(name, &bytes))
        .await
        .map_err(|err| AssetError::Worker(err.to_string()))?
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

impl AssetSource for TokioAssetSource {
    fn fetch(&self, path: &str, request: AssetRequest) {
        let id = self.next_request.get();
        self.next_request.set(id + 1);
        self.requests.borrow_mut().insert(id, request);

        let path = self.resolve(path);
        let sender = self.sender.clone();
        log::debug!("Fetching asset {}", path.display());

        self.runtime.spawn(async move {
            let result = load(path, &sender, id).await;
            let _ = sender.send((id, LoadEvent::Finished(result)));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{rc::Rc, time::Duration};

    #[test]
    fn test_missing_file_reports_io_error() {
        let source = TokioAssetSource::new(std::env::temp_dir()).unwrap();
        let outcome: Rc<RefCell<Option<Result<ModelData, AssetError>>>> =
            Rc::new(RefCell::new(None));

        let slot = outcome.clone();
        source.fetch(
            "/showreel-does-not-exist.glb",
            AssetRequest::new(|_| {}, move |result| *slot.borrow_mut() = Some(result)),
        );
        assert_eq!(source.in_flight(), 1);

        for _ in 0..200 {
            source.pump();
            if outcome.borrow().is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        assert!(matches!(
            outcome.borrow().as_ref(),
            Some(Err(AssetError::Io { .. }))
        ));
        assert_eq!(source.in_flight(), 0);
    }
}
