use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse glTF asset")]
    Parse(#[from] gltf::Error),
    #[error("asset {0} contains no triangle geometry")]
    Empty(String),
    #[error("asset worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("rendering context unavailable: {0}")]
    ContextUnavailable(String),
    #[error("output surface lost")]
    SurfaceLost,
    #[error("frame failed: {0}")]
    Frame(String),
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("invalid scene parameter: {0}")]
    InvalidParameter(String),
}
