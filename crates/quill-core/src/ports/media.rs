//! Media ports: image detection and storage of uploaded files.

use async_trait::async_trait;

/// Raster image recognised from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedImage {
    /// Canonical file extension for the detected format.
    pub extension: &'static str,
    pub width: usize,
    pub height: usize,
}

/// Decides whether uploaded bytes are a supported raster image.
///
/// Detection looks at the content only; the client-supplied file name and
/// content type are ignored.
pub trait ImageProbe: Send + Sync {
    fn probe(&self, bytes: &[u8]) -> Option<DetectedImage>;
}

/// Stores uploaded files and hands back a path relative to the media root.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn store(&self, dir: &str, extension: &str, bytes: &[u8]) -> Result<String, MediaError>;

    async fn remove(&self, path: &str) -> Result<(), MediaError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid media path: {0}")]
    InvalidPath(String),
}
