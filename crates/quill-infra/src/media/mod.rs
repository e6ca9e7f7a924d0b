//! Uploaded media: content-based image detection and local file storage.

mod probe;
mod storage;

pub use probe::ImagesizeProbe;
pub use storage::LocalMediaStorage;
