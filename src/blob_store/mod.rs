mod fs_store;

pub use fs_store::FsBlobStore;

use anyhow::Result;

/// Bucket holding audio files.
pub const AUDIO_BUCKET: &str = "music";
/// Bucket holding cover images, for both songs and albums.
pub const IMAGES_BUCKET: &str = "music-images";

/// Object storage over named buckets.
///
/// Paths are bucket-relative (e.g. `covers/123_a.png`). Whether a failed
/// removal is fatal is the caller's decision; the cascade deletion manager
/// treats it as a warning.
pub trait BlobStore: Send + Sync {
    fn put(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<()>;

    fn remove(&self, bucket: &str, path: &str) -> Result<()>;

    /// Public URL under which the blob is served. Derived, never persisted.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
