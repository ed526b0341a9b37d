//! Filesystem-backed blob store.
//!
//! Buckets map to directories under a media root; the same tree is statically
//! served by the HTTP layer, which is what makes `public_url` resolvable.

use super::BlobStore;
use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub struct FsBlobStore {
    media_root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn new<P: AsRef<Path>>(media_root: P, public_base_url: &str) -> Result<Self> {
        let media_root = media_root.as_ref().to_path_buf();
        if !media_root.is_dir() {
            bail!("Media root is not a directory: {:?}", media_root);
        }
        Ok(Self {
            media_root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(path);
        // Blob paths come from stored rows and upload handlers, but never
        // allow them to climb out of the media root.
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("Invalid blob path: {}/{}", bucket, path);
        }
        Ok(self.media_root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<()> {
        let full_path = self.resolve(bucket, path)?;
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create blob directory {:?}", parent))?;
        }
        std::fs::write(&full_path, bytes)
            .with_context(|| format!("Failed to write blob {}/{}", bucket, path))?;
        debug!("Stored blob {}/{} ({} bytes)", bucket, path, bytes.len());
        Ok(())
    }

    fn remove(&self, bucket: &str, path: &str) -> Result<()> {
        let full_path = self.resolve(bucket, path)?;
        std::fs::remove_file(&full_path)
            .with_context(|| format!("Failed to remove blob {}/{}", bucket, path))
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::{AUDIO_BUCKET, IMAGES_BUCKET};
    use tempfile::tempdir;

    #[test]
    fn test_put_and_remove() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "http://localhost:3001/media").unwrap();

        store
            .put(AUDIO_BUCKET, "tracks/1_a.mp3", b"audio bytes")
            .unwrap();
        let on_disk = dir.path().join("music/tracks/1_a.mp3");
        assert!(on_disk.exists());

        store.remove(AUDIO_BUCKET, "tracks/1_a.mp3").unwrap();
        assert!(!on_disk.exists());
    }

    #[test]
    fn test_remove_missing_blob_errors() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "http://localhost:3001/media").unwrap();

        let result = store.remove(IMAGES_BUCKET, "covers/nope.png");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("covers/nope.png"));
    }

    #[test]
    fn test_public_url_shape() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "http://localhost:3001/media/").unwrap();

        assert_eq!(
            store.public_url(IMAGES_BUCKET, "covers/a.png"),
            "http://localhost:3001/media/music-images/covers/a.png"
        );
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "http://localhost:3001/media").unwrap();

        assert!(store.put(AUDIO_BUCKET, "../escape.mp3", b"x").is_err());
        assert!(store.remove(AUDIO_BUCKET, "../../etc/passwd").is_err());
    }
}
