//! Cascading entity deletion.
//!
//! The database has no foreign keys, so removing a song, album, or user means
//! deleting its dependent rows explicitly, in dependency order. Row deletes
//! form a fail-fast chain: each step runs only if the previous one succeeded.
//! Blob removal runs after the chain and is best-effort: a file that cannot
//! be removed becomes a warning on an otherwise successful result, leaving an
//! orphaned blob that is not retried.

use crate::blob_store::{BlobStore, AUDIO_BUCKET, IMAGES_BUCKET};
use crate::catalog_store::{AlbumId, CatalogStore, SongId};
use crate::user::UserAdminStore;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DeletionError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A step of the fail-fast record chain errored; later steps were never
    /// attempted and already-committed steps are not rolled back.
    #[error("Record delete failed at '{step}': {source:#}")]
    Record {
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Outcome of a completed deletion. `warnings` holds one message per blob
/// that could not be removed after the record chain succeeded.
#[derive(Debug, Serialize)]
pub struct DeletionReport {
    pub message: String,
    pub warnings: Vec<String>,
}

fn record_step<T>(
    step: &'static str,
    result: anyhow::Result<T>,
) -> Result<T, DeletionError> {
    result.map_err(|source| DeletionError::Record { step, source })
}

pub struct CascadeDeletionManager {
    catalog: Arc<dyn CatalogStore>,
    blobs: Arc<dyn BlobStore>,
    users: Arc<dyn UserAdminStore>,
}

impl CascadeDeletionManager {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        blobs: Arc<dyn BlobStore>,
        users: Arc<dyn UserAdminStore>,
    ) -> Self {
        Self {
            catalog,
            blobs,
            users,
        }
    }

    /// Removes a song, its favorite marks, its album links, and its blobs.
    pub async fn delete_song(&self, song_id: SongId) -> Result<DeletionReport, DeletionError> {
        let song = record_step("fetch song", self.catalog.get_song(song_id))?
            .ok_or(DeletionError::NotFound { entity: "Song" })?;

        record_step(
            "delete favorites",
            self.catalog.delete_favorites_by_song(song_id),
        )?;
        record_step(
            "delete album links",
            self.catalog.delete_album_songs_by_song(song_id),
        )?;
        record_step("delete song", self.catalog.delete_song_row(song_id))?;

        let mut warnings = Vec::new();
        for (bucket, path) in [
            (IMAGES_BUCKET, song.cover_path.as_str()),
            (AUDIO_BUCKET, song.audio_path.as_str()),
        ] {
            if let Err(e) = self.blobs.remove(bucket, path) {
                warn!("Orphaned blob after deleting song {}: {:#}", song_id, e);
                warnings.push(format!("{e:#}"));
            }
        }

        info!(
            "Deleted song {} '{}' ({} blob warnings)",
            song_id,
            song.title,
            warnings.len()
        );
        Ok(DeletionReport {
            message: format!("Song '{}' deleted", song.title),
            warnings,
        })
    }

    /// Removes an album and its song links. Linked songs are kept; only the
    /// links are removed.
    pub async fn delete_album(&self, album_id: AlbumId) -> Result<DeletionReport, DeletionError> {
        let album = record_step("fetch album", self.catalog.get_album(album_id))?
            .ok_or(DeletionError::NotFound { entity: "Album" })?;

        record_step(
            "delete song links",
            self.catalog.delete_album_songs_by_album(album_id),
        )?;
        record_step("delete album", self.catalog.delete_album_row(album_id))?;

        let mut warnings = Vec::new();
        if let Err(e) = self.blobs.remove(IMAGES_BUCKET, &album.cover_path) {
            warn!("Orphaned cover after deleting album {}: {:#}", album_id, e);
            warnings.push(format!("{e:#}"));
        }

        info!(
            "Deleted album {} '{}' ({} blob warnings)",
            album_id,
            album.name,
            warnings.len()
        );
        Ok(DeletionReport {
            message: format!("Album '{}' deleted", album.name),
            warnings,
        })
    }

    /// Removes a user's favorite marks and then the identity itself. Users
    /// own no blobs, so there is no cleanup phase.
    pub async fn delete_user(&self, user_id: &str) -> Result<DeletionReport, DeletionError> {
        let user = record_step("fetch user", self.users.get_user(user_id))?
            .ok_or(DeletionError::NotFound { entity: "User" })?;

        record_step(
            "delete favorites",
            self.catalog.delete_favorites_by_user(user_id),
        )?;
        record_step("delete identity", self.users.delete_user(user_id))?;

        info!("Deleted user {} ({})", user_id, user.email);
        Ok(DeletionReport {
            message: format!("User '{}' deleted", user.email),
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::FsBlobStore;
    use crate::catalog_store::{NewAlbum, NewSong, SqliteCatalogStore};
    use crate::user::SqliteUserAdminStore;
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        catalog: Arc<SqliteCatalogStore>,
        blobs: Arc<FsBlobStore>,
        users: Arc<SqliteUserAdminStore>,
        manager: CascadeDeletionManager,
        _media_dir: TempDir,
    }

    fn fixture() -> Fixture {
        let media_dir = TempDir::new().unwrap();
        let catalog = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let blobs =
            Arc::new(FsBlobStore::new(media_dir.path(), "http://localhost/media").unwrap());
        let users = Arc::new(SqliteUserAdminStore::in_memory().unwrap());
        let manager = CascadeDeletionManager::new(
            catalog.clone() as Arc<dyn CatalogStore>,
            blobs.clone() as Arc<dyn BlobStore>,
            users.clone() as Arc<dyn UserAdminStore>,
        );
        Fixture {
            catalog,
            blobs,
            users,
            manager,
            _media_dir: media_dir,
        }
    }

    impl Fixture {
        fn seed_album(&self, name: &str) -> AlbumId {
            let album = self
                .catalog
                .create_album(NewAlbum {
                    name: name.to_string(),
                    description: None,
                    cover_path: format!("covers/album_covers/{}.png", name),
                })
                .unwrap();
            self.blobs
                .put(IMAGES_BUCKET, &album.cover_path, b"cover")
                .unwrap();
            album.id
        }

        /// Seeds a song with both blobs present in storage.
        fn seed_song(&self, title: &str, album_ids: Vec<AlbumId>) -> SongId {
            let song = self
                .catalog
                .create_song(NewSong {
                    title: title.to_string(),
                    artist: "Artist".to_string(),
                    audio_path: format!("tracks/{}.mp3", title),
                    cover_path: format!("covers/{}.png", title),
                    album_ids,
                })
                .unwrap();
            self.blobs
                .put(AUDIO_BUCKET, &song.audio_path, b"audio")
                .unwrap();
            self.blobs
                .put(IMAGES_BUCKET, &song.cover_path, b"cover")
                .unwrap();
            song.id
        }
    }

    #[tokio::test]
    async fn test_delete_song_removes_rows_and_blobs() {
        let f = fixture();
        let album_id = f.seed_album("a");
        let song_id = f.seed_song("one", vec![album_id]);
        let user = f.users.create_user("u@example.com", json!({})).unwrap();
        f.catalog.add_favorite(&user.user.id, song_id).unwrap();

        let report = f.manager.delete_song(song_id).await.unwrap();
        assert!(report.warnings.is_empty());
        assert_eq!(report.message, "Song 'one' deleted");

        assert!(f.catalog.get_song(song_id).unwrap().is_none());
        assert!(f.catalog.get_album_song_ids(album_id).unwrap().is_empty());
        assert!(f.catalog.get_user_favorites(&user.user.id).unwrap().is_empty());
        // Blobs gone: removing again fails
        assert!(f.blobs.remove(AUDIO_BUCKET, "tracks/one.mp3").is_err());
        assert!(f.blobs.remove(IMAGES_BUCKET, "covers/one.png").is_err());
    }

    #[tokio::test]
    async fn test_delete_song_with_missing_audio_blob_succeeds_with_warning() {
        let f = fixture();
        let album_id = f.seed_album("a");
        let song_id = f.seed_song("one", vec![album_id]);
        f.blobs.remove(AUDIO_BUCKET, "tracks/one.mp3").unwrap();

        let report = f.manager.delete_song(song_id).await.unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("tracks/one.mp3"));
        // The relational state is clean regardless
        assert!(f.catalog.get_song(song_id).unwrap().is_none());
        assert!(f.catalog.get_album_song_ids(album_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_song_is_not_found() {
        let f = fixture();
        let result = f.manager.delete_song(12345).await;
        match result {
            Err(DeletionError::NotFound { entity }) => assert_eq!(entity, "Song"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_album_keeps_linked_songs() {
        let f = fixture();
        let album_id = f.seed_album("a");
        let s1 = f.seed_song("one", vec![album_id]);
        let s2 = f.seed_song("two", vec![album_id]);

        let report = f.manager.delete_album(album_id).await.unwrap();
        assert!(report.warnings.is_empty());

        assert!(f.catalog.get_album(album_id).unwrap().is_none());
        assert!(f.catalog.get_album_song_ids(album_id).unwrap().is_empty());
        // Songs survive their album
        assert!(f.catalog.get_song(s1).unwrap().is_some());
        assert!(f.catalog.get_song(s2).unwrap().is_some());
        // Album cover removed
        assert!(f
            .blobs
            .remove(IMAGES_BUCKET, "covers/album_covers/a.png")
            .is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_album_attempts_no_deletes() {
        let f = fixture();
        let album_id = f.seed_album("a");
        let song_id = f.seed_song("one", vec![album_id]);

        let result = f.manager.delete_album(99).await;
        match result {
            Err(e @ DeletionError::NotFound { .. }) => {
                assert_eq!(e.to_string(), "Album not found");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }

        // Untouched
        assert!(f.catalog.get_album(album_id).unwrap().is_some());
        assert_eq!(f.catalog.get_album_song_ids(album_id).unwrap(), vec![song_id]);
    }

    #[tokio::test]
    async fn test_delete_album_with_missing_cover_blob_warns() {
        let f = fixture();
        let album_id = f.seed_album("a");
        f.blobs
            .remove(IMAGES_BUCKET, "covers/album_covers/a.png")
            .unwrap();

        let report = f.manager.delete_album(album_id).await.unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(f.catalog.get_album(album_id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_user_removes_favorites_and_identity() {
        let f = fixture();
        let song_id = f.seed_song("one", vec![]);
        let user = f.users.create_user("u@example.com", json!({})).unwrap();
        f.catalog.add_favorite(&user.user.id, song_id).unwrap();

        let report = f.manager.delete_user(&user.user.id).await.unwrap();
        assert!(report.warnings.is_empty());
        assert_eq!(report.message, "User 'u@example.com' deleted");

        assert!(f.users.get_user(&user.user.id).unwrap().is_none());
        assert!(f.catalog.get_user_favorites(&user.user.id).unwrap().is_empty());
        // The favorited song itself is untouched
        assert!(f.catalog.get_song(song_id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let f = fixture();
        let result = f.manager.delete_user("no-such-user").await;
        match result {
            Err(DeletionError::NotFound { entity }) => assert_eq!(entity, "User"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
