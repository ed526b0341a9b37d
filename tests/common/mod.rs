//! Shared fixture for admin API integration tests.
//!
//! Builds a router over in-memory SQLite stores and a tempdir-backed blob
//! store, so tests can drive the full HTTP surface without binding a socket.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use catalog_admin_server::blob_store::{BlobStore, FsBlobStore, AUDIO_BUCKET, IMAGES_BUCKET};
use catalog_admin_server::catalog_store::{
    AlbumId, CatalogStore, NewAlbum, NewSong, SongId, SqliteCatalogStore,
};
use catalog_admin_server::server::{make_router, RequestsLoggingLevel, ServerState};
use catalog_admin_server::user::{SqliteUserAdminStore, UserAdminStore};
use http_body_util::BodyExt;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub catalog: Arc<SqliteCatalogStore>,
    pub blobs: Arc<FsBlobStore>,
    pub users: Arc<SqliteUserAdminStore>,
    _media_dir: TempDir,
}

pub fn test_app() -> TestApp {
    let media_dir = TempDir::new().unwrap();
    let catalog = Arc::new(SqliteCatalogStore::in_memory().unwrap());
    let blobs = Arc::new(FsBlobStore::new(media_dir.path(), "http://localhost/media").unwrap());
    let users = Arc::new(SqliteUserAdminStore::in_memory().unwrap());

    let state = ServerState::new(
        catalog.clone() as Arc<dyn CatalogStore>,
        blobs.clone() as Arc<dyn BlobStore>,
        users.clone() as Arc<dyn UserAdminStore>,
        RequestsLoggingLevel::None,
    );
    let router = make_router(state, media_dir.path().to_path_buf());

    TestApp {
        router,
        catalog,
        blobs,
        users,
        _media_dir: media_dir,
    }
}

impl TestApp {
    pub fn seed_album(&self, name: &str) -> AlbumId {
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

    /// Seeds a song with both of its blobs present in storage.
    pub fn seed_song(&self, title: &str, album_ids: Vec<AlbumId>) -> SongId {
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

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn assert_json(
    response: Response<Body>,
    expected_status: StatusCode,
) -> serde_json::Value {
    assert_eq!(response.status(), expected_status);
    json_body(response).await
}
