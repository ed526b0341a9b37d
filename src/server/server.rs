use anyhow::Result;
use std::path::PathBuf;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::blob_store::{AUDIO_BUCKET, IMAGES_BUCKET};
use crate::catalog_store::{
    Album, AlbumId, AlbumPatch, NewAlbum, NewSong, Song, SongId, SongPatch,
};
use crate::deletion::DeletionError;
use crate::ordering::OrderingError;

use super::http_layers::log_requests;
use super::state::*;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
        .into_response()
}

fn internal_error(err: anyhow::Error) -> Response {
    error!("{:#}", err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
}

/// A song with its derived public URLs attached.
#[derive(Serialize)]
struct SongView {
    #[serde(flatten)]
    song: Song,
    audio_url: String,
    cover_url: String,
}

#[derive(Serialize)]
struct AlbumView {
    #[serde(flatten)]
    album: Album,
    cover_url: String,
}

#[derive(Serialize)]
struct AlbumSongView {
    order_index: i64,
    #[serde(flatten)]
    song: SongView,
}

#[derive(Serialize)]
struct AlbumDetailView {
    #[serde(flatten)]
    album: AlbumView,
    songs: Vec<AlbumSongView>,
}

fn song_view(blobs: &GuardedBlobStore, song: Song) -> SongView {
    let audio_url = blobs.public_url(AUDIO_BUCKET, &song.audio_path);
    let cover_url = blobs.public_url(IMAGES_BUCKET, &song.cover_path);
    SongView {
        song,
        audio_url,
        cover_url,
    }
}

fn album_view(blobs: &GuardedBlobStore, album: Album) -> AlbumView {
    let cover_url = blobs.public_url(IMAGES_BUCKET, &album.cover_path);
    AlbumView { album, cover_url }
}

// Songs

async fn list_songs(
    State(catalog): State<GuardedCatalogStore>,
    State(blobs): State<GuardedBlobStore>,
) -> Response {
    match catalog.list_songs() {
        Ok(songs) => Json(
            songs
                .into_iter()
                .map(|s| song_view(&blobs, s))
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => internal_error(err),
    }
}

async fn get_song(
    State(catalog): State<GuardedCatalogStore>,
    State(blobs): State<GuardedBlobStore>,
    Path(id): Path<SongId>,
) -> Response {
    match catalog.get_song(id) {
        Ok(Some(song)) => Json(song_view(&blobs, song)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Song not found"),
        Err(err) => internal_error(err),
    }
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Multipart form for song creation: text fields `title`, `artist`, optional
/// comma-separated `album_ids`, file fields `audio` and `cover`.
async fn create_song(
    State(catalog): State<GuardedCatalogStore>,
    State(blobs): State<GuardedBlobStore>,
    mut multipart: Multipart,
) -> Response {
    let mut title = None;
    let mut artist = None;
    let mut album_ids: Vec<AlbumId> = Vec::new();
    let mut audio = None;
    let mut cover = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
        };
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => match field.text().await {
                Ok(text) => title = Some(text),
                Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
            },
            "artist" => match field.text().await {
                Ok(text) => artist = Some(text),
                Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
            },
            "album_ids" => match field.text().await {
                Ok(text) => {
                    for part in text.split(',').filter(|p| !p.trim().is_empty()) {
                        match part.trim().parse() {
                            Ok(id) => album_ids.push(id),
                            Err(_) => {
                                return error_response(
                                    StatusCode::UNPROCESSABLE_ENTITY,
                                    format!("Invalid album id: {}", part),
                                )
                            }
                        }
                    }
                }
                Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
            },
            "audio" | "cover" => {
                let file_name = field.file_name().unwrap_or("file").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        let upload = Upload {
                            file_name,
                            bytes: bytes.to_vec(),
                        };
                        if name == "audio" {
                            audio = Some(upload);
                        } else {
                            cover = Some(upload);
                        }
                    }
                    Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
                }
            }
            _ => {}
        }
    }

    let (title, artist, audio, cover) = match (title, artist, audio, cover) {
        (Some(t), Some(a), Some(au), Some(c)) => (t, a, au, c),
        _ => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Fields title, artist, audio and cover are required",
            )
        }
    };

    if let Some(response) = check_albums_exist(&catalog, &album_ids) {
        return response;
    }

    let audio_path = format!("tracks/{}", stored_file_name(&audio.file_name));
    let cover_path = format!("covers/{}", stored_file_name(&cover.file_name));

    if let Err(err) = blobs.put(AUDIO_BUCKET, &audio_path, &audio.bytes) {
        return internal_error(err);
    }
    if let Err(err) = blobs.put(IMAGES_BUCKET, &cover_path, &cover.bytes) {
        return internal_error(err);
    }

    match catalog.create_song(NewSong {
        title,
        artist,
        audio_path,
        cover_path,
        album_ids,
    }) {
        Ok(song) => {
            info!("Created song {} '{}'", song.id, song.title);
            (StatusCode::CREATED, Json(song_view(&blobs, song))).into_response()
        }
        Err(err) => internal_error(err),
    }
}

async fn update_song(
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<SongId>,
    Json(patch): Json<SongPatch>,
) -> Response {
    match catalog.get_song(id) {
        Ok(Some(_)) => {}
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Song not found"),
        Err(err) => return internal_error(err),
    }
    if let Some(album_ids) = &patch.album_ids {
        if let Some(response) = check_albums_exist(&catalog, album_ids) {
            return response;
        }
    }
    match catalog.update_song(id, patch) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => internal_error(err),
    }
}

/// Rejects album ids that reference no existing album before any blob or row
/// write happens. Returns the error response to send, or None when all exist.
fn check_albums_exist(catalog: &GuardedCatalogStore, album_ids: &[AlbumId]) -> Option<Response> {
    for album_id in album_ids {
        match catalog.get_album(*album_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Some(error_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("Album {} not found", album_id),
                ))
            }
            Err(err) => return Some(internal_error(err)),
        }
    }
    None
}

async fn delete_song(
    State(deletion): State<GuardedDeletionManager>,
    Path(id): Path<SongId>,
) -> Response {
    deletion_response(deletion.delete_song(id).await)
}

// Albums

async fn list_albums(
    State(catalog): State<GuardedCatalogStore>,
    State(blobs): State<GuardedBlobStore>,
) -> Response {
    match catalog.list_albums() {
        Ok(albums) => Json(
            albums
                .into_iter()
                .map(|a| album_view(&blobs, a))
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => internal_error(err),
    }
}

/// Album resolved with its songs in display order.
async fn get_album(
    State(catalog): State<GuardedCatalogStore>,
    State(blobs): State<GuardedBlobStore>,
    Path(id): Path<AlbumId>,
) -> Response {
    let album = match catalog.get_album(id) {
        Ok(Some(album)) => album,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Album not found"),
        Err(err) => return internal_error(err),
    };
    match catalog.get_album_songs(id) {
        Ok(entries) => {
            let songs = entries
                .into_iter()
                .map(|e| AlbumSongView {
                    order_index: e.order_index,
                    song: song_view(&blobs, e.song),
                })
                .collect();
            Json(AlbumDetailView {
                album: album_view(&blobs, album),
                songs,
            })
            .into_response()
        }
        Err(err) => internal_error(err),
    }
}

/// Multipart form for album creation: text fields `name` and optional
/// `description`, file field `cover`.
async fn create_album(
    State(catalog): State<GuardedCatalogStore>,
    State(blobs): State<GuardedBlobStore>,
    mut multipart: Multipart,
) -> Response {
    let mut name = None;
    let mut description = None;
    let mut cover = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
        };
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => match field.text().await {
                Ok(text) => name = Some(text),
                Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
            },
            "description" => match field.text().await {
                Ok(text) => description = Some(text),
                Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
            },
            "cover" => {
                let file_name = field.file_name().unwrap_or("file").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        cover = Some(Upload {
                            file_name,
                            bytes: bytes.to_vec(),
                        })
                    }
                    Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
                }
            }
            _ => {}
        }
    }

    let (name, cover) = match (name, cover) {
        (Some(n), Some(c)) => (n, c),
        _ => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Fields name and cover are required",
            )
        }
    };

    let cover_path = format!("covers/album_covers/{}", stored_file_name(&cover.file_name));
    if let Err(err) = blobs.put(IMAGES_BUCKET, &cover_path, &cover.bytes) {
        return internal_error(err);
    }

    match catalog.create_album(NewAlbum {
        name,
        description,
        cover_path,
    }) {
        Ok(album) => {
            info!("Created album {} '{}'", album.id, album.name);
            (StatusCode::CREATED, Json(album_view(&blobs, album))).into_response()
        }
        Err(err) => internal_error(err),
    }
}

async fn update_album(
    State(catalog): State<GuardedCatalogStore>,
    Path(id): Path<AlbumId>,
    Json(patch): Json<AlbumPatch>,
) -> Response {
    match catalog.get_album(id) {
        Ok(Some(_)) => {}
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Album not found"),
        Err(err) => return internal_error(err),
    }
    match catalog.update_album(id, patch) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => internal_error(err),
    }
}

async fn delete_album(
    State(deletion): State<GuardedDeletionManager>,
    Path(id): Path<AlbumId>,
) -> Response {
    deletion_response(deletion.delete_album(id).await)
}

#[derive(Deserialize)]
struct ReorderBody {
    song_ids: Vec<SongId>,
}

async fn reorder_album_songs(
    State(ordering): State<GuardedOrderingManager>,
    Path(id): Path<AlbumId>,
    Json(body): Json<ReorderBody>,
) -> Response {
    match ordering.reorder(id, body.song_ids).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err @ OrderingError::AlbumNotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, err.to_string())
        }
        Err(err @ OrderingError::NotAPermutation { .. }) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        Err(err) => {
            error!("{:#}", anyhow::Error::new(err).context("Reorder failed"));
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Reorder failed")
        }
    }
}

// Users

async fn list_users(State(users): State<GuardedUserAdminStore>) -> Response {
    match users.list_users() {
        Ok(users) => Json(users).into_response(),
        Err(err) => internal_error(err),
    }
}

async fn get_user(
    State(users): State<GuardedUserAdminStore>,
    Path(id): Path<String>,
) -> Response {
    match users.get_user(&id) {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => internal_error(err),
    }
}

#[derive(Deserialize)]
struct CreateUserBody {
    email: String,
    #[serde(default = "empty_metadata")]
    metadata: serde_json::Value,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

async fn create_user(
    State(users): State<GuardedUserAdminStore>,
    Json(body): Json<CreateUserBody>,
) -> Response {
    match users.create_user(&body.email, body.metadata) {
        Ok(created) => {
            info!("Created user {} ({})", created.user.id, created.user.email);
            (StatusCode::CREATED, Json(created)).into_response()
        }
        Err(err) => internal_error(err),
    }
}

#[derive(Deserialize)]
struct UpdateUserBody {
    email: Option<String>,
    metadata: Option<serde_json::Value>,
}

async fn update_user(
    State(users): State<GuardedUserAdminStore>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserBody>,
) -> Response {
    match users.get_user(&id) {
        Ok(Some(_)) => {}
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => return internal_error(err),
    }
    match users.update_user(&id, body.email.as_deref(), body.metadata) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => internal_error(err),
    }
}

async fn delete_user(
    State(deletion): State<GuardedDeletionManager>,
    Path(id): Path<String>,
) -> Response {
    deletion_response(deletion.delete_user(&id).await)
}

fn deletion_response(
    result: Result<crate::deletion::DeletionReport, DeletionError>,
) -> Response {
    match result {
        Ok(report) => Json(report).into_response(),
        Err(err @ DeletionError::NotFound { .. }) => {
            error_response(StatusCode::NOT_FOUND, err.to_string())
        }
        Err(err) => {
            error!("{:#}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// Keep stored file names shell- and URL-safe, prefixed with a millisecond
/// timestamp to avoid collisions, like the original upload flow.
fn stored_file_name(original: &str) -> String {
    let sanitized: String = original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", chrono::Utc::now().timestamp_millis(), sanitized)
}

pub fn make_router(state: ServerState, media_root: PathBuf) -> Router {
    Router::new()
        .route("/songs", get(list_songs).post(create_song))
        .route(
            "/songs/{id}",
            get(get_song).put(update_song).delete(delete_song),
        )
        .route("/albums", get(list_albums).post(create_album))
        .route(
            "/albums/{id}",
            get(get_album).put(update_album).delete(delete_album),
        )
        .route("/albums/{id}/song-order", put(reorder_album_songs))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .nest_service("/media", ServeDir::new(media_root))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

pub async fn run_server(state: ServerState, port: u16, media_root: PathBuf) -> Result<()> {
    let app = make_router(state, media_root);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Admin server listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
