//! Integration tests for the cascade deletion endpoints.

mod common;

use axum::http::StatusCode;
use catalog_admin_server::blob_store::{BlobStore, AUDIO_BUCKET};
use catalog_admin_server::{CatalogStore, UserAdminStore};
use common::{assert_json, test_app};
use serde_json::json;

#[tokio::test]
async fn test_delete_song_cleans_rows_and_blobs() {
    let app = test_app();
    let album_id = app.seed_album("a");
    let song_id = app.seed_song("one", vec![album_id]);
    let user = app.users.create_user("u@example.com", json!({})).unwrap();
    app.catalog.add_favorite(&user.user.id, song_id).unwrap();

    let body = assert_json(
        app.delete(&format!("/songs/{}", song_id)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["message"], "Song 'one' deleted");
    assert!(body["warnings"].as_array().unwrap().is_empty());

    assert_eq!(
        app.get(&format!("/songs/{}", song_id)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert!(app.catalog.get_album_song_ids(album_id).unwrap().is_empty());
    assert!(app
        .catalog
        .get_user_favorites(&user.user.id)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_delete_song_with_missing_blob_reports_warning() {
    let app = test_app();
    let album_id = app.seed_album("a");
    let song_id = app.seed_song("one", vec![album_id]);
    app.blobs.remove(AUDIO_BUCKET, "tracks/one.mp3").unwrap();

    let body = assert_json(
        app.delete(&format!("/songs/{}", song_id)).await,
        StatusCode::OK,
    )
    .await;

    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("tracks/one.mp3"));
    // Relational cleanup happened regardless
    assert!(app.catalog.get_song(song_id).unwrap().is_none());
}

#[tokio::test]
async fn test_delete_missing_song_is_404() {
    let app = test_app();
    let body = assert_json(app.delete("/songs/12345").await, StatusCode::NOT_FOUND).await;
    assert_eq!(body["message"], "Song not found");
}

#[tokio::test]
async fn test_delete_album_keeps_its_songs() {
    let app = test_app();
    let album_id = app.seed_album("a");
    let s1 = app.seed_song("one", vec![album_id]);
    let s2 = app.seed_song("two", vec![album_id]);

    let body = assert_json(
        app.delete(&format!("/albums/{}", album_id)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["message"], "Album 'a' deleted");

    assert_eq!(
        app.get(&format!("/albums/{}", album_id)).await.status(),
        StatusCode::NOT_FOUND
    );
    // Songs survive the album, only the links are gone
    assert_eq!(
        app.get(&format!("/songs/{}", s1)).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        app.get(&format!("/songs/{}", s2)).await.status(),
        StatusCode::OK
    );
    assert!(app.catalog.get_song_album_ids(s1).unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_missing_album_is_404() {
    let app = test_app();
    let album_id = app.seed_album("a");
    app.seed_song("one", vec![album_id]);

    let body = assert_json(app.delete("/albums/99").await, StatusCode::NOT_FOUND).await;
    assert_eq!(body["message"], "Album not found");

    // Nothing was deleted
    assert_eq!(
        app.get(&format!("/albums/{}", album_id)).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_user_lifecycle_and_cascade_delete() {
    let app = test_app();
    let song_id = app.seed_song("one", vec![]);

    let created = assert_json(
        app.send_json("POST", "/users", json!({ "email": "u@example.com" }))
            .await,
        StatusCode::CREATED,
    )
    .await;
    let user_id = created["user"]["id"].as_str().unwrap().to_string();
    assert!(!created["temp_password"].as_str().unwrap().is_empty());

    app.catalog.add_favorite(&user_id, song_id).unwrap();

    let body = assert_json(
        app.delete(&format!("/users/{}", user_id)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["message"], "User 'u@example.com' deleted");

    assert_eq!(
        app.get(&format!("/users/{}", user_id)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert!(app.catalog.get_user_favorites(&user_id).unwrap().is_empty());
    // The favorited song itself is untouched
    assert!(app.catalog.get_song(song_id).unwrap().is_some());
}

#[tokio::test]
async fn test_update_user_with_empty_patch_is_noop() {
    let app = test_app();
    let created = app.users.create_user("u@example.com", json!({})).unwrap();

    let response = app
        .send_json("PUT", &format!("/users/{}", created.user.id), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let fetched = app.users.get_user(&created.user.id).unwrap().unwrap();
    assert_eq!(fetched.email, "u@example.com");
}

#[tokio::test]
async fn test_delete_missing_user_is_404() {
    let app = test_app();
    let body = assert_json(app.delete("/users/no-such-user").await, StatusCode::NOT_FOUND).await;
    assert_eq!(body["message"], "User not found");
}
