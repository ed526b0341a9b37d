//! SQLite schema for the admin catalog database.
//!
//! One canonical naming convention throughout: `album_id` / `song_id`.
//! There are no database-level foreign keys; referential cleanup is done by
//! the cascade deletion manager with explicit per-table deletes.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Songs table. Blob paths are bucket-relative; public URLs are derived, never stored.
const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("audio_path", &SqlType::Text, non_null = true),
        sqlite_column!("cover_path", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("cover_path", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Album <-> Song link with the display order of the song within the album.
/// `order_index` is 0-based and unique per (album_id, song_id) pair.
const ALBUM_SONG_TABLE: Table = Table {
    name: "album_song",
    columns: &[
        sqlite_column!("album_id", &SqlType::Integer, non_null = true),
        sqlite_column!("song_id", &SqlType::Integer, non_null = true),
        sqlite_column!("order_index", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_album_song_album", "album_id"),
        ("idx_album_song_song", "song_id"),
    ],
    unique_constraints: &[&["album_id", "song_id"]],
};

/// User <-> Song favorite marks. User ids come from the user admin store.
const FAVORITES_TABLE: Table = Table {
    name: "favorites",
    columns: &[
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("song_id", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_favorites_user", "user_id"),
        ("idx_favorites_song", "song_id"),
    ],
    unique_constraints: &[&["user_id", "song_id"]],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        SONGS_TABLE,
        ALBUMS_TABLE,
        ALBUM_SONG_TABLE,
        FAVORITES_TABLE,
    ],
    migration: None,
}];
