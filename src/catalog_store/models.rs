//! Catalog entities as stored, without derived fields.
//!
//! Public URLs for audio and cover files are computed at the HTTP boundary
//! from the stored bucket-relative paths and are never persisted.

use serde::{Deserialize, Serialize};

pub type SongId = i64;
pub type AlbumId = i64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub audio_path: String,
    pub cover_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    pub description: Option<String>,
    pub cover_path: String,
}

/// One row of the album_song join, resolved with its song.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AlbumSongEntry {
    pub song: Song,
    pub order_index: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub audio_path: String,
    pub cover_path: String,
    /// Albums to link the new song to. Each link is appended at the end of
    /// the album's current order.
    pub album_ids: Vec<AlbumId>,
}

/// Partial update for a song. `None` fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SongPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    /// When present, the song's album links are replaced with exactly this set.
    pub album_ids: Option<Vec<AlbumId>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewAlbum {
    pub name: String,
    pub description: Option<String>,
    pub cover_path: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AlbumPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_path: Option<String>,
}
