//! CatalogStore trait definition.
//!
//! Abstracts the relational catalog backend so managers and the server can be
//! exercised against the SQLite implementation or an in-memory test double.

use super::models::*;
use anyhow::Result;

/// Row-level CRUD and filtered queries over the catalog tables.
///
/// Deletes filtered by a foreign reference (`*_by_song`, `*_by_album`,
/// `*_by_user`) return the number of rows removed; removing zero rows is not
/// an error at this layer. Existence policy is decided by the callers.
pub trait CatalogStore: Send + Sync {
    // Songs

    fn list_songs(&self) -> Result<Vec<Song>>;

    fn get_song(&self, id: SongId) -> Result<Option<Song>>;

    fn create_song(&self, song: NewSong) -> Result<Song>;

    fn update_song(&self, id: SongId, patch: SongPatch) -> Result<()>;

    fn delete_song_row(&self, id: SongId) -> Result<usize>;

    // Albums

    fn list_albums(&self) -> Result<Vec<Album>>;

    fn get_album(&self, id: AlbumId) -> Result<Option<Album>>;

    fn create_album(&self, album: NewAlbum) -> Result<Album>;

    fn update_album(&self, id: AlbumId, patch: AlbumPatch) -> Result<()>;

    fn delete_album_row(&self, id: AlbumId) -> Result<usize>;

    // Album-song links

    /// Songs linked to the album, sorted ascending by `order_index`.
    /// This is the read-side ordering contract: display order is a pure
    /// function of persisted state.
    fn get_album_songs(&self, album_id: AlbumId) -> Result<Vec<AlbumSongEntry>>;

    /// Ids of the songs linked to the album, sorted ascending by `order_index`.
    fn get_album_song_ids(&self, album_id: AlbumId) -> Result<Vec<SongId>>;

    /// Albums a song is linked to.
    fn get_song_album_ids(&self, song_id: SongId) -> Result<Vec<AlbumId>>;

    /// Links a song to an album, appended after the album's current last slot.
    /// Fails if the album does not exist, since nothing else stops a dangling
    /// link row from being inserted.
    fn link_song_to_album(&self, album_id: AlbumId, song_id: SongId) -> Result<()>;

    /// Updates `order_index` on the link row matching (album_id, song_id).
    /// Fails if no such row exists.
    fn set_song_order_index(
        &self,
        album_id: AlbumId,
        song_id: SongId,
        order_index: i64,
    ) -> Result<()>;

    fn delete_album_songs_by_song(&self, song_id: SongId) -> Result<usize>;

    fn delete_album_songs_by_album(&self, album_id: AlbumId) -> Result<usize>;

    // Favorites

    fn add_favorite(&self, user_id: &str, song_id: SongId) -> Result<()>;

    fn remove_favorite(&self, user_id: &str, song_id: SongId) -> Result<()>;

    fn get_user_favorites(&self, user_id: &str) -> Result<Vec<SongId>>;

    fn delete_favorites_by_song(&self, song_id: SongId) -> Result<usize>;

    fn delete_favorites_by_user(&self, user_id: &str) -> Result<usize>;
}
