//! SQLite-backed catalog store.

use super::models::*;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if (db_version as usize) < BASE_DB_VERSION {
        bail!("Not a catalog database (user_version = {})", db_version);
    }
    let mut current_version = db_version as usize - BASE_DB_VERSION;

    if current_version < latest_version {
        let tx = conn.transaction()?;
        for schema in CATALOG_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating catalog db from version {} to {}",
                    current_version, schema.version
                );
                migration_fn(&tx)?;
                current_version = schema.version;
            }
        }
        tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
        tx.commit()?;
    }

    latest_schema.validate(conn)?;
    Ok(())
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn = Connection::open_with_flags(
            db_path.as_ref(),
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database")?;

        migrate_if_needed(&mut conn)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrate_if_needed(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn song_from_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        audio_path: row.get(3)?,
        cover_path: row.get(4)?,
    })
}

fn album_from_row(row: &rusqlite::Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        cover_path: row.get(3)?,
    })
}

/// Appends a link row after the album's current last order slot.
/// The album must exist: with no foreign keys, this check is what keeps
/// dangling link rows out of the table.
fn append_link(conn: &Connection, album_id: AlbumId, song_id: SongId) -> Result<()> {
    let album_exists = conn
        .query_row(
            "SELECT 1 FROM albums WHERE id = ?1",
            params![album_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !album_exists {
        bail!("Album {} not found", album_id);
    }
    let next_index: i64 = conn.query_row(
        "SELECT COALESCE(MAX(order_index) + 1, 0) FROM album_song WHERE album_id = ?1",
        params![album_id],
        |r| r.get(0),
    )?;
    conn.execute(
        "INSERT INTO album_song (album_id, song_id, order_index) VALUES (?1, ?2, ?3)",
        params![album_id, song_id, next_index],
    )
    .with_context(|| format!("Failed to link song {} to album {}", song_id, album_id))?;
    Ok(())
}

impl CatalogStore for SqliteCatalogStore {
    fn list_songs(&self) -> Result<Vec<Song>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, title, artist, audio_path, cover_path FROM songs")?;
        let songs = stmt
            .query_map([], song_from_row)?
            .collect::<Result<_, _>>()?;
        Ok(songs)
    }

    fn get_song(&self, id: SongId) -> Result<Option<Song>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, title, artist, audio_path, cover_path FROM songs WHERE id = ?1",
            params![id],
            song_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to fetch song {}", id))
    }

    fn create_song(&self, song: NewSong) -> Result<Song> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO songs (title, artist, audio_path, cover_path) VALUES (?1, ?2, ?3, ?4)",
            params![song.title, song.artist, song.audio_path, song.cover_path],
        )
        .with_context(|| format!("Failed to create song '{}'", song.title))?;
        let id = tx.last_insert_rowid();
        for album_id in &song.album_ids {
            append_link(&tx, *album_id, id)?;
        }
        tx.commit()?;
        Ok(Song {
            id,
            title: song.title,
            artist: song.artist,
            audio_path: song.audio_path,
            cover_path: song.cover_path,
        })
    }

    fn update_song(&self, id: SongId, patch: SongPatch) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        if let Some(title) = &patch.title {
            tx.execute("UPDATE songs SET title = ?1 WHERE id = ?2", params![title, id])?;
        }
        if let Some(artist) = &patch.artist {
            tx.execute(
                "UPDATE songs SET artist = ?1 WHERE id = ?2",
                params![artist, id],
            )?;
        }
        // Replacing the link set drops the song from albums not in the new
        // set and appends it to the end of newly linked ones.
        if let Some(album_ids) = &patch.album_ids {
            tx.execute("DELETE FROM album_song WHERE song_id = ?1", params![id])?;
            for album_id in album_ids {
                append_link(&tx, *album_id, id)?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_song_row(&self, id: SongId) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM songs WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete song {}", id))
    }

    fn list_albums(&self) -> Result<Vec<Album>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, name, description, cover_path FROM albums")?;
        let albums = stmt
            .query_map([], album_from_row)?
            .collect::<Result<_, _>>()?;
        Ok(albums)
    }

    fn get_album(&self, id: AlbumId) -> Result<Option<Album>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, description, cover_path FROM albums WHERE id = ?1",
            params![id],
            album_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to fetch album {}", id))
    }

    fn create_album(&self, album: NewAlbum) -> Result<Album> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO albums (name, description, cover_path) VALUES (?1, ?2, ?3)",
            params![album.name, album.description, album.cover_path],
        )
        .with_context(|| format!("Failed to create album '{}'", album.name))?;
        Ok(Album {
            id: conn.last_insert_rowid(),
            name: album.name,
            description: album.description,
            cover_path: album.cover_path,
        })
    }

    fn update_album(&self, id: AlbumId, patch: AlbumPatch) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        if let Some(name) = &patch.name {
            conn.execute("UPDATE albums SET name = ?1 WHERE id = ?2", params![name, id])?;
        }
        if let Some(description) = &patch.description {
            conn.execute(
                "UPDATE albums SET description = ?1 WHERE id = ?2",
                params![description, id],
            )?;
        }
        if let Some(cover_path) = &patch.cover_path {
            conn.execute(
                "UPDATE albums SET cover_path = ?1 WHERE id = ?2",
                params![cover_path, id],
            )?;
        }
        Ok(())
    }

    fn delete_album_row(&self, id: AlbumId) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM albums WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete album {}", id))
    }

    fn get_album_songs(&self, album_id: AlbumId) -> Result<Vec<AlbumSongEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.title, s.artist, s.audio_path, s.cover_path, als.order_index
             FROM album_song als JOIN songs s ON s.id = als.song_id
             WHERE als.album_id = ?1
             ORDER BY als.order_index ASC",
        )?;
        let entries = stmt
            .query_map(params![album_id], |row| {
                Ok(AlbumSongEntry {
                    song: song_from_row(row)?,
                    order_index: row.get(5)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(entries)
    }

    fn get_album_song_ids(&self, album_id: AlbumId) -> Result<Vec<SongId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT song_id FROM album_song WHERE album_id = ?1 ORDER BY order_index ASC",
        )?;
        let ids = stmt
            .query_map(params![album_id], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        Ok(ids)
    }

    fn get_song_album_ids(&self, song_id: SongId) -> Result<Vec<AlbumId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT album_id FROM album_song WHERE song_id = ?1")?;
        let ids = stmt
            .query_map(params![song_id], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        Ok(ids)
    }

    fn link_song_to_album(&self, album_id: AlbumId, song_id: SongId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        append_link(&conn, album_id, song_id)
    }

    fn set_song_order_index(
        &self,
        album_id: AlbumId,
        song_id: SongId,
        order_index: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute(
                "UPDATE album_song SET order_index = ?1 WHERE album_id = ?2 AND song_id = ?3",
                params![order_index, album_id, song_id],
            )
            .with_context(|| {
                format!(
                    "Failed to update order of song {} in album {}",
                    song_id, album_id
                )
            })?;
        if affected == 0 {
            bail!("No album_song row for album {} song {}", album_id, song_id);
        }
        Ok(())
    }

    fn delete_album_songs_by_song(&self, song_id: SongId) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM album_song WHERE song_id = ?1", params![song_id])
            .with_context(|| format!("Failed to delete album links of song {}", song_id))
    }

    fn delete_album_songs_by_album(&self, album_id: AlbumId) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM album_song WHERE album_id = ?1",
            params![album_id],
        )
        .with_context(|| format!("Failed to delete song links of album {}", album_id))
    }

    fn add_favorite(&self, user_id: &str, song_id: SongId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO favorites (user_id, song_id) VALUES (?1, ?2)",
            params![user_id, song_id],
        )?;
        Ok(())
    }

    fn remove_favorite(&self, user_id: &str, song_id: SongId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND song_id = ?2",
            params![user_id, song_id],
        )?;
        Ok(())
    }

    fn get_user_favorites(&self, user_id: &str) -> Result<Vec<SongId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT song_id FROM favorites WHERE user_id = ?1")?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        Ok(ids)
    }

    fn delete_favorites_by_song(&self, song_id: SongId) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM favorites WHERE song_id = ?1", params![song_id])
            .with_context(|| format!("Failed to delete favorites of song {}", song_id))
    }

    fn delete_favorites_by_user(&self, user_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM favorites WHERE user_id = ?1", params![user_id])
            .with_context(|| format!("Failed to delete favorites of user {}", user_id))
    }
}
