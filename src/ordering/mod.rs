//! Album song ordering.
//!
//! Persists drag-and-drop reorders of an album's song list as per-row
//! `order_index` updates, so that any later fetch reproduces the displayed
//! sequence. The convention is 0-based on both write and read: a song's
//! `order_index` is its position in the album's song list.

use crate::catalog_store::{AlbumId, AlbumSongEntry, CatalogStore, SongId};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("Album {0} not found")]
    AlbumNotFound(AlbumId),

    #[error("New order is not a permutation of the songs linked to album {album_id}")]
    NotAPermutation { album_id: AlbumId },

    /// One or more `order_index` updates failed after others may already have
    /// committed. The persisted order is possibly inconsistent with the UI's
    /// optimistic state; no rollback is attempted.
    #[error("Order update failed for {} of {} songs in album {album_id}: {}", failed.len(), total, first_message(failed))]
    PartialWrite {
        album_id: AlbumId,
        total: usize,
        failed: Vec<(SongId, String)>,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

fn first_message(failed: &[(SongId, String)]) -> &str {
    failed.first().map(|(_, msg)| msg.as_str()).unwrap_or("")
}

pub struct OrderingManager {
    store: Arc<dyn CatalogStore>,
}

impl OrderingManager {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Persists `new_order` as the album's song order.
    ///
    /// `new_order` must be a permutation of the songs currently linked to the
    /// album; partial reorders are rejected before any write. The per-song
    /// updates are issued concurrently and gathered at a join point. There is
    /// no transaction across the batch: on `PartialWrite`, sibling updates
    /// that already committed stay committed.
    pub async fn reorder(
        &self,
        album_id: AlbumId,
        new_order: Vec<SongId>,
    ) -> Result<(), OrderingError> {
        if self.store.get_album(album_id)?.is_none() {
            return Err(OrderingError::AlbumNotFound(album_id));
        }

        let current = self.store.get_album_song_ids(album_id)?;
        if !is_permutation(&current, &new_order) {
            return Err(OrderingError::NotAPermutation { album_id });
        }

        let total = new_order.len();
        let updates = new_order.into_iter().enumerate().map(|(index, song_id)| {
            let store = Arc::clone(&self.store);
            async move {
                let result = tokio::task::spawn_blocking(move || {
                    store.set_song_order_index(album_id, song_id, index as i64)
                })
                .await;
                let result = match result {
                    Ok(inner) => inner,
                    Err(join_err) => Err(anyhow::anyhow!("Order update task failed: {join_err}")),
                };
                (song_id, result)
            }
        });

        let failed: Vec<(SongId, String)> = join_all(updates)
            .await
            .into_iter()
            .filter_map(|(song_id, result)| result.err().map(|e| (song_id, format!("{e:#}"))))
            .collect();

        if failed.is_empty() {
            debug!("Reordered {} songs in album {}", total, album_id);
            Ok(())
        } else {
            warn!(
                "Reorder of album {} failed for {}/{} songs",
                album_id,
                failed.len(),
                total
            );
            Err(OrderingError::PartialWrite {
                album_id,
                total,
                failed,
            })
        }
    }

    /// The album's songs in display order (ascending `order_index`).
    pub fn album_songs(&self, album_id: AlbumId) -> Result<Vec<AlbumSongEntry>, OrderingError> {
        if self.store.get_album(album_id)?.is_none() {
            return Err(OrderingError::AlbumNotFound(album_id));
        }
        Ok(self.store.get_album_songs(album_id)?)
    }
}

fn is_permutation(current: &[SongId], proposed: &[SongId]) -> bool {
    if current.len() != proposed.len() {
        return false;
    }
    let proposed_set: HashSet<SongId> = proposed.iter().copied().collect();
    // Set equality plus equal length rules out duplicates in the proposal,
    // because the current membership is unique per (album, song).
    proposed_set.len() == proposed.len()
        && current.iter().all(|id| proposed_set.contains(id))
}
