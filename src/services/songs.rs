use std::sync::Arc;

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{NewSong, SongFilter, SongSummary, SongUpdate};

use super::SongDetailsSource;

/// Song catalog operations over the repository and the song details API.
pub struct SongService {
    repository: Repository,
    details: Arc<dyn SongDetailsSource>,
}

impl SongService {
    pub fn new(repository: Repository, details: Arc<dyn SongDetailsSource>) -> Self {
        Self {
            repository,
            details,
        }
    }

    /// `page` and `limit` must already be positive.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, filter: SongFilter, page: u32, limit: u32) -> Result<Vec<SongSummary>> {
        let Some(offset) = i64::from(page.saturating_sub(1)).checked_mul(i64::from(limit)) else {
            tracing::debug!("Offset out of range, no rows on this page");
            return Ok(Vec::new());
        };
        let songs = self
            .repository
            .list_songs(filter, limit, offset)
            .await
            .inspect_err(|e| tracing::error!("Failed to list songs: {}", e))?;
        tracing::info!(count = songs.len(), "Listed songs");
        Ok(songs)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_text(&self, id: i64) -> Result<String> {
        match self.repository.get_song(id).await {
            Ok(Some(song)) => Ok(song.text.unwrap_or_default()),
            Ok(None) => {
                tracing::warn!("Song not found");
                Err(AppError::NotFound(id))
            }
            Err(e) => {
                tracing::error!("Failed to load song text: {}", e);
                Err(e)
            }
        }
    }

    /// Creates a song from the details API. The group row is created before
    /// the API call and is kept even when the call fails.
    #[tracing::instrument(skip(self))]
    pub async fn add(&self, group: &str, song: &str) -> Result<i64> {
        let group_id = self
            .repository
            .find_or_create_group(group)
            .await
            .inspect_err(|e| tracing::error!("Failed to resolve group: {}", e))?;

        let detail = self
            .details
            .fetch(group, song)
            .await
            .inspect_err(|e| tracing::error!("Song details lookup failed: {}", e))?;

        let id = self
            .repository
            .insert_song(NewSong {
                group_id,
                song: song.to_string(),
                release_date: detail.release_date,
                text: detail.text,
                link: detail.link,
            })
            .await
            .inspect_err(|e| tracing::error!("Failed to save song: {}", e))?;

        tracing::info!(id, "Song added");
        Ok(id)
    }

    /// Updating an id that does not exist succeeds without changing anything.
    #[tracing::instrument(skip(self, update))]
    pub async fn update(&self, id: i64, update: SongUpdate) -> Result<()> {
        let changed = self
            .repository
            .update_song(id, update)
            .await
            .inspect_err(|e| tracing::error!("Failed to update song: {}", e))?;
        if changed == 0 {
            tracing::debug!("Update matched no rows");
        } else {
            tracing::info!("Song updated");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        let deleted = self
            .repository
            .delete_song(id)
            .await
            .inspect_err(|e| tracing::error!("Failed to delete song: {}", e))?;
        tracing::info!(deleted, "Song deleted");
        Ok(())
    }
}
