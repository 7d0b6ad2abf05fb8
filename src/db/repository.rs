use chrono::{DateTime, Utc};
use rusqlite::{params, Connection as SqliteConnection, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{NewSong, Song, SongFilter, SongSummary, SongUpdate};

use super::schema::SCHEMA;

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        let repository = Self { conn };
        repository.ping().await?;
        Ok(repository)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Round-trips a trivial statement to confirm the database thread is alive.
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Group operations

    /// Returns the id of the named group, creating it if needed. The UNIQUE
    /// constraint on `groups.name` makes concurrent creators converge on one row.
    pub async fn find_or_create_group(&self, name: &str) -> Result<i64> {
        let name = name.to_string();
        let id = self
            .conn
            .call(move |conn| Ok(group_id_for(conn, &name)?))
            .await?;
        Ok(id)
    }

    // Song operations

    pub async fn insert_song(&self, song: NewSong) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO songs (group_id, song_name, release_date, lyrics, link)
                       VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    params![
                        song.group_id,
                        song.song,
                        song.release_date,
                        song.text,
                        song.link
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn list_songs(
        &self,
        filter: SongFilter,
        limit: u32,
        offset: i64,
    ) -> Result<Vec<SongSummary>> {
        let songs = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT s.id, g.name, s.song_name, s.release_date
                       FROM songs s
                       JOIN groups g ON s.group_id = g.id
                       WHERE (?1 = '' OR instr(lower(g.name), lower(?1)) > 0)
                         AND (?2 = '' OR instr(lower(s.song_name), lower(?2)) > 0)
                       ORDER BY s.id
                       LIMIT ?3 OFFSET ?4"#,
                )?;
                let songs = stmt
                    .query_map(
                        params![filter.group, filter.song, limit, offset],
                        summary_from_row,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(songs)
            })
            .await?;
        Ok(songs)
    }

    pub async fn get_song(&self, id: i64) -> Result<Option<Song>> {
        let song = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT s.id, g.name, s.song_name, s.release_date, s.lyrics, s.link,
                              s.created_at, s.updated_at
                       FROM songs s
                       JOIN groups g ON s.group_id = g.id
                       WHERE s.id = ?1"#,
                )?;
                let song = stmt.query_row(params![id], song_from_row).optional()?;
                Ok(song)
            })
            .await?;
        Ok(song)
    }

    /// Applies a partial update and returns the number of rows touched.
    pub async fn update_song(&self, id: i64, update: SongUpdate) -> Result<usize> {
        let changed = self
            .conn
            .call(move |conn| {
                let group_id = match update.group.as_deref() {
                    Some(name) if !name.is_empty() => Some(group_id_for(conn, name)?),
                    _ => None,
                };
                let changed = conn.execute(
                    r#"UPDATE songs
                       SET group_id = COALESCE(?1, group_id),
                           song_name = COALESCE(NULLIF(?2, ''), song_name),
                           release_date = COALESCE(?3, release_date),
                           lyrics = COALESCE(?4, lyrics),
                           link = COALESCE(?5, link),
                           updated_at = datetime('now')
                       WHERE id = ?6"#,
                    params![
                        group_id,
                        update.song,
                        update.release_date,
                        update.text,
                        update.link,
                        id
                    ],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed)
    }

    pub async fn delete_song(&self, id: i64) -> Result<usize> {
        let deleted = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM songs WHERE id = ?1", params![id])?))
            .await?;
        Ok(deleted)
    }
}

fn group_id_for(conn: &SqliteConnection, name: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO groups (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    conn.query_row(
        "SELECT id FROM groups WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime('now') format, e.g. "2026-01-11 12:34:56"
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn summary_from_row(row: &Row) -> rusqlite::Result<SongSummary> {
    Ok(SongSummary {
        id: row.get(0)?,
        group: row.get(1)?,
        song: row.get(2)?,
        release_date: row.get(3)?,
    })
}

fn song_from_row(row: &Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        group: row.get(1)?,
        song: row.get(2)?,
        release_date: row.get(3)?,
        text: row.get(4)?,
        link: row.get(5)?,
        created_at: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        updated_at: row
            .get::<_, String>(7)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    async fn seeded() -> Repository {
        let repo = Repository::open_in_memory().await.unwrap();
        for (group, song) in [
            ("Muse", "Supermassive Black Hole"),
            ("Radiohead", "Karma Police"),
            ("Muse", "Uprising"),
            ("Massive Attack", "Teardrop"),
        ] {
            let group_id = repo.find_or_create_group(group).await.unwrap();
            repo.insert_song(NewSong {
                group_id,
                song: song.to_string(),
                release_date: None,
                text: format!("{song} verse 1\n{song} verse 2"),
                link: String::new(),
            })
            .await
            .unwrap();
        }
        repo
    }

    fn filter(group: &str, song: &str) -> SongFilter {
        SongFilter {
            group: group.to_string(),
            song: song.to_string(),
        }
    }

    #[tokio::test]
    async fn groups_are_reused_by_name() {
        let repo = Repository::open_in_memory().await.unwrap();
        let first = repo.find_or_create_group("Muse").await.unwrap();
        let second = repo.find_or_create_group("Muse").await.unwrap();
        let other = repo.find_or_create_group("Blur").await.unwrap();
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn empty_filter_lists_everything_in_id_order() {
        let repo = seeded().await;
        let songs = repo.list_songs(SongFilter::default(), 10, 0).await.unwrap();
        assert_eq!(songs.len(), 4);
        assert!(songs.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn filters_match_substrings_case_insensitively() {
        let repo = seeded().await;

        let songs = repo.list_songs(filter("mUsE", ""), 10, 0).await.unwrap();
        assert_eq!(songs.len(), 2);
        assert!(songs.iter().all(|s| s.group == "Muse"));

        let songs = repo.list_songs(filter("", "police"), 10, 0).await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].song, "Karma Police");

        let songs = repo.list_songs(filter("massive", ""), 10, 0).await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].group, "Massive Attack");
    }

    #[tokio::test]
    async fn filter_characters_are_literal() {
        let repo = seeded().await;
        let songs = repo.list_songs(filter("%", ""), 10, 0).await.unwrap();
        assert!(songs.is_empty());
    }

    #[tokio::test]
    async fn limit_and_offset_page_through_rows() {
        let repo = seeded().await;
        let first = repo.list_songs(SongFilter::default(), 3, 0).await.unwrap();
        let second = repo.list_songs(SongFilter::default(), 3, 3).await.unwrap();
        let beyond = repo.list_songs(SongFilter::default(), 3, 30).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 1);
        assert!(first.last().unwrap().id < second[0].id);
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn update_only_touches_supplied_fields() {
        let repo = seeded().await;
        let release = NaiveDate::from_ymd_opt(2006, 7, 14).unwrap();
        repo.update_song(
            1,
            SongUpdate {
                release_date: Some(release),
                link: Some("http://x".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let before = repo.get_song(1).await.unwrap().unwrap();
        let changed = repo
            .update_song(
                1,
                SongUpdate {
                    group: Some(String::new()),
                    song: Some("New Title".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let after = repo.get_song(1).await.unwrap().unwrap();

        assert_eq!(changed, 1);
        assert_eq!(after.song, "New Title");
        assert_eq!(after.group, before.group);
        assert_eq!(after.release_date, Some(release));
        assert_eq!(after.text, before.text);
        assert_eq!(after.link.as_deref(), Some("http://x"));
    }

    #[tokio::test]
    async fn update_refreshes_updated_at() {
        let repo = seeded().await;
        repo.connection()
            .call(|conn| {
                conn.execute(
                    "UPDATE songs SET updated_at = '2000-01-01 00:00:00' WHERE id = 3",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        let before = repo.get_song(3).await.unwrap().unwrap();
        assert_eq!(before.updated_at.to_rfc3339(), "2000-01-01T00:00:00+00:00");

        // No field supplied: only the timestamp moves.
        repo.update_song(3, SongUpdate::default()).await.unwrap();

        let after = repo.get_song(3).await.unwrap().unwrap();
        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.song, before.song);
    }

    #[tokio::test]
    async fn update_with_new_group_creates_it() {
        let repo = seeded().await;
        repo.update_song(
            2,
            SongUpdate {
                group: Some("Thom Yorke".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let song = repo.get_song(2).await.unwrap().unwrap();
        assert_eq!(song.group, "Thom Yorke");
        assert_eq!(song.song, "Karma Police");
    }

    #[tokio::test]
    async fn update_of_missing_song_affects_nothing() {
        let repo = seeded().await;
        let changed = repo
            .update_song(
                99,
                SongUpdate {
                    song: Some("Ghost".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(changed, 0);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let repo = seeded().await;
        assert_eq!(repo.delete_song(1).await.unwrap(), 1);
        assert_eq!(repo.delete_song(1).await.unwrap(), 0);
        assert!(repo.get_song(1).await.unwrap().is_none());
    }
}
