use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Song {
    pub id: i64,
    pub group: String,
    pub song: String,
    pub release_date: Option<NaiveDate>,
    pub text: Option<String>,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape returned by the song listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongSummary {
    pub id: i64,
    pub group: String,
    pub song: String,
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewSong {
    pub group_id: i64,
    pub song: String,
    pub release_date: Option<NaiveDate>,
    pub text: String,
    pub link: String,
}

/// Partial update. `None` leaves the stored value untouched, and so does an
/// empty `group` or `song`.
#[derive(Debug, Clone, Default)]
pub struct SongUpdate {
    pub group: Option<String>,
    pub song: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub text: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongFilter {
    pub group: String,
    pub song: String,
}

/// Details returned by the external song info API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongDetail {
    pub release_date: Option<NaiveDate>,
    pub text: String,
    pub link: String,
}
