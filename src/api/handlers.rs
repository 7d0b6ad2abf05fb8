use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{SongFilter, SongSummary, SongUpdate};

use super::pagination::{paginate_verses, PageParams};
use super::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub group: String,
    pub song: String,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddSongRequest {
    pub group: String,
    pub song: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateSongRequest {
    pub group: Option<String>,
    pub song: Option<String>,
    pub release_date: Option<String>,
    pub text: Option<String>,
    pub link: Option<String>,
}

impl UpdateSongRequest {
    /// Validates the body. In strict mode group and song are mandatory.
    fn into_update(self, strict: bool) -> Result<SongUpdate> {
        if strict {
            if is_blank(self.group.as_deref()) {
                return Err(AppError::Validation("group must not be empty".to_string()));
            }
            if is_blank(self.song.as_deref()) {
                return Err(AppError::Validation("song must not be empty".to_string()));
            }
        }

        let release_date = self
            .release_date
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    AppError::Validation(format!(
                        "release_date {raw:?} is not a YYYY-MM-DD date"
                    ))
                })
            })
            .transpose()?;

        Ok(SongUpdate {
            group: self.group,
            song: self.song,
            release_date,
            text: self.text,
            link: self.link,
        })
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("song id {raw:?} is not a number")))
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

pub async fn health() -> &'static str {
    "Server is running"
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "No such endpoint")
}

#[tracing::instrument(skip(state))]
pub async fn list_songs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<SongSummary>>> {
    let paging = PageParams {
        page: params.page,
        limit: params.limit,
    };
    let filter = SongFilter {
        group: params.group,
        song: params.song,
    };
    let songs = state
        .songs
        .list(filter, paging.page(), paging.limit())
        .await?;
    Ok(Json(songs))
}

#[tracing::instrument(skip(state))]
pub async fn get_song_text(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>> {
    let id = parse_id(&id)?;
    let text = state.songs.get_text(id).await?;
    Ok(Json(text))
}

#[tracing::instrument(skip(state))]
pub async fn song_verses(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(paging): Query<PageParams>,
) -> Result<Json<Vec<String>>> {
    let id = parse_id(&id)?;
    let text = state.songs.get_text(id).await?;
    let verses = paginate_verses(&text, paging.page(), paging.limit())
        .into_iter()
        .map(str::to_string)
        .collect();
    Ok(Json(verses))
}

#[tracing::instrument(skip_all)]
pub async fn add_song(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddSongRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = json_body(payload)?;
    if request.group.trim().is_empty() || request.song.trim().is_empty() {
        return Err(AppError::Validation(
            "both group and song are required".to_string(),
        ));
    }

    state.songs.add(&request.group, &request.song).await?;
    Ok((StatusCode::CREATED, "Song added"))
}

#[tracing::instrument(skip(state, payload))]
pub async fn update_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateSongRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id)?;
    let update = json_body(payload)?.into_update(state.strict_updates)?;
    state.songs.update(id, update).await?;
    Ok((StatusCode::OK, "Song updated"))
}

#[tracing::instrument(skip(state))]
pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id)?;
    state.songs.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
