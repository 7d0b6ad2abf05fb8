use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::services::SongService;

mod handlers;
mod pagination;

#[derive(Clone)]
pub struct AppState {
    pub songs: Arc<SongService>,
    /// Reject updates that leave out group or song.
    pub strict_updates: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/songs", get(handlers::list_songs))
        .route("/songs/add", post(handlers::add_song))
        .route(
            "/songs/:id",
            get(handlers::get_song_text)
                .put(handlers::update_song)
                .delete(handlers::delete_song),
        )
        .route("/songs/:id/verses", get(handlers::song_verses))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
