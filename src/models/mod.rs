mod song;

pub use song::{NewSong, Song, SongDetail, SongFilter, SongSummary, SongUpdate};
