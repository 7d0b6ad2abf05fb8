mod song_details;
mod songs;

pub use song_details::{SongDetailsClient, SongDetailsSource};
pub use songs::SongService;

#[cfg(test)]
pub(crate) use songs::tests::StubDetails;
