use super::spotify::{RecentlyPlayed, SpotifyWrapperError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Page size of the single "recently played" request.
pub const HISTORY_LIMIT: u32 = 50;

/// One play of a track as reported by Spotify. `played_at` is the raw
/// ISO-8601 timestamp, e.g. `2024-01-02T03:04:05.678Z`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayEvent {
    pub track: String,
    pub artist: String,
    pub album: String,
    pub played_at: String,
}

/// Flattened listening history: four parallel columns aligned by index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub tracks: Vec<String>,
    pub artists: Vec<String>,
    pub albums: Vec<String>,
    pub played_at: Vec<String>,
}

/// A single row of a [`History`], borrowed from its columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryRow<'a> {
    pub track: &'a str,
    pub artist: &'a str,
    pub album: &'a str,
    pub played_at: &'a str,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("could not access snapshot: {0}")]
    Io(#[from] io::Error),
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot columns differ in length")]
    Misaligned,
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("fetching recently played tracks failed: {0}")]
    Fetch(#[from] SpotifyWrapperError),
    #[error("writing snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Turns `2024-01-02T03:04:05.678Z` into `2024-01-02 03:04:05`.
///
/// The date/time separator becomes a space and everything from the first
/// `.` on is dropped. Applying it to its own output is a no-op.
pub fn normalize_played_at(raw: &str) -> String {
    let spaced = raw.replace('T', " ");
    match spaced.split('.').next() {
        Some(whole_seconds) => whole_seconds.to_string(),
        None => spaced,
    }
}

impl History {
    pub fn flatten(events: &[PlayEvent]) -> Self {
        let mut history = History {
            tracks: Vec::with_capacity(events.len()),
            artists: Vec::with_capacity(events.len()),
            albums: Vec::with_capacity(events.len()),
            played_at: Vec::with_capacity(events.len()),
        };
        for event in events {
            history.tracks.push(event.track.clone());
            history.artists.push(event.artist.clone());
            history.albums.push(event.album.clone());
            history.played_at.push(normalize_played_at(&event.played_at));
        }
        history
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn is_aligned(&self) -> bool {
        let len = self.len();
        self.artists.len() == len && self.albums.len() == len && self.played_at.len() == len
    }

    /// Rows in fetch order (newest play first).
    pub fn rows(&self) -> impl Iterator<Item = HistoryRow<'_>> {
        self.tracks
            .iter()
            .zip(&self.artists)
            .zip(&self.albums)
            .zip(&self.played_at)
            .map(|(((track, artist), album), played_at)| HistoryRow {
                track,
                artist,
                album,
                played_at,
            })
    }

    /// Overwrites `path` with the history as JSON indented by four spaces.
    pub fn write_snapshot(&self, path: &Path) -> SnapshotResult<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        fs::write(path, buf)?;
        Ok(())
    }

    pub fn read_snapshot(path: &Path) -> SnapshotResult<Self> {
        let contents = fs::read(path)?;
        let history: History = serde_json::from_slice(&contents)?;
        if !history.is_aligned() {
            return Err(SnapshotError::Misaligned);
        }
        Ok(history)
    }
}

/// Fetches the most recent plays, flattens them and writes the snapshot.
pub async fn extract<C>(client: &C, snapshot: &Path) -> Result<History, ExtractError>
where
    C: RecentlyPlayed + Sync,
{
    let events = client.recently_played(HISTORY_LIMIT).await?;
    info!("Fetched {} recently played tracks", events.len());

    let history = History::flatten(&events);
    history.write_snapshot(snapshot)?;
    info!("Wrote snapshot to {}", snapshot.display());
    Ok(history)
}
