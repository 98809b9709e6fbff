use super::db::{DbError, NewPlayedTrack, PlayStore, PlayedTrack};
use super::history::{History, HistoryRow};
use super::schema::SchemaStep;
use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{error, info, warn};

const PLAYED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{step} failed: {source}")]
    Schema {
        step: SchemaStep,
        #[source]
        source: DbError,
    },
    #[error("reading back played_tracks failed: {0}")]
    Verify(#[source] DbError),
}

#[derive(Debug, Error)]
pub enum RowError {
    #[error("invalid played_at {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error(transparent)]
    Db(#[from] DbError),
}

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: usize,
    pub failed: usize,
    pub played_tracks: Vec<PlayedTrack>,
}

fn new_played_track<'a>(row: &HistoryRow<'a>) -> Result<NewPlayedTrack<'a>, RowError> {
    let played_at = NaiveDateTime::parse_from_str(row.played_at, PLAYED_AT_FORMAT).map_err(
        |source| RowError::Timestamp {
            value: row.played_at.to_string(),
            source,
        },
    )?;
    Ok(NewPlayedTrack {
        track: row.track,
        artist: row.artist,
        album: row.album,
        played_at,
    })
}

async fn insert_row<S>(store: &mut S, row: &HistoryRow<'_>) -> Result<(), RowError>
where
    S: PlayStore + Send,
{
    let play = new_played_track(row)?;
    store.insert_play(&play).await?;
    Ok(())
}

/// Rebuilds the `spotify` database and loads `history` into it.
///
/// Any failing schema statement aborts the load. A failing insert only
/// loses its own row; the rest are still attempted.
pub async fn load<S>(store: &mut S, history: &History) -> LoadResult<LoadReport>
where
    S: PlayStore + Send,
{
    for step in SchemaStep::ALL.iter().copied() {
        store
            .apply(step)
            .await
            .map_err(|source| LoadError::Schema { step, source })?;
        info!("Schema step done: {}", step);
    }

    let mut report = LoadReport::default();
    for row in history.rows() {
        match insert_row(store, &row).await {
            Ok(()) => report.inserted += 1,
            Err(e) => {
                warn!("Error inserting {} ({}): {}", row.track, row.played_at, e);
                report.failed += 1;
            }
        }
    }

    report.played_tracks = store.played_tracks().await.map_err(LoadError::Verify)?;
    for play in &report.played_tracks {
        println!("{}", play);
    }

    info!(
        "Loaded {} of {} plays ({} failed), {} rows read back",
        report.inserted,
        history.len(),
        report.failed,
        report.played_tracks.len()
    );
    Ok(report)
}

/// [`load`], then closes the store whether or not the load succeeded.
pub async fn run<S>(store: &mut S, history: &History) -> LoadResult<LoadReport>
where
    S: PlayStore + Send,
{
    let result = load(store, history).await;
    if let Err(e) = &result {
        error!("Load aborted: {}", e);
    }
    if let Err(e) = store.close().await {
        warn!("Error closing connection: {}", e);
    }
    result
}
