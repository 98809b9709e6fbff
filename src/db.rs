use super::schema::{SchemaStep, INSERT_PLAYED_TRACK, SELECT_PLAYED_TRACKS};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Connection, Executor};
use std::fmt;
use thiserror::Error;
use tracing::info;

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct PlayedTrack {
    pub played_at: NaiveDateTime,
    pub track: String,
    pub artist: String,
    pub album: String,
}

pub struct NewPlayedTrack<'a> {
    pub track: &'a str,
    pub artist: &'a str,
    pub album: &'a str,
    pub played_at: NaiveDateTime,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("connection already closed")]
    Closed,
}

pub type DbResult<T> = Result<T, DbError>;

/// Destination of a load. Statements autocommit; nothing is batched.
#[async_trait]
pub trait PlayStore {
    async fn apply(&mut self, step: SchemaStep) -> DbResult<()>;
    async fn insert_play(&mut self, play: &NewPlayedTrack<'_>) -> DbResult<()>;
    async fn played_tracks(&mut self) -> DbResult<Vec<PlayedTrack>>;
    async fn close(&mut self) -> DbResult<()>;
}

/// A single MySQL connection, released by [`PlayStore::close`].
pub struct MySqlStore {
    conn: Option<MySqlConnection>,
}

impl MySqlStore {
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password);
        let conn = MySqlConnection::connect_with(&options).await?;
        info!(
            "Connected to mysql at {}:{} as {}",
            config.host, config.port, config.user
        );
        Ok(MySqlStore { conn: Some(conn) })
    }

    fn conn(&mut self) -> DbResult<&mut MySqlConnection> {
        self.conn.as_mut().ok_or(DbError::Closed)
    }
}

#[async_trait]
impl PlayStore for MySqlStore {
    async fn apply(&mut self, step: SchemaStep) -> DbResult<()> {
        let conn: &mut MySqlConnection = self.conn()?;
        // USE is not allowed as a prepared statement
        conn.execute(sqlx::raw_sql(step.sql())).await?;
        Ok(())
    }

    async fn insert_play(&mut self, play: &NewPlayedTrack<'_>) -> DbResult<()> {
        sqlx::query(INSERT_PLAYED_TRACK)
            .bind(play.track)
            .bind(play.artist)
            .bind(play.album)
            .bind(play.played_at)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    async fn played_tracks(&mut self) -> DbResult<Vec<PlayedTrack>> {
        let plays = sqlx::query_as::<_, PlayedTrack>(SELECT_PLAYED_TRACKS)
            .fetch_all(self.conn()?)
            .await?;
        Ok(plays)
    }

    async fn close(&mut self) -> DbResult<()> {
        match self.conn.take() {
            Some(conn) => Ok(conn.close().await?),
            None => Ok(()),
        }
    }
}

impl fmt::Display for PlayedTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {:?}, {:?}, {:?})",
            self.played_at, self.track, self.artist, self.album
        )
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use std::collections::BTreeMap;

    /// In-memory stand-in for the MySQL server. Tracks which databases
    /// exist, the selected one, and enforces the `played_at` primary key.
    #[derive(Default)]
    pub struct MemoryStore {
        databases: BTreeMap<&'static str, Option<BTreeMap<NaiveDateTime, PlayedTrack>>>,
        selected: Option<&'static str>,
        pub fail_on: Option<SchemaStep>,
        pub closed: bool,
    }

    fn rejected(message: &str) -> DbError {
        DbError::Sqlx(sqlx::Error::Protocol(message.to_string()))
    }

    impl MemoryStore {
        pub fn failing_on(step: SchemaStep) -> Self {
            MemoryStore {
                fail_on: Some(step),
                ..Default::default()
            }
        }

        pub fn row_count(&self) -> usize {
            self.table().map(|rows| rows.len()).unwrap_or(0)
        }

        fn table(&self) -> Option<&BTreeMap<NaiveDateTime, PlayedTrack>> {
            let name = self.selected?;
            self.databases.get(name)?.as_ref()
        }

        fn table_mut(&mut self) -> DbResult<&mut BTreeMap<NaiveDateTime, PlayedTrack>> {
            let name = self.selected.ok_or_else(|| rejected("No database selected"))?;
            match self.databases.get_mut(name) {
                Some(Some(table)) => Ok(table),
                _ => Err(rejected("Table 'played_tracks' doesn't exist")),
            }
        }
    }

    #[async_trait]
    impl PlayStore for MemoryStore {
        async fn apply(&mut self, step: SchemaStep) -> DbResult<()> {
            if self.closed {
                return Err(DbError::Closed);
            }
            if self.fail_on == Some(step) {
                return Err(rejected("injected failure"));
            }
            let name = crate::schema::DATABASE;
            match step {
                SchemaStep::DropDatabase => {
                    self.databases.remove(name);
                }
                SchemaStep::CreateDatabase => {
                    if self.databases.contains_key(name) {
                        return Err(rejected("database exists"));
                    }
                    self.databases.insert(name, None);
                }
                SchemaStep::UseDatabase => {
                    if !self.databases.contains_key(name) {
                        return Err(rejected("Unknown database"));
                    }
                    self.selected = Some(name);
                }
                SchemaStep::CreateTable => {
                    let selected = self.selected.ok_or_else(|| rejected("No database selected"))?;
                    let table = self
                        .databases
                        .get_mut(selected)
                        .ok_or_else(|| rejected("Unknown database"))?;
                    if table.is_some() {
                        return Err(rejected("Table already exists"));
                    }
                    *table = Some(BTreeMap::new());
                }
            }
            Ok(())
        }

        async fn insert_play(&mut self, play: &NewPlayedTrack<'_>) -> DbResult<()> {
            if self.closed {
                return Err(DbError::Closed);
            }
            let table = self.table_mut()?;
            if table.contains_key(&play.played_at) {
                return Err(rejected("Duplicate entry for key 'PRIMARY'"));
            }
            table.insert(
                play.played_at,
                PlayedTrack {
                    played_at: play.played_at,
                    track: play.track.to_string(),
                    artist: play.artist.to_string(),
                    album: play.album.to_string(),
                },
            );
            Ok(())
        }

        async fn played_tracks(&mut self) -> DbResult<Vec<PlayedTrack>> {
            if self.closed {
                return Err(DbError::Closed);
            }
            Ok(self.table_mut()?.values().cloned().collect())
        }

        async fn close(&mut self) -> DbResult<()> {
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn test_display_played_track() {
        let play = PlayedTrack {
            played_at: NaiveDateTime::parse_from_str("2024-01-01 00:05:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            track: "B".to_string(),
            artist: "Y".to_string(),
            album: "Beta".to_string(),
        };
        assert_eq!(
            "(2024-01-01 00:05:00, \"B\", \"Y\", \"Beta\")",
            play.to_string()
        );
    }

    #[tokio::test]
    async fn test_closed_mysql_store() {
        let mut store = MySqlStore { conn: None };
        assert!(store.close().await.is_ok());
        match store.played_tracks().await {
            Err(DbError::Closed) => {}
            other => panic!("expected closed connection, got {:?}", other),
        }
    }
}
