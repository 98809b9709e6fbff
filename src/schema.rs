use std::fmt;

pub const DATABASE: &str = "spotify";

pub const INSERT_PLAYED_TRACK: &str =
    "INSERT INTO played_tracks (track, artist, album, played_at) VALUES (?, ?, ?, ?)";

pub const SELECT_PLAYED_TRACKS: &str = "SELECT * FROM played_tracks";

/// Statements that tear down and rebuild the destination, in run order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaStep {
    DropDatabase,
    CreateDatabase,
    UseDatabase,
    CreateTable,
}

impl SchemaStep {
    pub const ALL: [SchemaStep; 4] = [
        SchemaStep::DropDatabase,
        SchemaStep::CreateDatabase,
        SchemaStep::UseDatabase,
        SchemaStep::CreateTable,
    ];

    pub fn sql(self) -> &'static str {
        match self {
            SchemaStep::DropDatabase => "DROP DATABASE IF EXISTS spotify",
            SchemaStep::CreateDatabase => "CREATE DATABASE spotify",
            SchemaStep::UseDatabase => "USE spotify",
            SchemaStep::CreateTable => {
                "CREATE TABLE played_tracks (
    played_at DATETIME PRIMARY KEY,
    track VARCHAR(256),
    artist VARCHAR(256),
    album VARCHAR(256))"
            }
        }
    }
}

impl fmt::Display for SchemaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaStep::DropDatabase => write!(f, "drop database {}", DATABASE),
            SchemaStep::CreateDatabase => write!(f, "create database {}", DATABASE),
            SchemaStep::UseDatabase => write!(f, "use database {}", DATABASE),
            SchemaStep::CreateTable => write!(f, "create table played_tracks"),
        }
    }
}
