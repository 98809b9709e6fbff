use super::db::DatabaseConfig;
use super::spotify::OAuthConfig;
use std::path::PathBuf;
use thiserror::Error;

pub struct Config {
    pub spotify: OAuthConfig,
    pub database: DatabaseConfig,
    pub snapshot_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    /// Reads the process environment, falling back to `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let optional = |key: &'static str, default: &str| {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let port = optional("DATABASE_PORT", "3306");
        let port = port.parse::<u16>().map_err(|_| ConfigError::Invalid {
            key: "DATABASE_PORT",
            value: port.clone(),
        })?;

        Ok(Config {
            spotify: OAuthConfig {
                client_id: required("SPOTIFY_CLIENT_ID")?,
                client_secret: required("SPOTIFY_CLIENT_SECRET")?,
                callback_url: required("SPOTIFY_REDIRECT_URI")?,
                token_cache: optional("SPOTIFY_TOKEN_CACHE", ".spotify_token_cache.json").into(),
            },
            database: DatabaseConfig {
                host: optional("DATABASE_HOST", "localhost"),
                port,
                user: optional("DATABASE_USER", "root"),
                password: required("DATABASE_PASSWORD")?,
            },
            snapshot_path: optional("SNAPSHOT_PATH", "data.json").into(),
        })
    }
}
