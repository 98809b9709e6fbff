use super::history::PlayEvent;
use async_trait::async_trait;
use chrono::SecondsFormat;
use rspotify::model::PlayHistory;
use rspotify::prelude::*;
use rspotify::{scopes, AuthCodeSpotify, ClientError, Config, Credentials, OAuth};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[async_trait]
pub trait RecentlyPlayed {
    /// Most recent plays, newest first, at most `limit` of them.
    async fn recently_played(&self, limit: u32) -> SpotifyWrapperResult<Vec<PlayEvent>>;
}

pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
    pub token_cache: PathBuf,
}

pub struct SpotifyWrapper {
    spotify: Option<AuthCodeSpotify>,
    config: OAuthConfig,
}

#[derive(Debug, Error)]
pub enum SpotifyWrapperError {
    #[error("Unauthenticated client!")]
    UnauthenticatedClient,
    #[error("authorization failed: {0}")]
    Authorization(#[source] ClientError),
    #[error("spotify API error: {0}")]
    Api(#[source] ClientError),
}

pub type SpotifyWrapperResult<T> = Result<T, SpotifyWrapperError>;

impl SpotifyWrapper {
    pub fn new(config: OAuthConfig) -> Self {
        SpotifyWrapper {
            spotify: None,
            config,
        }
    }

    async fn authenticate_spotify(config: &OAuthConfig) -> SpotifyWrapperResult<AuthCodeSpotify> {
        let creds = Credentials::new(&config.client_id, &config.client_secret);
        let oauth = OAuth {
            redirect_uri: config.callback_url.clone(),
            scopes: scopes!("user-read-recently-played"),
            ..Default::default()
        };
        let client_config = Config {
            token_cached: true,
            cache_path: config.token_cache.clone(),
            ..Default::default()
        };

        let spotify = AuthCodeSpotify::with_config(creds, oauth, client_config);
        let url = spotify
            .get_authorize_url(false)
            .map_err(SpotifyWrapperError::Authorization)?;
        // reuses the cached token when it is still valid
        spotify
            .prompt_for_token(&url)
            .await
            .map_err(SpotifyWrapperError::Authorization)?;
        Ok(spotify)
    }

    pub async fn connect(&mut self) -> SpotifyWrapperResult<()> {
        self.spotify = Some(Self::authenticate_spotify(&self.config).await?);
        info!("Authenticated spotify client");
        Ok(())
    }

    fn convert_history_to_play_event(item: PlayHistory) -> PlayEvent {
        let track = item.track;
        PlayEvent {
            track: track.name,
            artist: track
                .artists
                .into_iter()
                .next()
                .map(|artist| artist.name)
                .unwrap_or_default(),
            album: track.album.name,
            played_at: item
                .played_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[async_trait]
impl RecentlyPlayed for SpotifyWrapper {
    async fn recently_played(&self, limit: u32) -> SpotifyWrapperResult<Vec<PlayEvent>> {
        let spotify = self
            .spotify
            .as_ref()
            .ok_or(SpotifyWrapperError::UnauthenticatedClient)?;
        let page = spotify
            .current_user_recently_played(Some(limit), None)
            .await
            .map_err(SpotifyWrapperError::Api)?;
        Ok(page
            .items
            .into_iter()
            .map(Self::convert_history_to_play_event)
            .collect())
    }
}
