use spotify_history::config::Config;
use spotify_history::db::MySqlStore;
use spotify_history::history::extract;
use spotify_history::loader;
use spotify_history::spotify::SpotifyWrapper;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let mut spotify = SpotifyWrapper::new(config.spotify);
    spotify.connect().await?;

    let history = extract(&spotify, &config.snapshot_path).await?;

    let mut store = MySqlStore::connect(&config.database).await?;
    loader::run(&mut store, &history).await?;

    println!("Finished");
    Ok(())
}
