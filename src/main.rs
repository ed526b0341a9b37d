use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_admin_server::config::{AppConfig, CliConfig, FileConfig};
use catalog_admin_server::{
    run_server, FsBlobStore, RequestsLoggingLevel, ServerState, SqliteCatalogStore,
    SqliteUserAdminStore,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. File values override CLI values.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite database files.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to the media directory (audio files and images).
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// Base URL under which media files are publicly reachable.
    #[clap(long)]
    pub public_base_url: Option<String>,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        media_path: cli_args.media_path,
        port: cli_args.port,
        public_base_url: cli_args.public_base_url,
        logging_level: cli_args.logging_level,
    };

    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!(
        "Opening SQLite catalog database at {:?}...",
        config.catalog_db_path()
    );
    let catalog_store = Arc::new(SqliteCatalogStore::new(&config.catalog_db_path())?);

    let user_store = Arc::new(SqliteUserAdminStore::new(&config.user_db_path())?);

    std::fs::create_dir_all(&config.media_path)
        .with_context(|| format!("Failed to create media directory {:?}", config.media_path))?;
    let blob_store = Arc::new(FsBlobStore::new(
        &config.media_path,
        &config.public_base_url,
    )?);

    let state = ServerState::new(
        catalog_store,
        blob_store,
        user_store,
        config.logging_level.clone(),
    );

    info!("Ready to serve at port {}!", config.port);
    run_server(state, config.port, config.media_path).await
}
