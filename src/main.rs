use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use petcry_server::auth::TokenIssuer;
use petcry_server::inspection::InspectionEngine;
use petcry_server::pet_store::SqlitePetStore;
use petcry_server::predict::{HttpCryClassifier, PredictionGateway};
use petcry_server::profile_image::ProfileImageStore;
use petcry_server::server::{run_server, RequestsLoggingLevel};

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
    /// Path to the SQLite database file for users, pets and cries.
    #[clap(value_parser = parse_path)]
    pub db_path: PathBuf,

    /// Directory for inspection report caches, cry audio and profile images.
    #[clap(long, default_value = "dataset", value_parser = parse_path)]
    pub data_dir: PathBuf,

    /// Path to the default profile image served for pets without one.
    #[clap(long, default_value = "assets/default_profile_image.jpeg", value_parser = parse_path)]
    pub default_profile_image: PathBuf,

    /// URL of the cry classifier inference service.
    #[clap(long, env = "AI_SERVER_API")]
    pub classifier_url: String,

    /// Timeout in seconds for classifier requests.
    #[clap(long, default_value_t = 60)]
    pub classifier_timeout_sec: u64,

    /// Secret used to sign session tokens.
    #[clap(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 7701)]
    pub port: u16,

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

    info!("Opening SQLite pet database at {:?}...", cli_args.db_path);
    let store = Arc::new(SqlitePetStore::new(&cli_args.db_path)?);

    let inspection_engine = Arc::new(InspectionEngine::new(
        store.clone(),
        cli_args.data_dir.join("cry_inspect_logs"),
    )?);

    info!(
        "Cry classifier configured at {}",
        cli_args.classifier_url
    );
    let classifier = Arc::new(HttpCryClassifier::new(
        cli_args.classifier_url,
        cli_args.classifier_timeout_sec,
    ));
    let prediction_gateway = Arc::new(PredictionGateway::new(
        store.clone(),
        classifier,
        cli_args.data_dir.join("cry_dataset"),
    )?);

    let profile_images = Arc::new(ProfileImageStore::new(
        cli_args.data_dir.join("pet_profiles"),
        cli_args.default_profile_image,
    )?);

    let token_issuer = Arc::new(TokenIssuer::new(&cli_args.jwt_secret));

    info!("Ready to serve at port {}!", cli_args.port);
    run_server(
        store,
        inspection_engine,
        prediction_gateway,
        profile_images,
        token_issuer,
        cli_args.logging_level,
        cli_args.port,
    )
    .await
}
