use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::cry_routes::make_cry_routes;
use super::pet_routes::make_pet_routes;
use super::session::Session;
use super::state::*;
use super::user_routes::make_user_routes;
use super::{log_requests, ServerConfig};
use crate::auth::TokenIssuer;
use crate::inspection::InspectionEngine;
use crate::pet_store::FullStore;
use crate::predict::PredictionGateway;
use crate::profile_image::ProfileImageStore;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub authenticated: bool,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        authenticated: session.is_some(),
    };
    Json(stats)
}

impl ServerState {
    fn new(
        config: ServerConfig,
        store: Arc<dyn FullStore>,
        inspection_engine: Arc<InspectionEngine>,
        prediction_gateway: Arc<PredictionGateway>,
        profile_images: Arc<ProfileImageStore>,
        token_issuer: Arc<TokenIssuer>,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            store,
            inspection_engine,
            prediction_gateway,
            profile_images,
            token_issuer,
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    store: Arc<dyn FullStore>,
    inspection_engine: Arc<InspectionEngine>,
    prediction_gateway: Arc<PredictionGateway>,
    profile_images: Arc<ProfileImageStore>,
    token_issuer: Arc<TokenIssuer>,
) -> Result<Router> {
    let state = ServerState::new(
        config,
        store,
        inspection_engine,
        prediction_gateway,
        profile_images,
        token_issuer,
    );

    let app = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/user", make_user_routes(state.clone()))
        .nest("/pet", make_pet_routes(state.clone()))
        .nest("/cry", make_cry_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

#[allow(clippy::too_many_arguments)]
pub async fn run_server(
    store: Arc<dyn FullStore>,
    inspection_engine: Arc<InspectionEngine>,
    prediction_gateway: Arc<PredictionGateway>,
    profile_images: Arc<ProfileImageStore>,
    token_issuer: Arc<TokenIssuer>,
    requests_logging_level: super::RequestsLoggingLevel,
    port: u16,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
    };
    let app = make_app(
        config,
        store,
        inspection_engine,
        prediction_gateway,
        profile_images,
        token_issuer,
    )?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Listening on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
