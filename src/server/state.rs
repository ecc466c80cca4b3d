use axum::extract::FromRef;

use crate::auth::TokenIssuer;
use crate::inspection::InspectionEngine;
use crate::pet_store::FullStore;
use crate::predict::PredictionGateway;
use crate::profile_image::ProfileImageStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedStore = Arc<dyn FullStore>;
pub type GuardedInspectionEngine = Arc<InspectionEngine>;
pub type GuardedPredictionGateway = Arc<PredictionGateway>;
pub type GuardedProfileImageStore = Arc<ProfileImageStore>;
pub type GuardedTokenIssuer = Arc<TokenIssuer>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub store: GuardedStore,
    pub inspection_engine: GuardedInspectionEngine,
    pub prediction_gateway: GuardedPredictionGateway,
    pub profile_images: GuardedProfileImageStore,
    pub token_issuer: GuardedTokenIssuer,
}

impl FromRef<ServerState> for GuardedStore {
    fn from_ref(input: &ServerState) -> Self {
        input.store.clone()
    }
}

impl FromRef<ServerState> for GuardedInspectionEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.inspection_engine.clone()
    }
}

impl FromRef<ServerState> for GuardedPredictionGateway {
    fn from_ref(input: &ServerState) -> Self {
        input.prediction_gateway.clone()
    }
}

impl FromRef<ServerState> for GuardedProfileImageStore {
    fn from_ref(input: &ServerState) -> Self {
        input.profile_images.clone()
    }
}

impl FromRef<ServerState> for GuardedTokenIssuer {
    fn from_ref(input: &ServerState) -> Self {
        input.token_issuer.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
