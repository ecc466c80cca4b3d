use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use super::dto::{CryResponse, LangQuery};
use super::session::Session;
use super::state::{
    GuardedInspectionEngine, GuardedPredictionGateway, GuardedStore, ServerState,
};
use crate::error::{ApiError, ApiResult};
use crate::inspection::InspectionReport;
use crate::pet_store::{parse_intensity, parse_state, CryPatch, CryStore, NewCry};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Deserialize, Debug)]
struct CreateCryBody {
    pub pet_id: i64,
    pub time: DateTime<Utc>,
    pub state: String,
    #[serde(rename = "audioId")]
    pub audio_id: String,
    #[serde(rename = "predictMap")]
    pub predict_map: HashMap<String, f64>,
    pub intensity: Option<String>,
    pub duration: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct UpdateCryBody {
    pub time: Option<DateTime<Utc>>,
    pub state: Option<String>,
    #[serde(rename = "audioId")]
    pub audio_id: Option<String>,
    #[serde(rename = "predictMap")]
    pub predict_map: Option<HashMap<String, f64>>,
    pub intensity: Option<String>,
    pub duration: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct StateSearchQuery {
    pub pet_id: i64,
    pub query_state: String,
    #[serde(default)]
    pub lang: super::dto::Lang,
}

#[derive(Deserialize, Debug)]
struct TimeSearchQuery {
    pub pet_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub lang: super::dto::Lang,
}

#[derive(Deserialize, Debug)]
struct PetIdQuery {
    pub pet_id: i64,
}

async fn create_cry(
    session: Session,
    State(store): State<GuardedStore>,
    Query(lang): Query<LangQuery>,
    Json(body): Json<CreateCryBody>,
) -> ApiResult<(StatusCode, Json<CryResponse>)> {
    let cry = NewCry::new(
        body.pet_id,
        body.time,
        parse_state(&body.state)?,
        body.audio_id,
        body.predict_map,
        body.intensity.as_deref().map(parse_intensity).transpose()?,
        body.duration,
    )?;
    let created = store.create_cry(&session.uid, cry)?;
    Ok((
        StatusCode::CREATED,
        Json(CryResponse::render(created, lang.lang)),
    ))
}

async fn get_cry(
    session: Session,
    State(store): State<GuardedStore>,
    Path(cry_id): Path<i64>,
    Query(lang): Query<LangQuery>,
) -> ApiResult<Json<CryResponse>> {
    let cry = store.get_cry(cry_id, &session.uid)?;
    Ok(Json(CryResponse::render(cry, lang.lang)))
}

async fn get_pet_cries(
    session: Session,
    State(store): State<GuardedStore>,
    Path(pet_id): Path<i64>,
    Query(lang): Query<LangQuery>,
) -> ApiResult<Json<Vec<CryResponse>>> {
    let cries = store.list_cries_by_pet(pet_id, &session.uid)?;
    Ok(Json(CryResponse::render_all(cries, lang.lang)))
}

async fn search_cries_by_state(
    session: Session,
    State(store): State<GuardedStore>,
    Query(query): Query<StateSearchQuery>,
) -> ApiResult<Json<Vec<CryResponse>>> {
    let cries = store.list_cries_by_state(query.pet_id, &query.query_state, &session.uid)?;
    Ok(Json(CryResponse::render_all(cries, query.lang)))
}

async fn search_cries_by_time(
    session: Session,
    State(store): State<GuardedStore>,
    Query(query): Query<TimeSearchQuery>,
) -> ApiResult<Json<Vec<CryResponse>>> {
    let cries = store.list_cries_between(
        query.pet_id,
        query.start_time,
        query.end_time,
        &session.uid,
    )?;
    Ok(Json(CryResponse::render_all(cries, query.lang)))
}

async fn inspect_cries(
    session: Session,
    State(engine): State<GuardedInspectionEngine>,
    Query(query): Query<PetIdQuery>,
) -> ApiResult<Json<Option<InspectionReport>>> {
    Ok(Json(engine.inspect(query.pet_id, &session.uid)?))
}

async fn predict_cry(
    session: Session,
    State(gateway): State<GuardedPredictionGateway>,
    Query(query): Query<PetIdQuery>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<CryResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let is_wav = field
            .file_name()
            .map(|name| name.to_lowercase().ends_with(".wav"))
            .unwrap_or(false);
        if !is_wav {
            return Err(ApiError::Validation("Wav file not found".to_string()));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Malformed multipart upload: {}", e)))?;

        let cry = gateway.predict(&bytes, query.pet_id, &session.uid).await?;
        return Ok((
            StatusCode::CREATED,
            Json(CryResponse::render(cry, Default::default())),
        ));
    }

    Err(ApiError::Validation("Wav file not found".to_string()))
}

async fn update_cry(
    session: Session,
    State(store): State<GuardedStore>,
    Path(cry_id): Path<i64>,
    Query(lang): Query<LangQuery>,
    Json(body): Json<UpdateCryBody>,
) -> ApiResult<Json<CryResponse>> {
    let patch = CryPatch {
        time: body.time,
        state: body.state.as_deref().map(parse_state).transpose()?,
        audio_id: body.audio_id,
        predict_map: body.predict_map,
        intensity: body.intensity.as_deref().map(parse_intensity).transpose()?,
        duration: body.duration,
    };
    let cry = store.update_cry(cry_id, &session.uid, patch)?;
    Ok(Json(CryResponse::render(cry, lang.lang)))
}

async fn delete_cry(
    session: Session,
    State(store): State<GuardedStore>,
    Path(cry_id): Path<i64>,
) -> ApiResult<StatusCode> {
    store.delete_cry(cry_id, &session.uid)?;
    Ok(StatusCode::OK)
}

pub fn make_cry_routes(state: ServerState) -> Router {
    Router::new()
        .route("/create", post(create_cry))
        .route("/cry/{cry_id}", get(get_cry))
        .route("/pet/{pet_id}", get(get_pet_cries))
        .route("/search/state", get(search_cries_by_state))
        .route("/search/time", get(search_cries_by_time))
        .route("/inspect", get(inspect_cries))
        .route("/predict", post(predict_cry))
        .route("/{cry_id}", put(update_cry))
        .route("/{cry_id}", delete(delete_cry))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
