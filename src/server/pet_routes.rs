use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;

use super::dto::{LangQuery, PetResponse};
use super::session::Session;
use super::state::{GuardedProfileImageStore, GuardedStore, ServerState};
use crate::error::{ApiError, ApiResult};
use crate::pet_store::{parse_gender, parse_species, NewPet, PetPatch, PetStore};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Deserialize, Debug)]
struct CreatePetBody {
    pub name: String,
    pub gender: String,
    pub age: i64,
    pub species: String,
    pub sub_species: String,
}

#[derive(Deserialize, Debug)]
struct UpdatePetBody {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i64>,
    pub species: Option<String>,
    pub sub_species: Option<String>,
}

#[derive(Serialize, Debug)]
struct UploadProfileResponse {
    pub photo_id: String,
}

async fn create_pet(
    session: Session,
    State(store): State<GuardedStore>,
    Query(lang): Query<LangQuery>,
    Json(body): Json<CreatePetBody>,
) -> ApiResult<impl IntoResponse> {
    let pet = NewPet::new(
        body.name,
        parse_gender(&body.gender)?,
        body.age,
        parse_species(&body.species)?,
        body.sub_species,
    )?;
    let created = store.create_pet(&session.uid, pet)?;
    Ok((
        StatusCode::CREATED,
        Json(PetResponse::render(created, lang.lang)),
    ))
}

async fn get_pet(
    session: Session,
    State(store): State<GuardedStore>,
    Path(pet_id): Path<i64>,
    Query(lang): Query<LangQuery>,
) -> ApiResult<Json<PetResponse>> {
    let pet = store.get_pet(pet_id, &session.uid)?;
    Ok(Json(PetResponse::render(pet, lang.lang)))
}

async fn get_user_pets(
    session: Session,
    State(store): State<GuardedStore>,
    Path(user_id): Path<String>,
    Query(lang): Query<LangQuery>,
) -> ApiResult<Json<Vec<PetResponse>>> {
    if user_id != session.uid {
        return Err(ApiError::Unauthorized(
            "You are not authorized to view these pets".to_string(),
        ));
    }
    let pets = store.list_pets_by_user(&user_id)?;
    Ok(Json(
        pets.into_iter()
            .map(|pet| PetResponse::render(pet, lang.lang))
            .collect(),
    ))
}

async fn update_pet(
    session: Session,
    State(store): State<GuardedStore>,
    Path(pet_id): Path<i64>,
    Query(lang): Query<LangQuery>,
    Json(body): Json<UpdatePetBody>,
) -> ApiResult<Json<PetResponse>> {
    let patch = PetPatch {
        name: body.name,
        gender: body.gender.as_deref().map(parse_gender).transpose()?,
        age: body.age,
        species: body.species.as_deref().map(parse_species).transpose()?,
        sub_species: body.sub_species,
        photo_id: None,
    };
    let pet = store.update_pet(pet_id, &session.uid, patch)?;
    Ok(Json(PetResponse::render(pet, lang.lang)))
}

async fn delete_pet(
    session: Session,
    State(store): State<GuardedStore>,
    Path(pet_id): Path<i64>,
) -> ApiResult<StatusCode> {
    store.delete_pet(pet_id, &session.uid)?;
    Ok(StatusCode::OK)
}

async fn upload_profile_image(
    session: Session,
    State(store): State<GuardedStore>,
    State(profile_images): State<GuardedProfileImageStore>,
    Path(pet_id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadProfileResponse>> {
    // ownership gate before touching the upload
    store.get_pet(pet_id, &session.uid)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .ok_or_else(|| {
                ApiError::WrongFileType("Could not determine the file extension".to_string())
            })?
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Malformed multipart upload: {}", e)))?;

        let photo_id = profile_images.store(pet_id, &bytes, &filename)?;
        store.set_pet_photo_id(pet_id, &session.uid, &photo_id)?;
        return Ok(Json(UploadProfileResponse { photo_id }));
    }

    Err(ApiError::Validation(
        "Missing file field in multipart upload".to_string(),
    ))
}

/// Unauthenticated, as profile images are referenced directly by the client;
/// falls back to the bundled default asset.
async fn get_profile_image(
    State(profile_images): State<GuardedProfileImageStore>,
    Path(file_id): Path<String>,
) -> Response {
    let file_path = profile_images.resolve(&file_id);

    let mut buffer = Vec::new();
    match File::open(&file_path).and_then(|mut f| f.read_to_end(&mut buffer)) {
        Ok(_) => {}
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    }

    if let Some(kind) = infer::get(&buffer) {
        if kind.mime_type().starts_with("image/") {
            return Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, kind.mime_type().to_string())
                .body(buffer.into())
                .unwrap();
        }
    }
    StatusCode::NOT_FOUND.into_response()
}

pub fn make_pet_routes(state: ServerState) -> Router {
    Router::new()
        .route("/create", post(create_pet))
        .route("/{pet_id}", get(get_pet))
        .route("/{pet_id}", put(update_pet))
        .route("/{pet_id}", delete(delete_pet))
        .route("/user/{user_id}", get(get_user_pets))
        .route("/upload/profile/{pet_id}", post(upload_profile_image))
        .route("/raw/profile/{file_id}", get(get_profile_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
