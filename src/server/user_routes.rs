use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::dto::{AuthenticatedUserResponse, UserResponse};
use super::session::Session;
use super::state::{GuardedStore, GuardedTokenIssuer, ServerState};
use crate::error::ApiResult;
use crate::pet_store::{NewUser, UserPatch, UserStore};

#[derive(Deserialize, Debug)]
struct CreateUserBody {
    pub uid: String,
    pub email: String,
    pub nickname: String,
    #[serde(rename = "photoId")]
    pub photo_id: Option<String>,
}

#[derive(Deserialize, Debug)]
struct UpdateUserBody {
    pub nickname: Option<String>,
    #[serde(rename = "photoId")]
    pub photo_id: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub uid: String,
    pub email: String,
}

async fn create_user(
    State(store): State<GuardedStore>,
    State(token_issuer): State<GuardedTokenIssuer>,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<impl IntoResponse> {
    let user = store.create_user(NewUser::new(
        body.uid,
        body.email,
        body.nickname,
        body.photo_id,
    )?)?;
    let token = token_issuer.sign(&user.uid)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthenticatedUserResponse {
            user: user.into(),
            token,
        }),
    ))
}

async fn login(
    State(store): State<GuardedStore>,
    State(token_issuer): State<GuardedTokenIssuer>,
    Json(body): Json<LoginBody>,
) -> ApiResult<Json<AuthenticatedUserResponse>> {
    let user = store.login_user(&body.uid, &body.email)?;
    let token = token_issuer.sign(&user.uid)?;
    Ok(Json(AuthenticatedUserResponse {
        user: user.into(),
        token,
    }))
}

async fn get_current_user(
    session: Session,
    State(store): State<GuardedStore>,
) -> ApiResult<Json<UserResponse>> {
    Ok(Json(store.get_user(&session.uid)?.into()))
}

async fn update_current_user(
    session: Session,
    State(store): State<GuardedStore>,
    Json(body): Json<UpdateUserBody>,
) -> ApiResult<Json<UserResponse>> {
    let patch = UserPatch {
        nickname: body.nickname,
        photo_id: body.photo_id,
    };
    Ok(Json(store.update_user(&session.uid, patch)?.into()))
}

async fn delete_current_user(
    session: Session,
    State(store): State<GuardedStore>,
) -> ApiResult<StatusCode> {
    store.delete_user(&session.uid)?;
    Ok(StatusCode::OK)
}

async fn get_user_by_id(
    _session: Session,
    State(store): State<GuardedStore>,
    Path(target_uid): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    Ok(Json(store.get_user(&target_uid)?.into()))
}

pub fn make_user_routes(state: ServerState) -> Router {
    Router::new()
        .route("/me", post(create_user))
        .route("/me", get(get_current_user))
        .route("/me", put(update_current_user))
        .route("/me", delete(delete_current_user))
        .route("/me/login", post(login))
        .route("/user/{target_uid}", get(get_user_by_id))
        .with_state(state)
}
