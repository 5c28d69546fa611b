use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    error::{AppError, MessageBody},
    state::AppState,
    users::{
        dto::RegisterRequest,
        repo_types::PublicUser,
        services::MSG_FIELDS_REQUIRED,
    },
};

pub const MSG_REGISTERED: &str = "Registration successful!";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/get-users", get(get_users))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageBody>), AppError> {
    let Json(req) = payload.map_err(|e| {
        warn!(error = %e, "unreadable registration body");
        AppError::Validation(MSG_FIELDS_REQUIRED.into())
    })?;

    state.registration.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageBody {
            message: MSG_REGISTERED.into(),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_users(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = state.registration.list_users().await?;
    Ok(Json(users))
}
