use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::session::{CheckInRequest, SessionDto},
    error::AppError,
    services::session_service,
    state::SharedState,
};

use super::member_token;

#[utoipa::path(
    post,
    path = "/check-in",
    tag = "sessions",
    params(("X-Member-Token" = String, Header, description = "Access token issued at registration")),
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "New entry session opened", body = SessionDto),
        (status = 401, description = "Bad entry code or unknown member token")
    )
)]
/// Open a fresh admission window for a returning member.
pub async fn check_in(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<CheckInRequest>,
) -> Result<(StatusCode, Json<SessionDto>), AppError> {
    payload.validate()?;
    let token = member_token(&headers)?;
    let session = session_service::check_in(&state, token, payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/session",
    tag = "sessions",
    params(("X-Member-Token" = String, Header, description = "Access token issued at registration")),
    responses(
        (status = 200, description = "Newest unexpired session, null once it lapsed", body = SessionDto),
        (status = 401, description = "Missing or unknown member token")
    )
)]
/// Report the caller's current admission window.
pub async fn current_session(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Option<SessionDto>>, AppError> {
    let token = member_token(&headers)?;
    Ok(Json(session_service::active_session(&state, token).await?))
}

/// Configure the entry session routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/check-in", post(check_in))
        .route("/session", get(current_session))
}
