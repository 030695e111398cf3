use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::member::{MemberProfileResponse, MemberRegisteredResponse, RegisterMemberRequest},
    error::AppError,
    services::member_service,
    state::SharedState,
};

use super::member_token;

#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = RegisterMemberRequest,
    responses(
        (status = 201, description = "Member registered, first entry session opened", body = MemberRegisteredResponse),
        (status = 400, description = "Nickname or entry code failed validation"),
        (status = 401, description = "Entry code does not match the entrance poster")
    )
)]
/// Register a walk-in visitor and hand them their access token.
pub async fn register_member(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterMemberRequest>,
) -> Result<(StatusCode, Json<MemberRegisteredResponse>), AppError> {
    payload.validate()?;
    let response = member_service::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/members/me",
    tag = "members",
    params(("X-Member-Token" = String, Header, description = "Access token issued at registration")),
    responses(
        (status = 200, description = "Profile of the calling member", body = MemberProfileResponse),
        (status = 401, description = "Missing or unknown member token")
    )
)]
/// Return the calling member's record, active session and reservation.
pub async fn member_profile(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<MemberProfileResponse>, AppError> {
    let token = member_token(&headers)?;
    Ok(Json(member_service::profile(&state, token).await?))
}

/// Configure the member routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/members", post(register_member))
        .route("/members/me", get(member_profile))
}
