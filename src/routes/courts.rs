use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        court::CourtOverview,
        reservation::{
            EndGameResponse, ReservationWithMemberDto, ReserveRequest, ReserveResponse,
        },
    },
    error::AppError,
    services::board_service,
    state::SharedState,
};

use super::member_token;

#[utoipa::path(
    get,
    path = "/courts",
    tag = "courts",
    responses((status = 200, description = "Every court joined with its teams", body = [CourtOverview]))
)]
/// Render the whole floor, one overview per court.
pub async fn list_courts(State(state): State<SharedState>) -> Json<Vec<CourtOverview>> {
    Json(board_service::court_overviews(&state).await)
}

#[utoipa::path(
    get,
    path = "/reservations",
    tag = "courts",
    responses((status = 200, description = "Every reservation joined with its member", body = [ReservationWithMemberDto]))
)]
/// List all reservations on the board.
pub async fn list_reservations(
    State(state): State<SharedState>,
) -> Json<Vec<ReservationWithMemberDto>> {
    Json(board_service::reservations_with_members(&state).await)
}

#[utoipa::path(
    post,
    path = "/courts/{id}/reservations",
    tag = "courts",
    params(
        ("X-Member-Token" = String, Header, description = "Access token issued at registration"),
        ("id" = u32, Path, description = "Court to join")
    ),
    request_body = ReserveRequest,
    responses(
        (status = 201, description = "Seat taken; reports a promotion when the team filled up", body = ReserveResponse),
        (status = 401, description = "Missing token or no active entry session"),
        (status = 404, description = "Unknown court or team number"),
        (status = 409, description = "Already reserved elsewhere, or the team is full")
    )
)]
/// Join a team on a court.
pub async fn reserve_court(
    State(state): State<SharedState>,
    Path(id): Path<u32>,
    headers: HeaderMap,
    Json(payload): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<ReserveResponse>), AppError> {
    payload.validate()?;
    let token = member_token(&headers)?;
    let response = board_service::reserve(&state, token, id, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    delete,
    path = "/courts/{id}/reservations",
    tag = "courts",
    params(
        ("X-Member-Token" = String, Header, description = "Access token issued at registration"),
        ("id" = u32, Path, description = "Court the reservation is on")
    ),
    responses(
        (status = 204, description = "Reservation withdrawn"),
        (status = 401, description = "Missing or unknown member token"),
        (status = 404, description = "No reservation for this member on the court")
    )
)]
/// Withdraw the caller's reservation, whatever its status.
pub async fn cancel_reservation(
    State(state): State<SharedState>,
    Path(id): Path<u32>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = member_token(&headers)?;
    board_service::cancel(&state, token, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/courts/{id}/start-game",
    tag = "courts",
    params(
        ("X-Member-Token" = String, Header, description = "Access token issued at registration"),
        ("id" = u32, Path, description = "Court to start playing on")
    ),
    responses(
        (status = 200, description = "Game started; the fresh court overview", body = CourtOverview),
        (status = 401, description = "Missing or unknown member token"),
        (status = 404, description = "No reservation for this member on the court"),
        (status = 409, description = "Team not confirmed, or another game is running")
    )
)]
/// Move the caller's confirmed team onto the court.
pub async fn start_game(
    State(state): State<SharedState>,
    Path(id): Path<u32>,
    headers: HeaderMap,
) -> Result<Json<CourtOverview>, AppError> {
    let token = member_token(&headers)?;
    Ok(Json(board_service::start_game(&state, token, id).await?))
}

#[utoipa::path(
    post,
    path = "/courts/{id}/end-game",
    tag = "courts",
    params(
        ("X-Member-Token" = String, Header, description = "Access token issued at registration"),
        ("id" = u32, Path, description = "Court the game runs on")
    ),
    responses(
        (status = 200, description = "Outcome report; domain refusals come back with success=false", body = EndGameResponse),
        (status = 401, description = "Missing or unknown member token")
    )
)]
/// End the running game the caller is part of, clearing the whole team.
pub async fn end_game(
    State(state): State<SharedState>,
    Path(id): Path<u32>,
    headers: HeaderMap,
) -> Result<Json<EndGameResponse>, AppError> {
    let token = member_token(&headers)?;
    Ok(Json(board_service::end_game(&state, token, id).await?))
}

/// Configure the court and reservation routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/courts", get(list_courts))
        .route("/reservations", get(list_reservations))
        .route(
            "/courts/{id}/reservations",
            post(reserve_court).delete(cancel_reservation),
        )
        .route("/courts/{id}/start-game", post(start_game))
        .route("/courts/{id}/end-game", post(end_game))
}
