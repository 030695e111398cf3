use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use validator::Validate;

use crate::{
    dto::admin::{ActiveEntryDto, EntryLinkDto, SettingsDto, UpdateSettingsRequest},
    error::AppError,
    services::admin_service,
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints for venue settings and the entry roster.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route(
            "/admin/settings",
            get(get_settings).put(update_settings),
        )
        .route("/admin/sessions", get(list_active_sessions))
        .route("/admin/entry-link", get(entry_link))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

#[utoipa::path(
    get,
    path = "/admin/settings",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /feed/admin stream")),
    responses((status = 200, description = "Current venue settings, defaults until first saved", body = SettingsDto))
)]
/// Read the venue settings singleton.
pub async fn get_settings(State(state): State<SharedState>) -> Json<SettingsDto> {
    Json(admin_service::settings(&state).await)
}

#[utoipa::path(
    put,
    path = "/admin/settings",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /feed/admin stream")),
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings replaced", body = SettingsDto),
        (status = 400, description = "A field failed validation")
    )
)]
/// Replace the venue settings singleton.
pub async fn update_settings(
    State(state): State<SharedState>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsDto>, AppError> {
    payload.validate()?;
    Ok(Json(admin_service::update_settings(&state, payload).await))
}

#[utoipa::path(
    get,
    path = "/admin/sessions",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /feed/admin stream")),
    responses((status = 200, description = "Members currently inside, newest entries first", body = [ActiveEntryDto]))
)]
/// List everyone currently inside the facility.
pub async fn list_active_sessions(State(state): State<SharedState>) -> Json<Vec<ActiveEntryDto>> {
    Json(admin_service::active_entries(&state).await)
}

#[utoipa::path(
    get,
    path = "/admin/entry-link",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /feed/admin stream")),
    responses((status = 200, description = "The canonical entrance QR payload", body = EntryLinkDto))
)]
/// Return the URL to encode into the entrance QR poster.
pub async fn entry_link(State(state): State<SharedState>) -> Json<EntryLinkDto> {
    Json(admin_service::entry_link(&state))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    let expected = {
        let guard = state.admin_token().lock().await;
        guard.clone()
    };

    match expected {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "admin feed stream not initialised yet".into(),
        )),
    }
}
