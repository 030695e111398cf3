use axum::{Router, http::HeaderMap};

use crate::{error::AppError, state::SharedState};

pub mod admin;
pub mod courts;
pub mod docs;
pub mod feed;
pub mod health;
pub mod members;
pub mod session;

/// Header carrying the access token issued at registration.
pub(crate) const MEMBER_TOKEN_HEADER: &str = "x-member-token";

/// Pull the member access token out of the request headers.
pub(crate) fn member_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(MEMBER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing member token header `X-Member-Token`".into())
        })
}

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(feed::router())
        .merge(members::router())
        .merge(session::router())
        .merge(courts::router())
        .merge(admin::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
