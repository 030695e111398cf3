use std::convert::Infallible;

use axum::{
    Router,
    extract::{Query, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    dto::feed::FeedQuery,
    error::AppError,
    services::{
        feed_events,
        feed_service::{self, StreamKind},
    },
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/feed",
    tag = "feed",
    params(FeedQuery),
    responses((status = 200, description = "Public change feed", content_type = "text/event-stream", body = String))
)]
/// Stream change notifications to floor displays and member browsers.
pub async fn public_feed(
    State(state): State<SharedState>,
    Query(query): Query<FeedQuery>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = feed_service::subscribe_public(&state);
    info!("new public feed connection");
    let handshake = feed_events::handshake_event("public", state.is_degraded(), None);
    feed_service::to_feed_stream(receiver, handshake, query.filter(), StreamKind::Public)
}

#[utoipa::path(
    get,
    path = "/feed/admin",
    tag = "feed",
    responses(
        (status = 200, description = "Admin change feed carrying the console token", content_type = "text/event-stream", body = String),
        (status = 401, description = "Another admin stream is already active")
    )
)]
/// Stream change notifications to the admin console, minting its token.
pub async fn admin_feed(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let (receiver, token) = feed_service::subscribe_admin(&state).await?;
    info!("new admin feed connection");
    let handshake = feed_events::handshake_event("admin", state.is_degraded(), Some(token));
    Ok(feed_service::to_feed_stream(
        receiver,
        handshake,
        None,
        StreamKind::Admin(state),
    ))
}

/// Configure the feed endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/feed", get(public_feed))
        .route("/feed/admin", get(admin_feed))
}
