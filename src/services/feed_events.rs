//! Builders and broadcast helpers for the SSE change feeds.

use serde::Serialize;
use tracing::warn;

use crate::{
    dto::feed::{ChangeEvent, Handshake, ServerEvent, SystemStatus},
    state::{
        SharedState,
        feed::{FeedOp, FeedTable},
    },
};

/// Sent once per subscriber immediately after the stream opens.
pub const EVENT_HANDSHAKE: &str = "handshake";
/// Announces that rows of one table changed.
pub const EVENT_CHANGE: &str = "change";
/// Announces that the degraded flag flipped.
pub const EVENT_SYSTEM: &str = "system";

/// Tell every feed subscriber that `table` changed.
///
/// Change events carry the table in the envelope so per-subscriber filters
/// can drop them before delivery.
pub fn broadcast_change(state: &SharedState, table: FeedTable, op: FeedOp) {
    let payload = ChangeEvent { table, op };
    if let Some(event) = serialize(EVENT_CHANGE, Some(table), &payload) {
        state.public_feed().broadcast(event.clone());
        state.admin_feed().broadcast(event);
    }
}

/// Tell every feed subscriber whether the backend is degraded.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    if let Some(event) = serialize(EVENT_SYSTEM, None, &payload) {
        state.public_feed().broadcast(event.clone());
        state.admin_feed().broadcast(event);
    }
}

/// Build the greeting delivered to a single subscriber, not broadcast.
pub fn handshake_event(stream: &str, degraded: bool, token: Option<String>) -> ServerEvent {
    let payload = Handshake {
        stream: stream.to_string(),
        message: format!("{stream} stream connected"),
        degraded,
        token,
    };
    serialize(EVENT_HANDSHAKE, None, &payload).unwrap_or_else(|| ServerEvent {
        event: Some(EVENT_HANDSHAKE.to_string()),
        table: None,
        data: "{}".to_string(),
    })
}

fn serialize<T: Serialize>(event: &str, table: Option<FeedTable>, payload: &T) -> Option<ServerEvent> {
    match ServerEvent::json(event.to_string(), table, payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialise feed payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[test]
    fn change_events_reach_both_hubs() {
        let state = AppState::new(AppConfig::default());
        let mut public = state.public_feed().subscribe();
        let mut admin = state.admin_feed().subscribe();

        broadcast_change(&state, FeedTable::Reservations, FeedOp::Insert);

        let event = public.try_recv().unwrap();
        assert_eq!(event.event.as_deref(), Some(EVENT_CHANGE));
        assert_eq!(event.table, Some(FeedTable::Reservations));
        assert!(event.data.contains("\"op\":\"insert\""));
        assert_eq!(admin.try_recv().unwrap().table, Some(FeedTable::Reservations));
    }

    #[test]
    fn handshake_carries_token_only_when_present() {
        let public = handshake_event("public", true, None);
        assert!(public.data.contains("\"degraded\":true"));
        assert!(!public.data.contains("token"));

        let admin = handshake_event("admin", false, Some("t0k".into()));
        assert!(admin.data.contains("\"token\":\"t0k\""));
        assert_eq!(admin.table, None);
    }
}
