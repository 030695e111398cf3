//! Subscription plumbing shared by the public and admin change feeds.
//!
//! Every subscriber gets its own forwarding task that turns broadcast events
//! into an SSE response stream, applying the caller's table filter on the
//! way. The admin feed additionally hands out a one-off console token and is
//! limited to a single subscriber at a time.

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::feed::ServerEvent,
    error::ServiceError,
    state::{SharedState, feed::FeedTable},
};

use super::feed_events;

const FORWARD_BUFFER: usize = 8;
const KEEP_ALIVE_SECS: u64 = 15;

/// Distinguishes the teardown behaviour of the two feed endpoints.
pub enum StreamKind {
    /// Plain subscriber; nothing to clean up.
    Public,
    /// Admin stream holding the console token slot.
    Admin(SharedState),
}

/// Subscribe to the public feed hub.
pub fn subscribe_public(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.public_feed().subscribe()
}

/// Claim the admin slot and subscribe to the admin feed hub.
///
/// Fails while another admin stream holds the slot; the token is released
/// when that stream disconnects.
pub async fn subscribe_admin(
    state: &SharedState,
) -> Result<(broadcast::Receiver<ServerEvent>, String), ServiceError> {
    let token = claim_admin_token(state).await?;
    Ok((state.admin_feed().subscribe(), token))
}

/// Reserve the single admin token slot, minting a fresh token.
pub async fn claim_admin_token(state: &SharedState) -> Result<String, ServiceError> {
    let mut guard = state.admin_token().lock().await;
    match guard.as_ref() {
        Some(_) => Err(ServiceError::Unauthorized(
            "Another admin feed stream is already active".to_string(),
        )),
        None => {
            let token = Uuid::new_v4().simple().to_string();
            *guard = Some(token.clone());
            Ok(token)
        }
    }
}

/// Release the admin token slot so the next console can connect.
pub async fn reset_admin_token(state: &SharedState) {
    let mut guard = state.admin_token().lock().await;
    if guard.take().is_some() {
        info!("admin token cleared");
    }
}

/// Forward degraded flag changes onto both feeds. Runs until shutdown.
pub async fn watch_degraded(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    loop {
        if watcher.changed().await.is_err() {
            break;
        }
        let degraded = *watcher.borrow_and_update();
        feed_events::broadcast_system_status(&state, degraded);
    }
}

/// Bridge a broadcast receiver into an SSE response.
///
/// The handshake goes out first, before any broadcast event. A dedicated
/// task forwards subsequent events through a small buffer so one slow client
/// cannot block the hub; if the client stops reading, the task notices the
/// closed channel and tears the subscription down.
pub fn to_feed_stream(
    receiver: broadcast::Receiver<ServerEvent>,
    handshake: ServerEvent,
    filter: Option<Vec<FeedTable>>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(FORWARD_BUFFER);

    tokio::spawn(async move {
        let mut receiver = receiver;
        if tx.send(Ok(to_event(handshake))).await.is_ok() {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    event = receiver.recv() => match event {
                        Ok(message) => {
                            if !delivers(&filter, &message) {
                                continue;
                            }
                            if tx.send(Ok(to_event(message))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "feed subscriber lagging; skipping events");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        }

        match kind {
            StreamKind::Public => info!("public feed subscriber disconnected"),
            StreamKind::Admin(state) => {
                reset_admin_token(&state).await;
                info!("admin feed stream closed; token reset");
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}

/// Whether an event passes the subscriber's table filter.
///
/// Events without a table (handshake, system status) always pass.
fn delivers(filter: &Option<Vec<FeedTable>>, event: &ServerEvent) -> bool {
    match (filter, event.table) {
        (Some(tables), Some(table)) => tables.contains(&table),
        _ => true,
    }
}

fn to_event(message: ServerEvent) -> Event {
    let mut event = Event::default().data(message.data);
    if let Some(name) = message.event {
        event = event.event(name);
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    fn message(table: Option<FeedTable>) -> ServerEvent {
        ServerEvent {
            event: Some("change".into()),
            table,
            data: "{}".into(),
        }
    }

    #[test]
    fn filter_gates_table_events_but_never_envelope_events() {
        let filter = Some(vec![FeedTable::Courts]);
        assert!(delivers(&filter, &message(Some(FeedTable::Courts))));
        assert!(!delivers(&filter, &message(Some(FeedTable::Settings))));
        assert!(delivers(&filter, &message(None)));
        assert!(delivers(&None, &message(Some(FeedTable::Settings))));
    }

    #[tokio::test]
    async fn admin_slot_is_exclusive_until_reset() {
        let state = AppState::new(AppConfig::default());

        let token = claim_admin_token(&state).await.unwrap();
        assert_eq!(token.len(), 32);
        assert!(matches!(
            claim_admin_token(&state).await,
            Err(ServiceError::Unauthorized(_))
        ));

        reset_admin_token(&state).await;
        let second = claim_admin_token(&state).await.unwrap();
        assert_ne!(token, second);
    }

    #[tokio::test]
    async fn degraded_watcher_announces_flips() {
        let state = AppState::new(AppConfig::default());
        let mut public = state.public_feed().subscribe();
        tokio::spawn(watch_degraded(state.clone()));
        // Let the spawned watcher reach its subscribe point before flipping.
        tokio::task::yield_now().await;

        state.set_degraded(false);
        let event = tokio::time::timeout(Duration::from_secs(1), public.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event.as_deref(), Some(feed_events::EVENT_SYSTEM));
        assert!(event.data.contains("\"degraded\":false"));
    }
}
