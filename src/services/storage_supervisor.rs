//! Storage supervision: connection bootstrap, reconciliation, health polling
//! and reconnection.
//!
//! The application serves from memory and treats storage as write-behind, so
//! the supervisor's job is to get a connection up, settle the difference
//! between memory and the stored rows, and then keep the degraded flag
//! truthful while polling the backend.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{
        models::{EntrySessionEntity, MemberEntity},
        storage::StorageError,
        venue_store::VenueStore,
    },
    state::{
        SharedState,
        directory::{EntrySession, Member},
    },
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Reconnect to the storage backend and keep the shared state in degraded mode when it is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn VenueStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                if let Err(err) = reconcile(&state, &store).await {
                    warn!(error = %err, "storage reconciliation failed; retrying");
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_DELAY);
                    continue;
                }
                state.install_venue_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if state.is_degraded() {
                                info!("storage healthy again; leaving degraded mode");
                                state.set_degraded(false);
                            }
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(_) => {
                            let mut attempt = 0;
                            let mut reconnect_delay = INITIAL_DELAY;
                            let mut reconnected = false;

                            while attempt < MAX_RECONNECT_ATTEMPTS {
                                match store.try_reconnect().await {
                                    Ok(()) => {
                                        info!(
                                            "storage reconnection succeeded after health check failure"
                                        );
                                        reconnected = true;
                                        break;
                                    }
                                    Err(reconnect_err) => {
                                        if attempt == 0 {
                                            warn!(
                                                attempt, error = %reconnect_err,
                                                "storage reconnect first attempt failed; entering in degraded mode"
                                            );
                                            state.set_degraded(true);
                                        } else {
                                            warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                                        };
                                        attempt += 1;
                                        sleep(reconnect_delay).await;
                                        reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                                    }
                                }
                            }

                            if reconnected {
                                state.set_degraded(false);
                                sleep(HEALTH_POLL_INTERVAL).await;
                                continue;
                            } else {
                                warn!(
                                    "exhausted storage reconnect attempts; staying in degraded mode"
                                );
                                state.clear_venue_store().await;
                                break;
                            }
                        }
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Settle the difference between memory and the stored rows.
///
/// An empty directory adopts whatever the store holds; otherwise the store
/// is brought up to date with the rows written while degraded. Members are
/// never deleted, so replaying upserts is enough.
async fn reconcile(state: &SharedState, store: &Arc<dyn VenueStore>) -> Result<(), StorageError> {
    let stored_members = store.load_members().await?;
    let stored_sessions = store.load_entry_sessions().await?;
    let stored_settings = store.load_settings().await?;

    let members: Vec<Member> = stored_members.into_iter().map(Into::into).collect();
    let sessions: Vec<EntrySession> = stored_sessions.into_iter().map(Into::into).collect();
    let tokens: Vec<(String, uuid::Uuid)> = members
        .iter()
        .map(|member| (member.access_token.clone(), member.id))
        .collect();
    let member_count = members.len();
    let session_count = sessions.len();

    let hydrated = state
        .write_directory(move |directory| {
            if directory.is_empty() {
                directory.hydrate(members, sessions);
                true
            } else {
                false
            }
        })
        .await;

    if hydrated {
        state.member_tokens().clear();
        for (token, member_id) in tokens {
            state.member_tokens().insert(token, member_id);
        }
        info!(
            members = member_count,
            sessions = session_count,
            "hydrated directory from storage"
        );
    } else {
        replay(state, store).await?;
    }

    match stored_settings {
        Some(entity) => {
            let adopt = state.read_settings(|current| current.is_none()).await;
            if adopt {
                state.replace_settings(entity.into()).await;
            }
        }
        None => {
            if let Some(settings) = state.read_settings(|current| current.cloned()).await {
                store.save_settings(settings.into()).await?;
            }
        }
    }

    Ok(())
}

/// Push every in-memory row into the store.
async fn replay(state: &SharedState, store: &Arc<dyn VenueStore>) -> Result<(), StorageError> {
    let (members, sessions) = state
        .read_directory(|directory| {
            (
                directory
                    .members()
                    .cloned()
                    .map(MemberEntity::from)
                    .collect::<Vec<_>>(),
                directory
                    .sessions()
                    .cloned()
                    .map(EntrySessionEntity::from)
                    .collect::<Vec<_>>(),
            )
        })
        .await;

    let member_count = members.len();
    let session_count = sessions.len();
    for member in members {
        store.save_member(member).await?;
    }
    for session in sessions {
        store.save_entry_session(session).await?;
    }

    info!(
        members = member_count,
        sessions = session_count,
        "replayed in-memory directory into storage"
    );
    Ok(())
}
