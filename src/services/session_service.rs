//! Entry code verification and the append-only entry session ledger.

use std::time::SystemTime;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::session::{CheckInRequest, SessionDto},
    error::ServiceError,
    state::{
        SharedState,
        directory::EntrySession,
        feed::{FeedOp, FeedTable},
    },
};

use super::{feed_events, member_service};

/// Open a new entry session for an authenticated member.
///
/// Checking in again while an earlier session is still running simply
/// appends another row; reads resolve the newest one.
pub async fn check_in(
    state: &SharedState,
    token: &str,
    request: CheckInRequest,
) -> Result<SessionDto, ServiceError> {
    verify_entry_code(state, &request.entry_code)?;
    let member = member_service::member_by_token(state, token).await?;

    let now = SystemTime::now();
    let ttl = state.config().session_ttl();
    let session = state
        .write_directory(|directory| directory.open_session(member.id, now, ttl))
        .await
        .ok_or_else(|| ServiceError::NotFound("member not found".to_string()))?;

    info!(member_number = member.member_number, "member checked in");

    persist_entry_session(state, &session).await;
    feed_events::broadcast_change(state, FeedTable::EntrySessions, FeedOp::Insert);

    Ok(session.into())
}

/// The caller's newest unexpired session.
///
/// A lapsed session reads as absence, not as an error.
pub async fn active_session(
    state: &SharedState,
    token: &str,
) -> Result<Option<SessionDto>, ServiceError> {
    let member = member_service::member_by_token(state, token).await?;
    let now = SystemTime::now();
    let session = state
        .read_directory(|directory| directory.active_session(member.id, now).cloned())
        .await;
    Ok(session.map(Into::into))
}

/// Refuse callers whose admission window has lapsed.
pub(crate) async fn require_active_session(
    state: &SharedState,
    member_id: Uuid,
) -> Result<(), ServiceError> {
    let now = SystemTime::now();
    let current = state
        .read_directory(|directory| directory.active_session(member_id, now).is_some())
        .await;
    if current {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "no active entry session; scan the entrance QR code first".to_string(),
        ))
    }
}

/// Check a scanned code against the configured entrance code.
pub(crate) fn verify_entry_code(state: &SharedState, code: &str) -> Result<(), ServiceError> {
    if code == state.config().entry_code() {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized("invalid entry code".to_string()))
    }
}

/// Best-effort write-behind of an entry session row.
pub(crate) async fn persist_entry_session(state: &SharedState, session: &EntrySession) {
    if let Some(store) = state.venue_store().await {
        if let Err(err) = store.save_entry_session(session.clone().into()).await {
            warn!(
                session_id = %session.id,
                error = %err,
                "failed to persist entry session; keeping in-memory copy"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        dto::member::RegisterMemberRequest,
        state::{AppState, directory::Member},
    };

    async fn registered_member(state: &SharedState, nickname: &str) -> (String, Uuid) {
        let response = member_service::register(
            state,
            RegisterMemberRequest {
                nickname: nickname.into(),
                entry_code: state.config().entry_code().to_string(),
            },
        )
        .await
        .unwrap();
        (response.access_token, response.member.id)
    }

    #[tokio::test]
    async fn check_in_appends_to_the_ledger() {
        let state = AppState::new(AppConfig::default());
        let (token, member_id) = registered_member(&state, "alice").await;

        let request = CheckInRequest {
            entry_code: state.config().entry_code().to_string(),
        };
        let second = check_in(&state, &token, request).await.unwrap();

        assert_eq!(second.member_id, member_id);
        let rows = state
            .read_directory(|directory| directory.sessions().count())
            .await;
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn check_in_rejects_a_wrong_entry_code() {
        let state = AppState::new(AppConfig::default());
        let (token, _) = registered_member(&state, "alice").await;

        let request = CheckInRequest {
            entry_code: "stale-poster".into(),
        };
        assert!(matches!(
            check_in(&state, &token, request).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn fresh_registrations_hold_an_active_session() {
        let state = AppState::new(AppConfig::default());
        let (token, member_id) = registered_member(&state, "alice").await;

        assert!(active_session(&state, &token).await.unwrap().is_some());
        assert!(require_active_session(&state, member_id).await.is_ok());
    }

    #[tokio::test]
    async fn lapsed_sessions_read_as_absent_and_do_not_authorize() {
        let state = AppState::new(AppConfig::default());
        let now = SystemTime::now();
        let member = Member {
            id: Uuid::new_v4(),
            member_number: 1,
            nickname: "alice".into(),
            access_token: "tok".into(),
            created_at: now - Duration::from_secs(9_000),
        };
        let stale = EntrySession {
            id: Uuid::new_v4(),
            member_id: member.id,
            entry_at: now - Duration::from_secs(9_000),
            expires_at: now - Duration::from_secs(1_800),
            is_active: true,
        };
        state.member_tokens().insert("tok".into(), member.id);
        state
            .write_directory(|directory| directory.hydrate(vec![member.clone()], vec![stale]))
            .await;

        assert!(active_session(&state, "tok").await.unwrap().is_none());
        assert!(matches!(
            require_active_session(&state, member.id).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
