//! Member registration, token authentication and profile assembly.

use std::time::SystemTime;

use rand::Rng;
use tracing::{info, warn};

use crate::{
    dto::member::{MemberProfileResponse, MemberRegisteredResponse, RegisterMemberRequest},
    error::ServiceError,
    state::{
        SharedState,
        directory::Member,
        feed::{FeedOp, FeedTable},
    },
};

use super::{feed_events, session_service};

const TOKEN_BYTES: usize = 24;

/// Register a new member and open their first entry session.
///
/// The entry code proves physical presence at the entrance, so registration
/// doubles as the first check-in. The access token is returned exactly once.
pub async fn register(
    state: &SharedState,
    request: RegisterMemberRequest,
) -> Result<MemberRegisteredResponse, ServiceError> {
    session_service::verify_entry_code(state, &request.entry_code)?;

    let nickname = request.nickname.trim().to_string();
    let access_token = generate_access_token();
    let now = SystemTime::now();
    let ttl = state.config().session_ttl();

    let token_for_directory = access_token.clone();
    let (member, session) = state
        .write_directory(move |directory| directory.register(nickname, token_for_directory, now, ttl))
        .await;
    state.member_tokens().insert(access_token.clone(), member.id);

    info!(
        member_number = member.member_number,
        nickname = %member.nickname,
        "registered new member"
    );

    persist_member(state, &member).await;
    session_service::persist_entry_session(state, &session).await;
    feed_events::broadcast_change(state, FeedTable::EntrySessions, FeedOp::Insert);

    Ok(MemberRegisteredResponse {
        member: member.into(),
        access_token,
        session: session.into(),
    })
}

/// Resolve the member behind a bearer token.
pub async fn member_by_token(state: &SharedState, token: &str) -> Result<Member, ServiceError> {
    let member_id = state
        .member_tokens()
        .get(token)
        .map(|entry| *entry.value())
        .ok_or_else(|| ServiceError::Unauthorized("unknown member token".to_string()))?;
    state
        .read_directory(|directory| directory.member(member_id).cloned())
        .await
        .ok_or_else(|| ServiceError::Unauthorized("unknown member token".to_string()))
}

/// Assemble the profile view for an authenticated member.
pub async fn profile(
    state: &SharedState,
    token: &str,
) -> Result<MemberProfileResponse, ServiceError> {
    let member = member_by_token(state, token).await?;
    let now = SystemTime::now();

    let active_session = state
        .read_directory(|directory| directory.active_session(member.id, now).cloned())
        .await;
    let reservation = state
        .read_board(|board| board.reservation_for(member.id).cloned())
        .await;

    Ok(MemberProfileResponse {
        member: member.into(),
        active_session: active_session.map(Into::into),
        reservation: reservation.map(Into::into),
    })
}

/// Best-effort write-behind of a member row.
pub(crate) async fn persist_member(state: &SharedState, member: &Member) {
    if let Some(store) = state.venue_store().await {
        if let Err(err) = store.save_member(member.clone().into()).await {
            warn!(
                member_number = member.member_number,
                error = %err,
                "failed to persist member; keeping in-memory copy"
            );
        }
    }
}

fn generate_access_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    fn register_request(state: &SharedState, nickname: &str) -> RegisterMemberRequest {
        RegisterMemberRequest {
            nickname: nickname.into(),
            entry_code: state.config().entry_code().to_string(),
        }
    }

    #[tokio::test]
    async fn registration_trims_the_nickname_and_opens_a_session() {
        let state = AppState::new(AppConfig::default());

        let response = register(&state, register_request(&state, "  alice  "))
            .await
            .unwrap();

        assert_eq!(response.member.member_number, 1);
        assert_eq!(response.member.nickname, "alice");
        assert_eq!(response.access_token.len(), TOKEN_BYTES * 2);
        assert!(response.session.is_active);

        let member = member_by_token(&state, &response.access_token).await.unwrap();
        assert_eq!(member.id, response.member.id);
    }

    #[tokio::test]
    async fn registration_rejects_a_wrong_entry_code() {
        let state = AppState::new(AppConfig::default());
        let request = RegisterMemberRequest {
            nickname: "alice".into(),
            entry_code: "stale-poster".into(),
        };

        assert!(matches!(
            register(&state, request).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(state.read_directory(|directory| directory.is_empty()).await);
    }

    #[tokio::test]
    async fn member_numbers_grow_with_each_registration() {
        let state = AppState::new(AppConfig::default());

        let first = register(&state, register_request(&state, "alice")).await.unwrap();
        let second = register(&state, register_request(&state, "bob")).await.unwrap();

        assert_eq!(first.member.member_number, 1);
        assert_eq!(second.member.member_number, 2);
        assert_ne!(first.access_token, second.access_token);
    }

    #[tokio::test]
    async fn unknown_tokens_are_rejected() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            member_by_token(&state, "no-such-token").await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn profile_reports_the_freshly_opened_session() {
        let state = AppState::new(AppConfig::default());
        let registered = register(&state, register_request(&state, "alice"))
            .await
            .unwrap();

        let profile = profile(&state, &registered.access_token).await.unwrap();
        assert_eq!(profile.member.member_number, 1);
        assert!(profile.active_session.is_some());
        assert!(profile.reservation.is_none());
    }
}
