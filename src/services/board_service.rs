//! Reservation board operations: joining teams, starting and ending games.

use std::{collections::HashMap, time::SystemTime};

use tracing::info;
use uuid::Uuid;

use crate::{
    dto::{
        court::{CourtOverview, TeamMemberDto, TeamOverview},
        reservation::{
            EndGameResponse, ReservationWithMemberDto, ReserveRequest, ReserveResponse,
        },
    },
    error::ServiceError,
    state::{
        SharedState,
        board::{Board, Court, Reservation, ReservationStatus},
        directory::Member,
        feed::{FeedOp, FeedTable},
    },
};

use super::{feed_events, member_service, session_service};

/// Owned cut of one court and its teams, taken under the board lock.
struct BoardSlice {
    court: Court,
    teams: Vec<(u32, Vec<Reservation>)>,
    player_count: usize,
    next_team_number: u32,
}

/// The whole floor, one overview per court in board order.
pub async fn court_overviews(state: &SharedState) -> Vec<CourtOverview> {
    let slices = state
        .read_board(|board| {
            board
                .courts()
                .map(|court| slice(board, court))
                .collect::<Vec<_>>()
        })
        .await;

    let names = member_names(state).await;
    slices
        .into_iter()
        .map(|cut| build_overview(cut, &names))
        .collect()
}

/// One court joined with its teams and member names.
pub async fn court_overview(
    state: &SharedState,
    court_id: u32,
) -> Result<CourtOverview, ServiceError> {
    let cut = state
        .read_board(|board| board.court(court_id).map(|court| slice(board, court)))
        .await
        .ok_or_else(|| ServiceError::NotFound(format!("court {court_id} does not exist")))?;

    let names = member_names(state).await;
    Ok(build_overview(cut, &names))
}

/// Every reservation on the board, joined with the owning member.
pub async fn reservations_with_members(state: &SharedState) -> Vec<ReservationWithMemberDto> {
    let reservations: Vec<Reservation> = state
        .read_board(|board| board.reservations().cloned().collect())
        .await;
    let members: HashMap<Uuid, Member> = state
        .read_directory(|directory| {
            directory
                .members()
                .map(|member| (member.id, member.clone()))
                .collect()
        })
        .await;

    reservations
        .into_iter()
        .filter_map(|reservation| {
            members
                .get(&reservation.member_id)
                .cloned()
                .map(|member| (reservation, member).into())
        })
        .collect()
}

/// Join a team on a court on behalf of the token's member.
///
/// Requires an unexpired entry session; everything else (capacity, the
/// next-team rule, promotion of a filling team) is decided inside one board
/// mutation.
pub async fn reserve(
    state: &SharedState,
    token: &str,
    court_id: u32,
    request: ReserveRequest,
) -> Result<ReserveResponse, ServiceError> {
    let member = member_service::member_by_token(state, token).await?;
    session_service::require_active_session(state, member.id).await?;

    let now = SystemTime::now();
    let outcome = state
        .write_board(|board| board.reserve(court_id, member.id, request.team_number, now))
        .await?;

    info!(
        member_number = member.member_number,
        court_id,
        team = outcome.reservation.team_number,
        promoted = ?outcome.promoted_to,
        "reservation created"
    );

    feed_events::broadcast_change(state, FeedTable::Reservations, FeedOp::Insert);
    if outcome.court_status_changed {
        feed_events::broadcast_change(state, FeedTable::Courts, FeedOp::Update);
    }

    Ok(ReserveResponse {
        reservation: outcome.reservation.into(),
        promoted_to: outcome.promoted_to.map(Into::into),
    })
}

/// Withdraw the caller's reservation on the court, at any status.
pub async fn cancel(state: &SharedState, token: &str, court_id: u32) -> Result<(), ServiceError> {
    let member = member_service::member_by_token(state, token).await?;
    let outcome = state
        .write_board(|board| board.cancel(member.id, court_id))
        .await?;

    info!(
        member_number = member.member_number,
        court_id,
        team = outcome.reservation.team_number,
        "reservation cancelled"
    );

    feed_events::broadcast_change(state, FeedTable::Reservations, FeedOp::Delete);
    if outcome.court_status_changed {
        feed_events::broadcast_change(state, FeedTable::Courts, FeedOp::Update);
    }
    Ok(())
}

/// Move the caller's confirmed team onto the court.
pub async fn start_game(
    state: &SharedState,
    token: &str,
    court_id: u32,
) -> Result<CourtOverview, ServiceError> {
    let member = member_service::member_by_token(state, token).await?;
    let started = state
        .write_board(|board| board.start_game(court_id, member.id))
        .await?;

    info!(court_id, team = started.team_number, "game started");

    feed_events::broadcast_change(state, FeedTable::Reservations, FeedOp::Update);
    feed_events::broadcast_change(state, FeedTable::Courts, FeedOp::Update);

    court_overview(state, court_id).await
}

/// End the running game the caller is part of.
///
/// Domain refusals (no game running, caller not seated) come back as a
/// `success: false` report instead of an error, so the kiosk can show the
/// reason without special-casing status codes.
pub async fn end_game(
    state: &SharedState,
    token: &str,
    court_id: u32,
) -> Result<EndGameResponse, ServiceError> {
    let member = member_service::member_by_token(state, token).await?;
    let result = state
        .write_board(|board| board.end_game(court_id, member.id))
        .await;

    match result {
        Ok(ended) => {
            info!(
                court_id,
                team = ended.team_number,
                cleared = ended.cleared.len(),
                "game ended"
            );
            feed_events::broadcast_change(state, FeedTable::Reservations, FeedOp::Delete);
            if ended.court_status_changed {
                feed_events::broadcast_change(state, FeedTable::Courts, FeedOp::Update);
            }
            Ok(EndGameResponse {
                success: true,
                message: format!(
                    "game ended; team {} cleared from court {court_id}",
                    ended.team_number
                ),
            })
        }
        Err(err) => Ok(EndGameResponse {
            success: false,
            message: err.to_string(),
        }),
    }
}

fn slice(board: &Board, court: &Court) -> BoardSlice {
    BoardSlice {
        court: court.clone(),
        teams: board
            .teams_on(court.id)
            .into_iter()
            .map(|(team_number, members)| {
                (team_number, members.into_iter().cloned().collect())
            })
            .collect(),
        player_count: board.occupancy(court.id),
        next_team_number: board.next_team_number(court.id),
    }
}

fn build_overview(cut: BoardSlice, names: &HashMap<Uuid, (u32, String)>) -> CourtOverview {
    let teams = cut
        .teams
        .into_iter()
        .map(|(team_number, members)| {
            let status = members
                .first()
                .map(|reservation| reservation.status)
                .unwrap_or(ReservationStatus::Waiting)
                .into();
            let members = members
                .iter()
                .map(|reservation| seat(reservation, names))
                .collect();
            TeamOverview {
                team_number,
                status,
                members,
            }
        })
        .collect();

    CourtOverview {
        id: cut.court.id,
        name: cut.court.name,
        status: cut.court.status.into(),
        teams,
        player_count: cut.player_count,
        next_team_number: cut.next_team_number,
    }
}

fn seat(reservation: &Reservation, names: &HashMap<Uuid, (u32, String)>) -> TeamMemberDto {
    let (member_number, nickname) = names
        .get(&reservation.member_id)
        .cloned()
        .unwrap_or((0, "unknown".to_string()));
    TeamMemberDto::new(
        reservation.member_id,
        member_number,
        nickname,
        reservation.reserved_at,
    )
}

async fn member_names(state: &SharedState) -> HashMap<Uuid, (u32, String)> {
    state
        .read_directory(|directory| {
            directory
                .members()
                .map(|member| (member.id, (member.member_number, member.nickname.clone())))
                .collect()
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::{court::CourtStatusDto, member::RegisterMemberRequest, reservation::ReservationStatusDto},
        state::AppState,
    };

    async fn member_token(state: &SharedState, nickname: &str) -> String {
        member_service::register(
            state,
            RegisterMemberRequest {
                nickname: nickname.into(),
                entry_code: state.config().entry_code().to_string(),
            },
        )
        .await
        .unwrap()
        .access_token
    }

    async fn join(
        state: &SharedState,
        token: &str,
        court_id: u32,
        team_number: u32,
    ) -> Result<ReserveResponse, ServiceError> {
        reserve(state, token, court_id, ReserveRequest { team_number }).await
    }

    #[tokio::test]
    async fn the_fourth_member_fills_the_team_and_starts_play() {
        let state = AppState::new(AppConfig::default());
        let mut promoted = None;
        for nickname in ["ann", "ben", "cho", "dee"] {
            let token = member_token(&state, nickname).await;
            promoted = join(&state, &token, 1, 1).await.unwrap().promoted_to;
        }

        assert_eq!(promoted, Some(ReservationStatusDto::Playing));
        let overview = court_overview(&state, 1).await.unwrap();
        assert_eq!(overview.status, CourtStatusDto::InUse);
        assert_eq!(overview.player_count, 4);
        assert_eq!(overview.teams.len(), 1);
        assert_eq!(overview.teams[0].members.len(), 4);
        assert_eq!(overview.next_team_number, 2);
    }

    #[tokio::test]
    async fn reserving_needs_an_unexpired_entry_session() {
        use std::time::Duration;

        use crate::state::directory::{EntrySession, Member};

        let state = AppState::new(AppConfig::default());
        let now = SystemTime::now();
        let member = Member {
            id: Uuid::new_v4(),
            member_number: 1,
            nickname: "late".into(),
            access_token: "tok".into(),
            created_at: now - Duration::from_secs(9_000),
        };
        let stale = EntrySession {
            id: Uuid::new_v4(),
            member_id: member.id,
            entry_at: now - Duration::from_secs(9_000),
            expires_at: now - Duration::from_secs(60),
            is_active: true,
        };
        state.member_tokens().insert("tok".into(), member.id);
        state
            .write_directory(|directory| directory.hydrate(vec![member], vec![stale]))
            .await;

        assert!(matches!(
            join(&state, "tok", 1, 1).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn two_contenders_for_the_last_seat_leave_exactly_one_inside() {
        let state = AppState::new(AppConfig::default());
        for nickname in ["ann", "ben", "cho"] {
            let token = member_token(&state, nickname).await;
            join(&state, &token, 1, 1).await.unwrap();
        }

        let token_d = member_token(&state, "dee").await;
        let token_e = member_token(&state, "eve").await;
        let state_d = state.clone();
        let state_e = state.clone();
        let left = tokio::spawn(async move { join(&state_d, &token_d, 1, 1).await });
        let right = tokio::spawn(async move { join(&state_e, &token_e, 1, 1).await });

        let left = left.await.unwrap();
        let right = right.await.unwrap();
        assert_eq!(u8::from(left.is_ok()) + u8::from(right.is_ok()), 1);
        let loser = if left.is_ok() { right } else { left };
        assert!(matches!(loser, Err(ServiceError::Capacity(_))));

        let overview = court_overview(&state, 1).await.unwrap();
        assert_eq!(overview.player_count, 4);
    }

    #[tokio::test]
    async fn a_queued_team_takes_the_court_after_the_game_ends() {
        let state = AppState::new(AppConfig::default());
        let mut first_team = Vec::new();
        for nickname in ["ann", "ben", "cho", "dee"] {
            let token = member_token(&state, nickname).await;
            join(&state, &token, 1, 1).await.unwrap();
            first_team.push(token);
        }

        let mut second_team = Vec::new();
        let mut promoted = None;
        for nickname in ["eli", "fay", "gus", "hal"] {
            let token = member_token(&state, nickname).await;
            promoted = join(&state, &token, 1, 2).await.unwrap().promoted_to;
            second_team.push(token);
        }
        // The court is busy, so the full second team queues as confirmed.
        assert_eq!(promoted, Some(ReservationStatusDto::Confirmed));

        // Starting while another game runs is refused.
        assert!(matches!(
            start_game(&state, &second_team[0], 1).await,
            Err(ServiceError::InvalidState(_))
        ));

        let report = end_game(&state, &first_team[2], 1).await.unwrap();
        assert!(report.success);

        let overview = start_game(&state, &second_team[0], 1).await.unwrap();
        assert_eq!(overview.status, CourtStatusDto::InUse);
        assert_eq!(overview.teams.len(), 1);
        assert_eq!(overview.teams[0].status, ReservationStatusDto::Playing);
        assert_eq!(overview.next_team_number, 3);
    }

    #[tokio::test]
    async fn ending_without_a_running_game_reports_instead_of_failing() {
        let state = AppState::new(AppConfig::default());
        let token = member_token(&state, "ann").await;
        join(&state, &token, 1, 1).await.unwrap();

        let report = end_game(&state, &token, 1).await.unwrap();
        assert!(!report.success);
        assert!(report.message.contains("no running game"));

        // The waiting reservation is untouched.
        assert_eq!(reservations_with_members(&state).await.len(), 1);
    }

    #[tokio::test]
    async fn cancelling_frees_the_seat_and_notifies_the_feed() {
        let state = AppState::new(AppConfig::default());
        let token = member_token(&state, "ann").await;
        join(&state, &token, 1, 1).await.unwrap();

        let mut feed = state.public_feed().subscribe();
        cancel(&state, &token, 1).await.unwrap();

        let event = feed.try_recv().unwrap();
        assert_eq!(event.table, Some(FeedTable::Reservations));
        assert!(event.data.contains("\"op\":\"delete\""));
        assert!(reservations_with_members(&state).await.is_empty());

        // The seat can be taken again under a fresh team number.
        assert!(join(&state, &token, 1, 1).await.is_ok());
    }
}
