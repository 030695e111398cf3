use std::time::SystemTime;

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

/// Maximum number of members a team can hold.
pub const TEAM_CAPACITY: usize = 4;

/// Whether a court currently hosts a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourtStatus {
    /// No team is playing on the court.
    Available,
    /// At least one team on the court is in the playing state.
    InUse,
}

/// Lifecycle state of one member's seat in a team.
///
/// Transitions only move forward (waiting, then confirmed, then playing) and
/// always for a whole team at once; the only way back is deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// The team is still filling up.
    Waiting,
    /// The team is complete and waiting for its court to free up.
    Confirmed,
    /// The team is on the court playing.
    Playing,
}

/// What a team is promoted to the moment its fourth member joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionPolicy {
    /// Promote straight to playing when the court has no running game.
    Play,
    /// Promote to confirmed; a member must explicitly start the game.
    Confirm,
}

/// A physical playing area with a binary availability status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Court {
    /// Stable identifier, assigned in board order starting at 1.
    pub id: u32,
    /// Display name shown on the floor board.
    pub name: String,
    /// Derived from the reservations: in use iff any team is playing.
    pub status: CourtStatus,
}

/// One member's membership in one team on one court.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Stable identifier of this reservation row.
    pub id: Uuid,
    /// Court the team is queued on.
    pub court_id: u32,
    /// Owning member; at most one reservation per member system-wide.
    pub member_id: Uuid,
    /// Team the member joined, scoped per court.
    pub team_number: u32,
    /// Current lifecycle state, always uniform across a team.
    pub status: ReservationStatus,
    /// When the member joined the team.
    pub reserved_at: SystemTime,
}

/// Errors raised by board mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// The referenced court does not exist.
    #[error("court {0} does not exist")]
    UnknownCourt(u32),
    /// Joining a team number that neither exists nor is the next new team.
    #[error("team {requested} is not open on court {court_id} (next new team is {next})")]
    UnknownTeam {
        /// Court the join was attempted on.
        court_id: u32,
        /// Team number the caller asked for.
        requested: u32,
        /// The only valid number for a brand-new team right now.
        next: u32,
    },
    /// The member already holds a reservation somewhere on the board.
    #[error("member already holds a reservation on court {court_id}")]
    AlreadyReserved {
        /// Court of the existing reservation.
        court_id: u32,
    },
    /// The team is full or already promoted and accepts no more members.
    #[error("team {team_number} on court {court_id} is no longer accepting members")]
    TeamClosed {
        /// Court of the closed team.
        court_id: u32,
        /// Number of the closed team.
        team_number: u32,
    },
    /// The member holds no reservation on the given court.
    #[error("no reservation for this member on court {court_id}")]
    NotReserved {
        /// Court the operation targeted.
        court_id: u32,
    },
    /// The caller's team is not currently playing.
    #[error("team {team_number} on court {court_id} has no running game")]
    NotPlaying {
        /// Court the operation targeted.
        court_id: u32,
        /// The caller's team number.
        team_number: u32,
    },
    /// The caller's team has not been confirmed yet.
    #[error("team {team_number} on court {court_id} is not ready to start")]
    NotConfirmed {
        /// Court the operation targeted.
        court_id: u32,
        /// The caller's team number.
        team_number: u32,
    },
    /// Another team is already playing on the court.
    #[error("another team is already playing on court {0}")]
    CourtBusy(u32),
}

/// Result of a successful join, telling the caller what else moved.
#[derive(Debug, Clone)]
pub struct ReserveOutcome {
    /// The reservation that was inserted.
    pub reservation: Reservation,
    /// Set when this join completed the team and promoted all its members.
    pub promoted_to: Option<ReservationStatus>,
    /// True when the court flipped between available and in use.
    pub court_status_changed: bool,
}

/// Result of a successful cancellation.
#[derive(Debug, Clone)]
pub struct CancelOutcome {
    /// The reservation that was removed.
    pub reservation: Reservation,
    /// True when the court flipped between available and in use.
    pub court_status_changed: bool,
}

/// Result of a successful match start.
#[derive(Debug, Clone)]
pub struct StartedGame {
    /// Team that moved to playing.
    pub team_number: u32,
}

/// Result of a successful game end.
#[derive(Debug, Clone)]
pub struct EndedGame {
    /// Team whose reservations were cleared.
    pub team_number: u32,
    /// Every reservation of the team, removed atomically.
    pub cleared: Vec<Reservation>,
    /// True when the court flipped back to available.
    pub court_status_changed: bool,
}

/// Authoritative state of courts, teams, and reservations.
///
/// Reservations are keyed by member id, so the one-reservation-per-member
/// invariant holds by construction. All mutations run on `&mut self`; callers
/// serialize access with a single lock, which closes the check-then-act races
/// around team capacity and promotion.
#[derive(Debug, Clone)]
pub struct Board {
    courts: IndexMap<u32, Court>,
    reservations: IndexMap<Uuid, Reservation>,
    policy: PromotionPolicy,
}

impl Board {
    /// Seed the board with pre-provisioned courts, ids assigned in order.
    pub fn new(court_names: &[String], policy: PromotionPolicy) -> Self {
        let courts = court_names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let id = index as u32 + 1;
                (
                    id,
                    Court {
                        id,
                        name: name.clone(),
                        status: CourtStatus::Available,
                    },
                )
            })
            .collect();

        Self {
            courts,
            reservations: IndexMap::new(),
            policy,
        }
    }

    /// Iterate the courts in board order.
    pub fn courts(&self) -> impl Iterator<Item = &Court> {
        self.courts.values()
    }

    /// Look up a single court.
    pub fn court(&self, court_id: u32) -> Option<&Court> {
        self.courts.get(&court_id)
    }

    /// Iterate every reservation in insertion order.
    pub fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    /// The member's current reservation anywhere on the board, if any.
    pub fn reservation_for(&self, member_id: Uuid) -> Option<&Reservation> {
        self.reservations.get(&member_id)
    }

    /// Number of members currently seated on the court across all teams.
    pub fn occupancy(&self, court_id: u32) -> usize {
        self.reservations
            .values()
            .filter(|reservation| reservation.court_id == court_id)
            .count()
    }

    /// Teams on a court with their members, ordered by team number; members
    /// keep join order.
    pub fn teams_on(&self, court_id: u32) -> Vec<(u32, Vec<&Reservation>)> {
        let mut teams: Vec<(u32, Vec<&Reservation>)> = Vec::new();
        for reservation in self
            .reservations
            .values()
            .filter(|reservation| reservation.court_id == court_id)
        {
            match teams.iter_mut().find(|(number, _)| *number == reservation.team_number) {
                Some((_, members)) => members.push(reservation),
                None => teams.push((reservation.team_number, vec![reservation])),
            }
        }
        teams.sort_by_key(|(number, _)| *number);
        teams
    }

    /// The number a brand-new team on the court would get.
    pub fn next_team_number(&self, court_id: u32) -> u32 {
        self.reservations
            .values()
            .filter(|reservation| reservation.court_id == court_id)
            .map(|reservation| reservation.team_number)
            .max()
            .map(|max| max + 1)
            .unwrap_or(1)
    }

    /// Join or open a team on a court.
    ///
    /// The target must be an existing waiting team with room, or exactly the
    /// next new team number. When the join brings the team to
    /// [`TEAM_CAPACITY`], every member is promoted in the same mutation; the
    /// promotion target follows the configured policy, except that a team
    /// filling up while another game runs on the court always lands on
    /// confirmed and waits its turn.
    pub fn reserve(
        &mut self,
        court_id: u32,
        member_id: Uuid,
        team_number: u32,
        now: SystemTime,
    ) -> Result<ReserveOutcome, BoardError> {
        if let Some(existing) = self.reservations.get(&member_id) {
            return Err(BoardError::AlreadyReserved {
                court_id: existing.court_id,
            });
        }
        if !self.courts.contains_key(&court_id) {
            return Err(BoardError::UnknownCourt(court_id));
        }

        let team: Vec<&Reservation> = self
            .reservations
            .values()
            .filter(|reservation| {
                reservation.court_id == court_id && reservation.team_number == team_number
            })
            .collect();

        if team.is_empty() {
            let next = self.next_team_number(court_id);
            if team_number != next {
                return Err(BoardError::UnknownTeam {
                    court_id,
                    requested: team_number,
                    next,
                });
            }
        } else if team.len() >= TEAM_CAPACITY
            || team
                .iter()
                .any(|reservation| reservation.status != ReservationStatus::Waiting)
        {
            return Err(BoardError::TeamClosed {
                court_id,
                team_number,
            });
        }

        let reservation = Reservation {
            id: Uuid::new_v4(),
            court_id,
            member_id,
            team_number,
            status: ReservationStatus::Waiting,
            reserved_at: now,
        };
        let team_size = team.len() + 1;
        self.reservations.insert(member_id, reservation.clone());

        let mut promoted_to = None;
        if team_size == TEAM_CAPACITY {
            let target = match self.policy {
                PromotionPolicy::Confirm => ReservationStatus::Confirmed,
                PromotionPolicy::Play if self.has_playing_team(court_id) => {
                    ReservationStatus::Confirmed
                }
                PromotionPolicy::Play => ReservationStatus::Playing,
            };
            self.set_team_status(court_id, team_number, target);
            promoted_to = Some(target);
        }
        let court_status_changed = self.refresh_court_status(court_id);

        let reservation = self.reservations[&member_id].clone();
        Ok(ReserveOutcome {
            reservation,
            promoted_to,
            court_status_changed,
        })
    }

    /// Remove the member's own reservation on the court, at any status.
    ///
    /// Remaining team members keep their team number and status.
    pub fn cancel(
        &mut self,
        member_id: Uuid,
        court_id: u32,
    ) -> Result<CancelOutcome, BoardError> {
        match self.reservations.get(&member_id) {
            Some(reservation) if reservation.court_id == court_id => {}
            _ => return Err(BoardError::NotReserved { court_id }),
        }

        let reservation = self
            .reservations
            .shift_remove(&member_id)
            .ok_or(BoardError::NotReserved { court_id })?;
        let court_status_changed = self.refresh_court_status(court_id);

        Ok(CancelOutcome {
            reservation,
            court_status_changed,
        })
    }

    /// Move the caller's confirmed team to playing.
    ///
    /// Refused while another team occupies the court, so at most one team per
    /// court is ever playing.
    pub fn start_game(
        &mut self,
        court_id: u32,
        member_id: Uuid,
    ) -> Result<StartedGame, BoardError> {
        if !self.courts.contains_key(&court_id) {
            return Err(BoardError::UnknownCourt(court_id));
        }

        let reservation = match self.reservations.get(&member_id) {
            Some(reservation) if reservation.court_id == court_id => reservation,
            _ => return Err(BoardError::NotReserved { court_id }),
        };
        let team_number = reservation.team_number;

        if reservation.status != ReservationStatus::Confirmed {
            return Err(BoardError::NotConfirmed {
                court_id,
                team_number,
            });
        }
        if self.has_playing_team(court_id) {
            return Err(BoardError::CourtBusy(court_id));
        }

        self.set_team_status(court_id, team_number, ReservationStatus::Playing);
        self.refresh_court_status(court_id);

        Ok(StartedGame { team_number })
    }

    /// End the running game the caller is part of.
    ///
    /// Deletes every reservation of the caller's team in one mutation and
    /// re-derives the court status; on error nothing is touched.
    pub fn end_game(&mut self, court_id: u32, member_id: Uuid) -> Result<EndedGame, BoardError> {
        if !self.courts.contains_key(&court_id) {
            return Err(BoardError::UnknownCourt(court_id));
        }

        let reservation = match self.reservations.get(&member_id) {
            Some(reservation) if reservation.court_id == court_id => reservation,
            _ => return Err(BoardError::NotReserved { court_id }),
        };
        let team_number = reservation.team_number;

        if reservation.status != ReservationStatus::Playing {
            return Err(BoardError::NotPlaying {
                court_id,
                team_number,
            });
        }

        let mut cleared = Vec::with_capacity(TEAM_CAPACITY);
        self.reservations.retain(|_, reservation| {
            if reservation.court_id == court_id && reservation.team_number == team_number {
                cleared.push(reservation.clone());
                false
            } else {
                true
            }
        });
        let court_status_changed = self.refresh_court_status(court_id);

        Ok(EndedGame {
            team_number,
            cleared,
            court_status_changed,
        })
    }

    fn has_playing_team(&self, court_id: u32) -> bool {
        self.reservations.values().any(|reservation| {
            reservation.court_id == court_id && reservation.status == ReservationStatus::Playing
        })
    }

    fn set_team_status(&mut self, court_id: u32, team_number: u32, status: ReservationStatus) {
        for reservation in self.reservations.values_mut() {
            if reservation.court_id == court_id && reservation.team_number == team_number {
                reservation.status = status;
            }
        }
    }

    /// Re-derive the court status from its reservations, reporting a flip.
    fn refresh_court_status(&mut self, court_id: u32) -> bool {
        let status = if self.has_playing_team(court_id) {
            CourtStatus::InUse
        } else {
            CourtStatus::Available
        };

        match self.courts.get_mut(&court_id) {
            Some(court) if court.status != status => {
                court.status = status;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> Board {
        board_with(PromotionPolicy::Play)
    }

    fn board_with(policy: PromotionPolicy) -> Board {
        Board::new(&["North".into(), "South".into()], policy)
    }

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH
    }

    fn join(board: &mut Board, court: u32, team: u32) -> Uuid {
        let member = Uuid::new_v4();
        board.reserve(court, member, team, now()).unwrap();
        member
    }

    fn fill_team(board: &mut Board, court: u32, team: u32) -> Vec<Uuid> {
        (0..TEAM_CAPACITY).map(|_| join(board, court, team)).collect()
    }

    #[test]
    fn seeds_courts_in_order() {
        let board = board();
        let courts: Vec<_> = board.courts().collect();
        assert_eq!(courts.len(), 2);
        assert_eq!(courts[0].id, 1);
        assert_eq!(courts[0].name, "North");
        assert_eq!(courts[0].status, CourtStatus::Available);
        assert_eq!(courts[1].id, 2);
    }

    #[test]
    fn first_reservation_opens_team_one() {
        let mut board = board();
        let member = Uuid::new_v4();
        let outcome = board.reserve(1, member, 1, now()).unwrap();

        assert_eq!(outcome.reservation.team_number, 1);
        assert_eq!(outcome.reservation.status, ReservationStatus::Waiting);
        assert!(outcome.promoted_to.is_none());
        assert!(!outcome.court_status_changed);
        assert_eq!(board.occupancy(1), 1);
    }

    #[test]
    fn new_team_must_use_the_next_number() {
        let mut board = board();
        join(&mut board, 1, 1);

        let err = board.reserve(1, Uuid::new_v4(), 3, now()).unwrap_err();
        assert_eq!(
            err,
            BoardError::UnknownTeam {
                court_id: 1,
                requested: 3,
                next: 2,
            }
        );

        let err = board.reserve(1, Uuid::new_v4(), 0, now()).unwrap_err();
        assert!(matches!(err, BoardError::UnknownTeam { requested: 0, .. }));
    }

    #[test]
    fn joining_an_existing_waiting_team_with_room_is_allowed() {
        let mut board = board();
        join(&mut board, 1, 1);
        join(&mut board, 1, 1);
        join(&mut board, 1, 2);

        let outcome = board.reserve(1, Uuid::new_v4(), 1, now()).unwrap();
        assert_eq!(outcome.reservation.team_number, 1);
        assert_eq!(board.teams_on(1).len(), 2);
    }

    #[test]
    fn member_holds_at_most_one_reservation_system_wide() {
        let mut board = board();
        let member = Uuid::new_v4();
        board.reserve(1, member, 1, now()).unwrap();

        let err = board.reserve(2, member, 1, now()).unwrap_err();
        assert_eq!(err, BoardError::AlreadyReserved { court_id: 1 });
        assert_eq!(board.occupancy(2), 0);
    }

    #[test]
    fn unknown_court_is_rejected() {
        let mut board = board();
        let err = board.reserve(9, Uuid::new_v4(), 1, now()).unwrap_err();
        assert_eq!(err, BoardError::UnknownCourt(9));
    }

    #[test]
    fn fourth_member_promotes_the_whole_team_to_playing() {
        let mut board = board();
        join(&mut board, 1, 1);
        join(&mut board, 1, 1);
        join(&mut board, 1, 1);

        let outcome = board.reserve(1, Uuid::new_v4(), 1, now()).unwrap();
        assert_eq!(outcome.promoted_to, Some(ReservationStatus::Playing));
        assert!(outcome.court_status_changed);
        assert!(
            board
                .reservations()
                .all(|reservation| reservation.status == ReservationStatus::Playing)
        );
        assert_eq!(board.court(1).unwrap().status, CourtStatus::InUse);
    }

    #[test]
    fn confirm_policy_promotes_to_confirmed_instead() {
        let mut board = board_with(PromotionPolicy::Confirm);
        join(&mut board, 1, 1);
        join(&mut board, 1, 1);
        join(&mut board, 1, 1);

        let outcome = board.reserve(1, Uuid::new_v4(), 1, now()).unwrap();
        assert_eq!(outcome.promoted_to, Some(ReservationStatus::Confirmed));
        assert!(!outcome.court_status_changed);
        assert_eq!(board.court(1).unwrap().status, CourtStatus::Available);
    }

    #[test]
    fn full_team_accepts_no_fifth_member() {
        let mut board = board();
        fill_team(&mut board, 1, 1);

        let err = board.reserve(1, Uuid::new_v4(), 1, now()).unwrap_err();
        assert_eq!(
            err,
            BoardError::TeamClosed {
                court_id: 1,
                team_number: 1,
            }
        );
        assert_eq!(board.occupancy(1), TEAM_CAPACITY);
    }

    #[test]
    fn team_filling_behind_a_running_game_waits_confirmed() {
        let mut board = board();
        fill_team(&mut board, 1, 1);

        join(&mut board, 1, 2);
        join(&mut board, 1, 2);
        join(&mut board, 1, 2);
        let outcome = board.reserve(1, Uuid::new_v4(), 2, now()).unwrap();

        assert_eq!(outcome.promoted_to, Some(ReservationStatus::Confirmed));
        assert_eq!(board.court(1).unwrap().status, CourtStatus::InUse);
    }

    #[test]
    fn start_game_moves_a_confirmed_team_onto_the_court() {
        let mut board = board_with(PromotionPolicy::Confirm);
        let members = fill_team(&mut board, 1, 1);

        let started = board.start_game(1, members[2]).unwrap();
        assert_eq!(started.team_number, 1);
        assert!(
            board
                .reservations()
                .all(|reservation| reservation.status == ReservationStatus::Playing)
        );
        assert_eq!(board.court(1).unwrap().status, CourtStatus::InUse);
    }

    #[test]
    fn start_game_requires_a_confirmed_caller() {
        let mut board = board_with(PromotionPolicy::Confirm);
        let waiting = join(&mut board, 1, 1);

        let err = board.start_game(1, waiting).unwrap_err();
        assert_eq!(
            err,
            BoardError::NotConfirmed {
                court_id: 1,
                team_number: 1,
            }
        );

        let err = board.start_game(1, Uuid::new_v4()).unwrap_err();
        assert_eq!(err, BoardError::NotReserved { court_id: 1 });
    }

    #[test]
    fn start_game_is_blocked_while_another_team_plays() {
        let mut board = board();
        fill_team(&mut board, 1, 1);
        let queued = fill_team(&mut board, 1, 2);

        let err = board.start_game(1, queued[0]).unwrap_err();
        assert_eq!(err, BoardError::CourtBusy(1));
    }

    #[test]
    fn cancel_removes_only_the_callers_seat() {
        let mut board = board();
        let first = join(&mut board, 1, 1);
        let second = join(&mut board, 1, 1);

        let outcome = board.cancel(first, 1).unwrap();
        assert_eq!(outcome.reservation.member_id, first);
        assert!(!outcome.court_status_changed);
        assert_eq!(board.occupancy(1), 1);
        assert_eq!(board.reservation_for(second).unwrap().team_number, 1);
    }

    #[test]
    fn cancel_without_a_reservation_is_not_found() {
        let mut board = board();
        let err = board.cancel(Uuid::new_v4(), 1).unwrap_err();
        assert_eq!(err, BoardError::NotReserved { court_id: 1 });

        // Reserved on another court: still not found for this one.
        let member = join(&mut board, 2, 1);
        let err = board.cancel(member, 1).unwrap_err();
        assert_eq!(err, BoardError::NotReserved { court_id: 1 });
    }

    #[test]
    fn cancelling_the_last_playing_member_frees_the_court() {
        let mut board = board();
        let members = fill_team(&mut board, 1, 1);

        for member in &members[..3] {
            let outcome = board.cancel(*member, 1).unwrap();
            assert!(!outcome.court_status_changed);
            assert_eq!(board.court(1).unwrap().status, CourtStatus::InUse);
        }

        let outcome = board.cancel(members[3], 1).unwrap();
        assert!(outcome.court_status_changed);
        assert_eq!(board.court(1).unwrap().status, CourtStatus::Available);
    }

    #[test]
    fn end_game_clears_the_team_and_frees_the_court() {
        let mut board = board();
        let players = fill_team(&mut board, 1, 1);
        let bystander = join(&mut board, 1, 2);

        let ended = board.end_game(1, players[1]).unwrap();
        assert_eq!(ended.team_number, 1);
        assert_eq!(ended.cleared.len(), TEAM_CAPACITY);
        assert!(ended.court_status_changed);
        assert_eq!(board.court(1).unwrap().status, CourtStatus::Available);

        // The waiting team on the same court is untouched.
        assert_eq!(board.occupancy(1), 1);
        assert!(board.reservation_for(bystander).is_some());
    }

    #[test]
    fn end_game_requires_a_playing_participant() {
        let mut board = board();
        fill_team(&mut board, 1, 1);
        let waiting = join(&mut board, 1, 2);

        let err = board.end_game(1, waiting).unwrap_err();
        assert_eq!(
            err,
            BoardError::NotPlaying {
                court_id: 1,
                team_number: 2,
            }
        );

        let err = board.end_game(1, Uuid::new_v4()).unwrap_err();
        assert_eq!(err, BoardError::NotReserved { court_id: 1 });

        let err = board.end_game(9, Uuid::new_v4()).unwrap_err();
        assert_eq!(err, BoardError::UnknownCourt(9));
        assert_eq!(board.occupancy(1), TEAM_CAPACITY + 1);
    }

    #[test]
    fn team_numbers_restart_once_the_court_clears() {
        let mut board = board();
        let players = fill_team(&mut board, 1, 1);
        assert_eq!(board.next_team_number(1), 2);

        board.end_game(1, players[0]).unwrap();
        assert_eq!(board.next_team_number(1), 1);

        let outcome = board.reserve(1, Uuid::new_v4(), 1, now()).unwrap();
        assert_eq!(outcome.reservation.team_number, 1);
    }
}
