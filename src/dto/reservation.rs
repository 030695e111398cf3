use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::format_system_time,
    state::{
        board::{Reservation, ReservationStatus},
        directory::Member,
    },
};

/// Payload submitted to join or open a team on a court.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ReserveRequest {
    /// Existing team to join, or the next new team number to open one.
    #[validate(range(min = 1))]
    pub team_number: u32,
}

/// Wire projection of a reservation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatusDto {
    Waiting,
    Confirmed,
    Playing,
}

impl From<ReservationStatus> for ReservationStatusDto {
    fn from(status: ReservationStatus) -> Self {
        match status {
            ReservationStatus::Waiting => ReservationStatusDto::Waiting,
            ReservationStatus::Confirmed => ReservationStatusDto::Confirmed,
            ReservationStatus::Playing => ReservationStatusDto::Playing,
        }
    }
}

/// Public projection of a reservation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationDto {
    pub id: Uuid,
    pub court_id: u32,
    pub member_id: Uuid,
    pub team_number: u32,
    pub status: ReservationStatusDto,
    pub reserved_at: String,
}

impl From<Reservation> for ReservationDto {
    fn from(reservation: Reservation) -> Self {
        Self {
            id: reservation.id,
            court_id: reservation.court_id,
            member_id: reservation.member_id,
            team_number: reservation.team_number,
            status: reservation.status.into(),
            reserved_at: format_system_time(reservation.reserved_at),
        }
    }
}

/// Reservation row joined with the owning member for board listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationWithMemberDto {
    pub id: Uuid,
    pub court_id: u32,
    pub member_id: Uuid,
    pub member_number: u32,
    pub nickname: String,
    pub team_number: u32,
    pub status: ReservationStatusDto,
    pub reserved_at: String,
}

impl From<(Reservation, Member)> for ReservationWithMemberDto {
    fn from((reservation, member): (Reservation, Member)) -> Self {
        Self {
            id: reservation.id,
            court_id: reservation.court_id,
            member_id: reservation.member_id,
            member_number: member.member_number,
            nickname: member.nickname,
            team_number: reservation.team_number,
            status: reservation.status.into(),
            reserved_at: format_system_time(reservation.reserved_at),
        }
    }
}

/// Result of a successful reserve call.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReserveResponse {
    pub reservation: ReservationDto,
    /// Set when this join completed the team and promoted it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted_to: Option<ReservationStatusDto>,
}

/// Structured outcome of the end-game procedure.
///
/// Domain refusals (nobody playing, caller not seated) come back with
/// `success: false` and HTTP 200; only transport and auth failures use error
/// status codes.
#[derive(Debug, Serialize, ToSchema)]
pub struct EndGameResponse {
    pub success: bool,
    pub message: String,
}
