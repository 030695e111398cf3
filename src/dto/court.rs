use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{format_system_time, reservation::ReservationStatusDto},
    state::board::CourtStatus,
};

/// Wire projection of a court's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CourtStatusDto {
    Available,
    InUse,
}

impl From<CourtStatus> for CourtStatusDto {
    fn from(status: CourtStatus) -> Self {
        match status {
            CourtStatus::Available => CourtStatusDto::Available,
            CourtStatus::InUse => CourtStatusDto::InUse,
        }
    }
}

/// One member's seat as shown on the court board.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamMemberDto {
    pub member_id: Uuid,
    pub member_number: u32,
    pub nickname: String,
    pub reserved_at: String,
}

impl TeamMemberDto {
    pub(crate) fn new(
        member_id: Uuid,
        member_number: u32,
        nickname: String,
        reserved_at: std::time::SystemTime,
    ) -> Self {
        Self {
            member_id,
            member_number,
            nickname,
            reserved_at: format_system_time(reserved_at),
        }
    }
}

/// A team and its members as shown on the court board.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamOverview {
    pub team_number: u32,
    pub status: ReservationStatusDto,
    pub members: Vec<TeamMemberDto>,
}

/// A court joined with its teams, the shape the floor board renders from.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourtOverview {
    pub id: u32,
    pub name: String,
    pub status: CourtStatusDto,
    pub teams: Vec<TeamOverview>,
    /// Number of members currently seated across all teams.
    pub player_count: usize,
    /// The number a brand-new team would get right now.
    pub next_team_number: u32,
}
