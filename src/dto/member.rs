use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        format_system_time, reservation::ReservationDto, session::SessionDto,
        validation::validate_nickname,
    },
    state::directory::Member,
};

/// Payload submitted when a visitor registers at the entrance.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterMemberRequest {
    /// Display name, trimmed before storage.
    pub nickname: String,
    /// Entry code scanned from the entrance QR poster.
    pub entry_code: String,
}

impl Validate for RegisterMemberRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_nickname(&self.nickname) {
            errors.add("nickname", e);
        }

        if self.entry_code.trim().is_empty() {
            errors.add(
                "entry_code",
                validator::ValidationError::new("entry_code_blank"),
            );
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Public projection of a member.
///
/// Deliberately omits the access token; that is returned exactly once, at
/// registration.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberDto {
    pub id: Uuid,
    pub member_number: u32,
    pub nickname: String,
    pub created_at: String,
}

impl From<Member> for MemberDto {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            member_number: member.member_number,
            nickname: member.nickname,
            created_at: format_system_time(member.created_at),
        }
    }
}

/// Everything a freshly registered member needs: their record, the bearer
/// token for subsequent calls, and the entry session opened for them.
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberRegisteredResponse {
    pub member: MemberDto,
    pub access_token: String,
    pub session: SessionDto,
}

/// Profile returned to an authenticated member.
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberProfileResponse {
    pub member: MemberDto,
    /// Newest unexpired entry session, absent once it lapsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_session: Option<SessionDto>,
    /// The member's reservation anywhere on the board, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<ReservationDto>,
}
