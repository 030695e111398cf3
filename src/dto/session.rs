use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{dto::format_system_time, state::directory::EntrySession};

/// Payload submitted when an already-registered member scans the entrance QR
/// again.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CheckInRequest {
    /// Entry code scanned from the entrance QR poster.
    #[validate(length(min = 1))]
    pub entry_code: String,
}

/// Public projection of an entry session row.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionDto {
    pub id: Uuid,
    pub member_id: Uuid,
    pub entry_at: String,
    pub expires_at: String,
    pub is_active: bool,
}

impl From<EntrySession> for SessionDto {
    fn from(session: EntrySession) -> Self {
        Self {
            id: session.id,
            member_id: session.member_id,
            entry_at: format_system_time(session.entry_at),
            expires_at: format_system_time(session.expires_at),
            is_active: session.is_active,
        }
    }
}
