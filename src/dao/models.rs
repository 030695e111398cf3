use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::{
    Settings,
    directory::{EntrySession, Member},
};

/// Member record persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberEntity {
    /// Primary key of the member.
    pub id: Uuid,
    /// Monotonic member number assigned at registration.
    pub member_number: u32,
    /// Display name chosen at registration.
    pub nickname: String,
    /// Opaque bearer token the member authenticates with.
    pub access_token: String,
    /// Registration timestamp.
    pub created_at: SystemTime,
}

/// Entry ledger row persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntrySessionEntity {
    /// Primary key of the ledger row.
    pub id: Uuid,
    /// Member the entry belongs to.
    pub member_id: Uuid,
    /// Check-in timestamp.
    pub entry_at: SystemTime,
    /// When the session lapses.
    pub expires_at: SystemTime,
    /// Administrative kill switch, true for rows written by this service.
    pub is_active: bool,
}

/// Venue settings singleton persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsEntity {
    /// Display name of the facility.
    pub venue_name: String,
    /// Free-form opening hours text.
    pub operating_hours: String,
    /// Free-form contact line.
    pub contact_info: String,
    /// House rules text block.
    pub rules: String,
    /// Last save timestamp.
    pub updated_at: SystemTime,
}

impl From<Member> for MemberEntity {
    fn from(value: Member) -> Self {
        Self {
            id: value.id,
            member_number: value.member_number,
            nickname: value.nickname,
            access_token: value.access_token,
            created_at: value.created_at,
        }
    }
}

impl From<MemberEntity> for Member {
    fn from(value: MemberEntity) -> Self {
        Self {
            id: value.id,
            member_number: value.member_number,
            nickname: value.nickname,
            access_token: value.access_token,
            created_at: value.created_at,
        }
    }
}

impl From<EntrySession> for EntrySessionEntity {
    fn from(value: EntrySession) -> Self {
        Self {
            id: value.id,
            member_id: value.member_id,
            entry_at: value.entry_at,
            expires_at: value.expires_at,
            is_active: value.is_active,
        }
    }
}

impl From<EntrySessionEntity> for EntrySession {
    fn from(value: EntrySessionEntity) -> Self {
        Self {
            id: value.id,
            member_id: value.member_id,
            entry_at: value.entry_at,
            expires_at: value.expires_at,
            is_active: value.is_active,
        }
    }
}

impl From<Settings> for SettingsEntity {
    fn from(value: Settings) -> Self {
        Self {
            venue_name: value.venue_name,
            operating_hours: value.operating_hours,
            contact_info: value.contact_info,
            rules: value.rules,
            updated_at: value.updated_at,
        }
    }
}

impl From<SettingsEntity> for Settings {
    fn from(value: SettingsEntity) -> Self {
        Self {
            venue_name: value.venue_name,
            operating_hours: value.operating_hours,
            contact_info: value.contact_info,
            rules: value.rules,
            updated_at: value.updated_at,
        }
    }
}
