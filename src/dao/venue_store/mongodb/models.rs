use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{EntrySessionEntity, MemberEntity, SettingsEntity};

/// Fixed `_id` of the settings singleton document.
pub const SETTINGS_DOC_ID: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMemberDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    member_number: u32,
    nickname: String,
    access_token: String,
    created_at: DateTime,
}

impl From<MemberEntity> for MongoMemberDocument {
    fn from(value: MemberEntity) -> Self {
        Self {
            id: value.id,
            member_number: value.member_number,
            nickname: value.nickname,
            access_token: value.access_token,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoMemberDocument> for MemberEntity {
    fn from(value: MongoMemberDocument) -> Self {
        Self {
            id: value.id,
            member_number: value.member_number,
            nickname: value.nickname,
            access_token: value.access_token,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEntrySessionDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    member_id: Uuid,
    entry_at: DateTime,
    expires_at: DateTime,
    #[serde(default)]
    is_active: bool,
}

impl From<EntrySessionEntity> for MongoEntrySessionDocument {
    fn from(value: EntrySessionEntity) -> Self {
        Self {
            id: value.id,
            member_id: value.member_id,
            entry_at: DateTime::from_system_time(value.entry_at),
            expires_at: DateTime::from_system_time(value.expires_at),
            is_active: value.is_active,
        }
    }
}

impl From<MongoEntrySessionDocument> for EntrySessionEntity {
    fn from(value: MongoEntrySessionDocument) -> Self {
        Self {
            id: value.id,
            member_id: value.member_id,
            entry_at: value.entry_at.to_system_time(),
            expires_at: value.expires_at.to_system_time(),
            is_active: value.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSettingsDocument {
    #[serde(rename = "_id")]
    id: i32,
    venue_name: String,
    operating_hours: String,
    contact_info: String,
    rules: String,
    updated_at: DateTime,
}

impl From<SettingsEntity> for MongoSettingsDocument {
    fn from(value: SettingsEntity) -> Self {
        Self {
            id: SETTINGS_DOC_ID,
            venue_name: value.venue_name,
            operating_hours: value.operating_hours,
            contact_info: value.contact_info,
            rules: value.rules,
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoSettingsDocument> for SettingsEntity {
    fn from(value: MongoSettingsDocument) -> Self {
        Self {
            venue_name: value.venue_name,
            operating_hours: value.operating_hours,
            contact_info: value.contact_info,
            rules: value.rules,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
