//! DTO definitions used by the admin console REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{format_system_time, member::MemberDto, session::SessionDto},
    state::Settings,
};

/// Venue settings as served to the console; defaults are reported with no
/// `updated_at` until they are saved once.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsDto {
    pub venue_name: String,
    pub operating_hours: String,
    pub contact_info: String,
    pub rules: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<Settings> for SettingsDto {
    fn from(settings: Settings) -> Self {
        Self {
            venue_name: settings.venue_name,
            operating_hours: settings.operating_hours,
            contact_info: settings.contact_info,
            rules: settings.rules,
            updated_at: Some(format_system_time(settings.updated_at)),
        }
    }
}

/// Payload replacing the venue settings singleton.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, max = 100))]
    pub venue_name: String,
    #[validate(length(max = 500))]
    pub operating_hours: String,
    #[validate(length(max = 500))]
    pub contact_info: String,
    #[validate(length(max = 2000))]
    pub rules: String,
}

/// One row of the console's "currently inside" listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActiveEntryDto {
    pub member: MemberDto,
    pub session: SessionDto,
}

/// The canonical entrance QR payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntryLinkDto {
    /// Full URL to encode into the poster QR code.
    pub url: String,
    /// The fixed entry code embedded in that URL.
    pub entry_code: String,
}
