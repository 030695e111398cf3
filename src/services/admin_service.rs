//! Console operations: venue settings, the entry roster and the QR link.

use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dto::admin::{ActiveEntryDto, EntryLinkDto, SettingsDto, UpdateSettingsRequest},
    state::{
        Settings, SharedState,
        feed::{FeedOp, FeedTable},
    },
};

use super::feed_events;

/// Current venue settings.
///
/// Falls back to the configured defaults until an admin saves once; the
/// fallback carries no `updated_at`.
pub async fn settings(state: &SharedState) -> SettingsDto {
    state
        .read_settings(|settings| match settings {
            Some(saved) => saved.clone().into(),
            None => {
                let defaults = state.config().venue_defaults();
                SettingsDto {
                    venue_name: defaults.venue_name.clone(),
                    operating_hours: defaults.operating_hours.clone(),
                    contact_info: defaults.contact_info.clone(),
                    rules: defaults.rules.clone(),
                    updated_at: None,
                }
            }
        })
        .await
}

/// Replace the settings singleton.
pub async fn update_settings(state: &SharedState, request: UpdateSettingsRequest) -> SettingsDto {
    let settings = Settings {
        venue_name: request.venue_name.trim().to_string(),
        operating_hours: request.operating_hours,
        contact_info: request.contact_info,
        rules: request.rules,
        updated_at: SystemTime::now(),
    };

    let existed = state.replace_settings(settings.clone()).await;
    info!(venue_name = %settings.venue_name, "venue settings saved");

    if let Some(store) = state.venue_store().await {
        if let Err(err) = store.save_settings(settings.clone().into()).await {
            warn!(error = %err, "failed to persist settings; keeping in-memory copy");
        }
    }

    let op = if existed { FeedOp::Update } else { FeedOp::Insert };
    feed_events::broadcast_change(state, FeedTable::Settings, op);

    settings.into()
}

/// Everyone currently inside, newest entries first.
pub async fn active_entries(state: &SharedState) -> Vec<ActiveEntryDto> {
    let now = SystemTime::now();
    state
        .read_directory(|directory| {
            directory
                .active_sessions(now)
                .into_iter()
                .map(|(member, session)| ActiveEntryDto {
                    member: member.clone().into(),
                    session: session.clone().into(),
                })
                .collect()
        })
        .await
}

/// The canonical entrance link for the QR poster.
pub fn entry_link(state: &SharedState) -> EntryLinkDto {
    let config = state.config();
    let base = config.public_base_url().trim_end_matches('/');
    EntryLinkDto {
        url: format!("{base}/scan?session={}", config.entry_code()),
        entry_code: config.entry_code().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    fn request(name: &str) -> UpdateSettingsRequest {
        UpdateSettingsRequest {
            venue_name: name.into(),
            operating_hours: "06:00-23:00".into(),
            contact_info: "front desk".into(),
            rules: "indoor shoes only".into(),
        }
    }

    #[tokio::test]
    async fn defaults_are_served_until_the_first_save() {
        let state = AppState::new(AppConfig::default());

        let before = settings(&state).await;
        assert!(before.updated_at.is_none());
        assert_eq!(
            before.venue_name,
            state.config().venue_defaults().venue_name
        );

        update_settings(&state, request("North Hall")).await;
        let after = settings(&state).await;
        assert_eq!(after.venue_name, "North Hall");
        assert!(after.updated_at.is_some());
    }

    #[tokio::test]
    async fn the_first_save_inserts_and_the_second_updates() {
        let state = AppState::new(AppConfig::default());
        let mut feed = state.admin_feed().subscribe();

        update_settings(&state, request("North Hall")).await;
        update_settings(&state, request("South Hall")).await;

        let first = feed.try_recv().unwrap();
        assert_eq!(first.table, Some(FeedTable::Settings));
        assert!(first.data.contains("\"op\":\"insert\""));
        let second = feed.try_recv().unwrap();
        assert!(second.data.contains("\"op\":\"update\""));
    }

    #[tokio::test]
    async fn entry_link_embeds_the_configured_code() {
        let state = AppState::new(AppConfig::default());
        let link = entry_link(&state);

        assert_eq!(link.entry_code, state.config().entry_code());
        assert_eq!(
            link.url,
            format!(
                "{}/scan?session={}",
                state.config().public_base_url(),
                state.config().entry_code()
            )
        );
    }

    #[tokio::test]
    async fn the_roster_lists_nobody_before_any_entry() {
        let state = AppState::new(AppConfig::default());
        assert!(active_entries(&state).await.is_empty());
    }
}
