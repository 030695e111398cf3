use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::state::feed::{FeedOp, FeedTable};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the feed channels.
pub struct ServerEvent {
    /// SSE event name, `None` for unnamed data-only events.
    pub event: Option<String>,
    /// Table the event belongs to; `None` delivers regardless of any filter.
    pub table: Option<FeedTable>,
    /// Pre-serialised JSON body.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(
        event: E,
        table: Option<FeedTable>,
        payload: &T,
    ) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            table,
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to a feed client when it connects.
pub struct Handshake {
    /// Identifier of the stream (`public` or `admin`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
    /// Optional console token returned when the stream is privileged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Notification that rows in a table changed; carries no row data.
pub struct ChangeEvent {
    /// Table that moved.
    pub table: FeedTable,
    /// What happened to its rows.
    pub op: FeedOp,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
/// Query parameters accepted by the public feed endpoint.
pub struct FeedQuery {
    /// Comma-separated table names to subscribe to; all tables when omitted.
    pub tables: Option<String>,
}

impl FeedQuery {
    /// Resolve the filter, dropping unknown names; `None` means no filtering.
    pub fn filter(&self) -> Option<Vec<FeedTable>> {
        let raw = self.tables.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(
            raw.split(',')
                .filter_map(|name| FeedTable::from_name(name.trim()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parses_known_tables_and_drops_noise() {
        let query = FeedQuery {
            tables: Some(" courts, settings ,bogus".into()),
        };
        assert_eq!(
            query.filter(),
            Some(vec![FeedTable::Courts, FeedTable::Settings])
        );
    }

    #[test]
    fn absent_or_blank_filter_means_everything() {
        assert_eq!(FeedQuery::default().filter(), None);
        let blank = FeedQuery {
            tables: Some("   ".into()),
        };
        assert_eq!(blank.filter(), None);
    }
}
