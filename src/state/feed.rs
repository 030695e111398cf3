use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};
use utoipa::ToSchema;

use crate::dto::feed::ServerEvent;

/// Logical tables surfaced on the change feed.
///
/// Feed events only name the table that moved; consumers re-fetch whatever
/// they render from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedTable {
    /// Court board, including derived court status.
    Courts,
    /// Reservations and team membership.
    Reservations,
    /// The entry session ledger.
    EntrySessions,
    /// The venue settings singleton.
    Settings,
}

impl FeedTable {
    /// Every table, in documentation order.
    pub const ALL: [FeedTable; 4] = [
        FeedTable::Courts,
        FeedTable::Reservations,
        FeedTable::EntrySessions,
        FeedTable::Settings,
    ];

    /// Wire name of the table.
    pub fn name(self) -> &'static str {
        match self {
            FeedTable::Courts => "courts",
            FeedTable::Reservations => "reservations",
            FeedTable::EntrySessions => "entry_sessions",
            FeedTable::Settings => "settings",
        }
    }

    /// Parse a wire name, as used in the `tables` query filter.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.name() == name)
    }
}

/// Row-level operation kind announced on the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedOp {
    /// A row appeared.
    Insert,
    /// A row changed in place.
    Update,
    /// A row went away.
    Delete,
}

/// Feed-specific sub-state carved out from [`AppState`](super::AppState).
pub struct FeedState {
    public: FeedHub,
    admin: AdminFeedState,
}

impl FeedState {
    /// Build the feed sub-tree with per-stream channel capacities.
    pub fn new(public_capacity: usize, admin_capacity: usize) -> Self {
        Self {
            public: FeedHub::new(public_capacity),
            admin: AdminFeedState::new(admin_capacity),
        }
    }

    /// Access the public hub used to fan out change notifications.
    pub fn public(&self) -> &FeedHub {
        &self.public
    }

    /// Access the admin feed bundle containing both hub and token.
    pub fn admin(&self) -> &AdminFeedState {
        &self.admin
    }
}

/// State bundle holding the admin feed hub and its coordinating token.
pub struct AdminFeedState {
    hub: FeedHub,
    token: Mutex<Option<String>>,
}

impl AdminFeedState {
    fn new(capacity: usize) -> Self {
        Self {
            hub: FeedHub::new(capacity),
            token: Mutex::new(None),
        }
    }

    /// Borrow the broadcast hub used for admin-only events.
    pub fn hub(&self) -> &FeedHub {
        &self.hub
    }

    /// Borrow the token mutex that coordinates the single admin connection.
    pub fn token(&self) -> &Mutex<Option<String>> {
        &self.token
    }
}

/// Simple broadcast hub wrapper used by the feed services.
pub struct FeedHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl FeedHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_round_trip() {
        for table in FeedTable::ALL {
            assert_eq!(FeedTable::from_name(table.name()), Some(table));
        }
        assert_eq!(FeedTable::from_name("members"), None);
        assert_eq!(FeedTable::from_name(""), None);
    }

    #[test]
    fn hub_broadcast_reaches_subscribers_and_tolerates_none() {
        let hub = FeedHub::new(4);
        hub.broadcast(ServerEvent {
            event: None,
            table: None,
            data: "dropped".into(),
        });

        let mut receiver = hub.subscribe();
        hub.broadcast(ServerEvent {
            event: Some("change".into()),
            table: Some(FeedTable::Courts),
            data: "{}".into(),
        });

        let received = receiver.try_recv().unwrap();
        assert_eq!(received.table, Some(FeedTable::Courts));
        assert_eq!(received.data, "{}");
    }
}
