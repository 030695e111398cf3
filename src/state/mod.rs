pub mod board;
pub mod directory;
pub mod feed;

use std::{sync::Arc, time::SystemTime};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

use crate::{config::AppConfig, dao::venue_store::VenueStore, error::ServiceError};

pub use self::feed::FeedHub;
use self::{board::Board, directory::Directory, feed::FeedState};

/// Cheap-to-clone handle on the application state.
pub type SharedState = Arc<AppState>;

/// Venue-wide settings singleton, written by the admin console.
///
/// `None` in [`AppState`] means nothing was ever saved; reads fall back to
/// the configured defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Display name of the facility.
    pub venue_name: String,
    /// Free-form opening hours text.
    pub operating_hours: String,
    /// Free-form contact line.
    pub contact_info: String,
    /// House rules, one block of text.
    pub rules: String,
    /// Last save instant.
    pub updated_at: SystemTime,
}

/// Central application state storing the live venue data and storage handles.
pub struct AppState {
    config: AppConfig,
    venue_store: RwLock<Option<Arc<dyn VenueStore>>>,
    feed: FeedState,
    member_tokens: DashMap<String, Uuid>,
    board: RwLock<Board>,
    directory: RwLock<Directory>,
    settings: RwLock<Option<Settings>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Courts are seeded from the configuration and the application starts in
    /// degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let board = Board::new(config.court_names(), config.promotion());
        Arc::new(Self {
            config,
            venue_store: RwLock::new(None),
            feed: FeedState::new(16, 16),
            member_tokens: DashMap::new(),
            board: RwLock::new(board),
            directory: RwLock::new(Directory::new()),
            settings: RwLock::new(None),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration the state was built from.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current venue store, if one is installed.
    pub async fn venue_store(&self) -> Option<Arc<dyn VenueStore>> {
        let guard = self.venue_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the venue store or fail with [`ServiceError::Degraded`].
    pub async fn require_venue_store(&self) -> Result<Arc<dyn VenueStore>, ServiceError> {
        self.venue_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new venue store implementation and leave degraded mode.
    pub async fn install_venue_store(&self, store: Arc<dyn VenueStore>) {
        {
            let mut guard = self.venue_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current venue store and enter degraded mode.
    pub async fn clear_venue_store(&self) {
        {
            let mut guard = self.venue_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Flip the degraded flag without touching the installed store.
    ///
    /// Used by the storage supervisor while a backend is present but failing
    /// its health checks.
    pub fn set_degraded(&self, value: bool) {
        self.update_degraded(value);
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast hub used for the public change feed.
    pub fn public_feed(&self) -> &FeedHub {
        self.feed.public()
    }

    /// Broadcast hub used for the admin change feed.
    pub fn admin_feed(&self) -> &FeedHub {
        self.feed.admin().hub()
    }

    /// Token guard that ensures a single admin feed subscriber at a time.
    pub fn admin_token(&self) -> &Mutex<Option<String>> {
        self.feed.admin().token()
    }

    /// Registry of issued member tokens keyed by the opaque token string.
    pub fn member_tokens(&self) -> &DashMap<String, Uuid> {
        &self.member_tokens
    }

    /// Read the reservation board under the shared lock.
    pub async fn read_board<R>(&self, reader: impl FnOnce(&Board) -> R) -> R {
        let guard = self.board.read().await;
        reader(&guard)
    }

    /// Mutate the reservation board under the exclusive lock.
    ///
    /// Every check-then-act on teams and courts must happen inside one such
    /// closure; the write guard is what makes promotion at the fourth member
    /// atomic under concurrent joins.
    pub async fn write_board<R>(&self, writer: impl FnOnce(&mut Board) -> R) -> R {
        let mut guard = self.board.write().await;
        writer(&mut guard)
    }

    /// Read the member directory under the shared lock.
    pub async fn read_directory<R>(&self, reader: impl FnOnce(&Directory) -> R) -> R {
        let guard = self.directory.read().await;
        reader(&guard)
    }

    /// Mutate the member directory under the exclusive lock.
    pub async fn write_directory<R>(&self, writer: impl FnOnce(&mut Directory) -> R) -> R {
        let mut guard = self.directory.write().await;
        writer(&mut guard)
    }

    /// Read the settings singleton, `None` when never saved.
    pub async fn read_settings<R>(&self, reader: impl FnOnce(Option<&Settings>) -> R) -> R {
        let guard = self.settings.read().await;
        reader(guard.as_ref())
    }

    /// Replace the settings singleton, returning whether a row existed before.
    pub async fn replace_settings(&self, settings: Settings) -> bool {
        let mut guard = self.settings.write().await;
        guard.replace(settings).is_some()
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}
