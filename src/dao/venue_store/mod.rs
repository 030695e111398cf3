#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{EntrySessionEntity, MemberEntity, SettingsEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for members, entry sessions, and
/// venue settings.
///
/// Saves are upserts keyed on the entity id. Loads return everything; the
/// directory is small enough to hydrate wholesale on reconnect.
pub trait VenueStore: Send + Sync {
    fn save_member(&self, member: MemberEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn save_entry_session(
        &self,
        session: EntrySessionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn save_settings(&self, settings: SettingsEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn load_members(&self) -> BoxFuture<'static, StorageResult<Vec<MemberEntity>>>;
    fn load_entry_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<EntrySessionEntity>>>;
    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Option<SettingsEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
