use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoEntrySessionDocument, MongoMemberDocument, MongoSettingsDocument, SETTINGS_DOC_ID,
        doc_id,
    },
};
use crate::dao::{
    models::{EntrySessionEntity, MemberEntity, SettingsEntity},
    storage::StorageResult,
    venue_store::VenueStore,
};

const MEMBER_COLLECTION_NAME: &str = "members";
const SESSION_COLLECTION_NAME: &str = "entry_sessions";
const SETTINGS_COLLECTION_NAME: &str = "settings";

/// MongoDB-backed venue store holding durable member and settings data.
#[derive(Clone)]
pub struct MongoVenueStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoVenueStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let member_collection = self.member_collection().await;
        let member_index = mongodb::IndexModel::builder()
            .keys(doc! {"member_number": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("member_number_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        member_collection
            .create_index(member_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MEMBER_COLLECTION_NAME,
                index: "member_number",
                source,
            })?;

        // Admin listings and hydration both read the ledger per member in
        // entry order.
        let session_collection = self.session_collection().await;
        let session_index = mongodb::IndexModel::builder()
            .keys(doc! {"member_id": 1, "entry_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("session_member_entry_idx".to_owned()))
                    .build(),
            )
            .build();

        session_collection
            .create_index(session_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_COLLECTION_NAME,
                index: "member_id,entry_at",
                source,
            })?;

        Ok(())
    }

    async fn member_collection(&self) -> Collection<MongoMemberDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoMemberDocument>(MEMBER_COLLECTION_NAME)
    }

    async fn session_collection(&self) -> Collection<MongoEntrySessionDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoEntrySessionDocument>(SESSION_COLLECTION_NAME)
    }

    async fn settings_collection(&self) -> Collection<MongoSettingsDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoSettingsDocument>(SETTINGS_COLLECTION_NAME)
    }

    async fn save_member(&self, member: MemberEntity) -> MongoResult<()> {
        let id = member.id;
        let document: MongoMemberDocument = member.into();
        let collection = self.member_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveMember { id, source })?;

        Ok(())
    }

    async fn save_entry_session(&self, session: EntrySessionEntity) -> MongoResult<()> {
        let id = session.id;
        let document: MongoEntrySessionDocument = session.into();
        let collection = self.session_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveEntrySession { id, source })?;

        Ok(())
    }

    async fn save_settings(&self, settings: SettingsEntity) -> MongoResult<()> {
        let document: MongoSettingsDocument = settings.into();
        let collection = self.settings_collection().await;
        collection
            .replace_one(doc! {"_id": SETTINGS_DOC_ID}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveSettings { source })?;

        Ok(())
    }

    async fn load_members(&self) -> MongoResult<Vec<MemberEntity>> {
        let collection = self.member_collection().await;

        let documents: Vec<MongoMemberDocument> = collection
            .find(doc! {})
            .sort(doc! {"member_number": 1})
            .await
            .map_err(|source| MongoDaoError::LoadMembers { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadMembers { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn load_entry_sessions(&self) -> MongoResult<Vec<EntrySessionEntity>> {
        let collection = self.session_collection().await;

        let documents: Vec<MongoEntrySessionDocument> = collection
            .find(doc! {})
            .sort(doc! {"entry_at": 1})
            .await
            .map_err(|source| MongoDaoError::LoadEntrySessions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadEntrySessions { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn load_settings(&self) -> MongoResult<Option<SettingsEntity>> {
        let collection = self.settings_collection().await;

        let document = collection
            .find_one(doc! {"_id": SETTINGS_DOC_ID})
            .await
            .map_err(|source| MongoDaoError::LoadSettings { source })?;

        Ok(document.map(Into::into))
    }
}

impl VenueStore for MongoVenueStore {
    fn save_member(&self, member: MemberEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_member(member).await.map_err(Into::into) })
    }

    fn save_entry_session(
        &self,
        session: EntrySessionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_entry_session(session).await.map_err(Into::into) })
    }

    fn save_settings(&self, settings: SettingsEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_settings(settings).await.map_err(Into::into) })
    }

    fn load_members(&self) -> BoxFuture<'static, StorageResult<Vec<MemberEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_members().await.map_err(Into::into) })
    }

    fn load_entry_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<EntrySessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_entry_sessions().await.map_err(Into::into) })
    }

    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Option<SettingsEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_settings().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
