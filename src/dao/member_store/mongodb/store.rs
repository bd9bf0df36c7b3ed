use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{Client, Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoMemberDocument, member_filter},
};
use crate::{
    dao::{member_store::MemberStore, models::MemberEntity, storage::StorageResult},
    ids::MemberId,
};

const MEMBER_COLLECTION_NAME: &str = "members";

#[derive(Clone)]
pub struct MongoMemberStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();
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

impl MongoMemberStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(MongoState { client, database }),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;

        let by_member = IndexModel::builder()
            .keys(doc! { "member": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("member_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        collection
            .create_index(by_member)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MEMBER_COLLECTION_NAME,
                index: "member",
                source,
            })?;

        let by_rating = IndexModel::builder()
            .keys(doc! { "rating": -1 })
            .options(
                IndexOptions::builder()
                    .name(Some("rating_idx".to_owned()))
                    .build(),
            )
            .build();
        collection
            .create_index(by_rating)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MEMBER_COLLECTION_NAME,
                index: "rating",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoMemberDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoMemberDocument>(MEMBER_COLLECTION_NAME)
    }

    async fn find_member(&self, member: MemberId) -> MongoResult<Option<MemberEntity>> {
        let document = self
            .collection()
            .await
            .find_one(member_filter(member))
            .await
            .map_err(|source| MongoDaoError::LoadMember { member, source })?;
        Ok(document.map(|document| document.into_entity(member)))
    }

    async fn save_member(&self, entity: MemberEntity) -> MongoResult<()> {
        let member = entity.member;
        let document: MongoMemberDocument = entity.into();
        self.collection()
            .await
            .replace_one(member_filter(member), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveMember { member, source })?;
        Ok(())
    }

    async fn count_rated_above(&self, rating: f64) -> MongoResult<u64> {
        self.collection()
            .await
            .count_documents(doc! { "rating": { "$gt": rating } })
            .await
            .map_err(|source| MongoDaoError::CountMembers { rating, source })
    }
}

impl MemberStore for MongoMemberStore {
    fn find_member(
        &self,
        member: MemberId,
    ) -> BoxFuture<'static, StorageResult<Option<MemberEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_member(member).await.map_err(Into::into) })
    }

    fn save_member(&self, entity: MemberEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_member(entity).await.map_err(Into::into) })
    }

    fn count_rated_above(&self, rating: f64) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count_rated_above(rating).await.map_err(Into::into) })
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
