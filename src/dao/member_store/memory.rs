use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{self, BoxFuture};

use crate::{
    dao::{member_store::MemberStore, models::MemberEntity, storage::StorageResult},
    ids::MemberId,
};

/// Process-local member store used when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryMemberStore {
    members: Arc<DashMap<MemberId, MemberEntity>>,
}

impl InMemoryMemberStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemberStore for InMemoryMemberStore {
    fn find_member(
        &self,
        member: MemberId,
    ) -> BoxFuture<'static, StorageResult<Option<MemberEntity>>> {
        let found = self.members.get(&member).map(|entry| entry.value().clone());
        Box::pin(future::ready(Ok(found)))
    }

    fn save_member(&self, entity: MemberEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.members.insert(entity.member, entity);
        Box::pin(future::ready(Ok(())))
    }

    fn count_rated_above(&self, rating: f64) -> BoxFuture<'static, StorageResult<u64>> {
        let count = self
            .members
            .iter()
            .filter(|entry| entry.rating > rating)
            .count() as u64;
        Box::pin(future::ready(Ok(count)))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_and_ranks_members() {
        let store = InMemoryMemberStore::new();
        assert!(store.find_member(MemberId(1)).await.unwrap().is_none());

        let mut strong = MemberEntity::new(MemberId(1));
        strong.rating = 900.0;
        store.save_member(strong.clone()).await.unwrap();
        store.save_member(MemberEntity::new(MemberId(2))).await.unwrap();

        assert_eq!(store.find_member(MemberId(1)).await.unwrap(), Some(strong));
        assert_eq!(store.count_rated_above(500.0).await.unwrap(), 1);
        assert_eq!(store.count_rated_above(900.0).await.unwrap(), 0);
    }
}
