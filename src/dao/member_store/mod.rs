pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::models::MemberEntity;
use crate::dao::storage::StorageResult;
use crate::ids::MemberId;

/// Abstraction over the persistence layer for member skill records.
pub trait MemberStore: Send + Sync {
    fn find_member(&self, member: MemberId)
    -> BoxFuture<'static, StorageResult<Option<MemberEntity>>>;
    fn save_member(&self, entity: MemberEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Number of members whose rating is strictly greater than `rating`.
    fn count_rated_above(&self, rating: f64) -> BoxFuture<'static, StorageResult<u64>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
