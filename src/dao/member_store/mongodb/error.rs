use mongodb::error::Error as MongoError;
use thiserror::Error;

use crate::ids::MemberId;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save member `{member}`")]
    SaveMember {
        member: MemberId,
        #[source]
        source: MongoError,
    },
    #[error("failed to load member `{member}`")]
    LoadMember {
        member: MemberId,
        #[source]
        source: MongoError,
    },
    #[error("failed to count members rated above {rating}")]
    CountMembers {
        rating: f64,
        #[source]
        source: MongoError,
    },
}
