use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::{dao::models::MemberEntity, ids::MemberId};

/// Stored shape of a member record. Ids are kept as strings to survive the 64-bit range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMemberDocument {
    member: String,
    mu: f64,
    sigma: f64,
    rating: f64,
    #[serde(default)]
    debate_count: u32,
    #[serde(default)]
    vote_count: u32,
    #[serde(default)]
    factual: u32,
    #[serde(default)]
    consistent: u32,
    #[serde(default)]
    charitable: u32,
    #[serde(default)]
    respectful: u32,
    updated_at: DateTime,
}

impl From<MemberEntity> for MongoMemberDocument {
    fn from(value: MemberEntity) -> Self {
        Self {
            member: value.member.to_string(),
            mu: value.mu,
            sigma: value.sigma,
            rating: value.rating,
            debate_count: value.debate_count,
            vote_count: value.vote_count,
            factual: value.factual,
            consistent: value.consistent,
            charitable: value.charitable,
            respectful: value.respectful,
            updated_at: DateTime::now(),
        }
    }
}

impl MongoMemberDocument {
    /// Rebuild the entity for `member`, the id the document was looked up by.
    pub fn into_entity(self, member: MemberId) -> MemberEntity {
        MemberEntity {
            member,
            mu: self.mu,
            sigma: self.sigma,
            rating: self.rating,
            debate_count: self.debate_count,
            vote_count: self.vote_count,
            factual: self.factual,
            consistent: self.consistent,
            charitable: self.charitable,
            respectful: self.respectful,
        }
    }
}

pub fn member_filter(member: MemberId) -> Document {
    doc! { "member": member.to_string() }
}
