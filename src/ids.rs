//! Opaque snowflake identifiers for guild members, channels, roles and messages.
//!
//! Identifiers travel as decimal strings on the wire so that JavaScript-based gateways do not
//! lose precision on 64-bit values.

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::ToSchema;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[serde_as]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        #[schema(value_type = String)]
        pub struct $name(#[serde_as(as = "DisplayFromStr")] pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

snowflake!(
    /// Identifier of a guild member.
    MemberId
);
impl MemberId {
    /// Platform mention markup for the member.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

snowflake!(
    /// Identifier of a voice or text channel.
    ChannelId
);
snowflake!(
    /// Identifier of a guild role.
    RoleId
);
snowflake!(
    /// Identifier of a message posted by the bot.
    MessageId
);
