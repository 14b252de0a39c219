use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }

            /// Postgres has no unsigned 64-bit column type; snowflakes are stored bit-for-bit.
            pub(crate) fn to_db(self) -> i64 {
                self.0 as i64
            }

            pub(crate) fn from_db(raw: i64) -> Self {
                Self(raw as u64)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

snowflake!(CommunityId);
snowflake!(UserId);
snowflake!(ChannelId);

/// Identifies one cooldown timer: a user inside a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey {
    pub community: CommunityId,
    pub user: UserId,
}

impl EntryKey {
    pub fn new(community: CommunityId, user: UserId) -> Self {
        Self { community, user }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.community, self.user)
    }
}
