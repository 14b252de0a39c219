use super::ids::{ChannelId, CommunityId, UserId};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Opt-in record binding a user, inside one community, to a delivery channel.
///
/// `channel` is `None` until an admin configures one; such a registration is
/// valid but not deliverable. Registrations are never deleted, only
/// deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub community: CommunityId,
    pub user: UserId,
    pub display_name: Option<String>,
    pub channel: Option<ChannelId>,
    pub is_active: bool,
    pub added_at: OffsetDateTime,
}

impl Registration {
    /// The channel notifications go to, if this registration can receive any.
    pub fn delivery_channel(&self) -> Option<ChannelId> {
        if self.is_active { self.channel } else { None }
    }

    pub fn label(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => self.user.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub community: CommunityId,
    pub completed_by: UserId,
    pub completed_at: OffsetDateTime,
}
