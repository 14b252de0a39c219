pub mod ids;
pub mod registration;

pub use ids::{ChannelId, CommunityId, EntryKey, UserId};
pub use registration::{CompletionRecord, Registration};
