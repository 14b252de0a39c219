//! Chat commands, independent of the Discord transport.
//!
//! The gateway turns interactions and prefix messages into these values and
//! sends back whatever reply text comes out.

use crate::cooldown::{CooldownError, SleepRequest};
use crate::humanize;
use crate::service::{BotService, ServiceError};
use crate::types::{ChannelId, CommunityId, EntryKey, UserId};

use time::OffsetDateTime;
use tracing::error;

pub const HELP_TEXT: &str = "🐝 **Robo Party Tracker**\n\n\
`/start` - start your 3 hour party timer in this server\n\
`/done` - mark your party complete and restart the timer\n\
`/sleep hours minutes` - pause reminders for a while\n\
`/sleep until` - pause reminders until HH:MM (UTC)\n\
`/adduser user channel` - register someone for reminders (admins)\n\
`/help` - show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Start,
    Done,
    Sleep {
        hours: Option<i64>,
        minutes: Option<i64>,
        until: Option<String>,
    },
    AddUser {
        user: UserId,
        display_name: Option<String>,
        channel: Option<ChannelId>,
    },
    Help,
}

/// Who ran a command and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invoker {
    /// `None` when the command came from a direct message.
    pub community: Option<CommunityId>,
    pub user: UserId,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub content: String,
    pub ephemeral: bool,
}

impl CommandReply {
    fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

pub async fn execute(
    service: &BotService,
    invoker: Invoker,
    command: SlashCommand,
    now: OffsetDateTime,
) -> CommandReply {
    if command == SlashCommand::Help {
        return CommandReply::ephemeral(HELP_TEXT);
    }
    let Some(community) = invoker.community else {
        return CommandReply::ephemeral("⚠️ This command only works inside a server.");
    };
    let key = EntryKey::new(community, invoker.user);

    let result = match command {
        SlashCommand::Start => service.start_tracking(key, now).await.map(|next| {
            format!(
                "🐝 **Robo Party Tracker Started!**\n\nNext party {}.\n\
                 You'll be pinged when it's ready!",
                discord_time(next)
            )
        }),
        SlashCommand::Done => service.complete(key, now).await.map(|next| {
            format!(
                "✅ **Party Complete!**\n\nNext party {}! 🎉",
                discord_time(next)
            )
        }),
        SlashCommand::Sleep {
            hours,
            minutes,
            until,
        } => SleepRequest::from_parts(hours, minutes, until.as_deref())
            .map_err(ServiceError::from)
            .and_then(|request| service.sleep(key, now, request))
            .map(|outcome| {
                format!(
                    "😴 **Reminders paused** for {}.\n\nWaking up {}.",
                    humanize::duration(outcome.duration),
                    discord_time(outcome.wake_at)
                )
            }),
        SlashCommand::AddUser {
            user,
            display_name,
            channel,
        } => service
            .register(
                invoker.is_admin,
                community,
                user,
                display_name.as_deref(),
                channel,
            )
            .await
            .map(|registration| match registration.channel {
                Some(channel) => format!(
                    "✅ <@{user}> added to party reminders! Pings go to <#{channel}>."
                ),
                None => format!(
                    "✅ <@{user}> added to party reminders! No channel is configured yet, \
                     so pings are held until one is set with `/adduser`."
                ),
            }),
        SlashCommand::Help => Ok(HELP_TEXT.to_string()),
    };

    match result {
        Ok(content) => CommandReply::ephemeral(content),
        Err(err) => CommandReply::ephemeral(error_reply(&err)),
    }
}

fn error_reply(err: &ServiceError) -> String {
    match err {
        ServiceError::NotRegistered => "⚠️ You're not registered for party reminders in this \
            server. Ask an admin to run `/adduser`."
            .to_string(),
        ServiceError::Forbidden => "⚠️ Admin only!".to_string(),
        ServiceError::Cooldown(CooldownError::NotTracking) => {
            "⚠️ Party tracking not active! Use `/start` first.".to_string()
        }
        ServiceError::Cooldown(CooldownError::MissingSleepWindow) => {
            "⚠️ Tell me how long to sleep with `hours`/`minutes`, or when to wake with \
             `until` (HH:MM, UTC)."
                .to_string()
        }
        ServiceError::Cooldown(CooldownError::ConflictingSleepWindow) => {
            "⚠️ Use either `hours`/`minutes` or `until`, not both.".to_string()
        }
        ServiceError::Cooldown(CooldownError::InvalidWakeTime(raw)) => {
            format!("⚠️ `{raw}` isn't a valid time. Use HH:MM in UTC, like `07:30`.")
        }
        ServiceError::Cooldown(CooldownError::InvalidDuration) => {
            "⚠️ Sleep duration can't be negative.".to_string()
        }
        ServiceError::Cooldown(CooldownError::SleepTooLong) => {
            "⚠️ You can sleep for at most 7 days.".to_string()
        }
        ServiceError::Store(store_err) => {
            error!("command failed on registration store: {store_err}");
            "❌ Couldn't reach the database. Try again in a moment.".to_string()
        }
    }
}

/// Hidden `!` commands reserved for the bot owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixCommand {
    Updating,
    TestParty,
}

impl PrefixCommand {
    pub fn parse(content: &str) -> Option<Self> {
        match content.trim() {
            "!updating" => Some(PrefixCommand::Updating),
            "!testparty" => Some(PrefixCommand::TestParty),
            _ => None,
        }
    }
}

/// Returns the channel reply, or `None` when the author is not the owner.
pub async fn execute_prefix(
    service: &BotService,
    author: UserId,
    community: Option<CommunityId>,
    command: PrefixCommand,
    now: OffsetDateTime,
) -> Option<String> {
    if author != service.owner_id() {
        return None;
    }
    let reply = match command {
        PrefixCommand::Updating => {
            if service.toggle_maintenance() {
                "✅ Update mode **ENABLED** - Status page updated".to_string()
            } else {
                "✅ Update mode **DISABLED** - Back to normal".to_string()
            }
        }
        PrefixCommand::TestParty => match community {
            None => "⚠️ Test parties only work inside a server.".to_string(),
            Some(community) => {
                match service
                    .start_test_party(EntryKey::new(community, author), now)
                    .await
                {
                    Ok(next) => format!("🧪 Test party scheduled, ping {}.", discord_time(next)),
                    Err(err) => error_reply(&err),
                }
            }
        },
    };
    Some(reply)
}

/// Relative Discord timestamp markup, rendered in each reader's locale.
pub fn discord_time(at: OffsetDateTime) -> String {
    let unix = at.unix_timestamp();
    format!("<t:{unix}:R> (<t:{unix}:t>)")
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::cooldown::PARTY_INTERVAL;
    use crate::test_support::{MemoryRegistrationStore, at, service_with};
    use time::Duration;

    const GUILD: CommunityId = CommunityId(1);
    const MEMBER: UserId = UserId(42);

    fn member() -> Invoker {
        Invoker {
            community: Some(GUILD),
            user: MEMBER,
            is_admin: false,
        }
    }

    fn registered() -> MemoryRegistrationStore {
        let store = MemoryRegistrationStore::default();
        store.insert(EntryKey::new(GUILD, MEMBER), Some(ChannelId(9)), true);
        store
    }

    #[tokio::test]
    async fn start__should_reply_with_relative_next_due() {
        // Given
        let (service, _) = service_with(registered());
        let now = at("2025-03-01T10:00:00Z");

        // When
        let reply = execute(&service, member(), SlashCommand::Start, now).await;

        // Then
        let next = (now + PARTY_INTERVAL).unix_timestamp();
        assert!(reply.ephemeral);
        assert!(reply.content.contains(&format!("<t:{next}:R>")));
        let state = service
            .with_engine(|engine| engine.get(EntryKey::new(GUILD, MEMBER)))
            .expect("entry");
        assert_eq!(state.sleep_until, None);
    }

    #[tokio::test]
    async fn start__should_refuse_unregistered_user() {
        let (service, _) = service_with(MemoryRegistrationStore::default());

        let reply = execute(&service, member(), SlashCommand::Start, at("2025-03-01T10:00:00Z")).await;

        assert!(reply.content.contains("not registered"));
        assert_eq!(service.tracked_count(), 0);
    }

    #[tokio::test]
    async fn done__should_error_when_not_tracking() {
        let (service, _) = service_with(registered());

        let reply = execute(&service, member(), SlashCommand::Done, at("2025-03-01T10:00:00Z")).await;

        assert!(reply.content.contains("Use `/start` first"));
        assert_eq!(service.tracked_count(), 0);
    }

    #[tokio::test]
    async fn done__should_reset_timer_right_after_start() {
        // Given
        let (service, _) = service_with(registered());
        let now = at("2025-03-01T10:00:00Z");
        execute(&service, member(), SlashCommand::Start, now).await;
        let first = service
            .with_engine(|engine| engine.get(EntryKey::new(GUILD, MEMBER)))
            .and_then(|state| state.next_due_at)
            .expect("first due");

        // When
        let later = now + Duration::seconds(2);
        let reply = execute(&service, member(), SlashCommand::Done, later).await;

        // Then
        assert!(reply.content.contains("Party Complete"));
        let second = service
            .with_engine(|engine| engine.get(EntryKey::new(GUILD, MEMBER)))
            .and_then(|state| state.next_due_at)
            .expect("second due");
        assert_eq!(second - first, Duration::seconds(2));
    }

    #[tokio::test]
    async fn sleep__should_report_duration_and_wake_time() {
        // Given
        let (service, _) = service_with(registered());
        let now = at("2025-03-01T10:00:00Z");
        execute(&service, member(), SlashCommand::Start, now).await;

        // When
        let reply = execute(
            &service,
            member(),
            SlashCommand::Sleep {
                hours: Some(1),
                minutes: None,
                until: None,
            },
            now,
        )
        .await;

        // Then
        let wake = (now + Duration::hours(1)).unix_timestamp();
        assert!(reply.content.contains("1h 0m"));
        assert!(reply.content.contains(&format!("<t:{wake}:R>")));
    }

    #[tokio::test]
    async fn sleep__should_reject_missing_and_conflicting_windows() {
        // Given
        let (service, _) = service_with(registered());
        let now = at("2025-03-01T10:00:00Z");
        execute(&service, member(), SlashCommand::Start, now).await;

        // When
        let missing = execute(
            &service,
            member(),
            SlashCommand::Sleep {
                hours: None,
                minutes: Some(0),
                until: None,
            },
            now,
        )
        .await;
        let both = execute(
            &service,
            member(),
            SlashCommand::Sleep {
                hours: Some(2),
                minutes: None,
                until: Some("08:00".to_string()),
            },
            now,
        )
        .await;

        // Then
        assert!(missing.content.contains("how long to sleep"));
        assert!(both.content.contains("not both"));
        let state = service
            .with_engine(|engine| engine.get(EntryKey::new(GUILD, MEMBER)))
            .expect("entry");
        assert_eq!(state.sleep_until, None);
    }

    #[tokio::test]
    async fn sleep__should_reject_huge_duration_and_keep_serving() {
        // Given
        let (service, _) = service_with(registered());
        let now = at("2025-03-01T10:00:00Z");
        execute(&service, member(), SlashCommand::Start, now).await;

        // When
        let reply = execute(
            &service,
            member(),
            SlashCommand::Sleep {
                hours: Some(100_000_000),
                minutes: None,
                until: None,
            },
            now,
        )
        .await;

        // Then
        assert!(reply.content.contains("at most 7 days"));
        assert_eq!(service.tracked_count(), 1);
        let done = execute(&service, member(), SlashCommand::Done, now).await;
        assert!(done.content.contains("Party Complete"));
    }

    #[tokio::test]
    async fn adduser__should_require_admin() {
        // Given
        let (service, store) = service_with(MemoryRegistrationStore::default());
        let command = SlashCommand::AddUser {
            user: UserId(77),
            display_name: Some("worker bee".to_string()),
            channel: Some(ChannelId(9)),
        };

        // When
        let denied = execute(&service, member(), command.clone(), at("2025-03-01T10:00:00Z")).await;
        let admin = Invoker {
            is_admin: true,
            ..member()
        };
        let accepted = execute(&service, admin, command, at("2025-03-01T10:00:00Z")).await;

        // Then
        assert_eq!(denied.content, "⚠️ Admin only!");
        assert!(accepted.content.contains("<@77>"));
        assert!(accepted.content.contains("<#9>"));
        let registrations = store.registrations();
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].display_name.as_deref(), Some("worker bee"));
    }

    #[tokio::test]
    async fn commands__should_require_a_server_except_help() {
        // Given
        let (service, _) = service_with(registered());
        let direct = Invoker {
            community: None,
            ..member()
        };

        // When
        let start = execute(&service, direct, SlashCommand::Start, at("2025-03-01T10:00:00Z")).await;
        let help = execute(&service, direct, SlashCommand::Help, at("2025-03-01T10:00:00Z")).await;

        // Then
        assert!(start.content.contains("inside a server"));
        assert_eq!(help.content, HELP_TEXT);
    }

    #[test]
    fn prefix_parse__should_only_match_known_commands() {
        assert_eq!(PrefixCommand::parse(" !updating "), Some(PrefixCommand::Updating));
        assert_eq!(PrefixCommand::parse("!testparty"), Some(PrefixCommand::TestParty));
        assert_eq!(PrefixCommand::parse("!updating now"), None);
        assert_eq!(PrefixCommand::parse("updating"), None);
    }

    #[tokio::test]
    async fn execute_prefix__should_ignore_non_owner() {
        // Given
        let (service, _) = service_with(registered());

        // When
        let reply = execute_prefix(
            &service,
            MEMBER,
            Some(GUILD),
            PrefixCommand::Updating,
            at("2025-03-01T10:00:00Z"),
        )
        .await;

        // Then
        assert_eq!(reply, None);
        assert!(!service.is_maintenance());
    }

    #[tokio::test]
    async fn execute_prefix__should_toggle_maintenance_for_owner() {
        // Given
        let (service, _) = service_with(registered());
        let owner = service.owner_id();
        let now = at("2025-03-01T10:00:00Z");

        // When
        let enabled = execute_prefix(&service, owner, Some(GUILD), PrefixCommand::Updating, now).await;
        let disabled = execute_prefix(&service, owner, Some(GUILD), PrefixCommand::Updating, now).await;

        // Then
        assert!(enabled.expect("reply").contains("ENABLED"));
        assert!(disabled.expect("reply").contains("DISABLED"));
        assert!(!service.is_maintenance());
    }

    #[tokio::test]
    async fn execute_prefix__should_schedule_short_test_party() {
        // Given
        let store = MemoryRegistrationStore::default();
        let (service, _) = service_with(store);
        let owner = service.owner_id();
        service
            .register(true, GUILD, owner, None, Some(ChannelId(9)))
            .await
            .expect("register owner");
        let now = at("2025-03-01T10:00:00Z");

        // When
        let reply = execute_prefix(&service, owner, Some(GUILD), PrefixCommand::TestParty, now).await;

        // Then
        assert!(reply.expect("reply").contains("Test party scheduled"));
        let entries = service.entries(now);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_test);
    }
}
