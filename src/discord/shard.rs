use crate::commands::{self, PrefixCommand};
use crate::discord::interactions;
use crate::service::BotService;
use crate::types::{CommunityId, UserId};

use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, error, info, trace, warn};
use twilight_cache_inmemory::InMemoryCache;
use twilight_gateway::{Event, EventTypeFlags, Shard, StreamExt};
use twilight_http::Client as HttpClient;
use twilight_model::gateway::payload::incoming::MessageCreate;
use twilight_model::gateway::payload::outgoing::UpdatePresence;
use twilight_model::gateway::payload::outgoing::update_presence::UpdatePresenceError;
use twilight_model::gateway::presence::{Activity, ActivityType, MinimalActivity, Status};
use twilight_model::id::Id;
use twilight_model::id::marker::ApplicationMarker;

const LATENCY_SAMPLE_INTERVAL: Duration = Duration::from_secs(30);
/// The dashboard latency history is fed by a single shard.
const LATENCY_SHARD: u32 = 0;

pub(crate) struct ShardContext {
    pub(crate) http: Arc<HttpClient>,
    pub(crate) cache: Arc<InMemoryCache>,
    pub(crate) service: Arc<BotService>,
    pub(crate) application_id: Id<ApplicationMarker>,
    pub(crate) app_name: String,
}

pub(crate) async fn run(mut shard: Shard, ctx: Arc<ShardContext>) {
    let shard_id = shard.id().number();
    let sender = shard.sender();
    let mut maintenance = ctx.service.subscribe_maintenance();
    let mut latency_tick = tokio::time::interval(LATENCY_SAMPLE_INTERVAL);
    info!(shard_id, "shard started");

    loop {
        tokio::select! {
            item = shard.next_event(EventTypeFlags::all()) => {
                let Some(item) = item else {
                    break;
                };
                let event = match item {
                    Ok(event) => event,
                    Err(err) => {
                        error!(shard_id, "error receiving event: {err}");
                        continue;
                    }
                };
                ctx.cache.update(&event);
                if matches!(event, Event::Ready(_)) {
                    update_presence(&sender, &ctx, ctx.service.is_maintenance());
                }
                handle_event(event, &ctx, shard_id);
            }
            _ = latency_tick.tick() => {
                if samples_latency(shard_id)
                    && let Some(latency) = shard.latency().average()
                {
                    ctx.service.gateway().record_latency(latency);
                }
            }
            Ok(()) = maintenance.changed() => {
                let enabled = *maintenance.borrow_and_update();
                update_presence(&sender, &ctx, enabled);
            }
        }
    }

    warn!(shard_id, "shard event loop ended");
}

fn samples_latency(shard_id: u32) -> bool {
    shard_id == LATENCY_SHARD
}

fn handle_event(event: Event, ctx: &Arc<ShardContext>, shard_id: u32) {
    match event {
        Event::Ready(ready) => {
            ctx.service
                .gateway()
                .set_guild_count(ctx.cache.stats().guilds());
            info!(
                shard_id,
                user = %ready.user.name,
                guilds = ready.guilds.len(),
                "connected to gateway"
            );
        }
        Event::GuildCreate(_) | Event::GuildDelete(_) => {
            ctx.service
                .gateway()
                .set_guild_count(ctx.cache.stats().guilds());
        }
        Event::InteractionCreate(interaction) => {
            tokio::spawn(interactions::handle(
                Arc::clone(&ctx.http),
                ctx.application_id,
                Arc::clone(&ctx.service),
                interaction.0,
            ));
        }
        Event::MessageCreate(message) => {
            if message.author.bot {
                return;
            }
            if let Some(command) = PrefixCommand::parse(&message.content) {
                tokio::spawn(handle_prefix(Arc::clone(ctx), *message, command));
            }
        }
        other => trace!(shard_id, kind = ?other.kind(), "unhandled event"),
    }
}

async fn handle_prefix(ctx: Arc<ShardContext>, message: MessageCreate, command: PrefixCommand) {
    let author = UserId(message.author.id.get());
    let community = message.guild_id.map(|id| CommunityId(id.get()));
    let Some(reply) = commands::execute_prefix(
        &ctx.service,
        author,
        community,
        command,
        OffsetDateTime::now_utc(),
    )
    .await
    else {
        debug!(user = %author, "ignoring owner command from non-owner");
        return;
    };

    if let Err(err) = ctx.http.delete_message(message.channel_id, message.id).await {
        debug!("could not delete command message: {err}");
    }
    if let Err(err) = ctx.http.create_message(message.channel_id).content(&reply).await {
        warn!(channel = %message.channel_id, "failed to reply to owner command: {err}");
    }
}

fn update_presence(
    sender: &twilight_gateway::MessageSender,
    ctx: &ShardContext,
    maintenance: bool,
) {
    let presence = match presence(maintenance, &ctx.app_name) {
        Ok(presence) => presence,
        Err(err) => {
            error!("invalid presence: {err}");
            return;
        }
    };
    if let Err(err) = sender.command(&presence) {
        warn!("failed to queue presence update: {err}");
    }
}

pub(crate) fn presence(
    maintenance: bool,
    app_name: &str,
) -> Result<UpdatePresence, UpdatePresenceError> {
    let (status, name) = if maintenance {
        (Status::Idle, "🔧 Updating...".to_string())
    } else {
        (Status::Online, app_name.to_string())
    };
    let activity = MinimalActivity {
        kind: ActivityType::Playing,
        name,
        url: None,
    };
    UpdatePresence::new(vec![Activity::from(activity)], false, None::<u64>, status)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn samples_latency__should_only_hold_for_first_shard() {
        assert!(samples_latency(0));
        assert!(!samples_latency(1));
        assert!(!samples_latency(7));
    }

    #[test]
    fn presence__should_follow_maintenance_flag() {
        // When
        let updating = presence(true, "SorynTech Bot Suite").expect("presence");
        let normal = presence(false, "SorynTech Bot Suite").expect("presence");

        // Then
        assert_eq!(updating.d.status, Status::Idle);
        assert_eq!(updating.d.activities[0].name, "🔧 Updating...");
        assert_eq!(normal.d.status, Status::Online);
        assert_eq!(normal.d.activities[0].name, "SorynTech Bot Suite");
    }
}
