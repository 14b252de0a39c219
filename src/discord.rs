//! Discord connection: HTTP client, command registration and shard tasks.

use crate::service::BotService;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};
use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{self as gateway, Config, Intents};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;

mod interactions;
mod shard;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("discord http request failed: {0}")]
    Http(#[from] twilight_http::Error),
    #[error("failed to decode discord response: {0}")]
    Decode(#[from] twilight_http::response::DeserializeBodyError),
    #[error("failed to start gateway shards: {0}")]
    Shards(String),
}

pub struct Discord {
    http: Arc<HttpClient>,
    shards: JoinSet<()>,
}

impl Discord {
    pub async fn start(
        token: String,
        app_name: String,
        service: Arc<BotService>,
    ) -> Result<Self, GatewayError> {
        let http = Arc::new(
            ClientBuilder::new()
                .token(token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );

        let application_id = http.current_user_application().await?.model().await?.id;
        let commands = interactions::command_definitions();
        http.interaction(application_id)
            .set_global_commands(&commands)
            .await?;
        info!(count = commands.len(), "registered global slash commands");

        let cache = Arc::new(
            InMemoryCache::builder()
                .resource_types(ResourceType::GUILD)
                .build(),
        );
        let config = Config::new(
            token,
            Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT,
        );
        let shards = gateway::create_recommended(&http, config, |_, builder| builder.build())
            .await
            .map_err(|err| GatewayError::Shards(err.to_string()))?;

        let ctx = Arc::new(shard::ShardContext {
            http: Arc::clone(&http),
            cache,
            service,
            application_id,
            app_name,
        });
        let mut tasks = JoinSet::new();
        for shard in shards {
            tasks.spawn(shard::run(shard, Arc::clone(&ctx)));
        }
        info!(shards = tasks.len(), "discord gateway started");

        Ok(Self {
            http,
            shards: tasks,
        })
    }

    pub fn http(&self) -> Arc<HttpClient> {
        Arc::clone(&self.http)
    }

    /// Resolves once every shard task has stopped.
    pub async fn wait(mut self) {
        while let Some(result) = self.shards.join_next().await {
            if let Err(err) = result {
                warn!("shard task aborted: {err}");
            }
        }
    }
}
