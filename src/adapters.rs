use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use twilight_http::Client as HttpClient;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

use crate::ports;
use crate::types::ChannelId;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl ports::Clock for TokioClock {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("channel id {0} is not a valid snowflake")]
    InvalidChannel(ChannelId),
    #[error("discord request failed: {0}")]
    Http(#[from] twilight_http::Error),
}

#[derive(Clone)]
pub struct DiscordMessenger {
    http: Arc<HttpClient>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

impl ports::MessageSender for DiscordMessenger {
    type Error = DeliveryError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, channel: ChannelId, message: &'a str) -> Self::Fut<'a> {
        Box::pin(async move {
            let channel_id = Id::<ChannelMarker>::new_checked(channel.get())
                .ok_or(DeliveryError::InvalidChannel(channel))?;
            self.http.create_message(channel_id).content(message).await?;
            Ok(())
        })
    }
}
