use crate::types::ChannelId;

/// Outbound chat delivery.
pub trait MessageSender: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, channel: ChannelId, message: &'a str) -> Self::Fut<'a>;
}
