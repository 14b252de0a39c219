//! Robo Party reminder bot.
//!
//! Cooldown tracking lives in memory only: a restart forgets every running
//! timer and users start again with `/start`. Registrations and the party
//! history are stored in Postgres.

pub mod adapters;
pub mod app;
pub mod assets;
pub mod auth;
pub mod commands;
pub mod config;
pub mod cooldown;
pub mod db;
pub mod discord;
pub mod dispatcher;
pub mod humanize;
pub mod ports;
pub mod service;
pub mod state;
pub mod templates;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

use crate::adapters::{DiscordMessenger, TokioClock};
use crate::config::AppConfig;
use crate::discord::Discord;
use crate::dispatcher::Dispatcher;
use crate::service::BotService;

use anyhow::Context;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let pool = db::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    db::run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;
    let store = Arc::new(db::PgRegistrationStore::new(pool));

    let service = Arc::new(BotService::new(store, &config, OffsetDateTime::now_utc()));
    let discord = Discord::start(
        config.discord_token.clone(),
        config.app_name.clone(),
        Arc::clone(&service),
    )
    .await
    .context("failed to start discord gateway")?;

    let dispatcher = Dispatcher::new(
        TokioClock,
        DiscordMessenger::new(discord.http()),
        Arc::clone(&service),
        config.dispatch_interval,
    );
    tokio::spawn(dispatcher.run());

    let addr = config.bind_addr;
    let state = state::AppState {
        config: Arc::new(config),
        service,
    };
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "web server listening");
    let server = axum::serve(
        listener,
        app::app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .into_future();

    tokio::select! {
        result = server => result.context("web server failed")?,
        () = discord.wait() => warn!("all discord shards stopped"),
    }
    Ok(())
}
