//! The long-lived service object shared by the gateway, the HTTP layer and
//! the dispatcher. It owns every piece of mutable runtime state.

use crate::auth::SessionStore;
use crate::config::AppConfig;
use crate::cooldown::{
    CooldownEngine, CooldownError, EntrySnapshot, EntryStatus, SleepOutcome, SleepRequest,
};
use crate::ports::{RegistrationStore, StoreError};
use crate::types::{ChannelId, CommunityId, CompletionRecord, EntryKey, Registration, UserId};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;
use time::{Duration, OffsetDateTime};
use tokio::sync::watch;
use tracing::{error, info};

/// Interval used by owner-triggered test parties.
pub const TEST_PARTY_INTERVAL: Duration = Duration::minutes(5);

const LATENCY_HISTORY_LEN: usize = 60;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("user is not registered in this community")]
    NotRegistered,
    #[error("administrator permission required")]
    Forbidden,
    #[error(transparent)]
    Cooldown(#[from] CooldownError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Connection figures reported by the gateway for the dashboards.
#[derive(Debug, Default)]
pub struct GatewayStats {
    guilds: AtomicUsize,
    latency_ms: Mutex<VecDeque<f64>>,
}

impl GatewayStats {
    pub fn set_guild_count(&self, count: usize) {
        self.guilds.store(count, Ordering::Relaxed);
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.load(Ordering::Relaxed)
    }

    pub fn record_latency(&self, latency: StdDuration) {
        let millis = (latency.as_secs_f64() * 100_000.0).round() / 100.0;
        let mut history = self.latency_ms.lock().expect("latency lock");
        if history.len() == LATENCY_HISTORY_LEN {
            history.pop_front();
        }
        history.push_back(millis);
    }

    pub fn latency_history(&self) -> Vec<f64> {
        self.latency_ms
            .lock()
            .expect("latency lock")
            .iter()
            .copied()
            .collect()
    }

    pub fn latest_latency(&self) -> Option<f64> {
        self.latency_ms.lock().expect("latency lock").back().copied()
    }
}

pub struct BotService {
    engine: Mutex<CooldownEngine>,
    store: Arc<dyn RegistrationStore>,
    sessions: SessionStore,
    maintenance: watch::Sender<bool>,
    sleep_banner: AtomicBool,
    started_at: OffsetDateTime,
    owner_id: UserId,
    gateway: GatewayStats,
}

impl BotService {
    pub fn new(store: Arc<dyn RegistrationStore>, config: &AppConfig, now: OffsetDateTime) -> Self {
        let (maintenance, _) = watch::channel(false);
        Self {
            engine: Mutex::new(CooldownEngine::new()),
            store,
            sessions: SessionStore::new(config.cookie_secure),
            maintenance,
            sleep_banner: AtomicBool::new(false),
            started_at: now,
            owner_id: config.owner_id,
            gateway: GatewayStats::default(),
        }
    }

    /// Runs `f` with exclusive access to the engine. The closure is synchronous,
    /// so the lock can never be held across an await point.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut CooldownEngine) -> R) -> R {
        let mut engine = self.engine.lock().expect("engine lock");
        f(&mut engine)
    }

    pub fn store(&self) -> &dyn RegistrationStore {
        self.store.as_ref()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn gateway(&self) -> &GatewayStats {
        &self.gateway
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn uptime(&self, now: OffsetDateTime) -> Duration {
        now - self.started_at
    }

    pub async fn start_tracking(
        &self,
        key: EntryKey,
        now: OffsetDateTime,
    ) -> Result<OffsetDateTime, ServiceError> {
        self.require_active_registration(key).await?;
        let next = self.with_engine(|engine| engine.start(key, now));
        info!(entry = %key, "party tracking started");
        Ok(next)
    }

    pub async fn start_test_party(
        &self,
        key: EntryKey,
        now: OffsetDateTime,
    ) -> Result<OffsetDateTime, ServiceError> {
        self.require_active_registration(key).await?;
        let next = self.with_engine(|engine| engine.start_with_interval(key, now, TEST_PARTY_INTERVAL));
        info!(entry = %key, "test party scheduled");
        Ok(next)
    }

    pub async fn complete(
        &self,
        key: EntryKey,
        now: OffsetDateTime,
    ) -> Result<OffsetDateTime, ServiceError> {
        let next = self.with_engine(|engine| engine.complete(key, now))?;
        let record = CompletionRecord {
            community: key.community,
            completed_by: key.user,
            completed_at: now,
        };
        if let Err(err) = self.store.record_completion(&record).await {
            error!(entry = %key, "failed to record party completion: {err}");
        }
        Ok(next)
    }

    pub fn sleep(
        &self,
        key: EntryKey,
        now: OffsetDateTime,
        request: SleepRequest,
    ) -> Result<SleepOutcome, ServiceError> {
        let outcome = self.with_engine(|engine| engine.sleep(key, now, request))?;
        info!(entry = %key, wake_at = %outcome.wake_at, "party reminders paused");
        Ok(outcome)
    }

    pub async fn register(
        &self,
        invoker_is_admin: bool,
        community: CommunityId,
        user: UserId,
        display_name: Option<&str>,
        channel: Option<ChannelId>,
    ) -> Result<Registration, ServiceError> {
        if !invoker_is_admin {
            return Err(ServiceError::Forbidden);
        }
        let registration = self
            .store
            .upsert(community, user, display_name, channel)
            .await?;
        info!(
            community = %community,
            user = %user,
            channel = ?channel,
            "registration saved"
        );
        Ok(registration)
    }

    pub fn status(&self, key: EntryKey, now: OffsetDateTime) -> EntryStatus {
        self.with_engine(|engine| engine.status(key, now))
    }

    pub fn entries(&self, now: OffsetDateTime) -> Vec<EntrySnapshot> {
        self.with_engine(|engine| engine.snapshot(now))
    }

    pub fn tracked_count(&self) -> usize {
        self.with_engine(|engine| engine.len())
    }

    pub fn is_maintenance(&self) -> bool {
        *self.maintenance.borrow()
    }

    /// Flips the maintenance flag and returns the new value.
    pub fn toggle_maintenance(&self) -> bool {
        let mut enabled = false;
        self.maintenance.send_modify(|flag| {
            *flag = !*flag;
            enabled = *flag;
        });
        info!(enabled, "maintenance mode toggled");
        enabled
    }

    pub fn subscribe_maintenance(&self) -> watch::Receiver<bool> {
        self.maintenance.subscribe()
    }

    pub fn is_sleep_banner(&self) -> bool {
        self.sleep_banner.load(Ordering::Relaxed)
    }

    pub fn toggle_sleep_banner(&self) -> bool {
        let enabled = !self.sleep_banner.fetch_xor(true, Ordering::Relaxed);
        info!(enabled, "sleep banner toggled");
        enabled
    }

    async fn require_active_registration(&self, key: EntryKey) -> Result<Registration, ServiceError> {
        match self.store.find(key.community, key.user).await? {
            Some(registration) if registration.is_active => Ok(registration),
            _ => Err(ServiceError::NotRegistered),
        }
    }
}
