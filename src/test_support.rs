use crate::config::AppConfig;
use crate::ports::{Clock, MessageSender, RegistrationStore, StoreError};
use crate::service::BotService;
use crate::types::{ChannelId, CommunityId, CompletionRecord, EntryKey, Registration, UserId};

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub(crate) fn at(raw: &str) -> OffsetDateTime {
    OffsetDateTime::parse(raw, &Rfc3339).expect("parse instant")
}

pub(crate) fn service_with(
    store: MemoryRegistrationStore,
) -> (Arc<BotService>, Arc<MemoryRegistrationStore>) {
    service_with_config(store, &AppConfig::default())
}

pub(crate) fn service_with_config(
    store: MemoryRegistrationStore,
    config: &AppConfig,
) -> (Arc<BotService>, Arc<MemoryRegistrationStore>) {
    let store = Arc::new(store);
    let service = BotService::new(store.clone(), config, at("2025-03-01T00:00:00Z"));
    (Arc::new(service), store)
}

#[derive(Default)]
pub(crate) struct MemoryRegistrationStore {
    registrations: Mutex<BTreeMap<EntryKey, Registration>>,
    completions: Mutex<Vec<CompletionRecord>>,
    fail_lookups: AtomicBool,
}

impl MemoryRegistrationStore {
    pub(crate) fn insert(&self, key: EntryKey, channel: Option<ChannelId>, is_active: bool) {
        self.registrations.lock().expect("registrations lock").insert(
            key,
            Registration {
                community: key.community,
                user: key.user,
                display_name: None,
                channel,
                is_active,
                added_at: OffsetDateTime::UNIX_EPOCH,
            },
        );
    }

    pub(crate) fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn registrations(&self) -> Vec<Registration> {
        self.registrations
            .lock()
            .expect("registrations lock")
            .values()
            .cloned()
            .collect()
    }

    pub(crate) fn completions(&self) -> Vec<CompletionRecord> {
        self.completions.lock().expect("completions lock").clone()
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn find(
        &self,
        community: CommunityId,
        user: UserId,
    ) -> Result<Option<Registration>, StoreError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(self
            .registrations
            .lock()
            .expect("registrations lock")
            .get(&EntryKey::new(community, user))
            .cloned())
    }

    async fn upsert(
        &self,
        community: CommunityId,
        user: UserId,
        display_name: Option<&str>,
        channel: Option<ChannelId>,
    ) -> Result<Registration, StoreError> {
        let mut registrations = self.registrations.lock().expect("registrations lock");
        let entry = registrations
            .entry(EntryKey::new(community, user))
            .or_insert_with(|| Registration {
                community,
                user,
                display_name: None,
                channel: None,
                is_active: true,
                added_at: OffsetDateTime::UNIX_EPOCH,
            });
        if let Some(name) = display_name {
            entry.display_name = Some(name.to_string());
        }
        if channel.is_some() {
            entry.channel = channel;
        }
        entry.is_active = true;
        Ok(entry.clone())
    }

    async fn list(&self) -> Result<Vec<Registration>, StoreError> {
        Ok(self.registrations())
    }

    async fn record_completion(&self, record: &CompletionRecord) -> Result<(), StoreError> {
        self.completions
            .lock()
            .expect("completions lock")
            .push(record.clone());
        Ok(())
    }

    async fn completion_count(&self) -> Result<i64, StoreError> {
        Ok(self.completions.lock().expect("completions lock").len() as i64)
    }
}

#[derive(Clone)]
pub(crate) struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    pub(crate) fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub(crate) fn set(&self, now: OffsetDateTime) {
        *self.now.lock().expect("clock lock") = now;
    }
}

impl Clock for ManualClock {
    type Sleep<'a>
        = std::future::Ready<()>
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("clock lock")
    }

    fn sleep<'a>(&'a self, _duration: Duration) -> Self::Sleep<'a> {
        std::future::ready(())
    }
}

#[derive(Debug)]
pub(crate) struct TestSendError;

impl std::fmt::Display for TestSendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("test send error")
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingSender {
    sent: Arc<Mutex<Vec<(ChannelId, String)>>>,
    failing: Arc<Mutex<HashSet<ChannelId>>>,
}

impl RecordingSender {
    pub(crate) fn fail_channel(&self, channel: ChannelId) {
        self.failing.lock().expect("failing lock").insert(channel);
    }

    pub(crate) fn sent(&self) -> Vec<(ChannelId, String)> {
        self.sent.lock().expect("sent lock").clone()
    }
}

impl MessageSender for RecordingSender {
    type Error = TestSendError;
    type Fut<'a>
        = std::future::Ready<Result<(), Self::Error>>
    where
        Self: 'a;

    fn send<'a>(&'a self, channel: ChannelId, message: &'a str) -> Self::Fut<'a> {
        if self.failing.lock().expect("failing lock").contains(&channel) {
            return std::future::ready(Err(TestSendError));
        }
        self.sent
            .lock()
            .expect("sent lock")
            .push((channel, message.to_string()));
        std::future::ready(Ok(()))
    }
}
