//! Periodic poll that turns due cooldown entries into Discord pings.
//!
//! Each cycle snapshots the due set, resolves every entry's delivery channel
//! through the registration store and sends one reminder per entry. Sent and
//! failed deliveries are both rescheduled one interval out; failures are not
//! retried. Entries without an active registration or a configured channel
//! stay due and are skipped again on the next cycle.

use crate::ports;
use crate::service::BotService;
use crate::types::{EntryKey, Registration, UserId};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub woke: Vec<EntryKey>,
    pub fired: Vec<EntryKey>,
    pub failed: Vec<EntryKey>,
    pub skipped: Vec<EntryKey>,
}

pub struct Dispatcher<C, S> {
    clock: C,
    sender: S,
    service: Arc<BotService>,
    interval: Duration,
}

impl<C, S> Dispatcher<C, S>
where
    C: ports::Clock,
    S: ports::MessageSender,
{
    pub fn new(clock: C, sender: S, service: Arc<BotService>, interval: Duration) -> Self {
        Self {
            clock,
            sender,
            service,
            interval,
        }
    }

    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "dispatcher started");
        loop {
            self.clock.sleep(self.interval).await;
            let report = self.run_cycle().await;
            if report != CycleReport::default() {
                debug!(?report, "dispatcher cycle finished");
            }
        }
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let now = self.clock.now();
        let (woke, due) = self.service.with_engine(|engine| {
            let woke = engine.wake_elapsed(now);
            let due: Vec<(EntryKey, bool)> = engine
                .query_due(now)
                .into_iter()
                .map(|key| (key, engine.get(key).is_some_and(|state| state.is_test())))
                .collect();
            (woke, due)
        });

        let mut report = CycleReport {
            woke,
            ..Default::default()
        };
        for key in &report.woke {
            info!(entry = %key, "sleep window ended, reminders resumed");
        }

        for (key, is_test) in due {
            let registration = match self.service.store().find(key.community, key.user).await {
                Ok(registration) => registration,
                Err(err) => {
                    error!(entry = %key, "registration lookup failed: {err}");
                    report.skipped.push(key);
                    continue;
                }
            };
            let Some(channel) = registration.as_ref().and_then(Registration::delivery_channel)
            else {
                warn!(
                    entry = %key,
                    registered = registration.is_some(),
                    "due entry has no deliverable channel, skipping"
                );
                report.skipped.push(key);
                continue;
            };

            let message = reminder_message(key.user, is_test);
            match self.sender.send(channel, &message).await {
                Ok(()) => {
                    info!(entry = %key, channel = %channel, test = is_test, "party reminder sent");
                    report.fired.push(key);
                }
                Err(err) => {
                    error!(entry = %key, channel = %channel, "party reminder failed: {err}");
                    report.failed.push(key);
                }
            }

            self.service
                .with_engine(|engine| engine.reschedule_if_due(key, now));
        }

        report
    }
}

pub(crate) fn reminder_message(user: UserId, is_test: bool) -> String {
    let body = format!(
        "🤖🎉 **ROBO PARTY ALERT!** 🎉🤖\n\n<@{user}> your Robo Party is ready!\n\
         Use `/done` once you've partied and I'll start the next 3 hour timer. 🐝✨"
    );
    if is_test {
        format!("🧪 **[TEST]** {body}")
    } else {
        body
    }
}
