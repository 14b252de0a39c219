//! Per-(community, user) party cooldown timers.
//!
//! The engine is plain data: every operation takes the current instant as an
//! argument and never suspends, so callers can hold it behind a synchronous
//! lock without spanning an `.await`. State is memory-resident on purpose; a
//! restart puts every user back to "not tracking".

use crate::humanize;
use crate::types::EntryKey;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use time::{Duration, OffsetDateTime, Time, UtcOffset};

/// Time between two notification-eligible instants.
pub const PARTY_INTERVAL: Duration = Duration::hours(3);

/// Entries scheduled closer than this are tagged as test entries.
pub const TEST_HORIZON: Duration = Duration::minutes(10);

/// Longest window a single `/sleep` may pause reminders for.
pub const MAX_SLEEP: Duration = Duration::days(7);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CooldownError {
    #[error("party tracking has not been started")]
    NotTracking,
    #[error("a sleep duration or wake time is required")]
    MissingSleepWindow,
    #[error("a sleep duration and a wake time cannot be combined")]
    ConflictingSleepWindow,
    #[error("invalid wake time '{0}', expected HH:MM")]
    InvalidWakeTime(String),
    #[error("sleep duration cannot be negative")]
    InvalidDuration,
    #[error("sleep cannot last longer than 7 days")]
    SleepTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CooldownState {
    pub next_due_at: Option<OffsetDateTime>,
    pub sleep_until: Option<OffsetDateTime>,
    /// When `next_due_at` was last set.
    pub scheduled_at: OffsetDateTime,
}

impl CooldownState {
    fn scheduled(now: OffsetDateTime, interval: Duration) -> Self {
        Self {
            next_due_at: Some(now + interval),
            sleep_until: None,
            scheduled_at: now,
        }
    }

    pub fn is_sleeping(&self, at: OffsetDateTime) -> bool {
        self.sleep_until.is_some_and(|until| until > at)
    }

    pub fn is_due(&self, at: OffsetDateTime) -> bool {
        !self.is_sleeping(at) && self.next_due_at.is_some_and(|due| due <= at)
    }

    pub fn is_test(&self) -> bool {
        self.next_due_at
            .is_some_and(|due| due - self.scheduled_at < TEST_HORIZON)
    }
}

/// How a `/sleep` window was expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepRequest {
    For(Duration),
    /// Wall-clock wake time in UTC; rolls to tomorrow if already passed today.
    Until(Time),
}

impl SleepRequest {
    pub fn from_parts(
        hours: Option<i64>,
        minutes: Option<i64>,
        until: Option<&str>,
    ) -> Result<Self, CooldownError> {
        let hours = hours.unwrap_or(0);
        let minutes = minutes.unwrap_or(0);
        if hours < 0 || minutes < 0 {
            return Err(CooldownError::InvalidDuration);
        }
        if hours > MAX_SLEEP.whole_hours() || minutes > MAX_SLEEP.whole_minutes() {
            return Err(CooldownError::SleepTooLong);
        }

        match until.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => {
                if hours != 0 || minutes != 0 {
                    return Err(CooldownError::ConflictingSleepWindow);
                }
                parse_wake_time(raw).map(SleepRequest::Until)
            }
            None => {
                let duration = Duration::hours(hours) + Duration::minutes(minutes);
                if duration.is_zero() {
                    return Err(CooldownError::MissingSleepWindow);
                }
                if duration > MAX_SLEEP {
                    return Err(CooldownError::SleepTooLong);
                }
                Ok(SleepRequest::For(duration))
            }
        }
    }

    pub fn wake_at(self, now: OffsetDateTime) -> Result<OffsetDateTime, CooldownError> {
        let wake_at = match self {
            SleepRequest::For(duration) if duration.is_negative() => {
                return Err(CooldownError::InvalidDuration);
            }
            SleepRequest::For(duration) if duration > MAX_SLEEP => {
                return Err(CooldownError::SleepTooLong);
            }
            SleepRequest::For(duration) => now.checked_add(duration),
            SleepRequest::Until(time) => {
                let now = now.to_offset(UtcOffset::UTC);
                let today = now.replace_time(time);
                if today <= now {
                    today.checked_add(Duration::days(1))
                } else {
                    Some(today)
                }
            }
        };
        wake_at.ok_or(CooldownError::SleepTooLong)
    }
}

fn parse_wake_time(raw: &str) -> Result<Time, CooldownError> {
    let invalid = || CooldownError::InvalidWakeTime(raw.to_string());
    let (hour, minute) = raw.split_once(':').ok_or_else(invalid)?;
    let hour: u8 = hour.trim().parse().map_err(|_| invalid())?;
    let minute: u8 = minute.trim().parse().map_err(|_| invalid())?;
    Time::from_hms(hour, minute, 0).map_err(|_| invalid())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepOutcome {
    pub wake_at: OffsetDateTime,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Inactive,
    Active { next_due_at: Option<OffsetDateTime> },
    Sleeping { until: OffsetDateTime, remaining: Duration },
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Inactive => f.write_str("Inactive"),
            EntryStatus::Active { .. } => f.write_str("Active"),
            EntryStatus::Sleeping { remaining, .. } => {
                write!(f, "Sleeping ({})", humanize::duration(*remaining))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub key: EntryKey,
    pub state: CooldownState,
    pub label: String,
    pub is_test: bool,
}

#[derive(Debug, Default)]
pub struct CooldownEngine {
    entries: BTreeMap<EntryKey, CooldownState>,
}

impl CooldownEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or resets the entry; repeated calls restart the clock.
    pub fn start(&mut self, key: EntryKey, now: OffsetDateTime) -> OffsetDateTime {
        self.start_with_interval(key, now, PARTY_INTERVAL)
    }

    pub fn start_with_interval(
        &mut self,
        key: EntryKey,
        now: OffsetDateTime,
        interval: Duration,
    ) -> OffsetDateTime {
        let state = CooldownState::scheduled(now, interval);
        self.entries.insert(key, state);
        now + interval
    }

    /// Restarts the interval for a tracked entry. Sleep is left as is.
    pub fn complete(
        &mut self,
        key: EntryKey,
        now: OffsetDateTime,
    ) -> Result<OffsetDateTime, CooldownError> {
        let state = self
            .entries
            .get_mut(&key)
            .ok_or(CooldownError::NotTracking)?;
        let next = now + PARTY_INTERVAL;
        state.next_due_at = Some(next);
        state.scheduled_at = now;
        Ok(next)
    }

    pub fn sleep(
        &mut self,
        key: EntryKey,
        now: OffsetDateTime,
        request: SleepRequest,
    ) -> Result<SleepOutcome, CooldownError> {
        let state = self
            .entries
            .get_mut(&key)
            .ok_or(CooldownError::NotTracking)?;
        let wake_at = request.wake_at(now)?;
        state.sleep_until = Some(wake_at);
        Ok(SleepOutcome {
            wake_at,
            duration: wake_at - now,
        })
    }

    /// Entries that are past due and not sleeping, in key order.
    pub fn query_due(&self, as_of: OffsetDateTime) -> Vec<EntryKey> {
        self.entries
            .iter()
            .filter(|(_, state)| state.is_due(as_of))
            .map(|(key, _)| *key)
            .collect()
    }

    /// Clears sleep windows that ended at or before `as_of`.
    pub fn wake_elapsed(&mut self, as_of: OffsetDateTime) -> Vec<EntryKey> {
        let mut woken = Vec::new();
        for (key, state) in self.entries.iter_mut() {
            if state.sleep_until.is_some_and(|until| until <= as_of) {
                state.sleep_until = None;
                woken.push(*key);
            }
        }
        woken
    }

    /// Advances a fired entry by one interval, unless it was completed or put
    /// to sleep since the due snapshot was taken.
    pub fn reschedule_if_due(
        &mut self,
        key: EntryKey,
        now: OffsetDateTime,
    ) -> Option<OffsetDateTime> {
        let state = self.entries.get_mut(&key)?;
        if !state.is_due(now) {
            return None;
        }
        let next = now + PARTY_INTERVAL;
        state.next_due_at = Some(next);
        state.scheduled_at = now;
        Some(next)
    }

    pub fn get(&self, key: EntryKey) -> Option<CooldownState> {
        self.entries.get(&key).copied()
    }

    pub fn status(&self, key: EntryKey, now: OffsetDateTime) -> EntryStatus {
        match self.entries.get(&key) {
            None => EntryStatus::Inactive,
            Some(state) => match state.sleep_until {
                Some(until) if until > now => EntryStatus::Sleeping {
                    until,
                    remaining: until - now,
                },
                _ => EntryStatus::Active {
                    next_due_at: state.next_due_at,
                },
            },
        }
    }

    pub fn snapshot(&self, now: OffsetDateTime) -> Vec<EntrySnapshot> {
        self.entries
            .iter()
            .map(|(key, state)| EntrySnapshot {
                key: *key,
                state: *state,
                label: self.status(*key, now).to_string(),
                is_test: state.is_test(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
