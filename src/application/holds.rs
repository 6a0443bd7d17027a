//! Hold manager: advisory, session-scoped slot holds.
//!
//! Each session has at most one hold. Expiry is checked lazily whenever a
//! hold is read, and every `acquire_hold` sweeps expired holds left behind
//! by abandoned sessions. Holds never touch the booking ledger.

use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;

use crate::config::HoldConfig;
use crate::domain::{Hold, SessionId, SlotKey};
use crate::ports::Clock;

pub struct HoldManager {
    config: HoldConfig,
    clock: Arc<dyn Clock>,
    holds: DashMap<SessionId, Hold>,
}

impl HoldManager {
    #[must_use]
    pub fn new(config: HoldConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            holds: DashMap::new(),
        }
    }

    /// Hold `key` for `session`, replacing the session's previous hold.
    pub fn acquire_hold(&self, key: SlotKey, session: SessionId) -> Hold {
        self.sweep_expired();
        let hold = Hold::new(session.clone(), key, self.clock.now(), self.config.ttl());
        if let Some(previous) = self.holds.insert(session, hold.clone()) {
            tracing::debug!("Session {} moved hold off {}", hold.session_id, previous.key);
        }
        tracing::debug!("Session {} holds {} until {}", hold.session_id, hold.key, hold.expires_at);
        hold
    }

    /// The session's live hold. An expired hold is dropped and reported as `None`.
    #[must_use]
    pub fn current_hold(&self, session: &SessionId) -> Option<Hold> {
        let now = self.clock.now();
        if self.holds.remove_if(session, |_, h| h.is_expired(now)).is_some() {
            tracing::debug!("Hold for session {} expired", session);
        }
        self.holds.get(session).map(|h| h.value().clone())
    }

    /// Countdown of the session's live hold.
    #[must_use]
    pub fn remaining(&self, session: &SessionId) -> Option<Duration> {
        let now = self.clock.now();
        self.current_hold(session).map(|h| h.remaining(now))
    }

    pub fn release_hold(&self, session: &SessionId) -> Option<Hold> {
        self.holds.remove(session).map(|(_, hold)| hold)
    }

    /// Drop all expired holds. Returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut dropped = 0;
        self.holds.retain(|_, hold| {
            let live = !hold.is_expired(now);
            if !live {
                dropped += 1;
            }
            live
        });
        if dropped > 0 {
            tracing::debug!("Swept {} expired holds", dropped);
        }
        dropped
    }

    /// Number of live holds on a key, across sessions.
    #[must_use]
    pub fn holds_for(&self, key: &SlotKey) -> usize {
        let now = self.clock.now();
        self.holds
            .iter()
            .filter(|entry| &entry.value().key == key && !entry.value().is_expired(now))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ManualClock;
    use chrono::{NaiveDate, NaiveTime, Utc};

    fn key(h: u32) -> SlotKey {
        SlotKey::new(
            "d1",
            NaiveDate::from_ymd_opt(2025, 1, 6).expect("Valid date"),
            NaiveTime::from_hms_opt(h, 0, 0).expect("Valid time"),
        )
    }

    fn manager() -> (HoldManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (HoldManager::new(HoldConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn test_acquire_replaces_previous() {
        let (holds, _) = manager();
        let session = SessionId::from("s1");

        holds.acquire_hold(key(10), session.clone());
        holds.acquire_hold(key(11), session.clone());

        let current = holds.current_hold(&session).expect("Should hold");
        assert_eq!(current.key, key(11));
        assert_eq!(holds.holds_for(&key(10)), 0);
    }

    #[test]
    fn test_two_sessions_may_hold_same_key() {
        let (holds, _) = manager();
        holds.acquire_hold(key(10), SessionId::from("s1"));
        holds.acquire_hold(key(10), SessionId::from("s2"));

        assert_eq!(holds.holds_for(&key(10)), 2);
    }

    #[test]
    fn test_lazy_expiry() {
        let (holds, clock) = manager();
        let session = SessionId::from("s1");
        holds.acquire_hold(key(10), session.clone());

        clock.advance(Duration::minutes(3));
        assert_eq!(holds.remaining(&session), Some(Duration::minutes(2)));

        clock.advance(Duration::minutes(2));
        assert!(holds.current_hold(&session).is_some());

        clock.advance(Duration::seconds(1));
        assert!(holds.current_hold(&session).is_none());
        assert!(holds.remaining(&session).is_none());
    }

    #[test]
    fn test_release_and_sweep() {
        let (holds, clock) = manager();
        holds.acquire_hold(key(10), SessionId::from("s1"));
        holds.acquire_hold(key(11), SessionId::from("s2"));

        assert!(holds.release_hold(&SessionId::from("s1")).is_some());
        assert!(holds.release_hold(&SessionId::from("s1")).is_none());

        clock.advance(Duration::minutes(4));
        holds.acquire_hold(key(12), SessionId::from("s3"));
        clock.advance(Duration::minutes(2));

        assert_eq!(holds.sweep_expired(), 1);
        assert!(holds.current_hold(&SessionId::from("s3")).is_some());
    }

    #[test]
    fn test_acquire_drops_abandoned_holds() {
        let (holds, clock) = manager();
        for i in 0..10 {
            holds.acquire_hold(key(10), SessionId::from(format!("gone-{i}").as_str()));
        }
        assert_eq!(holds.holds_for(&key(10)), 10);

        clock.advance(Duration::minutes(6));
        holds.acquire_hold(key(11), SessionId::from("fresh"));

        // Nothing left for a timer to collect.
        assert_eq!(holds.sweep_expired(), 0);
        assert!(holds.current_hold(&SessionId::from("gone-0")).is_none());
        assert!(holds.current_hold(&SessionId::from("fresh")).is_some());
    }
}
