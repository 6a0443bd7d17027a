//! Verification gate: phone challenge/response with per-phone send limits.
//!
//! Send counts are process-wide and survive session resets. By default they
//! never reset; `GateConfig::send_window_secs` turns them into a rolling
//! allowance per window. With a window configured, verification sessions
//! older than one window are discarded as well.
//!
//! Phones are keyed in normalized form, so formatting variants of one number
//! share a single allowance.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::adapters::KeyedLocks;
use crate::config::GateConfig;
use crate::domain::{
    normalize_phone, Challenge, TransactionId, VerificationSession, VerificationState,
};
use crate::ports::{Clock, CodeSource};
use crate::{Result, SlotguardError};

/// Per-phone send counter.
#[derive(Debug, Default)]
struct SendCounter {
    count: u32,
    window_start: Option<DateTime<Utc>>,
}

impl SendCounter {
    /// Count one send and return the new total for the current window.
    fn record(&mut self, now: DateTime<Utc>, window: Option<Duration>) -> u32 {
        if let (Some(window), Some(start)) = (window, self.window_start) {
            if now - start >= window {
                self.count = 0;
                self.window_start = None;
            }
        }
        if self.window_start.is_none() {
            self.window_start = Some(now);
        }
        self.count = self.count.saturating_add(1);
        self.count
    }

    fn retry_after(&self, now: DateTime<Utc>, window: Option<Duration>) -> Option<std::time::Duration> {
        let (window, start) = (window?, self.window_start?);
        (start + window - now).to_std().ok()
    }
}

pub struct VerificationGate {
    config: GateConfig,
    codes: Arc<dyn CodeSource>,
    clock: Arc<dyn Clock>,
    send_counts: KeyedLocks<String, SendCounter>,
    sessions: DashMap<TransactionId, VerificationSession>,
}

impl VerificationGate {
    #[must_use]
    pub fn new(config: GateConfig, codes: Arc<dyn CodeSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            codes,
            clock,
            send_counts: KeyedLocks::new(),
            sessions: DashMap::new(),
        }
    }

    /// Issue a verification challenge to a phone.
    ///
    /// The send counter is incremented even when the request is rejected.
    ///
    /// # Errors
    /// - `Validation` if the phone is blank
    /// - `RateLimited` once the phone exceeds `max_sends`
    pub fn request_challenge(&self, phone: &str) -> Result<Challenge> {
        let phone = normalize_phone(phone);
        if phone.is_empty() {
            return Err(SlotguardError::Validation("phone is required".to_string()));
        }

        let now = self.clock.now();
        let window = self.config.send_window();
        self.prune_sessions(now);

        let (sends, retry_after) = self.send_counts.with(&phone, |counter| {
            let sends = counter.record(now, window);
            (sends, counter.retry_after(now, window))
        });

        if sends > self.config.max_sends {
            tracing::warn!(
                "Challenge refused for {}: {} sends exceeds limit of {}",
                phone,
                sends,
                self.config.max_sends
            );
            return Err(SlotguardError::RateLimited { retry_after });
        }

        let transaction_id = TransactionId::generate();
        let code = self.codes.issue(&phone, &transaction_id);
        let session =
            VerificationSession::challenge_sent(transaction_id.clone(), phone.as_str(), &code, now);
        self.sessions.insert(transaction_id.clone(), session);

        tracing::info!(
            "Challenge issued for {} (send {}/{})",
            phone,
            sends,
            self.config.max_sends
        );

        Ok(Challenge {
            transaction_id,
            cooldown: self.config.cooldown(),
        })
    }

    /// Check a submitted code for a transaction.
    ///
    /// Wrong codes may be retried without limit. Verifying an already
    /// verified transaction with the right code succeeds again.
    ///
    /// # Returns
    /// The verified phone.
    ///
    /// # Errors
    /// - `UnknownTransaction` if the transaction was never issued
    /// - `IncorrectCode` on mismatch
    pub fn verify_challenge(&self, transaction_id: &TransactionId, code: &str) -> Result<String> {
        let now = self.clock.now();
        let mut session = self
            .sessions
            .get_mut(transaction_id)
            .filter(|s| !self.is_stale(s, now))
            .ok_or(SlotguardError::UnknownTransaction)?;

        if !session.matches(code) {
            tracing::debug!("Incorrect verification code submitted");
            return Err(SlotguardError::IncorrectCode);
        }

        session.mark_verified();
        tracing::info!("Phone {} verified", session.phone);
        Ok(session.phone.clone())
    }

    /// State of a transaction; unknown and discarded transactions are `Unstarted`.
    #[must_use]
    pub fn state(&self, transaction_id: &TransactionId) -> VerificationState {
        let now = self.clock.now();
        self.sessions
            .get(transaction_id)
            .filter(|s| !self.is_stale(s, now))
            .map_or(VerificationState::Unstarted, |s| s.state)
    }

    #[must_use]
    pub fn is_verified(&self, transaction_id: &TransactionId) -> bool {
        self.state(transaction_id) == VerificationState::Verified
    }

    /// Phone of a verified transaction.
    #[must_use]
    pub fn verified_phone(&self, transaction_id: &TransactionId) -> Option<String> {
        let now = self.clock.now();
        self.sessions
            .get(transaction_id)
            .filter(|s| s.is_verified() && !self.is_stale(s, now))
            .map(|s| s.phone.clone())
    }

    /// Sends counted for a phone in its current window.
    #[must_use]
    pub fn sends_issued(&self, phone: &str) -> u32 {
        self.send_counts
            .peek(&normalize_phone(phone), |c| c.count)
            .unwrap_or(0)
    }

    /// Number of verification sessions currently retained.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn is_stale(&self, session: &VerificationSession, now: DateTime<Utc>) -> bool {
        self.config
            .send_window()
            .is_some_and(|window| now - session.issued_at >= window)
    }

    /// Drop sessions older than the send window. A no-op without a window.
    fn prune_sessions(&self, now: DateTime<Utc>) {
        if self.config.send_window().is_none() {
            return;
        }
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !self.is_stale(s, now));
        let dropped = before.saturating_sub(self.sessions.len());
        if dropped > 0 {
            tracing::debug!("Discarded {} stale verification sessions", dropped);
        }
    }
}
