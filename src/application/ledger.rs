//! Booking ledger: the authoritative record of confirmed bookings.
//!
//! Commits on the same slot key are serialized by that key's lock; commits
//! on different keys proceed independently. A commit either inserts exactly
//! one booking or leaves the ledger untouched. Appointment ids are unique
//! across the ledger.

use std::sync::Arc;

use chrono::Days;
use dashmap::DashSet;

use crate::adapters::KeyedLocks;
use crate::config::LedgerConfig;
use crate::domain::{Alternative, Booking, SlotKey};
use crate::ports::{Clock, ScheduleCatalog};
use crate::{Result, SlotguardError};

pub struct BookingLedger {
    catalog: Arc<dyn ScheduleCatalog>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    slots: KeyedLocks<SlotKey, Option<Booking>>,
    appointment_ids: DashSet<String>,
}

impl BookingLedger {
    #[must_use]
    pub fn new(config: LedgerConfig, catalog: Arc<dyn ScheduleCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            clock,
            config,
            slots: KeyedLocks::new(),
            appointment_ids: DashSet::new(),
        }
    }

    /// Confirm a booking for a slot.
    ///
    /// # Errors
    /// - `SlotUnavailable` if the key is not in the catalog or its baseline
    ///   is exhausted
    /// - `SlotConflict` if the key already has a booking
    ///
    /// Both carry nearby free alternatives.
    pub fn commit(&self, key: &SlotKey, patient_ref: &str, phone: &str) -> Result<Booking> {
        let open = self
            .catalog
            .slot(key)
            .is_some_and(|slot| !slot.baseline.is_exhausted());
        if !open {
            let alternatives = self.alternatives(key);
            tracing::warn!("Commit rejected for {}: slot not open for booking", key);
            return Err(SlotguardError::SlotUnavailable { alternatives });
        }

        let now = self.clock.now();
        let committed = self.slots.with(key, |entry| {
            if entry.is_some() {
                return None;
            }
            let id = self.unique_appointment_id();
            let booking = Booking::new(id, key.clone(), patient_ref, phone, now);
            *entry = Some(booking.clone());
            Some(booking)
        });

        match committed {
            Some(booking) => {
                tracing::info!(
                    "Committed appointment {} for {}",
                    booking.appointment_id,
                    key
                );
                Ok(booking)
            }
            None => {
                // Computed after the key lock is released.
                let alternatives = self.alternatives(key);
                tracing::warn!(
                    "Commit conflict on {}: {} alternatives",
                    key,
                    alternatives.len()
                );
                Err(SlotguardError::SlotConflict { alternatives })
            }
        }
    }

    fn unique_appointment_id(&self) -> String {
        self.unique_appointment_id_with(Booking::candidate_id)
    }

    /// Draw ids until one has not been issued by this ledger.
    fn unique_appointment_id_with(&self, mut generate: impl FnMut() -> String) -> String {
        loop {
            let id = generate();
            if self.appointment_ids.insert(id.clone()) {
                return id;
            }
            tracing::debug!("Appointment id {} already issued, drawing again", id);
        }
    }

    /// Free slots near `key` for the same doctor.
    ///
    /// Scans the requested day (skipping the requested time), then the
    /// following days up to `lookahead_days`, in template order. Exhausted
    /// and committed slots are skipped. At most `max_alternatives` results.
    #[must_use]
    pub fn alternatives(&self, key: &SlotKey) -> Vec<Alternative> {
        let mut found = Vec::with_capacity(self.config.max_alternatives);
        if self.config.max_alternatives == 0 {
            return found;
        }

        for offset in 0..=u64::from(self.config.lookahead_days) {
            let Some(date) = key.date.checked_add_days(Days::new(offset)) else {
                break;
            };
            let Some(template) = self.catalog.day_template(&key.doctor_id, date) else {
                continue;
            };

            for slot in template {
                if offset == 0 && slot.time == key.time {
                    continue;
                }
                if slot.baseline.is_exhausted() || self.is_committed(&slot.key()) {
                    continue;
                }
                found.push(Alternative {
                    date: slot.date,
                    time: slot.time,
                });
                if found.len() >= self.config.max_alternatives {
                    return found;
                }
            }
        }

        found
    }

    /// The booking for a key, if committed.
    #[must_use]
    pub fn booking(&self, key: &SlotKey) -> Option<Booking> {
        self.slots.peek(key, Clone::clone).flatten()
    }

    #[must_use]
    pub fn is_committed(&self, key: &SlotKey) -> bool {
        self.slots.peek(key, Option::is_some).unwrap_or(false)
    }

    /// Number of committed bookings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.count_where(Option::is_some)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryCatalog, ManualClock};
    use crate::domain::{BaselineCapacity, DoctorId};
    use chrono::{NaiveDate, NaiveTime, Utc};
    use std::sync::Barrier;
    use std::thread;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).expect("Valid date")
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("Valid time")
    }

    /// One doctor with a single working day of `n` plenty slots, every 20 minutes from 10:00.
    fn ledger_with_day(n: u32) -> BookingLedger {
        let d = DoctorId::from("d1");
        let slots: Vec<(NaiveTime, BaselineCapacity)> = (0..n)
            .map(|i| (at(10 + (i * 20) / 60, (i * 20) % 60), BaselineCapacity::Plenty))
            .collect();
        let mut catalog = InMemoryCatalog::new();
        catalog.set_day(&d, day(), &slots);
        BookingLedger::new(
            LedgerConfig::default(),
            Arc::new(catalog),
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    fn key(h: u32, m: u32) -> SlotKey {
        SlotKey::new("d1", day(), at(h, m))
    }

    #[test]
    fn test_commit_then_conflict() {
        let ledger = ledger_with_day(6);

        let booking = ledger.commit(&key(10, 0), "p1", "+911111111111").expect("Should commit");
        assert_eq!(booking.key, key(10, 0));
        assert!(ledger.is_committed(&key(10, 0)));
        assert_eq!(ledger.booking(&key(10, 0)), Some(booking.clone()));

        let err = ledger
            .commit(&key(10, 0), "p2", "+912222222222")
            .expect_err("Second commit should lose");
        assert!(matches!(err, SlotguardError::SlotConflict { .. }));

        // The winner is untouched.
        assert_eq!(ledger.booking(&key(10, 0)), Some(booking));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_conflict_with_five_free_offers_three() {
        // Six slots: one taken by the winner, five free.
        let ledger = ledger_with_day(6);
        ledger.commit(&key(10, 40), "p1", "+911111111111").expect("Should commit");

        let err = ledger
            .commit(&key(10, 40), "p2", "+912222222222")
            .expect_err("Should conflict");
        let alternatives = err.alternatives();

        assert_eq!(alternatives.len(), 3);
        assert!(alternatives.iter().all(|a| a.time != at(10, 40)));
        assert_eq!(alternatives[0].time, at(10, 0));
        assert_eq!(alternatives[1].time, at(10, 20));
        assert_eq!(alternatives[2].time, at(11, 0));
    }

    #[test]
    fn test_alternatives_skip_committed_and_cap_at_free_count() {
        let ledger = ledger_with_day(3);
        ledger.commit(&key(10, 0), "p1", "+911111111111").expect("Should commit");
        ledger.commit(&key(10, 20), "p2", "+912222222222").expect("Should commit");

        let err = ledger
            .commit(&key(10, 0), "p3", "+913333333333")
            .expect_err("Should conflict");
        assert_eq!(
            err.alternatives(),
            &[Alternative {
                date: day(),
                time: at(10, 40)
            }]
        );
    }

    #[test]
    fn test_alternatives_look_ahead() {
        let mut catalog = InMemoryCatalog::new();
        let d = DoctorId::from("d1");
        catalog.set_day(&d, day(), &[(at(10, 0), BaselineCapacity::Plenty)]);
        catalog.set_day(
            &d,
            day() + Days::new(2),
            &[
                (at(10, 0), BaselineCapacity::Exhausted),
                (at(10, 20), BaselineCapacity::Scarce),
            ],
        );
        catalog.set_day(&d, day() + Days::new(7), &[(at(10, 0), BaselineCapacity::Plenty)]);
        let ledger = BookingLedger::new(
            LedgerConfig::default(),
            Arc::new(catalog),
            Arc::new(ManualClock::new(Utc::now())),
        );

        ledger.commit(&key(10, 0), "p1", "+911111111111").expect("Should commit");
        let err = ledger
            .commit(&key(10, 0), "p2", "+912222222222")
            .expect_err("Should conflict");

        // Day +7 is beyond the six-day lookahead.
        assert_eq!(
            err.alternatives(),
            &[Alternative {
                date: day() + Days::new(2),
                time: at(10, 20)
            }]
        );
    }

    #[test]
    fn test_unknown_or_exhausted_slot_unavailable() {
        let ledger = BookingLedger::new(
            LedgerConfig::default(),
            Arc::new(InMemoryCatalog::demo(day())),
            Arc::new(ManualClock::new(Utc::now())),
        );

        // Offset 0: first three slots exhausted upstream.
        let exhausted = ledger
            .commit(&key(10, 0), "p1", "+911111111111")
            .expect_err("Exhausted slot");
        match exhausted {
            SlotguardError::SlotUnavailable { alternatives } => {
                assert_eq!(alternatives.len(), 3);
                assert_eq!(alternatives[0].time, at(11, 0));
            }
            other => panic!("Expected SlotUnavailable, got {other:?}"),
        }

        let off_grid = ledger.commit(&key(10, 5), "p1", "+911111111111");
        assert!(matches!(off_grid, Err(SlotguardError::SlotUnavailable { .. })));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_concurrent_commits_single_winner() {
        let ledger = Arc::new(ledger_with_day(9));
        let barrier = Arc::new(Barrier::new(12));

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    ledger.commit(&key(11, 0), &format!("p{i}"), "+911111111111")
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("Thread should finish"))
            .collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, SlotguardError::SlotConflict { .. })));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_appointment_ids_never_repeat() {
        let ledger = ledger_with_day(3);
        let mut draws = ["A0000001", "A0000001", "A0000001", "A0000002"].into_iter();
        let mut next = || draws.next().unwrap_or("A9999999").to_string();

        assert_eq!(ledger.unique_appointment_id_with(&mut next), "A0000001");
        assert_eq!(ledger.unique_appointment_id_with(&mut next), "A0000002");

        let first = ledger.commit(&key(10, 0), "p1", "+911111111111").expect("Should commit");
        let second = ledger.commit(&key(10, 20), "p2", "+912222222222").expect("Should commit");
        assert_ne!(first.appointment_id, second.appointment_id);
        assert!(!["A0000001", "A0000002"].contains(&first.appointment_id.as_str()));
    }

    #[test]
    fn test_distinct_keys_commit_independently() {
        let ledger = Arc::new(ledger_with_day(9));
        let handles: Vec<_> = (0..9u32)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    let k = key(10 + (i * 20) / 60, (i * 20) % 60);
                    ledger.commit(&k, "p1", "+911111111111").is_ok()
                })
            })
            .collect();

        assert!(handles
            .into_iter()
            .all(|h| h.join().expect("Thread should finish")));
        assert_eq!(ledger.len(), 9);
    }
}
