//! Day-state aggregator: availability labels for calendars and time pickers.
//!
//! Every answer is computed from the catalog and the ledger at call time.
//! Nothing is cached, so a commit is visible to the next query.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::config::AvailabilityConfig;
use crate::domain::{BaselineCapacity, CalendarDay, DayState, DoctorId, SlotLabel, SlotView};
use crate::ports::ScheduleCatalog;
use crate::{Result, SlotguardError};

use super::ledger::BookingLedger;

pub struct DayStateAggregator {
    catalog: Arc<dyn ScheduleCatalog>,
    ledger: Arc<BookingLedger>,
    config: AvailabilityConfig,
}

impl DayStateAggregator {
    #[must_use]
    pub fn new(
        config: AvailabilityConfig,
        catalog: Arc<dyn ScheduleCatalog>,
        ledger: Arc<BookingLedger>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            config,
        }
    }

    /// Coarse state of one doctor-day.
    ///
    /// Days without a template are `NotAvailable` whatever the ledger holds.
    #[must_use]
    pub fn day_state(&self, doctor: &DoctorId, date: NaiveDate) -> DayState {
        let Some(template) = self.catalog.day_template(doctor, date) else {
            return DayState::NotAvailable;
        };

        let unbooked = template
            .iter()
            .filter(|slot| !slot.baseline.is_exhausted() && !self.ledger.is_committed(&slot.key()))
            .count();

        DayState::from_unbooked(unbooked, self.config.few_left_threshold)
    }

    /// Slots of one doctor-day in template order. Empty when there is no template.
    #[must_use]
    pub fn day_slots(&self, doctor: &DoctorId, date: NaiveDate) -> Vec<SlotView> {
        self.catalog
            .day_template(doctor, date)
            .unwrap_or_default()
            .into_iter()
            .map(|slot| {
                let bookable =
                    !slot.baseline.is_exhausted() && !self.ledger.is_committed(&slot.key());
                let label = if !bookable {
                    SlotLabel::Full
                } else if slot.baseline == BaselineCapacity::Scarce {
                    SlotLabel::FewLeft
                } else {
                    SlotLabel::Available
                };
                SlotView {
                    time: slot.time,
                    bookable,
                    label,
                }
            })
            .collect()
    }

    /// Day states for every day of a calendar month.
    ///
    /// Each day reads the ledger live; the view is not a cross-day snapshot.
    ///
    /// # Errors
    /// Returns `Validation` if `year`/`month` do not name a calendar month.
    pub fn month_view(&self, doctor: &DoctorId, year: i32, month: u32) -> Result<Vec<CalendarDay>> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| SlotguardError::Validation(format!("invalid month {year}-{month:02}")))?;

        let days: Vec<CalendarDay> = first
            .iter_days()
            .take_while(|date| date.month() == month)
            .map(|date| CalendarDay {
                date,
                state: self.day_state(doctor, date),
            })
            .collect();

        tracing::debug!("Rendered {} days of {}-{:02} for {}", days.len(), year, month, doctor);
        Ok(days)
    }
}
