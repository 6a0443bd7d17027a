//! Committed bookings and conflict alternatives.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids;
use super::schedule::SlotKey;

/// The unique confirmed reservation for a slot key.
///
/// Created only by a successful ledger commit and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Appointment identifier (`A` + 7 digits)
    pub appointment_id: String,

    pub key: SlotKey,

    /// Reference to the patient (internal id or MRN)
    pub patient_ref: String,

    /// Contact phone used during verification
    pub phone: String,

    pub created_at: DateTime<Utc>,
}

impl Booking {
    #[must_use]
    pub fn new(
        appointment_id: impl Into<String>,
        key: SlotKey,
        patient_ref: impl Into<String>,
        phone: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            appointment_id: appointment_id.into(),
            key,
            patient_ref: patient_ref.into(),
            phone: phone.into(),
            created_at,
        }
    }

    /// A random appointment id candidate. Uniqueness is the ledger's job.
    #[must_use]
    pub fn candidate_id() -> String {
        ids::appointment_id()
    }
}

/// A nearby free slot suggested after a lost commit.
///
/// Informational only: nothing is reserved on the caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl std::fmt::Display for Alternative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.date.format("%Y-%m-%d"), self.time.format("%H:%M"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_creation() {
        let key = SlotKey::new(
            "d1",
            NaiveDate::from_ymd_opt(2025, 1, 2).expect("Valid date"),
            NaiveTime::from_hms_opt(10, 0, 0).expect("Valid time"),
        );
        let booking = Booking::new(
            Booking::candidate_id(),
            key.clone(),
            "p1",
            "+919876543210",
            Utc::now(),
        );

        assert_eq!(booking.key, key);
        assert!(booking.appointment_id.starts_with('A'));
        assert_eq!(booking.appointment_id.len(), 8);
        assert_eq!(booking.patient_ref, "p1");
    }

    #[test]
    fn test_alternative_display() {
        let alt = Alternative {
            date: NaiveDate::from_ymd_opt(2025, 1, 2).expect("Valid date"),
            time: NaiveTime::from_hms_opt(11, 40, 0).expect("Valid time"),
        };
        assert_eq!(alt.to_string(), "2025-01-02 11:40");
    }
}
