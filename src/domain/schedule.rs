//! Schedule catalog types: doctors, departments and per-day slot templates.
//!
//! These values are owned by the external schedule catalog and are
//! immutable from the engine's point of view.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Identifier of a doctor in the schedule catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoctorId(String);

impl DoctorId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DoctorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DoctorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DoctorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A clinical department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
}

impl Department {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A doctor with department memberships and weekly closures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,

    /// Display name (e.g. "Dr. A. Sharma")
    pub name: String,

    /// Department ids this doctor belongs to (many-to-many)
    pub departments: Vec<String>,

    /// Weekdays on which the doctor never works
    pub closed_weekdays: Vec<Weekday>,
}

impl Doctor {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DoctorId::new(id),
            name: name.into(),
            departments: Vec::new(),
            closed_weekdays: Vec::new(),
        }
    }

    #[must_use]
    pub fn in_departments(mut self, departments: &[&str]) -> Self {
        self.departments = departments.iter().map(|d| (*d).to_string()).collect();
        self
    }

    #[must_use]
    pub fn closed_on(mut self, weekdays: &[Weekday]) -> Self {
        self.closed_weekdays = weekdays.to_vec();
        self
    }

    /// Whether the doctor works on the given calendar date.
    #[must_use]
    pub fn works_on(&self, date: NaiveDate) -> bool {
        !self.closed_weekdays.contains(&date.weekday())
    }

    #[must_use]
    pub fn belongs_to(&self, department_id: &str) -> bool {
        self.departments.iter().any(|d| d == department_id)
    }
}

/// Baseline capacity of a slot, fixed when the schedule is generated.
///
/// This is an external scarcity signal from the system of record and is
/// independent of bookings made through the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineCapacity {
    /// Plenty of capacity
    Plenty,
    /// Few places left upstream
    Scarce,
    /// Pre-filled upstream; never bookable here
    Exhausted,
}

impl BaselineCapacity {
    #[must_use]
    pub fn is_exhausted(self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// Unique key of a bookable slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl SlotKey {
    #[must_use]
    pub fn new(doctor_id: impl Into<DoctorId>, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            date,
            time,
        }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.doctor_id,
            self.date.format("%Y-%m-%d"),
            self.time.format("%H:%M")
        )
    }
}

/// One entry of a doctor's day template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub baseline: BaselineCapacity,
}

impl ScheduleSlot {
    #[must_use]
    pub fn key(&self) -> SlotKey {
        SlotKey {
            doctor_id: self.doctor_id.clone(),
            date: self.date,
            time: self.time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("Valid date")
    }

    #[test]
    fn test_doctor_closures() {
        let doctor = Doctor::new("d1", "Dr. A. Sharma").closed_on(&[Weekday::Wed]);

        // 2025-01-01 was a Wednesday
        assert!(!doctor.works_on(date(2025, 1, 1)));
        assert!(doctor.works_on(date(2025, 1, 2)));
    }

    #[test]
    fn test_department_membership() {
        let doctor = Doctor::new("d1", "Dr. A. Sharma").in_departments(&["card", "gm"]);
        assert!(doctor.belongs_to("gm"));
        assert!(!doctor.belongs_to("ent"));
    }

    #[test]
    fn test_slot_key_display() {
        let key = SlotKey::new(
            "d2",
            date(2025, 3, 4),
            NaiveTime::from_hms_opt(10, 20, 0).expect("Valid time"),
        );
        assert_eq!(key.to_string(), "d2|2025-03-04|10:20");
    }
}
