//! Schedule catalog port: Read-only access to doctors and day templates.
//!
//! The catalog is owned by an external system of record. The engine only
//! reads from it.

use chrono::NaiveDate;

use crate::domain::{Department, Doctor, DoctorId, ScheduleSlot, SlotKey};

/// Trait for schedule catalog lookups.
pub trait ScheduleCatalog: Send + Sync {
    /// Look up a doctor by id.
    fn doctor(&self, id: &DoctorId) -> Option<Doctor>;

    /// All doctors, in catalog order.
    fn doctors(&self) -> Vec<Doctor>;

    /// All departments, in catalog order.
    fn departments(&self) -> Vec<Department>;

    /// Slot template for one doctor on one day, in template order.
    ///
    /// # Returns
    /// `None` if the doctor does not work that day (no template exists).
    fn day_template(&self, doctor: &DoctorId, date: NaiveDate) -> Option<Vec<ScheduleSlot>>;

    /// Doctors belonging to a department.
    fn doctors_in_department(&self, department_id: &str) -> Vec<Doctor> {
        self.doctors()
            .into_iter()
            .filter(|d| d.belongs_to(department_id))
            .collect()
    }

    /// Template entry for a single slot key.
    fn slot(&self, key: &SlotKey) -> Option<ScheduleSlot> {
        self.day_template(&key.doctor_id, key.date)?
            .into_iter()
            .find(|s| s.time == key.time)
    }
}
