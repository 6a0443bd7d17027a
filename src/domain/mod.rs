//! Domain layer: Core scheduling types.
//!
//! Pure value types with validation. No locking or I/O happens here.

mod availability;
mod booking;
mod hold;
mod ids;
mod patient;
mod schedule;
mod verification;

pub use availability::{CalendarDay, DayState, SlotLabel, SlotView};
pub use booking::{Alternative, Booking};
pub use hold::{Hold, SessionId};
pub use patient::{
    normalize_phone, Gender, Mrn, MrnError, Patient, PatientProfile, FALLBACK_MRN,
};
pub use schedule::{BaselineCapacity, Department, Doctor, DoctorId, ScheduleSlot, SlotKey};
pub use verification::{Challenge, TransactionId, VerificationSession, VerificationState};
