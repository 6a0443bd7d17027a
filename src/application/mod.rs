//! Application layer: Use cases and services.
//!
//! This module composes domain logic with ports to implement the booking
//! flow. `SchedulingEngine` is the single entry point; the component
//! services are exposed for callers that wire their own composition.

mod availability;
mod engine;
mod gate;
mod holds;
mod ledger;
mod patients;

pub use availability::DayStateAggregator;
pub use engine::SchedulingEngine;
pub use gate::VerificationGate;
pub use holds::HoldManager;
pub use ledger::BookingLedger;
pub use patients::PatientService;
