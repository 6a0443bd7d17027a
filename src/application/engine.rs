//! Scheduling engine: the process-scoped state object.
//!
//! The engine is constructed once and owns every piece of mutable state
//! (send counters, verification sessions, holds, the booking ledger). All
//! operations are synchronous, bounded, and safe to call from any thread.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::adapters::{FixedCode, InMemoryCatalog, InMemoryPatientRegistry, StorageError, SystemClock};
use crate::config::EngineConfig;
use crate::domain::{
    Booking, CalendarDay, Challenge, DayState, Department, Doctor, DoctorId, Hold, Mrn, Patient,
    PatientProfile, SessionId, SlotKey, SlotView, TransactionId, VerificationState,
};
use crate::ports::{Clock, CodeSource, PatientRegistry, ScheduleCatalog};
use crate::{Result, SlotguardError};

use super::availability::DayStateAggregator;
use super::gate::VerificationGate;
use super::holds::HoldManager;
use super::ledger::BookingLedger;
use super::patients::PatientService;

pub struct SchedulingEngine<R = InMemoryPatientRegistry>
where
    R: PatientRegistry,
{
    config: EngineConfig,
    catalog: Arc<dyn ScheduleCatalog>,
    gate: VerificationGate,
    holds: HoldManager,
    ledger: Arc<BookingLedger>,
    availability: DayStateAggregator,
    patients: PatientService<R>,
}

impl SchedulingEngine<InMemoryPatientRegistry> {
    /// Engine over the demo catalog starting at `start`, the sample
    /// patients, the system clock and the fixed demo code.
    #[must_use]
    pub fn demo(config: EngineConfig, start: NaiveDate) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryCatalog::demo(start)),
            Arc::new(InMemoryPatientRegistry::with_samples()),
            Arc::new(SystemClock),
            Arc::new(FixedCode::default()),
        )
    }
}

impl<R> SchedulingEngine<R>
where
    R: PatientRegistry,
    R::Error: Into<StorageError>,
{
    #[must_use]
    pub fn new(
        config: EngineConfig,
        catalog: Arc<dyn ScheduleCatalog>,
        registry: Arc<R>,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn CodeSource>,
    ) -> Self {
        let ledger = Arc::new(BookingLedger::new(
            config.ledger.clone(),
            Arc::clone(&catalog),
            Arc::clone(&clock),
        ));

        tracing::info!(
            "Scheduling engine ready: {} doctors, max {} sends per phone, {}s holds",
            catalog.doctors().len(),
            config.gate.max_sends,
            config.holds.ttl_secs
        );

        Self {
            gate: VerificationGate::new(config.gate.clone(), codes, Arc::clone(&clock)),
            holds: HoldManager::new(config.holds.clone(), clock),
            availability: DayStateAggregator::new(
                config.availability.clone(),
                Arc::clone(&catalog),
                Arc::clone(&ledger),
            ),
            patients: PatientService::new(registry),
            ledger,
            catalog,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Catalog ---

    #[must_use]
    pub fn departments(&self) -> Vec<Department> {
        self.catalog.departments()
    }

    #[must_use]
    pub fn doctors(&self) -> Vec<Doctor> {
        self.catalog.doctors()
    }

    #[must_use]
    pub fn doctors_in_department(&self, department_id: &str) -> Vec<Doctor> {
        self.catalog.doctors_in_department(department_id)
    }

    #[must_use]
    pub fn doctor(&self, id: &DoctorId) -> Option<Doctor> {
        self.catalog.doctor(id)
    }

    // --- Verification ---

    /// # Errors
    /// `RateLimited` once the phone has used up its sends.
    pub fn request_challenge(&self, phone: &str) -> Result<Challenge> {
        self.gate.request_challenge(phone)
    }

    /// # Errors
    /// `IncorrectCode` or `UnknownTransaction`.
    pub fn verify_challenge(&self, transaction_id: &TransactionId, code: &str) -> Result<String> {
        self.gate.verify_challenge(transaction_id, code)
    }

    #[must_use]
    pub fn verification_state(&self, transaction_id: &TransactionId) -> VerificationState {
        self.gate.state(transaction_id)
    }

    #[must_use]
    pub fn is_verified(&self, transaction_id: &TransactionId) -> bool {
        self.gate.is_verified(transaction_id)
    }

    #[must_use]
    pub fn verified_phone(&self, transaction_id: &TransactionId) -> Option<String> {
        self.gate.verified_phone(transaction_id)
    }

    // --- Patients ---

    /// # Errors
    /// Storage failures only; an unknown phone yields an empty list.
    pub fn list_patients(&self, phone: &str) -> Result<Vec<Patient>> {
        self.patients.list_patients(phone)
    }

    /// Patients of the phone verified by `transaction_id`.
    ///
    /// # Errors
    /// `NotVerified` unless the transaction has passed verification.
    pub fn patients_for_transaction(&self, transaction_id: &TransactionId) -> Result<Vec<Patient>> {
        let phone = self
            .gate
            .verified_phone(transaction_id)
            .ok_or(SlotguardError::NotVerified)?;
        self.patients.list_patients(&phone)
    }

    /// # Errors
    /// `MissingRequiredFields` if the profile is incomplete.
    pub fn create_patient(&self, profile: PatientProfile) -> Result<Patient> {
        self.patients.create_patient(profile)
    }

    /// # Errors
    /// Storage failures only.
    pub fn find_patient(&self, mrn: &Mrn) -> Result<Option<Patient>> {
        self.patients.find_by_mrn(mrn)
    }

    // --- Availability ---

    #[must_use]
    pub fn day_state(&self, doctor: &DoctorId, date: NaiveDate) -> DayState {
        self.availability.day_state(doctor, date)
    }

    #[must_use]
    pub fn day_slots(&self, doctor: &DoctorId, date: NaiveDate) -> Vec<SlotView> {
        self.availability.day_slots(doctor, date)
    }

    /// # Errors
    /// `Validation` for an invalid month.
    pub fn month_view(&self, doctor: &DoctorId, year: i32, month: u32) -> Result<Vec<CalendarDay>> {
        self.availability.month_view(doctor, year, month)
    }

    // --- Holds ---

    pub fn acquire_hold(
        &self,
        doctor: &DoctorId,
        date: NaiveDate,
        time: NaiveTime,
        session: &SessionId,
    ) -> Hold {
        self.holds
            .acquire_hold(SlotKey::new(doctor.clone(), date, time), session.clone())
    }

    #[must_use]
    pub fn current_hold(&self, session: &SessionId) -> Option<Hold> {
        self.holds.current_hold(session)
    }

    #[must_use]
    pub fn hold_remaining(&self, session: &SessionId) -> Option<Duration> {
        self.holds.remaining(session)
    }

    pub fn release_hold(&self, session: &SessionId) -> Option<Hold> {
        self.holds.release_hold(session)
    }

    pub fn sweep_expired(&self) -> usize {
        self.holds.sweep_expired()
    }

    // --- Ledger ---

    /// Confirm a booking. The ledger's answer is final.
    ///
    /// # Errors
    /// `SlotConflict` or `SlotUnavailable`, each with alternatives.
    pub fn commit(
        &self,
        doctor: &DoctorId,
        date: NaiveDate,
        time: NaiveTime,
        patient_ref: &str,
        phone: &str,
    ) -> Result<Booking> {
        self.ledger
            .commit(&SlotKey::new(doctor.clone(), date, time), patient_ref, phone)
    }

    /// Commit on behalf of a session, releasing its hold on success.
    ///
    /// A failed commit leaves the hold in place so the client can pick an
    /// alternative.
    ///
    /// # Errors
    /// As [`Self::commit`].
    pub fn confirm(
        &self,
        session: &SessionId,
        doctor: &DoctorId,
        date: NaiveDate,
        time: NaiveTime,
        patient_ref: &str,
        phone: &str,
    ) -> Result<Booking> {
        let booking = self.commit(doctor, date, time, patient_ref, phone)?;
        self.holds.release_hold(session);
        Ok(booking)
    }

    #[must_use]
    pub fn booking(&self, key: &SlotKey) -> Option<Booking> {
        self.ledger.booking(key)
    }

    #[must_use]
    pub fn is_committed(&self, key: &SlotKey) -> bool {
        self.ledger.is_committed(key)
    }

    /// Number of confirmed bookings.
    #[must_use]
    pub fn bookings(&self) -> usize {
        self.ledger.len()
    }
}
