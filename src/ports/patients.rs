//! Patient registry port: Trait for patient record storage.
//!
//! This trait abstracts the registry backend (in-memory or SQLite) from the
//! application logic.

use crate::domain::{Mrn, Patient};

/// Trait for patient record storage.
pub trait PatientRegistry: Send + Sync {
    /// Error type for registry operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Patients registered under a phone, oldest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn list_by_phone(&self, phone: &str) -> Result<Vec<Patient>, Self::Error>;

    /// Store a new patient.
    ///
    /// # Errors
    /// Returns error if storage operation fails or the MRN is taken.
    fn insert(&self, patient: &Patient) -> Result<(), Self::Error>;

    /// Find a patient by MRN.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn find_by_mrn(&self, mrn: &Mrn) -> Result<Option<Patient>, Self::Error>;

    /// Check whether an MRN is already assigned.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn mrn_exists(&self, mrn: &Mrn) -> Result<bool, Self::Error> {
        Ok(self.find_by_mrn(mrn)?.is_some())
    }

    /// Total number of patients.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count(&self) -> Result<usize, Self::Error>;
}
