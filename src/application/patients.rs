//! Patient service: lookup by verified phone and registration with MRN assignment.

use std::sync::Arc;

use crate::adapters::StorageError;
use crate::domain::{normalize_phone, Mrn, Patient, PatientProfile};
use crate::ports::PatientRegistry;
use crate::{Result, SlotguardError};

/// Candidates tried before falling back to the reserved MRN.
const MRN_ATTEMPTS: usize = 8;

pub struct PatientService<R>
where
    R: PatientRegistry,
{
    registry: Arc<R>,
}

impl<R> PatientService<R>
where
    R: PatientRegistry,
    R::Error: Into<StorageError>,
{
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// Patients registered under a phone, oldest first.
    ///
    /// # Errors
    /// Returns error if the registry cannot be read.
    pub fn list_patients(&self, phone: &str) -> Result<Vec<Patient>> {
        let phone = normalize_phone(phone);
        let patients = self
            .registry
            .list_by_phone(&phone)
            .map_err(|e| SlotguardError::Storage(e.into()))?;
        tracing::debug!("Found {} patients for {}", patients.len(), phone);
        Ok(patients)
    }

    /// Register a new patient with a freshly assigned MRN.
    ///
    /// # Errors
    /// - `MissingRequiredFields` if the profile is incomplete
    /// - `Storage` if the registry rejects the record
    pub fn create_patient(&self, mut profile: PatientProfile) -> Result<Patient> {
        profile.phone = normalize_phone(&profile.phone);
        let missing = profile.missing_fields();
        if !missing.is_empty() {
            return Err(SlotguardError::MissingRequiredFields(missing));
        }

        let mrn = self.assign_mrn()?;
        let patient =
            Patient::from_profile(mrn, profile).map_err(SlotguardError::MissingRequiredFields)?;
        self.registry
            .insert(&patient)
            .map_err(|e| SlotguardError::Storage(e.into()))?;

        tracing::info!("Registered patient {} with MRN {}", patient.id, patient.mrn);
        Ok(patient)
    }

    /// # Errors
    /// Returns error if the registry cannot be read.
    pub fn find_by_mrn(&self, mrn: &Mrn) -> Result<Option<Patient>> {
        self.registry
            .find_by_mrn(mrn)
            .map_err(|e| SlotguardError::Storage(e.into()))
    }

    fn assign_mrn(&self) -> Result<Mrn> {
        self.assign_mrn_with(Mrn::candidate)
    }

    /// Draw candidates until one validates and is unused; otherwise fall back.
    fn assign_mrn_with(&self, mut generate: impl FnMut() -> String) -> Result<Mrn> {
        for attempt in 1..=MRN_ATTEMPTS {
            let candidate = generate();
            match Mrn::parse(&candidate) {
                Ok(mrn) => {
                    let taken = self
                        .registry
                        .mrn_exists(&mrn)
                        .map_err(|e| SlotguardError::Storage(e.into()))?;
                    if !taken {
                        return Ok(mrn);
                    }
                    tracing::debug!("MRN candidate collided (attempt {})", attempt);
                }
                Err(e) => tracing::warn!("Generated MRN rejected (attempt {}): {}", attempt, e),
            }
        }

        tracing::warn!(
            "No usable MRN after {} attempts, using fallback",
            MRN_ATTEMPTS
        );
        Ok(Mrn::fallback())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::SAMPLE_FAMILY_PHONE;
    use crate::adapters::{InMemoryPatientRegistry, SqlitePatientRegistry};
    use crate::domain::{Gender, FALLBACK_MRN};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn profile(first: &str) -> PatientProfile {
        PatientProfile {
            first_name: first.to_string(),
            last_name: "Rao".to_string(),
            phone: "+911234567890".to_string(),
            dob: NaiveDate::from_ymd_opt(1988, 7, 14),
            gender: Some(Gender::Female),
            email: Some("asha@example.com".to_string()),
        }
    }

    fn service() -> PatientService<InMemoryPatientRegistry> {
        PatientService::new(Arc::new(InMemoryPatientRegistry::with_samples()))
    }

    #[test]
    fn test_list_samples() {
        let service = service();
        let family = service.list_patients(SAMPLE_FAMILY_PHONE).expect("Should list");
        assert_eq!(family.len(), 2);
        assert!(service.list_patients("+910000000000").expect("Should list").is_empty());
    }

    #[test]
    fn test_create_patient_lists_under_phone() {
        let service = service();
        let patient = service.create_patient(profile("Asha")).expect("Should create");

        assert!(patient.id.starts_with('p'));
        let listed = service.list_patients("+911234567890").expect("Should list");
        assert_eq!(listed, vec![patient.clone()]);
        assert_eq!(
            service.find_by_mrn(&patient.mrn).expect("Should query"),
            Some(patient)
        );
    }

    #[test]
    fn test_phone_formatting_ignored() {
        let service = service();
        let mut p = profile("Asha");
        p.phone = "+91 12345-67890".to_string();
        let patient = service.create_patient(p).expect("Should create");

        assert_eq!(patient.phone, "+911234567890");
        assert_eq!(
            service.list_patients(" +91 1234567890").expect("Should list"),
            vec![patient]
        );
        assert_eq!(
            service.list_patients("+91 98765 43210").expect("Should list").len(),
            2
        );
    }

    #[test]
    fn test_missing_fields_reported() {
        let incomplete = PatientProfile {
            first_name: "Asha".to_string(),
            phone: "+911234567890".to_string(),
            ..PatientProfile::default()
        };

        match service().create_patient(incomplete) {
            Err(SlotguardError::MissingRequiredFields(fields)) => {
                assert_eq!(fields, vec!["last_name", "dob", "gender"]);
            }
            other => panic!("Expected MissingRequiredFields, got {other:?}"),
        }
    }

    #[test]
    fn test_email_optional() {
        let mut p = profile("Asha");
        p.email = None;
        let patient = service().create_patient(p).expect("Should create");
        assert!(patient.email.is_none());
    }

    #[test]
    fn test_malformed_candidates_fall_back() {
        let service = service();
        let mrn = service
            .assign_mrn_with(|| "0123".to_string())
            .expect("Should fall back");
        assert_eq!(mrn.as_str(), FALLBACK_MRN);
    }

    #[test]
    fn test_collisions_retry_then_fall_back() {
        let service = service();

        // First candidate collides with a sample patient, second is free.
        let mut candidates = vec!["1000000789", "1000000123"];
        let mrn = service
            .assign_mrn_with(|| candidates.pop().unwrap_or("x").to_string())
            .expect("Should assign");
        assert_eq!(mrn.as_str(), "1000000789");

        let mrn = service
            .assign_mrn_with(|| "1000000456".to_string())
            .expect("Should fall back");
        assert_eq!(mrn.as_str(), FALLBACK_MRN);
    }

    #[test]
    fn test_sqlite_backed_service() {
        let registry = SqlitePatientRegistry::in_memory().expect("Should create db");
        let service = PatientService::new(Arc::new(registry));

        let patient = service.create_patient(profile("Asha")).expect("Should create");
        let listed = service.list_patients(" +911234567890 ").expect("Should list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].mrn, patient.mrn);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_created_mrn_is_well_formed(first in "[A-Za-z]{1,12}") {
            let patient = service().create_patient(profile(&first)).expect("Should create");
            let mrn = patient.mrn.as_str();
            prop_assert_eq!(mrn.len(), 10);
            prop_assert!(mrn.starts_with('1'));
            prop_assert!(mrn.bytes().all(|b| b.is_ascii_digit()));
        }
    }
}
