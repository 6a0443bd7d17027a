//! In-memory patient registry.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::domain::{Gender, Mrn, Patient, PatientProfile};
use crate::ports::PatientRegistry;

use super::StorageError;

/// Phone with two registered patients in the sample data.
pub const SAMPLE_FAMILY_PHONE: &str = "+919876543210";

#[derive(Debug, Default)]
pub struct InMemoryPatientRegistry {
    by_phone: RwLock<HashMap<String, Vec<Patient>>>,
}

impl InMemoryPatientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the sample patients (Jane and Rohan Doe).
    #[must_use]
    pub fn with_samples() -> Self {
        let registry = Self::new();
        let samples = [
            ("1000000123", "Jane", 1990, 5, 12, Gender::Female, "jane@example.com"),
            ("1000000456", "Rohan", 2016, 3, 4, Gender::Male, "guardian@example.com"),
        ];

        if let Ok(mut map) = registry.by_phone.write() {
            let list = map.entry(SAMPLE_FAMILY_PHONE.to_string()).or_default();
            for (mrn, first, y, m, d, gender, email) in samples {
                let Ok(mrn) = Mrn::parse(mrn) else { continue };
                let profile = PatientProfile {
                    first_name: first.to_string(),
                    last_name: "Doe".to_string(),
                    phone: SAMPLE_FAMILY_PHONE.to_string(),
                    dob: NaiveDate::from_ymd_opt(y, m, d),
                    gender: Some(gender),
                    email: Some(email.to_string()),
                };
                if let Ok(patient) = Patient::from_profile(mrn, profile) {
                    list.push(patient);
                }
            }
        }

        registry
    }
}

impl PatientRegistry for InMemoryPatientRegistry {
    type Error = StorageError;

    fn list_by_phone(&self, phone: &str) -> Result<Vec<Patient>, Self::Error> {
        let map = self.by_phone.read().map_err(|_| StorageError::Poisoned)?;
        Ok(map.get(phone).cloned().unwrap_or_default())
    }

    fn insert(&self, patient: &Patient) -> Result<(), Self::Error> {
        let mut map = self.by_phone.write().map_err(|_| StorageError::Poisoned)?;
        if map.values().flatten().any(|p| p.mrn == patient.mrn) {
            return Err(StorageError::DuplicateMrn(patient.mrn.to_string()));
        }
        map.entry(patient.phone.clone())
            .or_default()
            .push(patient.clone());
        Ok(())
    }

    fn find_by_mrn(&self, mrn: &Mrn) -> Result<Option<Patient>, Self::Error> {
        let map = self.by_phone.read().map_err(|_| StorageError::Poisoned)?;
        Ok(map.values().flatten().find(|p| &p.mrn == mrn).cloned())
    }

    fn count(&self) -> Result<usize, Self::Error> {
        let map = self.by_phone.read().map_err(|_| StorageError::Poisoned)?;
        Ok(map.values().map(Vec::len).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples() {
        let registry = InMemoryPatientRegistry::with_samples();
        let family = registry.list_by_phone(SAMPLE_FAMILY_PHONE).expect("Should list");

        assert_eq!(family.len(), 2);
        assert_eq!(family[0].mrn.as_str(), "1000000123");
        assert_eq!(family[1].full_name(), "Rohan Doe");
        assert!(registry.list_by_phone("+911234567890").expect("Should list").is_empty());
    }

    #[test]
    fn test_duplicate_mrn_rejected() {
        let registry = InMemoryPatientRegistry::with_samples();
        let mut copy = registry.list_by_phone(SAMPLE_FAMILY_PHONE).expect("Should list")[0].clone();
        copy.phone = "+911234567890".to_string();

        let err = registry.insert(&copy).expect_err("Should reject");
        assert!(matches!(err, StorageError::DuplicateMrn(_)));
        assert_eq!(registry.count().expect("Should count"), 2);
    }
}
