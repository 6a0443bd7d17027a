//! Patient records keyed by Medical Record Number (MRN).

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ids;

/// Canonical MRN format: 10 digits, first digit `1`.
const MRN_PATTERN: &str = r"^1\d{9}$";

/// Fixed MRN used when generation cannot produce a valid value.
pub const FALLBACK_MRN: &str = "1000000001";

static MRN_REGEX: OnceLock<Regex> = OnceLock::new();

fn mrn_regex() -> &'static Regex {
    MRN_REGEX.get_or_init(|| Regex::new(MRN_PATTERN).expect("Valid regex"))
}

/// Internal validation failure for a malformed MRN.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MrnError {
    #[error("MRN must be 10 digits starting with 1, got {0} characters")]
    Malformed(usize),
}

/// A validated Medical Record Number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mrn(String);

impl Mrn {
    /// Parse and validate an MRN.
    ///
    /// # Errors
    /// Returns `MrnError::Malformed` if the value does not match `^1\d{9}$`.
    pub fn parse(value: &str) -> Result<Self, MrnError> {
        if mrn_regex().is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(MrnError::Malformed(value.chars().count()))
        }
    }

    /// Build an unvalidated candidate: `1` followed by 9 random digits.
    #[must_use]
    pub fn candidate() -> String {
        format!("1{}", ids::random_digits(9))
    }

    /// The fixed safe MRN.
    #[must_use]
    pub fn fallback() -> Self {
        Self(FALLBACK_MRN.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Mrn {
    type Error = MrnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Mrn> for String {
    fn from(mrn: Mrn) -> Self {
        mrn.0
    }
}

impl std::fmt::Display for Mrn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
            Self::Other => "Other",
        }
    }

    /// Parse a stored gender label (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "female" => Some(Self::Female),
            "male" => Some(Self::Male),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical form of a phone number: surrounding whitespace, inner spaces
/// and hyphens removed. Send limits and patient lookup are keyed by it.
#[must_use]
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// New-patient input as collected by the registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientProfile {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub dob: Option<NaiveDate>,
    pub gender: Option<Gender>,

    /// Optional contact email
    pub email: Option<String>,
}

impl PatientProfile {
    /// Names of required fields that are missing or blank.
    ///
    /// Email is optional.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.first_name.trim().is_empty() {
            missing.push("first_name");
        }
        if self.last_name.trim().is_empty() {
            missing.push("last_name");
        }
        if self.phone.trim().is_empty() {
            missing.push("phone");
        }
        if self.dob.is_none() {
            missing.push("dob");
        }
        if self.gender.is_none() {
            missing.push("gender");
        }

        missing
    }
}

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Internal identifier (local only)
    pub id: String,

    pub mrn: Mrn,
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub gender: Gender,
    pub phone: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Build a patient from a complete profile.
    ///
    /// # Errors
    /// Returns the names of missing required fields.
    pub fn from_profile(mrn: Mrn, profile: PatientProfile) -> Result<Self, Vec<&'static str>> {
        let missing = profile.missing_fields();
        let (Some(dob), Some(gender), true) = (profile.dob, profile.gender, missing.is_empty())
        else {
            return Err(missing);
        };

        Ok(Self {
            id: ids::patient_id(),
            mrn,
            first_name: profile.first_name.trim().to_string(),
            last_name: profile.last_name.trim().to_string(),
            dob,
            gender,
            phone: profile.phone.trim().to_string(),
            email: profile
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            created_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
