//! SQLite adapter: Implementation of PatientRegistry.
//!
//! Keeps patient records in a local SQLite database. MRN uniqueness is
//! enforced by the schema as well as by the MRN generator.
//!
//! # Mutex Behavior
//!
//! The connection sits behind a `Mutex`. A poisoned mutex (from a panic in
//! another thread) panics on the next access rather than handing out a
//! connection in an unknown state.
use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{Gender, Mrn, Patient};
use crate::ports::PatientRegistry;

/// Error type for registry storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Duplicate MRN: {0}")]
    DuplicateMrn(String),

    #[error("Registry lock poisoned")]
    Poisoned,
}

/// SQLite patient registry.
pub struct SqlitePatientRegistry {
    conn: Mutex<Connection>,
}

impl SqlitePatientRegistry {
    /// Open (or create) a registry database at the given path.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let registry = Self {
            conn: Mutex::new(conn),
        };
        registry.init_schema()?;
        Ok(registry)
    }

    /// Create an in-memory SQLite database.
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let registry = Self {
            conn: Mutex::new(conn),
        };
        registry.init_schema()?;
        Ok(registry)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS patients (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                mrn TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                dob TEXT NOT NULL,
                gender TEXT NOT NULL,
                phone TEXT NOT NULL,
                email TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_patients_phone
                ON patients(phone, seq);
            ",
        )?;

        Ok(())
    }

    fn row_to_patient(row: &rusqlite::Row<'_>) -> rusqlite::Result<Patient> {
        let id: String = row.get(0)?;
        let mrn_str: String = row.get(1)?;
        let first_name: String = row.get(2)?;
        let last_name: String = row.get(3)?;
        let dob_str: String = row.get(4)?;
        let gender_str: String = row.get(5)?;
        let phone: String = row.get(6)?;
        let email: Option<String> = row.get(7)?;
        let created_at_str: String = row.get(8)?;

        let invalid = |idx: usize, what: &str, value: &str| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                format!("invalid {what}: {value:?}").into(),
            )
        };

        let mrn = Mrn::parse(&mrn_str).map_err(|_| invalid(1, "mrn", &mrn_str))?;
        let dob = NaiveDate::parse_from_str(&dob_str, "%Y-%m-%d")
            .map_err(|_| invalid(4, "dob", &dob_str))?;
        let gender = Gender::parse(&gender_str).ok_or_else(|| invalid(5, "gender", &gender_str))?;

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now());

        Ok(Patient {
            id,
            mrn,
            first_name,
            last_name,
            dob,
            gender,
            phone,
            email,
            created_at,
        })
    }
}

impl PatientRegistry for SqlitePatientRegistry {
    type Error = StorageError;

    fn list_by_phone(&self, phone: &str) -> Result<Vec<Patient>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let mut stmt = conn.prepare(
            r"
            SELECT id, mrn, first_name, last_name, dob, gender, phone, email, created_at
            FROM patients
            WHERE phone = ?1
            ORDER BY seq ASC
            ",
        )?;

        let patients = stmt
            .query_map(params![phone], Self::row_to_patient)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    fn insert(&self, patient: &Patient) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let result = conn.execute(
            r"
            INSERT INTO patients (
                id, mrn, first_name, last_name, dob, gender, phone, email, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                patient.id,
                patient.mrn.as_str(),
                patient.first_name,
                patient.last_name,
                patient.dob.format("%Y-%m-%d").to_string(),
                patient.gender.as_str(),
                patient.phone,
                patient.email,
                patient.created_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {
                tracing::debug!("Saved patient {} to registry", patient.id);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::DuplicateMrn(patient.mrn.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_by_mrn(&self, mrn: &Mrn) -> Result<Option<Patient>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let patient = conn
            .query_row(
                r"
                SELECT id, mrn, first_name, last_name, dob, gender, phone, email, created_at
                FROM patients
                WHERE mrn = ?1
                ",
                params![mrn.as_str()],
                Self::row_to_patient,
            )
            .optional()?;

        Ok(patient)
    }

    fn count(&self) -> Result<usize, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;

        Ok(count as usize)
    }
}
