//! # Slotguard
//!
//! Appointment slot reservation engine for doctor schedules.
//!
//! This crate provides:
//! - An authoritative booking ledger with per-slot atomic commits
//! - Conflict recovery with nearby alternative slots
//! - Lazily computed day availability for calendar rendering
//! - Advisory slot holds with expiry
//! - Phone verification with per-phone send limits
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core scheduling types (SlotKey, Booking, Hold, Patient, MRN)
//! - `ports`: Trait definitions for external collaborators
//! - `adapters`: Concrete implementations (in-memory catalog, SQLite registry)
//! - `application`: Gate, holds, ledger and aggregator, composed by the engine
//! - `config`: Engine configuration

use std::time::Duration;

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::SchedulingEngine;
pub use config::EngineConfig;
pub use domain::{Alternative, Booking, DayState, Mrn, Patient, SlotKey};

/// Result type for Slotguard operations
pub type Result<T> = std::result::Result<T, SlotguardError>;

/// Main error type for Slotguard
#[derive(Debug, thiserror::Error)]
pub enum SlotguardError {
    #[error("Rate limited. Try again later.")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Incorrect OTP")]
    IncorrectCode,

    #[error("Unknown verification transaction")]
    UnknownTransaction,

    #[error("Phone not verified for this transaction")]
    NotVerified,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<&'static str>),

    #[error("Slot just got booked ({} alternatives suggested)", .alternatives.len())]
    SlotConflict { alternatives: Vec<Alternative> },

    #[error("Slot is not open for booking ({} alternatives suggested)", .alternatives.len())]
    SlotUnavailable { alternatives: Vec<Alternative> },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SlotguardError {
    /// Alternatives attached to a rejected commit, if any.
    #[must_use]
    pub fn alternatives(&self) -> &[Alternative] {
        match self {
            Self::SlotConflict { alternatives } | Self::SlotUnavailable { alternatives } => {
                alternatives
            }
            _ => &[],
        }
    }
}
