//! Adapters layer: Concrete implementations of ports and shared plumbing.
//!
//! - `catalog`: in-memory schedule catalog (with demo data)
//! - `memory` / `sqlite`: patient registries
//! - `clock`: system and manual clocks
//! - `codes`: verification code sources
//! - `keyed`: per-key lock table backing the ledger and the gate
//! - `sanitize`: PII filtering for logs

pub mod catalog;
pub mod clock;
pub mod codes;
pub mod keyed;
pub mod memory;
pub mod sanitize;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;

pub use catalog::InMemoryCatalog;
pub use clock::{ManualClock, SystemClock};
pub use codes::{FixedCode, RandomCode, DEMO_CODE};
pub use keyed::KeyedLocks;
pub use memory::InMemoryPatientRegistry;
pub use sqlite::SqlitePatientRegistry;
