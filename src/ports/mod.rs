//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the engine and the systems it consumes (schedule catalog,
//! patient registry, wall clock, verification code delivery).

mod catalog;
mod clock;
mod codes;
mod patients;

pub use catalog::ScheduleCatalog;
pub use clock::Clock;
pub use codes::CodeSource;
pub use patients::PatientRegistry;
