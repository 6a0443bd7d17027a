//! Clock port: wall-clock source for hold expiry and timestamps.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}
