//! Code source port: supplies the expected verification code.
//!
//! Delivery of the code to the phone (SMS, voice) is an external trust
//! service. The engine only consumes the code it is told to expect.

use zeroize::Zeroizing;

use crate::domain::TransactionId;

pub trait CodeSource: Send + Sync {
    /// Issue the six-digit code expected for a new challenge.
    fn issue(&self, phone: &str, transaction_id: &TransactionId) -> Zeroizing<String>;
}
