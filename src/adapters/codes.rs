//! Verification code sources.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroizing;

use crate::domain::TransactionId;
use crate::ports::CodeSource;

/// Demo code accepted for every challenge.
pub const DEMO_CODE: &str = "123456";

/// Issues the same code for every challenge.
///
/// Used for demos and tests where no delivery channel exists.
#[derive(Debug, Clone)]
pub struct FixedCode {
    code: String,
}

impl FixedCode {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl Default for FixedCode {
    fn default() -> Self {
        Self::new(DEMO_CODE)
    }
}

impl CodeSource for FixedCode {
    fn issue(&self, _phone: &str, _transaction_id: &TransactionId) -> Zeroizing<String> {
        Zeroizing::new(self.code.clone())
    }
}

/// Issues a random six-digit code per challenge.
///
/// The caller is responsible for delivering the returned code out of band.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCode;

impl CodeSource for RandomCode {
    fn issue(&self, _phone: &str, _transaction_id: &TransactionId) -> Zeroizing<String> {
        let mut rng = ChaCha20Rng::from_entropy();
        Zeroizing::new(format!("{:06}", rng.gen_range(0..1_000_000u32)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_code() {
        let code = FixedCode::default().issue("+911234567890", &TransactionId::generate());
        assert_eq!(code.as_str(), DEMO_CODE);
    }

    #[test]
    fn test_random_code_shape() {
        let code = RandomCode.issue("+911234567890", &TransactionId::generate());
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| b.is_ascii_digit()));
    }
}
