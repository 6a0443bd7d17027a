//! Random identifiers for appointments, patients and verification
//! transactions.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Uses ChaCha20Rng seeded from OS entropy so identifiers cannot be predicted.
fn rng() -> ChaCha20Rng {
    ChaCha20Rng::from_entropy()
}

/// `len` random decimal digits.
pub(crate) fn random_digits(len: usize) -> String {
    let mut rng = rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// `len` random lowercase base-36 characters.
pub(crate) fn random_base36(len: usize) -> String {
    let mut rng = rng();
    (0..len)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect()
}

/// Appointment identifier: `A` followed by 7 digits.
pub(crate) fn appointment_id() -> String {
    format!("A{}", random_digits(7))
}

/// Internal patient identifier: `p` followed by 6 base-36 characters.
pub(crate) fn patient_id() -> String {
    format!("p{}", random_base36(6))
}
