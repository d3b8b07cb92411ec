//! # Password Generation

use crate::constants::PASSWORD_EXCLUDED_CHARS;
use rand::Rng;

/// Printable ASCII letters, digits and punctuation minus the excluded set
fn password_alphabet() -> Vec<char> {
    ('!'..='~')
        .filter(|c| !PASSWORD_EXCLUDED_CHARS.contains(*c))
        .collect()
}

/// Generate a random password of `length` characters from a thread-local CSPRNG
pub fn generate_password(length: usize) -> String {
    let alphabet = password_alphabet();
    let mut rng = rand::rng();

    (0..length)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
        .collect()
}
