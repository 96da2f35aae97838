//! Pool join codes.

use rand::{Rng, rng};

/// Number of characters in a pool code.
pub const POOL_CODE_LENGTH: usize = 6;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Source of candidate pool codes. Uniqueness is enforced by the store, not here.
pub trait CodeSource: Send + Sync {
    /// Produce the next candidate code.
    fn next_code(&self) -> String;
}

/// Uniformly random codes drawn from `[A-Z0-9]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodes;

impl CodeSource for RandomCodes {
    fn next_code(&self) -> String {
        let mut rng = rng();
        (0..POOL_CODE_LENGTH)
            .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
            .collect()
    }
}

/// Whether `code` has the shape of a pool code (6 uppercase ASCII letters or digits).
pub fn is_pool_code(code: &str) -> bool {
    code.len() == POOL_CODE_LENGTH
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Canonical form of a user supplied code.
pub fn normalize_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_codes_have_pool_code_shape() {
        let source = RandomCodes;
        for _ in 0..500 {
            let code = source.next_code();
            assert!(is_pool_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn shape_check_rejects_lowercase_and_length() {
        assert!(is_pool_code("AB12CD"));
        assert!(!is_pool_code("ab12cd"));
        assert!(!is_pool_code("AB12C"));
        assert!(!is_pool_code("AB12CDE"));
        assert!(!is_pool_code("AB-2CD"));
    }

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_code("  ab12cd \n"), "AB12CD");
    }
}
