//! Randomization primitives used by response templates.
//!
//! All draws go through `rand::thread_rng()`, so concurrent requests each use
//! their own thread-local generator and never contend on a shared one.

use rand::seq::SliceRandom;
use rand::Rng;

/// Fixed pool drawn from by [`random_first_name`].
pub const FIRST_NAMES: [&str; 26] = [
    "Aaron",
    "Barbara",
    "Charles",
    "Diane",
    "Edward",
    "Felicity",
    "Greg",
    "Harriet",
    "Idris",
    "Jacqueline",
    "Ken",
    "Lisa",
    "Mark",
    "Nina",
    "Orlando",
    "Pierre",
    "Quaid",
    "Ryan",
    "Stacy",
    "Timothy",
    "Ursula",
    "Victor",
    "Wanda",
    "Xavier",
    "Yolanda",
    "Zachary",
];

/// Characters a generated password may contain (85 in total).
pub const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+-=[]{}|;:,.";

/// Pick a first name uniformly from [`FIRST_NAMES`].
pub fn random_first_name() -> &'static str {
    let idx = rand::thread_rng().gen_range(0..FIRST_NAMES.len());
    FIRST_NAMES[idx]
}

/// Pick one candidate uniformly. Returns `None` for an empty list.
pub fn random_from<T>(candidates: &[T]) -> Option<&T> {
    candidates.choose(&mut rand::thread_rng())
}

/// Generate a password of exactly `len` characters from [`PASSWORD_ALPHABET`].
pub fn random_password(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_size() {
        assert_eq!(PASSWORD_ALPHABET.len(), 85);

        let mut unique = PASSWORD_ALPHABET.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 85);
    }

    #[test]
    fn test_first_name_from_pool() {
        for _ in 0..100 {
            assert!(FIRST_NAMES.contains(&random_first_name()));
        }
    }

    #[test]
    fn test_random_from() {
        let candidates = ["a", "b", "c"];
        for _ in 0..100 {
            let picked = random_from(&candidates).unwrap();
            assert!(candidates.contains(picked));
        }

        let empty: [&str; 0] = [];
        assert!(random_from(&empty).is_none());
    }

    #[test]
    fn test_password_length_and_alphabet() {
        for len in [0, 1, 8, 64] {
            let password = random_password(len);
            assert_eq!(password.chars().count(), len);
            assert!(password.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));
        }
    }
}
