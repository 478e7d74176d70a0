//! Random password generation.

use rand::seq::SliceRandom;
use rand::Rng;

/// Length used when none is requested.
pub const DEFAULT_LENGTH: usize = 8;
/// Shortest password that can hold one character of every class.
pub const MIN_LENGTH: usize = 4;
/// Longest password the shell will generate.
pub const MAX_LENGTH: usize = 4096;

const DIGITS: &[u8] = b"0123456789";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const PUNCTUATION: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

const CLASSES: [&[u8]; 4] = [DIGITS, LOWERCASE, UPPERCASE, PUNCTUATION];

/// Generate a password of `length` characters (raised to [`MIN_LENGTH`]).
///
/// Characters are drawn uniformly from all four classes and the draw is
/// repeated until every class is present. There is no retry cap; at
/// length 4 roughly one draw in fifteen succeeds, and it only gets better
/// from there.
pub fn generate_password<R: Rng + ?Sized>(length: usize, rng: &mut R) -> String {
    let length = length.max(MIN_LENGTH);
    let alphabet: Vec<u8> = CLASSES.concat();

    loop {
        let candidate: Vec<u8> = (0..length)
            .map(|_| *alphabet.choose(rng).unwrap_or(&b'a'))
            .collect();

        if covers_all_classes(&candidate) {
            return candidate.into_iter().map(char::from).collect();
        }
    }
}

fn covers_all_classes(candidate: &[u8]) -> bool {
    CLASSES
        .iter()
        .all(|class| candidate.iter().any(|b| class.contains(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assert_well_formed(password: &str, length: usize) {
        assert_eq!(password.len(), length);
        assert!(password.chars().any(|c| c.is_ascii_digit()));
        assert!(password.chars().any(|c| c.is_ascii_lowercase()));
        assert!(password.chars().any(|c| c.is_ascii_uppercase()));
        assert!(password.chars().any(|c| c.is_ascii_punctuation()));
    }

    #[test]
    fn test_every_class_present() {
        let mut rng = StdRng::seed_from_u64(42);
        for length in [4, 5, 8, 12, 32, 128] {
            for _ in 0..50 {
                let password = generate_password(length, &mut rng);
                assert_well_formed(&password, length);
            }
        }
    }

    #[test]
    fn test_length_floor() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_well_formed(&generate_password(0, &mut rng), MIN_LENGTH);
        assert_well_formed(&generate_password(2, &mut rng), MIN_LENGTH);
    }

    #[test]
    fn test_uses_thread_rng() {
        let password = generate_password(DEFAULT_LENGTH, &mut rand::thread_rng());
        assert_well_formed(&password, DEFAULT_LENGTH);
    }

    #[test]
    fn test_punctuation_matches_ascii_punctuation() {
        let expected: Vec<u8> = (0u8..128).filter(|b| b.is_ascii_punctuation()).collect();
        let mut actual = PUNCTUATION.to_vec();
        actual.sort_unstable();
        assert_eq!(actual, expected);
    }
}
