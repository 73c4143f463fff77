//! Random key generation.
use rand::Rng;

use super::alphabet::{ALPHABET_LEN, SYMBOLS};

/// Generates `length` symbols drawn uniformly from the alphabet.
pub fn generate<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Vec<u8> {
    (0..length)
        .map(|_| SYMBOLS[usize::from(rng.gen_range(0..ALPHABET_LEN))])
        .collect()
}
