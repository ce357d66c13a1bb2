//! Random string generation shared by tokens and credentials.
//!
//! Both draw from the operating system CSPRNG over a fixed
//! ambiguity-reduced alphabet: characters that are easily confused when
//! read aloud or transcribed (`o`/`0`/`O`, `i`/`I`/`l`/`1`, `5`/`S`/`s`,
//! `Q`/`C`, `7`) never appear in generated output.

use rand::{rngs::OsRng, Rng};

/// Generation alphabet. Lowercase letters and digits minus the ambiguous
/// set.
pub(crate) const GENERATION_ALPHABET: &[u8] = b"abcdefghjkmnpqrtuvwxyz234689";

/// Characters excluded from generated output.
pub(crate) const AMBIGUOUS_CHARACTERS: &[char] = &[
    'o', '0', 'O', 'Q', 'C', 'i', 'I', 'l', '1', '5', 'S', 's', '7',
];

/// Draws a random string of `length` characters from the generation
/// alphabet.
///
/// Uses `OsRng` directly: generated values gate a credential write, so the
/// OS CSPRNG is used rather than a seeded or thread-local generator.
pub(crate) fn random_string(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..GENERATION_ALPHABET.len());
            GENERATION_ALPHABET[idx] as char
        })
        .collect()
}
