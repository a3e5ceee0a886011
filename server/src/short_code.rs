use std::fmt::{Debug, Display};
use std::str::FromStr;

use rand::prelude::Distribution;
use rand::Rng;
use thiserror::Error;

pub const SHORT_CODE_SIZE: usize = 10;

/// Identifier handed out for every paste.
pub type PasteId = ShortCode<SHORT_CODE_SIZE>;

/// A fixed-length, case-sensitive identifier over the URL-safe alphabet.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortCode<const N: usize>([u8; N]);

impl<const N: usize> ShortCode<N> {
    pub fn as_str(&self) -> &str {
        // Every byte was checked against `ALPHABET`, which is pure ASCII.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl<const N: usize> Debug for ShortCode<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortCode").field(&self.as_str()).finish()
    }
}

impl<const N: usize> Display for ShortCode<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseShortCodeError {
    #[error("expected {expected} characters, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("{0:?} is not a valid short code character")]
    Char(char),
}

impl<const N: usize> FromStr for ShortCode<N> {
    type Err = ParseShortCodeError;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        if let Some(c) = v.chars().find(|c| !is_short_code_char(*c)) {
            return Err(ParseShortCodeError::Char(c));
        }

        // Only ASCII is left, so bytes and chars line up.
        let bytes: [u8; N] = v
            .as_bytes()
            .try_into()
            .map_err(|_| ParseShortCodeError::Length {
                expected: N,
                actual: v.len(),
            })?;

        Ok(Self(bytes))
    }
}

fn is_short_code_char(c: char) -> bool {
    c.is_ascii() && ALPHABET.contains(&(c as u8))
}

/// Samples short codes uniformly over [`ALPHABET`].
pub struct Generator;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

impl<const N: usize> Distribution<ShortCode<N>> for Generator {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ShortCode<N> {
        let mut arr = [0; N];

        for c in &mut arr {
            *c = ALPHABET[rng.gen_range(0..ALPHABET.len())];
        }

        ShortCode(arr)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn generated_codes_parse_back() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..256 {
            let code: PasteId = rng.sample(Generator);
            assert_eq!(code.as_str().len(), SHORT_CODE_SIZE);
            assert_eq!(code.as_str().parse::<PasteId>(), Ok(code));
        }
    }

    #[test]
    fn codes_are_case_sensitive() {
        let lower: PasteId = "abcdefghij".parse().unwrap();
        let upper: PasteId = "ABCDEFGHIJ".parse().unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            "abc".parse::<PasteId>(),
            Err(ParseShortCodeError::Length {
                expected: SHORT_CODE_SIZE,
                actual: 3
            })
        );
        assert!("abcdefghijk".parse::<PasteId>().is_err());
        assert!("".parse::<PasteId>().is_err());
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        assert_eq!(
            "abcdefghi/".parse::<PasteId>(),
            Err(ParseShortCodeError::Char('/'))
        );
        assert_eq!(
            "abcdefghié".parse::<PasteId>(),
            Err(ParseShortCodeError::Char('é'))
        );
        assert!("abc' OR 1".parse::<PasteId>().is_err());
    }

    #[test]
    fn accepts_url_safe_punctuation() {
        let code: PasteId = "a_b-c_d-e_".parse().unwrap();
        assert_eq!(code.to_string(), "a_b-c_d-e_");
    }
}
