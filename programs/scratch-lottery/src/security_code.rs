use rand::{CryptoRng, Rng};
use tracing::warn;

use crate::constants::*;
use crate::error::{LotteryError, Result};

/// Draws a fresh code. Each character is picked uniformly from
/// `SECURITY_CODE_ALPHABET`.
pub fn generate<R>(rng: &mut R) -> String
where
    R: Rng + CryptoRng + ?Sized,
{
    (0..SECURITY_CODE_LEN)
        .map(|_| SECURITY_CODE_ALPHABET[rng.gen_range(0..SECURITY_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Draws codes until `taken` reports one as unused.
///
/// A collision is not an error, just a reason to draw again. Only after
/// `max_attempts` collisions in a row does the purchase give up.
pub fn generate_unique<R, F>(rng: &mut R, max_attempts: u32, mut taken: F) -> Result<String>
where
    R: Rng + CryptoRng + ?Sized,
    F: FnMut(&str) -> Result<bool>,
{
    for attempt in 1..=max_attempts {
        let code = generate(rng);
        if !taken(&code)? {
            return Ok(code);
        }
        warn!(attempt, "security code collision, drawing again");
    }
    Err(LotteryError::SecurityCodeExhausted(max_attempts))
}

/// Whether `code` could have been produced by [`generate`].
pub fn is_well_formed(code: &str) -> bool {
    code.len() == SECURITY_CODE_LEN && code.bytes().all(|b| SECURITY_CODE_ALPHABET.contains(&b))
}

/// Keeps the first and last few characters and stars out the middle.
pub fn mask(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    if chars.len() <= SECURITY_CODE_VISIBLE * 2 {
        return "*".repeat(chars.len());
    }
    let hidden = chars.len() - SECURITY_CODE_VISIBLE * 2;
    let head: String = chars[..SECURITY_CODE_VISIBLE].iter().collect();
    let tail: String = chars[chars.len() - SECURITY_CODE_VISIBLE..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(hidden))
}
