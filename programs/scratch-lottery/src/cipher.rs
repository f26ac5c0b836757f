//! Sealing of card layouts at rest.
//!
//! Payload format: `version (1) || nonce (12) || ChaCha20-Poly1305 ciphertext`.
//! The ticket's security code is bound in as associated data, so a payload
//! lifted onto another ticket row no longer opens.

use std::fmt;

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::constants::{CIPHER_KEY_LEN, CIPHER_NONCE_LEN, PAYLOAD_VERSION};
use crate::error::{LotteryError, Result};
use crate::layout::Layout;
use crate::require;

/// Server-side symmetric key for ticket payloads. Never leaves the process.
pub struct OutcomeCipher {
    key: Zeroizing<[u8; CIPHER_KEY_LEN]>,
}

impl fmt::Debug for OutcomeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeCipher").finish_non_exhaustive()
    }
}

impl OutcomeCipher {
    pub fn new(key: [u8; CIPHER_KEY_LEN]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    pub fn from_slice(key: &[u8]) -> Result<Self> {
        let key: [u8; CIPHER_KEY_LEN] = key.try_into().map_err(|_| {
            LotteryError::InvalidConfig(format!("cipher key must be {CIPHER_KEY_LEN} bytes"))
        })?;
        Ok(Self::new(key))
    }

    /// A cipher with a freshly drawn key.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut key = Zeroizing::new([0u8; CIPHER_KEY_LEN]);
        rng.fill_bytes(&mut key[..]);
        Self { key }
    }

    fn aead(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.key[..]))
    }

    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        layout: &Layout,
        security_code: &str,
        rng: &mut R,
    ) -> Result<Vec<u8>> {
        let plaintext = Zeroizing::new(serde_json::to_vec(layout)?);
        let mut nonce = [0u8; CIPHER_NONCE_LEN];
        rng.fill_bytes(&mut nonce);

        let sealed = self
            .aead()
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext.as_slice(),
                    aad: security_code.as_bytes(),
                },
            )
            .map_err(|_| LotteryError::Cipher)?;

        let mut payload = Vec::with_capacity(1 + CIPHER_NONCE_LEN + sealed.len());
        payload.push(PAYLOAD_VERSION);
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&sealed);
        Ok(payload)
    }

    pub fn decrypt(&self, payload: &[u8], security_code: &str) -> Result<Layout> {
        require!(payload.len() > 1 + CIPHER_NONCE_LEN, LotteryError::Cipher);
        let (version, rest) = payload.split_at(1);
        require!(version[0] == PAYLOAD_VERSION, LotteryError::Cipher);
        let (nonce, sealed) = rest.split_at(CIPHER_NONCE_LEN);

        let plaintext = Zeroizing::new(
            self.aead()
                .decrypt(
                    Nonce::from_slice(nonce),
                    Payload {
                        msg: sealed,
                        aad: security_code.as_bytes(),
                    },
                )
                .map_err(|_| LotteryError::Cipher)?,
        );
        Ok(serde_json::from_slice(&plaintext)?)
    }
}
