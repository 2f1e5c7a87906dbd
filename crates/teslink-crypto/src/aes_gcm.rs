//! AES-128-GCM authenticated encryption with associated data.
//!
//! The key is 128 bits because the vehicle derives it from a truncated SHA-1
//! digest (see [`crate::kdf`]). Nonces are 12 random bytes per message and
//! must never be derived from counters; counter freshness is enforced
//! separately through the associated data.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Nonce};

use crate::CryptoError;

/// AES-128 key length.
pub const KEY_LEN: usize = 16;

/// GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key`/`nonce`, binding `aad`.
///
/// Returns `ciphertext || tag`, with the 16-byte tag appended.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyLength`] or
/// [`CryptoError::InvalidNonceLength`] on length mismatch.
pub fn encrypt(
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(key, nonce)?;
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt `ciphertext || tag` under `key`/`nonce`, verifying `aad`.
///
/// # Errors
///
/// Returns [`CryptoError::DecryptionFailed`] if the tag does not verify,
/// which covers both ciphertext tampering and associated-data mismatch.
pub fn decrypt(
    key: &[u8],
    nonce: &[u8],
    ciphertext_with_tag: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(key, nonce)?;
    if ciphertext_with_tag.len() < TAG_LEN {
        return Err(CryptoError::InvalidLength {
            reason: "ciphertext shorter than GCM tag",
        });
    }
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext_with_tag,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed)
}

fn cipher_for(key: &[u8], nonce: &[u8]) -> Result<Aes128Gcm, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        });
    }
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::InvalidNonceLength {
            expected: NONCE_LEN,
            actual: nonce.len(),
        });
    }
    Aes128Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_LEN,
        actual: key.len(),
    })
}
