//! Vehicle session key derivation.
//!
//! The vehicle protocol derives the AES-128-GCM command key by truncating a
//! SHA-1 digest of the ECDH shared secret to 16 bytes, and the session-info
//! authentication key by HMAC-ing the command key with a fixed label. The
//! SHA-1 truncation is dictated by the remote end; it is a key-derivation
//! quirk, not a security claim of SHA-1, and must not be replaced with HKDF
//! without breaking interoperability.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hmac::hmac_sha256;
use crate::sha::sha1;

/// HMAC label for the session-info authentication key.
pub const SESSION_INFO_KEY_LABEL: &[u8] = b"session info";

/// Keys derived once per handshake. Zeroized on drop so a failed handshake
/// leaves no key material behind.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    /// AES-128-GCM key for command encryption and response decryption.
    pub aes_key: [u8; 16],
    /// HMAC-SHA256 key authenticating vehicle-supplied session info.
    pub session_info_key: [u8; 32],
}

/// Derive the per-session keys from the 32-byte ECDH shared secret.
#[must_use]
pub fn session_keys(shared_secret: &[u8; 32]) -> SessionKeys {
    let digest = sha1(shared_secret);
    let mut aes_key = [0u8; 16];
    aes_key.copy_from_slice(&digest[..16]);
    let session_info_key = hmac_sha256(&aes_key, SESSION_INFO_KEY_LABEL);
    SessionKeys {
        aes_key,
        session_info_key,
    }
}
