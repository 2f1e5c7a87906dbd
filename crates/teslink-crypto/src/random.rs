//! CSPRNG access.
//!
//! All randomness in the protocol (ephemeral keys, nonces, request UUIDs,
//! routing addresses) comes from the operating system CSPRNG via
//! `rand::rngs::OsRng`.

use rand::rngs::OsRng;
use rand::RngCore;

/// Fill a freshly allocated buffer of `n` bytes from the OS CSPRNG.
#[must_use]
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Produce a fixed-size random array from the OS CSPRNG.
#[must_use]
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}
