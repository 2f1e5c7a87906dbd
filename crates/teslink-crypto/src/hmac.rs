//! HMAC-SHA256 message authentication.
//!
//! The protocol uses HMAC in two places: deriving the session-info key from
//! the AES command key (see [`crate::kdf`]), and authenticating the
//! vehicle-supplied session context, where the MAC input is the canonical
//! metadata followed by the session-info bytes exactly as transmitted.
//! [`hmac_sha256_verify`] takes the input in parts so callers never build
//! that concatenation themselves, and compares through the `hmac` crate's
//! constant-time equality so a mismatch reveals nothing about where the
//! tags diverge.

use crate::CryptoError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

fn mac_for(key: &[u8]) -> Hmac<Sha256> {
    Hmac::<Sha256>::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any length")
}

/// Compute the HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = mac_for(key);
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Verify `expected` against the HMAC-SHA256 of `parts`, fed in order as
/// one logical message.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidHmac`] if the tag does not match. The
/// comparison is constant-time.
pub fn hmac_sha256_verify(
    key: &[u8],
    parts: &[&[u8]],
    expected: &[u8; 32],
) -> Result<(), CryptoError> {
    let mut mac = mac_for(key);
    for part in parts {
        mac.update(part);
    }
    mac.verify_slice(expected)
        .map_err(|_| CryptoError::InvalidHmac)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Any split of the input into parts verifies against the MAC of
        /// the whole.
        #[test]
        fn hmac_verify_split_roundtrip(
            key in proptest::collection::vec(any::<u8>(), 1..128),
            data in proptest::collection::vec(any::<u8>(), 0..512),
            cut in any::<usize>(),
        ) {
            let mac = hmac_sha256(&key, &data);
            let cut = cut % (data.len() + 1);
            prop_assert!(
                hmac_sha256_verify(&key, &[&data[..cut], &data[cut..]], &mac).is_ok()
            );
        }
    }
}
