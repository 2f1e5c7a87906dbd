//! SHA-1 and SHA-256 hashing primitives.
//!
//! SHA-256 backs metadata digests (AES-GCM associated data) and HMAC.
//! SHA-1 appears in two interoperability-mandated places: the session key
//! derivation and the BLE advertisement name prefix. Neither use relies on
//! SHA-1 collision resistance.

use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Compute the SHA-1 hash of the given data.
#[must_use]
pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

/// Compute the SHA-256 hash of the given data.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    // FIPS 180 example digests.
    #[test]
    fn test_sha1_abc() {
        let digest = sha1(b"abc");
        let expected = hex::decode("a9993e364706816aba3e25717850c26c9cd0d89d").unwrap();
        assert_eq!(digest.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_sha1_empty() {
        let digest = sha1(b"");
        let expected = hex::decode("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap();
        assert_eq!(digest.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_sha256_abc() {
        let digest = sha256(b"abc");
        let expected =
            hex::decode("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
                .unwrap();
        assert_eq!(digest.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_sha256_empty() {
        let digest = sha256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(digest.as_slice(), expected.as_slice());
    }
}
