//! Cryptographic primitives for the teslink vehicle BLE client.
//!
//! This crate provides the foundational cryptographic operations used by the
//! protocol layers: NIST P-256 key agreement, AES-128-GCM authenticated
//! encryption, HMAC-SHA256, SHA-1/SHA-256 hashing, the vehicle session key
//! derivation, and CSPRNG access.

pub mod aes_gcm;
pub mod error;
pub mod hmac;
pub mod kdf;
pub mod p256;
pub mod random;
pub mod sha;

pub use error::CryptoError;
