//! NIST P-256 key agreement.
//!
//! Provides [`EcPrivateKey`] and [`EcPublicKey`] newtypes wrapping the `p256`
//! crate primitives. The vehicle authenticates clients by their P-256 public
//! key (65-byte uncompressed SEC1 encoding) and both sides derive session
//! keys from the ECDH shared secret's x-coordinate.

use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;

use crate::CryptoError;

/// Length of an uncompressed SEC1 point encoding (0x04 prefix + x + y).
pub const UNCOMPRESSED_POINT_LEN: usize = 65;

/// Length of the raw private scalar.
pub const SCALAR_LEN: usize = 32;

/// A P-256 private key (secret scalar in `[1, n-1]`).
///
/// Wraps [`p256::SecretKey`], which rejects the zero scalar and anything
/// outside the group order on construction, so every value of this type
/// satisfies the scalar-range invariant.
pub struct EcPrivateKey(SecretKey);

impl EcPrivateKey {
    /// Generate a random P-256 private key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        Self(SecretKey::random(&mut OsRng))
    }

    /// Create a private key from a raw 32-byte big-endian scalar.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidScalar`] if the bytes encode zero or a
    /// value outside `[1, n-1]`.
    pub fn from_bytes(bytes: &[u8; SCALAR_LEN]) -> Result<Self, CryptoError> {
        SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidScalar)
    }

    /// Derive the corresponding public key.
    #[must_use]
    pub fn public_key(&self) -> EcPublicKey {
        EcPublicKey(self.0.public_key())
    }

    /// Perform ECDH with another party's public key.
    ///
    /// Returns the 32-byte x-coordinate of the shared point. Both sides
    /// computing `a.diffie_hellman(&B)` and `b.diffie_hellman(&A)` arrive at
    /// the same value.
    #[must_use]
    pub fn diffie_hellman(&self, their_public: &EcPublicKey) -> [u8; 32] {
        let shared = diffie_hellman(self.0.to_nonzero_scalar(), their_public.0.as_affine());
        let mut out = [0u8; 32];
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        out
    }

    /// Extract the raw 32-byte big-endian scalar.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SCALAR_LEN] {
        self.0.to_bytes().into()
    }
}

/// A P-256 public key (curve point).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcPublicKey(PublicKey);

impl EcPublicKey {
    /// Parse a public key from a SEC1 encoding (compressed or uncompressed).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPoint`] if the bytes do not encode a
    /// point on the curve.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPoint)
    }

    /// Encode as the 65-byte uncompressed SEC1 form the vehicle expects.
    #[must_use]
    pub fn to_uncompressed_bytes(&self) -> [u8; UNCOMPRESSED_POINT_LEN] {
        let point = self.0.to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_POINT_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }
}
