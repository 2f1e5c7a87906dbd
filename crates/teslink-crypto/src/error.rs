use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    InvalidKeyLength { expected: usize, actual: usize },
    InvalidNonceLength { expected: usize, actual: usize },
    InvalidScalar,
    InvalidPoint,
    EncryptionFailed,
    DecryptionFailed,
    InvalidHmac,
    InvalidLength { reason: &'static str },
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidKeyLength { expected, actual } => {
                write!(f, "invalid key length: expected {expected}, got {actual}")
            }
            CryptoError::InvalidNonceLength { expected, actual } => {
                write!(f, "invalid nonce length: expected {expected}, got {actual}")
            }
            CryptoError::InvalidScalar => write!(f, "invalid P-256 scalar"),
            CryptoError::InvalidPoint => write!(f, "invalid P-256 point encoding"),
            CryptoError::EncryptionFailed => write!(f, "encryption failed"),
            CryptoError::DecryptionFailed => write!(f, "decryption failed"),
            CryptoError::InvalidHmac => write!(f, "HMAC verification failed"),
            CryptoError::InvalidLength { reason } => write!(f, "invalid length: {reason}"),
        }
    }
}

impl std::error::Error for CryptoError {}
