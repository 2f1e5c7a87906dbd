//! Newtype wrappers for protocol byte-array fields.
//!
//! These types prevent accidental mixing of the two 16-byte identifiers the
//! protocol carries: the per-request correlation UUID and the per-connection
//! return routing address.

use core::fmt;
use core::ops::Deref;

fn fmt_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

/// Error for byte-slice conversions of the wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid length: expected {}, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for InvalidLength {}

/// The 16-byte correlation UUID attached to every outbound message.
///
/// Responses echo it back, and the pending-request table is keyed by it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct RequestUuid([u8; 16]);

impl RequestUuid {
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn into_bytes(self) -> [u8; 16] {
        self.0
    }
}

impl AsRef<[u8]> for RequestUuid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for RequestUuid {
    type Target = [u8; 16];

    fn deref(&self) -> &[u8; 16] {
        &self.0
    }
}

impl TryFrom<&[u8]> for RequestUuid {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for RequestUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for RequestUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestUuid(")?;
        fmt_hex(&self.0[..4], f)?;
        write!(f, "..)")
    }
}

/// The 16-byte client-chosen return address, generated once per session and
/// echoed in the `from_destination` of every outbound message.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct RoutingAddress([u8; 16]);

impl RoutingAddress {
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for RoutingAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for RoutingAddress {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for RoutingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for RoutingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoutingAddress(")?;
        fmt_hex(&self.0[..4], f)?;
        write!(f, "..)")
    }
}
