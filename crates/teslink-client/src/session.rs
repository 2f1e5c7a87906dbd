//! Per-domain session state.
//!
//! A session is created by a successful handshake and destroyed on
//! disconnect, authentication failure, or explicit reset. The counter is
//! strictly increasing for the session's lifetime; the epoch is immutable.
//! Vehicle time is tracked against a monotonic instant recorded at
//! handshake, so a wall-clock jump cannot produce an expiry earlier than
//! one already sent.

use std::time::Instant;

use zeroize::{Zeroize, ZeroizeOnDrop};

use teslink_crypto::kdf::SessionKeys;
use teslink_proto::schema::signatures::SessionInfo;
use teslink_proto::schema::universal::Domain;

/// Key material held by a session, zeroized when the session is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SessionSecrets {
    aes_key: [u8; 16],
    session_info_key: [u8; 32],
}

/// Established session state for one vehicle domain.
pub struct SessionState {
    domain: Domain,
    secrets: SessionSecrets,
    counter: u32,
    epoch: Vec<u8>,
    vehicle_public_key: Vec<u8>,
    client_public_key: [u8; 65],
    base_clock_time: u32,
    established_at: Instant,
}

impl SessionState {
    /// Record the state of a freshly authenticated handshake.
    pub fn establish(
        domain: Domain,
        keys: SessionKeys,
        info: &SessionInfo,
        client_public_key: [u8; 65],
    ) -> Self {
        Self {
            domain,
            secrets: SessionSecrets {
                aes_key: keys.aes_key,
                session_info_key: keys.session_info_key,
            },
            counter: info.counter,
            epoch: info.epoch.clone(),
            vehicle_public_key: info.public_key.clone(),
            client_public_key,
            base_clock_time: info.clock_time,
            established_at: Instant::now(),
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn aes_key(&self) -> &[u8; 16] {
        &self.secrets.aes_key
    }

    pub fn session_info_key(&self) -> &[u8; 32] {
        &self.secrets.session_info_key
    }

    pub fn epoch(&self) -> &[u8] {
        &self.epoch
    }

    pub fn vehicle_public_key(&self) -> &[u8] {
        &self.vehicle_public_key
    }

    pub fn client_public_key(&self) -> &[u8; 65] {
        &self.client_public_key
    }

    /// The last counter value consumed.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Consume and return the next counter value.
    pub fn next_counter(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    /// Current vehicle clock estimate in seconds, monotonic non-decreasing.
    pub fn vehicle_time_seconds(&self) -> u32 {
        let elapsed = self.established_at.elapsed().as_secs();
        self.base_clock_time
            .saturating_add(u32::try_from(elapsed).unwrap_or(u32::MAX))
    }

    /// Expiry for a command sent now, `ttl` vehicle-seconds ahead.
    pub fn command_expiry(&self, ttl: u32) -> u32 {
        self.vehicle_time_seconds().saturating_add(ttl)
    }
}
