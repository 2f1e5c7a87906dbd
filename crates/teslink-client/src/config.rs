//! TOML-based client configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use teslink_ble::transport::DEFAULT_BLOCK_LENGTH;
use teslink_ble::DiscoveryMode;

use crate::error::ClientError;

/// Default scan timeout, seconds.
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 20;

/// Default per-request response deadline, seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default command time-to-live in vehicle seconds.
///
/// The vehicle-side acceptance window is not published; on slow links this
/// may need raising.
pub const DEFAULT_COMMAND_TTL_SECS: u32 = 10;

/// Client configuration, loadable from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Vehicle identification number, 17 ASCII characters.
    pub vin: String,
    pub discovery_mode: DiscoveryMode,
    pub scan_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub command_ttl_secs: u32,
    /// Preferred write block length; the effective value is still capped by
    /// the MTU derivation.
    pub preferred_block_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            vin: String::new(),
            discovery_mode: DiscoveryMode::default(),
            scan_timeout_secs: DEFAULT_SCAN_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            command_ttl_secs: DEFAULT_COMMAND_TTL_SECS,
            preferred_block_length: DEFAULT_BLOCK_LENGTH,
        }
    }
}

impl ClientConfig {
    /// Configuration with defaults for the given VIN.
    pub fn new(vin: impl Into<String>) -> Self {
        Self {
            vin: vin.into(),
            ..Default::default()
        }
    }

    /// Load and validate configuration from a TOML file.
    ///
    /// Errors name the offending path, since a client typically has
    /// several candidate config locations.
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| ClientError::Config(format!("invalid TOML in {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// Unlike [`ClientConfig::load`] this does not validate the VIN, so
    /// partial configs can be assembled before a VIN is known.
    pub fn parse(s: &str) -> Result<Self, ClientError> {
        toml::from_str(s).map_err(|e| ClientError::Config(format!("invalid TOML: {e}")))
    }

    /// Check the VIN shape: exactly 17 ASCII alphanumerics.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.vin.len() != 17 {
            return Err(ClientError::Config(format!(
                "VIN must be 17 characters, got {}",
                self.vin.len()
            )));
        }
        if !self.vin.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ClientError::Config(
                "VIN must be ASCII alphanumeric".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
