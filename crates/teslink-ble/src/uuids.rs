//! Vendor-fixed GATT identifiers and the VIN-derived advertisement name.

use uuid::Uuid;

use teslink_crypto::sha::sha1;

/// Primary vehicle service.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x00000211_b2d1_43f0_9b88_960cebf8b91e);

/// Client-to-vehicle write characteristic.
pub const TX_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x00000212_b2d1_43f0_9b88_960cebf8b91e);

/// Vehicle-to-client notification characteristic.
pub const RX_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x00000213_b2d1_43f0_9b88_960cebf8b91e);

/// 16-bit pairing service advertised by the vehicle, expanded to the
/// Bluetooth base UUID.
pub const PAIRING_SERVICE_UUID: Uuid = Uuid::from_u128(0x00001122_0000_1000_8000_00805f9b34fb);

/// The advertisement local-name prefix for a VIN:
/// `"S" || lowercase_hex(SHA1(vin))[0..16] || "C"`, exactly 17 characters.
#[must_use]
pub fn advertisement_local_name(vin: &str) -> String {
    let digest = sha1(vin.as_bytes());
    let mut name = String::with_capacity(18);
    name.push('S');
    for byte in &digest[..8] {
        name.push_str(&format!("{byte:02x}"));
    }
    name.push('C');
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertisement_name_shape() {
        let name = advertisement_local_name("5YJ3E1EA7JF000000");
        assert_eq!(name.len(), 18);
        assert!(name.starts_with('S'));
        assert!(name.ends_with('C'));
    }

    #[test]
    fn test_advertisement_name_matches_sha1_prefix() {
        let vin = "5YJ3E1EA7JF000000";
        let digest = sha1(vin.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        let expected = format!("S{}C", &hex[..16]);
        assert_eq!(advertisement_local_name(vin), expected);
    }

    #[test]
    fn test_distinct_vins_have_distinct_names() {
        assert_ne!(
            advertisement_local_name("5YJ3E1EA7JF000000"),
            advertisement_local_name("5YJ3E1EA7JF000001"),
        );
    }

    #[test]
    fn test_characteristic_uuids_share_base() {
        let tx = TX_CHARACTERISTIC_UUID.as_u128();
        let rx = RX_CHARACTERISTIC_UUID.as_u128();
        let service = SERVICE_UUID.as_u128();
        assert_eq!(rx - tx, 1u128 << 96);
        assert_eq!(tx - service, 1u128 << 96);
    }
}
