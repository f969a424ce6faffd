use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{mac, vendor};

/// Signal strength assumed when the gateway reports none, or reports
/// something unparsable. Weak enough to sort below any real reading.
pub const DEFAULT_RSSI: i32 = -100;

/// Placeholder address for advertisements that carry no MAC. All such
/// observations share one registry entry.
pub const UNKNOWN_MAC: &str = "UNKNOWN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(Uuid);

impl DeviceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single advertisement observed during one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advertisement {
    pub mac_address: String,
    pub rssi: i32,
    pub manufacturer: String,
    pub device_type: String,
    pub adv_data: String,
    pub last_seen: DateTime<Utc>,
}

impl Advertisement {
    /// Parse a raw gateway row: `[identifier, mac, rssi, adv_data?]`.
    ///
    /// Rows with fewer than three elements carry no usable address and
    /// are skipped. A blank MAC becomes [`UNKNOWN_MAC`]; a blank or
    /// malformed RSSI becomes [`DEFAULT_RSSI`]. Neither aborts the batch.
    pub fn from_row(row: &[String], seen_at: DateTime<Utc>) -> Option<Self> {
        if row.len() < 3 {
            return None;
        }

        let mac_address = if row[1].trim().is_empty() {
            UNKNOWN_MAC.to_string()
        } else {
            mac::normalize(&row[1])
        };
        let adv_data = row.get(3).cloned().unwrap_or_default();
        let vendor = vendor::lookup(&mac_address);

        Some(Self {
            mac_address,
            rssi: parse_rssi(&row[2]),
            manufacturer: vendor.manufacturer.to_string(),
            device_type: vendor.device_type.to_string(),
            adv_data,
            last_seen: seen_at,
        })
    }
}

fn parse_rssi(raw: &str) -> i32 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_RSSI;
    }
    trimmed.parse().unwrap_or(DEFAULT_RSSI)
}

/// A persisted registry entry, one per unique MAC address.
///
/// `id`, `discovered_at` and `name` are fixed when the device is first
/// seen; `rssi`, `adv_data` and `last_seen` track the latest observation.
/// Serialized field names are the registry file's on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub mac_address: String,
    pub rssi: i32,
    pub manufacturer: String,
    pub device_type: String,
    pub adv_data: String,
    pub last_seen: DateTime<Utc>,
    pub discovered_at: DateTime<Utc>,
    pub name: String,
}

impl DeviceRecord {
    /// Mint a registry entry for a device seen for the first time.
    pub fn from_advertisement(adv: &Advertisement, discovered_at: DateTime<Utc>) -> Self {
        Self {
            id: DeviceId::generate(),
            mac_address: adv.mac_address.clone(),
            rssi: adv.rssi,
            manufacturer: adv.manufacturer.clone(),
            device_type: adv.device_type.clone(),
            adv_data: adv.adv_data.clone(),
            last_seen: adv.last_seen,
            discovered_at,
            name: format!("BLE Device {}", mac::hex_suffix(&adv.mac_address, 6)),
        }
    }

    /// Fold a re-observation into this record, leaving identity fields
    /// (`id`, `discovered_at`, `name`) untouched.
    pub fn update_from(&mut self, adv: &Advertisement) {
        self.rssi = adv.rssi;
        self.adv_data = adv.adv_data.clone();
        self.last_seen = adv.last_seen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_device_id_generation() {
        let id1 = DeviceId::generate();
        let id2 = DeviceId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_from_row_basic() {
        let now = Utc::now();
        let adv = Advertisement::from_row(
            &row(&["bluetooth.kitchen", "aa:bb:cc:11:22:33", "-67", "{}"]),
            now,
        )
        .unwrap();

        assert_eq!(adv.mac_address, "AA:BB:CC:11:22:33");
        assert_eq!(adv.rssi, -67);
        assert_eq!(adv.adv_data, "{}");
        assert_eq!(adv.last_seen, now);
    }

    #[test]
    fn test_from_row_short_row_is_skipped() {
        assert!(Advertisement::from_row(&row(&["id", "AA:BB:CC:11:22:33"]), Utc::now()).is_none());
        assert!(Advertisement::from_row(&[], Utc::now()).is_none());
    }

    #[test]
    fn test_from_row_missing_adv_data() {
        let adv =
            Advertisement::from_row(&row(&["id", "AA:BB:CC:11:22:33", "-50"]), Utc::now()).unwrap();
        assert_eq!(adv.adv_data, "");
    }

    #[test]
    fn test_from_row_blank_mac_becomes_unknown() {
        let adv = Advertisement::from_row(&row(&["id", "", "-50", ""]), Utc::now()).unwrap();
        assert_eq!(adv.mac_address, UNKNOWN_MAC);
    }

    #[test]
    fn test_from_row_rssi_fails_open() {
        for raw in ["", "   ", "weak", "-67.5"] {
            let adv =
                Advertisement::from_row(&row(&["id", "AA:BB:CC:11:22:33", raw, ""]), Utc::now())
                    .unwrap();
            assert_eq!(adv.rssi, DEFAULT_RSSI, "raw rssi {:?}", raw);
        }
    }

    #[test]
    fn test_from_row_vendor_lookup() {
        let adv = Advertisement::from_row(&row(&["id", "00:17:88:01:02:03", "-60", ""]), Utc::now())
            .unwrap();
        assert_eq!(adv.manufacturer, "Philips");
        assert_eq!(adv.device_type, "Philips Hue");

        let adv = Advertisement::from_row(&row(&["id", "12:34:56:78:9A:BC", "-60", ""]), Utc::now())
            .unwrap();
        assert_eq!(adv.manufacturer, "Unknown");
        assert_eq!(adv.device_type, "Unknown");
    }

    #[test]
    fn test_record_name_from_mac_suffix() {
        let now = Utc::now();
        let adv =
            Advertisement::from_row(&row(&["id", "AA:BB:CC:11:22:33", "-60", ""]), now).unwrap();
        let record = DeviceRecord::from_advertisement(&adv, now);
        assert_eq!(record.name, "BLE Device 112233");
        assert_eq!(record.discovered_at, now);
    }

    #[test]
    fn test_update_from_preserves_identity() {
        let t0 = Utc::now();
        let adv =
            Advertisement::from_row(&row(&["id", "AA:BB:CC:11:22:33", "-60", "a"]), t0).unwrap();
        let mut record = DeviceRecord::from_advertisement(&adv, t0);
        let id = record.id;
        let name = record.name.clone();

        let t1 = t0 + chrono::Duration::seconds(60);
        let later =
            Advertisement::from_row(&row(&["id", "AA:BB:CC:11:22:33", "-72", "b"]), t1).unwrap();
        record.update_from(&later);

        assert_eq!(record.id, id);
        assert_eq!(record.name, name);
        assert_eq!(record.discovered_at, t0);
        assert_eq!(record.rssi, -72);
        assert_eq!(record.adv_data, "b");
        assert_eq!(record.last_seen, t1);
    }
}
