//! Manufacturer heuristics keyed on MAC address prefix.
//!
//! Exact prefix match only. The table covers the handful of vendors the
//! platform dashboards care about; everything else reports as unknown.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorInfo {
    pub manufacturer: &'static str,
    pub device_type: &'static str,
}

const UNKNOWN: VendorInfo = VendorInfo {
    manufacturer: "Unknown",
    device_type: "Unknown",
};

const PREFIXES: &[(&str, VendorInfo)] = &[
    (
        "00:0D:6F",
        VendorInfo {
            manufacturer: "Google",
            device_type: "Google Device",
        },
    ),
    (
        "AC:23:3F",
        VendorInfo {
            manufacturer: "Google",
            device_type: "Google Device",
        },
    ),
    (
        "B0:49:5F",
        VendorInfo {
            manufacturer: "Google",
            device_type: "Google Device",
        },
    ),
    (
        "00:17:88",
        VendorInfo {
            manufacturer: "Philips",
            device_type: "Philips Hue",
        },
    ),
    (
        "EC:B5:FA",
        VendorInfo {
            manufacturer: "Philips",
            device_type: "Philips Hue",
        },
    ),
    (
        "58:D5:6E",
        VendorInfo {
            manufacturer: "Apple",
            device_type: "Apple Device",
        },
    ),
    (
        "A4:C1:38",
        VendorInfo {
            manufacturer: "Apple",
            device_type: "Apple Device",
        },
    ),
];

pub fn lookup(mac: &str) -> VendorInfo {
    let upper = mac.to_uppercase();
    PREFIXES
        .iter()
        .find(|(prefix, _)| upper.starts_with(prefix))
        .map(|(_, vendor)| *vendor)
        .unwrap_or(UNKNOWN)
}
