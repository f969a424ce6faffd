pub mod device;
pub mod mac;
pub mod vendor;

pub use device::{Advertisement, DeviceId, DeviceRecord, DEFAULT_RSSI, UNKNOWN_MAC};
pub use vendor::VendorInfo;
