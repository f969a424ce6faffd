use std::path::PathBuf;
use std::time::Duration;

pub const DISCOVERIES_FILE_NAME: &str = "bluetooth_discoveries.json";

pub struct DaemonConfig {
    pub scan_interval: Duration,
    pub gateway_topic: String,
    pub discoveries_file: PathBuf,
    pub data_dir: PathBuf,
}

impl DaemonConfig {
    pub fn new(
        scan_interval_secs: u64,
        gateway_topic: String,
        discoveries_file: Option<PathBuf>,
    ) -> Self {
        let data_dir = directories::ProjectDirs::from("io", "blewatch", "blewatchd")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".blewatch"));

        let discoveries_file =
            discoveries_file.unwrap_or_else(|| data_dir.join(DISCOVERIES_FILE_NAME));

        Self {
            scan_interval: Duration::from_secs(scan_interval_secs),
            gateway_topic,
            discoveries_file,
            data_dir,
        }
    }

    pub fn diagnostics_dir(&self) -> PathBuf {
        self.data_dir.join("diagnostics")
    }
}
