//! System diagnostics for troubleshooting installations where no
//! bluetooth data ever shows up.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::process::Command;

use crate::config::DaemonConfig;

const SENSITIVE_KEYS: &[&str] = &["token", "key", "secret", "pass", "auth"];

#[derive(Debug, Serialize)]
pub struct DiagnosticsReport {
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub platform: &'static str,
    pub arch: &'static str,
    pub bluetoothctl_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bluetoothctl_version: Option<String>,
    pub bluetooth_adapters: Vec<String>,
    pub environment: BTreeMap<String, String>,
}

pub async fn collect() -> DiagnosticsReport {
    let bluetoothctl_version = probe_bluetoothctl().await;

    DiagnosticsReport {
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        platform: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        bluetoothctl_available: bluetoothctl_version.is_some(),
        bluetoothctl_version,
        bluetooth_adapters: list_adapters().await,
        environment: sanitized_environment(),
    }
}

pub async fn persist(
    config: &DaemonConfig,
    report: &DiagnosticsReport,
) -> std::io::Result<PathBuf> {
    let dir = config.diagnostics_dir();
    tokio::fs::create_dir_all(&dir).await?;

    let path = dir.join(format!(
        "diagnostics_{}.json",
        report.timestamp.format("%Y%m%d_%H%M%S")
    ));
    let json = serde_json::to_vec_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    tokio::fs::write(&path, json).await?;

    Ok(path)
}

async fn probe_bluetoothctl() -> Option<String> {
    let output = Command::new("bluetoothctl")
        .arg("--version")
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn list_adapters() -> Vec<String> {
    let mut adapters = Vec::new();
    let Ok(mut dir) = tokio::fs::read_dir("/sys/class/bluetooth").await else {
        return adapters;
    };
    while let Ok(Some(entry)) = dir.next_entry().await {
        adapters.push(entry.file_name().to_string_lossy().into_owned());
    }
    adapters
}

fn sanitized_environment() -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| !is_sensitive(key))
        .collect()
}

fn is_sensitive(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|marker| lower.contains(marker))
}
