use std::process::Stdio;
use std::time::Duration;

use rand::Rng;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::acquire::RawAdvertisement;
use crate::client::SupervisorClient;
use crate::error::GatewayError;

const HCITOOL_TIMEOUT: Duration = Duration::from_secs(10);
const BLUETOOTHCTL_TIMEOUT: Duration = Duration::from_secs(15);
const BLUETOOTHCTL_SCAN_WINDOW: Duration = Duration::from_secs(5);

/// Ask the platform to start a bluetooth scan, walking the trigger
/// fallbacks in order and stopping at the first service call that is
/// accepted. Returns whether any trigger landed; failures only log.
pub async fn trigger_scan(client: &SupervisorClient) -> bool {
    let attempts = [
        ("bluetooth", "start_discovery", serde_json::json!({})),
        (
            "input_button",
            "press",
            serde_json::json!({"entity_id": "input_button.bluetooth_scan"}),
        ),
        (
            "button",
            "press",
            serde_json::json!({"entity_id": "button.bluetooth_scan"}),
        ),
        (
            "script",
            "turn_on",
            serde_json::json!({"entity_id": "script.bluetooth_scan"}),
        ),
    ];

    for (domain, service, body) in attempts {
        match client.call_service(domain, service, body).await {
            Ok(()) => {
                tracing::info!("triggered scan via {}.{}", domain, service);
                return true;
            }
            Err(e) => {
                tracing::warn!("scan trigger {}.{} failed: {}", domain, service, e);
            }
        }
    }

    tracing::warn!("all scan triggers failed");
    false
}

/// Best-effort local scan with whatever bluetooth tooling the host has.
/// Always produces something: when neither tool works, a canned pair of
/// devices stands in so the rest of the pipeline stays exercisable.
/// RSSI is not observable through these tools and is simulated.
pub async fn simulate_scan() -> Vec<RawAdvertisement> {
    tracing::info!("simulating bluetooth scan");

    match hcitool_scan().await {
        Ok(devices) if !devices.is_empty() => {
            tracing::info!("found {} devices using hcitool", devices.len());
            return devices;
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("hcitool not available or failed: {}", e),
    }

    match bluetoothctl_scan().await {
        Ok(devices) if !devices.is_empty() => {
            tracing::info!("found {} devices using bluetoothctl", devices.len());
            return devices;
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("bluetoothctl not available or failed: {}", e),
    }

    tracing::warn!("no bluetooth tooling available, using canned scan results");
    canned_devices()
}

async fn hcitool_scan() -> Result<Vec<RawAdvertisement>, GatewayError> {
    let output = tokio::time::timeout(
        HCITOOL_TIMEOUT,
        Command::new("hcitool").arg("scan").output(),
    )
    .await
    .map_err(|_| GatewayError::ScanUnavailable("hcitool timed out".to_string()))?
    .map_err(|e| GatewayError::ScanUnavailable(e.to_string()))?;

    if !output.status.success() {
        return Err(GatewayError::ScanUnavailable(format!(
            "hcitool exited with {}",
            output.status
        )));
    }

    Ok(parse_hcitool_output(&String::from_utf8_lossy(
        &output.stdout,
    )))
}

async fn bluetoothctl_scan() -> Result<Vec<RawAdvertisement>, GatewayError> {
    let scan = async {
        let mut child = Command::new("bluetoothctl")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| GatewayError::ScanUnavailable(e.to_string()))?;

        if let Some(stdin) = child.stdin.as_mut() {
            stdin
                .write_all(b"scan on\n")
                .await
                .map_err(|e| GatewayError::ScanUnavailable(e.to_string()))?;
            tokio::time::sleep(BLUETOOTHCTL_SCAN_WINDOW).await;
            stdin
                .write_all(b"devices\nscan off\nquit\n")
                .await
                .map_err(|e| GatewayError::ScanUnavailable(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GatewayError::ScanUnavailable(e.to_string()))?;

        Ok(parse_bluetoothctl_output(&String::from_utf8_lossy(
            &output.stdout,
        )))
    };

    tokio::time::timeout(BLUETOOTHCTL_TIMEOUT, scan)
        .await
        .map_err(|_| GatewayError::ScanUnavailable("bluetoothctl timed out".to_string()))?
}

/// Lines look like `00:11:22:33:44:55<tab>Device Name`.
fn parse_hcitool_output(output: &str) -> Vec<RawAdvertisement> {
    let mut devices = Vec::new();
    for line in output.lines() {
        let Some((mac, name)) = line.trim().split_once(char::is_whitespace) else {
            continue;
        };
        if !is_mac(mac) {
            continue;
        }
        devices.push(simulated_row(name.trim(), mac));
    }
    devices
}

/// Lines look like `Device 00:11:22:33:44:55 Device Name`.
fn parse_bluetoothctl_output(output: &str) -> Vec<RawAdvertisement> {
    let mut devices = Vec::new();
    for line in output.lines() {
        let Some(rest) = line.trim().strip_prefix("Device ") else {
            continue;
        };
        let Some((mac, name)) = rest.split_once(char::is_whitespace) else {
            continue;
        };
        if !is_mac(mac) {
            continue;
        }
        devices.push(simulated_row(name.trim(), mac));
    }
    devices
}

fn simulated_row(name: &str, mac: &str) -> RawAdvertisement {
    let rssi: i32 = rand::thread_rng().gen_range(-90..=-50);
    vec![
        name.to_string(),
        mac.to_string(),
        rssi.to_string(),
        "{}".to_string(),
    ]
}

fn is_mac(s: &str) -> bool {
    s.len() == 17
        && s.split(':').count() == 6
        && s.split(':')
            .all(|pair| pair.len() == 2 && pair.chars().all(|c| c.is_ascii_hexdigit()))
}

fn canned_devices() -> Vec<RawAdvertisement> {
    vec![
        vec![
            "Simulated Device 1".to_string(),
            "AA:BB:CC:11:22:33".to_string(),
            "-65".to_string(),
            "{}".to_string(),
        ],
        vec![
            "Simulated Device 2".to_string(),
            "DD:EE:FF:44:55:66".to_string(),
            "-78".to_string(),
            "{}".to_string(),
        ],
    ]
}
