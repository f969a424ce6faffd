//! One-time platform setup: the entities the add-on expects to exist.

use serde_json::json;

use crate::client::SupervisorClient;
use crate::error::GatewayError;

pub const GATEWAY_SENSOR: &str = "sensor.ble_gateway_raw_data";
pub const DISCOVERED_INPUT_TEXT: &str = "input_text.discovered_ble_devices";
pub const SELECTED_INPUT_TEXT: &str = "input_text.selected_ble_device";

/// Create the raw-data gateway sensor when it does not exist yet.
pub async fn ensure_gateway_sensor(client: &SupervisorClient) -> Result<(), GatewayError> {
    if client.state(GATEWAY_SENSOR).await?.is_some() {
        return Ok(());
    }

    tracing::info!("creating gateway sensor {}", GATEWAY_SENSOR);
    publish_gateway_devices::<serde_json::Value>(client, &[]).await
}

/// Push a device list into the gateway sensor's attributes wholesale.
pub async fn publish_gateway_devices<T: serde::Serialize>(
    client: &SupervisorClient,
    devices: &[T],
) -> Result<(), GatewayError> {
    client
        .set_state(
            GATEWAY_SENSOR,
            "online",
            json!({
                "friendly_name": "BLE Gateway",
                "icon": "mdi:bluetooth-connect",
                "devices": devices,
            }),
        )
        .await
}

/// Register something dashboard-clickable that triggers a scan, walking
/// the ladder of entity kinds the platform may or may not support:
/// input_button first, then a plain button, then a script wrapping the
/// discovery service. Returns whether anything usable exists afterwards.
pub async fn register_scan_button(client: &SupervisorClient) -> bool {
    let mut registered = false;

    match client
        .call_service(
            "input_button",
            "create",
            json!({
                "entity_id": "input_button.bluetooth_scan",
                "name": "Bluetooth Scan",
                "icon": "mdi:bluetooth-search",
            }),
        )
        .await
    {
        Ok(()) => {
            tracing::info!("created input_button.bluetooth_scan");
            registered = true;
            // the create service ignores the icon; set it on the state
            if let Err(e) = client
                .set_state(
                    "input_button.bluetooth_scan",
                    "off",
                    json!({
                        "friendly_name": "Bluetooth Scan",
                        "icon": "mdi:bluetooth-search",
                    }),
                )
                .await
            {
                tracing::warn!("failed to set input_button icon: {}", e);
            }
        }
        Err(e) => tracing::warn!("failed to create input_button: {}", e),
    }

    match client.state("button.bluetooth_scan").await {
        Ok(Some(_)) => {
            tracing::info!("button.bluetooth_scan already exists");
            registered = true;
        }
        Ok(None) => {
            if register_button_entity(client).await {
                registered = true;
            }
        }
        Err(e) => tracing::warn!("failed to check button.bluetooth_scan: {}", e),
    }

    if !registered {
        registered = register_scan_script(client).await;
    }

    registered
}

async fn register_button_entity(client: &SupervisorClient) -> bool {
    tracing::info!("registering button.bluetooth_scan");

    let created = client
        .call_service(
            "button",
            "create",
            json!({
                "entity_id": "button.bluetooth_scan",
                "name": "Bluetooth Scan",
                "icon": "mdi:bluetooth-search",
            }),
        )
        .await;

    match created {
        Ok(()) => {
            tracing::info!("scan button registered via service call");
            return true;
        }
        Err(e) => tracing::info!("button service unavailable ({}), trying state update", e),
    }

    // some installations only accept a direct state write
    let state_set = client
        .set_state(
            "button.bluetooth_scan",
            "2023-01-01T00:00:00+00:00",
            json!({
                "friendly_name": "Bluetooth Scan",
                "icon": "mdi:bluetooth-search",
                "device_class": "restart",
            }),
        )
        .await;

    match state_set {
        Ok(()) => {
            tracing::info!("scan button registered via state update");
            true
        }
        Err(e) => {
            tracing::error!("failed to register scan button: {}", e);
            false
        }
    }
}

async fn register_scan_script(client: &SupervisorClient) -> bool {
    tracing::info!("creating script.bluetooth_scan as fallback");

    let created = client
        .call_service(
            "script",
            "create",
            json!({
                "entity_id": "script.bluetooth_scan",
                "sequence": [{ "service": "bluetooth.start_discovery" }],
                "icon": "mdi:bluetooth-search",
                "name": "Bluetooth Scan",
            }),
        )
        .await;

    match created {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("failed to create scan script: {}", e);
            false
        }
    }
}

/// Make sure the input_text entities the dashboard binds to exist.
pub async fn ensure_input_texts(client: &SupervisorClient) {
    for entity_id in [DISCOVERED_INPUT_TEXT, SELECTED_INPUT_TEXT] {
        if let Err(e) = ensure_input_text(client, entity_id).await {
            tracing::warn!("failed to ensure {}: {}", entity_id, e);
        }
    }
}

async fn ensure_input_text(
    client: &SupervisorClient,
    entity_id: &str,
) -> Result<(), GatewayError> {
    if client.state(entity_id).await?.is_some() {
        return Ok(());
    }

    tracing::info!("creating missing entity {}", entity_id);
    let config = if entity_id == DISCOVERED_INPUT_TEXT {
        json!({
            "entity_id": entity_id,
            "name": "Discovered BLE Devices",
            "max": 1024,
            "initial": "{}",
        })
    } else {
        json!({
            "entity_id": entity_id,
            "name": entity_title(entity_id),
            "max": 255,
            "initial": "",
        })
    };

    client.call_service("input_text", "create", config).await
}

/// `input_text.selected_ble_device` -> `Selected Ble Device`.
fn entity_title(entity_id: &str) -> String {
    let object_id = entity_id.split('.').nth(1).unwrap_or(entity_id);
    object_id
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
