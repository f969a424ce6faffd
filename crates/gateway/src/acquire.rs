use std::sync::Arc;

use async_trait::async_trait;

use blewatch_core::DEFAULT_RSSI;

use crate::client::{EntityState, SupervisorClient};
use crate::entities;
use crate::scan;

/// One raw advertisement row as the gateway reports it:
/// `[identifier, mac, rssi, adv_data?]`.
pub type RawAdvertisement = Vec<String>;

/// Outcome of asking a single source for advertisement data.
#[derive(Debug)]
pub enum Acquired {
    /// The source produced a batch worth processing.
    Devices(Vec<RawAdvertisement>),
    /// The source answered but currently sees nothing.
    Empty,
    /// The source failed or is not present on this installation.
    Unavailable(String),
}

#[async_trait]
pub trait AdvertisementSource: Send + Sync {
    fn name(&self) -> &str;
    async fn acquire(&self) -> Acquired;
}

/// Ordered fallback over advertisement sources: the first source that
/// yields devices wins, everything else is logged and skipped. An
/// exhausted chain is an empty batch, never an error.
pub struct AcquisitionChain {
    sources: Vec<Box<dyn AdvertisementSource>>,
}

impl AcquisitionChain {
    pub fn new(sources: Vec<Box<dyn AdvertisementSource>>) -> Self {
        Self { sources }
    }

    /// The production chain, in the order the platform is consulted:
    /// native bluetooth integration, then gateway sensors, then a
    /// simulated scan with local tooling.
    pub fn standard(client: Arc<SupervisorClient>) -> Self {
        Self::new(vec![
            Box::new(BluetoothIntegrationSource {
                client: client.clone(),
            }),
            Box::new(GatewaySensorSource {
                client: client.clone(),
            }),
            Box::new(SimulatedScanSource { client }),
        ])
    }

    pub async fn acquire(&self) -> Vec<RawAdvertisement> {
        for source in &self.sources {
            match source.acquire().await {
                Acquired::Devices(devices) => {
                    tracing::info!("found {} devices via {}", devices.len(), source.name());
                    return devices;
                }
                Acquired::Empty => {
                    tracing::debug!("{} reported no devices", source.name());
                }
                Acquired::Unavailable(reason) => {
                    tracing::warn!("{} unavailable: {}", source.name(), reason);
                }
            }
        }
        Vec::new()
    }
}

/// Devices tracked by the platform's native bluetooth integration,
/// read out of the full entity state dump.
pub struct BluetoothIntegrationSource {
    pub client: Arc<SupervisorClient>,
}

#[async_trait]
impl AdvertisementSource for BluetoothIntegrationSource {
    fn name(&self) -> &str {
        "bluetooth integration"
    }

    async fn acquire(&self) -> Acquired {
        let states = match self.client.states().await {
            Ok(states) => states,
            Err(e) => return Acquired::Unavailable(e.to_string()),
        };

        let devices = rows_from_states(&states);
        if devices.is_empty() {
            Acquired::Empty
        } else {
            Acquired::Devices(devices)
        }
    }
}

fn rows_from_states(states: &[EntityState]) -> Vec<RawAdvertisement> {
    let mut devices = Vec::new();

    for state in states {
        let entity_id = &state.entity_id;
        if !entity_id.starts_with("bluetooth.") || entity_id.ends_with("_battery_level") {
            continue;
        }

        let mac = state
            .attributes
            .get("address")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| entity_id.trim_start_matches("bluetooth.").to_string());

        let rssi = match state.attributes.get("rssi") {
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => DEFAULT_RSSI.to_string(),
        };

        // full attribute map rides along as the opaque payload
        let adv_data = serde_json::Value::Object(state.attributes.clone()).to_string();

        devices.push(vec![entity_id.clone(), mac, rssi, adv_data]);
    }

    devices
}

/// Rows published into a gateway sensor's `devices` attribute, checking
/// the primary sensor first and then the alternates other integrations
/// use.
pub struct GatewaySensorSource {
    pub client: Arc<SupervisorClient>,
}

const FALLBACK_SENSORS: &[&str] = &[
    "sensor.ble_scanner",
    "sensor.ble_monitor",
    "sensor.ble_gateway",
];

#[async_trait]
impl AdvertisementSource for GatewaySensorSource {
    fn name(&self) -> &str {
        "gateway sensor"
    }

    async fn acquire(&self) -> Acquired {
        for sensor in
            std::iter::once(entities::GATEWAY_SENSOR).chain(FALLBACK_SENSORS.iter().copied())
        {
            match self.client.state(sensor).await {
                Ok(Some(state)) => {
                    let devices = rows_from_sensor(&state);
                    if !devices.is_empty() {
                        tracing::info!("found {} devices in {}", devices.len(), sensor);
                        return Acquired::Devices(devices);
                    }
                }
                Ok(None) => continue,
                Err(e) => return Acquired::Unavailable(e.to_string()),
            }
        }

        // A fresh installation has no gateway sensor at all. Create it so
        // later cycles (and the simulated scan) have somewhere to publish.
        if let Err(e) = entities::ensure_gateway_sensor(&self.client).await {
            tracing::warn!("failed to create gateway sensor: {}", e);
        }

        Acquired::Empty
    }
}

fn rows_from_sensor(state: &EntityState) -> Vec<RawAdvertisement> {
    let Some(rows) = state.attributes.get("devices").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| row.as_array())
        .map(|row| {
            row.iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

/// Last resort: scan with whatever bluetooth tooling the host has and
/// mirror the result into the gateway sensor.
pub struct SimulatedScanSource {
    pub client: Arc<SupervisorClient>,
}

#[async_trait]
impl AdvertisementSource for SimulatedScanSource {
    fn name(&self) -> &str {
        "simulated scan"
    }

    async fn acquire(&self) -> Acquired {
        let devices = scan::simulate_scan().await;
        if devices.is_empty() {
            return Acquired::Empty;
        }

        if let Err(e) = entities::publish_gateway_devices(&self.client, &devices).await {
            tracing::warn!("failed to publish simulated batch: {}", e);
        }

        Acquired::Devices(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(entity_id: &str, attributes: serde_json::Value) -> EntityState {
        EntityState {
            entity_id: entity_id.to_string(),
            state: String::new(),
            attributes: attributes.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_rows_from_states_filters_entities() {
        let states = vec![
            entity(
                "bluetooth.kitchen",
                serde_json::json!({"address": "AA:BB:CC:11:22:33", "rssi": -67}),
            ),
            entity("bluetooth.kitchen_battery_level", serde_json::json!({})),
            entity("sensor.temperature", serde_json::json!({})),
        ];

        let rows = rows_from_states(&states);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "bluetooth.kitchen");
        assert_eq!(rows[0][1], "AA:BB:CC:11:22:33");
        assert_eq!(rows[0][2], "-67");
    }

    #[test]
    fn test_rows_from_states_mac_falls_back_to_entity_id() {
        let states = vec![entity("bluetooth.aabbcc112233", serde_json::json!({}))];

        let rows = rows_from_states(&states);
        assert_eq!(rows[0][1], "aabbcc112233");
        assert_eq!(rows[0][2], "-100");
    }

    #[test]
    fn test_rows_from_states_string_rssi() {
        let states = vec![entity(
            "bluetooth.kitchen",
            serde_json::json!({"address": "AA:BB:CC:11:22:33", "rssi": "-71"}),
        )];
        assert_eq!(rows_from_states(&states)[0][2], "-71");
    }

    #[test]
    fn test_rows_from_sensor() {
        let state = entity(
            "sensor.ble_gateway_raw_data",
            serde_json::json!({
                "devices": [
                    ["scanner", "AA:BB:CC:11:22:33", "-65", "{}"],
                    ["scanner", "DD:EE:FF:44:55:66", -78],
                ]
            }),
        );

        let rows = rows_from_sensor(&state);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], "AA:BB:CC:11:22:33");
        // non-string cells are carried over as their JSON rendering
        assert_eq!(rows[1][2], "-78");
    }

    #[test]
    fn test_rows_from_sensor_without_devices() {
        let state = entity("sensor.ble_gateway_raw_data", serde_json::json!({}));
        assert!(rows_from_sensor(&state).is_empty());
    }

    struct StaticSource {
        name: &'static str,
        outcome: fn() -> Acquired,
    }

    #[async_trait]
    impl AdvertisementSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn acquire(&self) -> Acquired {
            (self.outcome)()
        }
    }

    fn batch() -> Acquired {
        Acquired::Devices(vec![vec![
            "scanner".to_string(),
            "AA:BB:CC:11:22:33".to_string(),
            "-65".to_string(),
        ]])
    }

    #[tokio::test]
    async fn test_chain_returns_first_batch() {
        let chain = AcquisitionChain::new(vec![
            Box::new(StaticSource {
                name: "unavailable",
                outcome: || Acquired::Unavailable("down".to_string()),
            }),
            Box::new(StaticSource {
                name: "empty",
                outcome: || Acquired::Empty,
            }),
            Box::new(StaticSource {
                name: "working",
                outcome: batch,
            }),
            Box::new(StaticSource {
                name: "never reached",
                outcome: || panic!("chain should have stopped"),
            }),
        ]);

        let rows = chain.acquire().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], "AA:BB:CC:11:22:33");
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_empty() {
        let chain = AcquisitionChain::new(vec![Box::new(StaticSource {
            name: "empty",
            outcome: || Acquired::Empty,
        })]);
        assert!(chain.acquire().await.is_empty());
    }
}
