use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use blewatch_core::{Advertisement, DeviceRecord};
use blewatch_gateway::{entities, scan, AcquisitionChain, SupervisorClient};
use blewatch_registry::{reconcile, DiscoveryStore, JsonStore, ReconcileOutcome};

use crate::config::DaemonConfig;

const NOTIFY_ID_DISCOVERY: &str = "ble_discovery";
const NOTIFY_ID_RESULTS: &str = "ble_discovery_results";
const NOTIFY_ID_STARTUP: &str = "ble_discovery_startup";

/// Delay between triggering a scan and reading its results back.
const SCAN_SETTLE: Duration = Duration::from_secs(5);

/// Everything one discovery pass needs: the platform client, the
/// acquisition chain and the registry store seam.
pub struct Context {
    client: Arc<SupervisorClient>,
    chain: AcquisitionChain,
    store: Box<dyn DiscoveryStore>,
}

impl Context {
    pub fn new(config: &DaemonConfig) -> Arc<Self> {
        let client = Arc::new(SupervisorClient::from_env());
        let chain = AcquisitionChain::standard(client.clone());
        let store = Box::new(JsonStore::new(&config.discoveries_file));
        Arc::new(Self {
            client,
            chain,
            store,
        })
    }

    /// One-time platform setup. Failures are logged, never fatal.
    pub async fn bootstrap(&self) {
        if !entities::register_scan_button(&self.client).await {
            warn!("no scan button could be registered");
        }
        if let Err(e) = entities::ensure_gateway_sensor(&self.client).await {
            warn!("gateway sensor bootstrap failed: {}", e);
        }
        entities::ensure_input_texts(&self.client).await;

        if let Err(e) = self
            .client
            .notify(
                "BLE Discovery Add-on",
                "BLE discovery has started. Use the BLE Dashboard to manage devices.",
                Some(NOTIFY_ID_STARTUP),
            )
            .await
        {
            warn!("startup notification failed: {}", e);
        }
    }

    /// One full discovery pass: acquire, reconcile, persist, publish.
    /// Returns the number of devices known afterwards.
    pub async fn run_cycle(&self, force_scan: bool) -> usize {
        if force_scan {
            info!("triggering bluetooth scan");
            if scan::trigger_scan(&self.client).await {
                tokio::time::sleep(SCAN_SETTLE).await;
            } else {
                warn!("failed to trigger bluetooth scan");
            }
        }

        let now = Utc::now();
        let rows = self.chain.acquire().await;
        let observed: Vec<Advertisement> = rows
            .iter()
            .filter_map(|row| Advertisement::from_row(row, now))
            .collect();

        let registry = match self.store.load().await {
            Ok(registry) => registry,
            Err(e) => {
                error!("failed to load discoveries: {}", e);
                Vec::new()
            }
        };

        let ReconcileOutcome {
            registry,
            newly_added,
        } = reconcile(&observed, registry, now);

        if let Err(e) = self.store.save(&registry).await {
            error!("failed to save discoveries: {}", e);
        }

        self.publish_cycle(&observed, &registry, &newly_added).await;

        registry.len()
    }

    async fn publish_cycle(
        &self,
        observed: &[Advertisement],
        registry: &[DeviceRecord],
        newly_added: &[DeviceRecord],
    ) {
        // current-cycle MAC -> RSSI map for the dashboard input_text
        let mac_to_rssi: serde_json::Map<String, serde_json::Value> = observed
            .iter()
            .map(|adv| (adv.mac_address.clone(), serde_json::json!(adv.rssi)))
            .collect();
        let value = serde_json::Value::Object(mac_to_rssi).to_string();
        if let Err(e) = self
            .client
            .set_input_text(entities::DISCOVERED_INPUT_TEXT, &value)
            .await
        {
            warn!(
                "failed to update {}: {}",
                entities::DISCOVERED_INPUT_TEXT,
                e
            );
        }

        if !newly_added.is_empty() {
            info!("{} new devices discovered", newly_added.len());
            let message = new_device_message(observed);
            if let Err(e) = self
                .client
                .notify("BLE Device Discovery", &message, Some(NOTIFY_ID_DISCOVERY))
                .await
            {
                warn!("discovery notification failed: {}", e);
            }
        }

        if !registry.is_empty() {
            if let Err(e) = entities::publish_gateway_devices(&self.client, registry).await {
                warn!("failed to publish registry to gateway sensor: {}", e);
            }
        }
    }

    /// Manual scan: announce, force a pass, then report everything known
    /// sorted by signal strength.
    pub async fn manual_scan(&self) {
        info!("manual scan requested");
        if let Err(e) = self
            .client
            .notify(
                "BLE Device Discovery",
                "Starting manual Bluetooth scan...",
                Some(NOTIFY_ID_DISCOVERY),
            )
            .await
        {
            warn!("scan announcement failed: {}", e);
        }

        self.run_cycle(true).await;

        let registry = self.store.load().await.unwrap_or_default();
        let message = scan_results_message(&registry);
        if let Err(e) = self
            .client
            .notify(
                "BLE Device Discovery Results",
                &message,
                Some(NOTIFY_ID_RESULTS),
            )
            .await
        {
            warn!("results notification failed: {}", e);
        }
    }
}

fn new_device_message(observed: &[Advertisement]) -> String {
    let mut message = format!("Discovered {} BLE devices:\n\n", observed.len());
    for adv in observed {
        message.push_str(&format!("- {} (RSSI: {} dBm)\n", adv.mac_address, adv.rssi));
    }
    message.push_str("\nGo to the BLE Dashboard to manage devices.");
    message
}

fn scan_results_message(registry: &[DeviceRecord]) -> String {
    let mut sorted: Vec<&DeviceRecord> = registry.iter().collect();
    sorted.sort_by(|a, b| b.rssi.cmp(&a.rssi));

    let mut message = format!("Manual scan complete. Found {} devices:\n\n", sorted.len());
    for (idx, record) in sorted.iter().enumerate() {
        message.push_str(&format!(
            "{}. {} ({}): {} dBm\n",
            idx + 1,
            record.name,
            record.mac_address,
            record.rssi
        ));
    }
    message.push_str("\nGo to the BLE Dashboard to manage these devices.");
    message
}
