use chrono::{DateTime, Utc};

use blewatch_core::{Advertisement, DeviceRecord};

/// Result of folding one poll cycle's observations into the registry.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// The full registry after the merge, existing entries first.
    pub registry: Vec<DeviceRecord>,
    /// Entries minted during this merge, in observation order.
    pub newly_added: Vec<DeviceRecord>,
}

/// Merge a batch of observed advertisements into the persisted registry.
///
/// Records are matched by MAC address with a linear scan. Re-observed
/// devices have their `rssi`, `adv_data` and `last_seen` overwritten;
/// identity fields (`id`, `discovered_at`, `name`) are never touched.
/// Unmatched observations become new records, appended in observation
/// order with `discovered_at` set to `now`. Nothing is ever removed, and
/// a MAC repeated within one batch is merged into the entry the first
/// occurrence created (last observation wins).
pub fn reconcile(
    observed: &[Advertisement],
    mut registry: Vec<DeviceRecord>,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let mut added = Vec::new();

    for adv in observed {
        match registry
            .iter_mut()
            .find(|record| record.mac_address == adv.mac_address)
        {
            Some(record) => record.update_from(adv),
            None => {
                registry.push(DeviceRecord::from_advertisement(adv, now));
                added.push(registry.len() - 1);
            }
        }
    }

    let newly_added = added.into_iter().map(|i| registry[i].clone()).collect();

    ReconcileOutcome {
        registry,
        newly_added,
    }
}
