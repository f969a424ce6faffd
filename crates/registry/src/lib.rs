pub mod error;
pub mod reconcile;
pub mod store;

pub use error::RegistryError;
pub use reconcile::{reconcile, ReconcileOutcome};
pub use store::{DiscoveryStore, JsonStore, MemoryStore};
