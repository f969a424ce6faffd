pub mod acquire;
pub mod client;
pub mod entities;
pub mod error;
pub mod scan;

pub use acquire::{Acquired, AcquisitionChain, AdvertisementSource, RawAdvertisement};
pub use client::{EntityState, SupervisorClient};
pub use error::GatewayError;
