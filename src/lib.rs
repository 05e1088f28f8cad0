//! BLE-to-SenML HTTP gateway core.
//!
//! Bridges a small fleet of BLE sensor beacons to a remote HTTP
//! collector: per-slot connection lifecycle, timestamp-correlated
//! aggregation of four independent measurements into one composite
//! record, and bounded-redirect/bounded-retry delivery of the encoded
//! SenML payload.
//!
//! Radio-level BLE primitives are a capability the embedding platform
//! provides (see [`infrastructure::ble`]); this crate supplies everything
//! above them.

pub mod domain;
pub mod gateway;
pub mod infrastructure;

pub use domain::models::{
    Advertisement, CharacteristicKind, ConnectionHandle, LocationEstimate, PeerAddress,
};
pub use domain::settings::{Settings, SettingsService};
pub use gateway::Gateway;
pub use infrastructure::ble::{BleCentral, BleEventSink};
pub use infrastructure::http::{HttpPoster, ReqwestPoster};
pub use infrastructure::logging::init_logger;
