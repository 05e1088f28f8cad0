//! Infrastructure layer: capability interfaces and their host-side
//! implementations (logging, clock, HTTP transport). The BLE capability
//! itself is implemented by the embedding platform.

pub mod ble;
pub mod clock;
pub mod http;
pub mod logging;
