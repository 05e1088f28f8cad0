//! BLE capability interface.
//!
//! Radio-level scanning and connection primitives live outside the gateway
//! core (in the embedding platform). The core drives them through
//! [`BleCentral`] and receives discovery / notification / disconnect
//! events through [`BleEventSink`], which the gateway implements.
//!
//! Both sides run in a single non-reentrant event-processing context:
//! every sink method takes `&mut self`, so two handlers can never
//! interleave on shared slot or ring state.

use thiserror::Error;

use crate::domain::models::{
    Advertisement, CharacteristicHandle, CharacteristicKind, ConnectionHandle, PeerAddress,
};

#[derive(Debug, Error)]
pub enum BleError {
    #[error("connect to {0} failed")]
    ConnectFailed(PeerAddress),
    #[error("service {0} not found")]
    ServiceNotFound(String),
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(CharacteristicKind),
    #[error("subscribe to {0} failed")]
    SubscribeFailed(CharacteristicKind),
    #[error("unknown connection handle")]
    UnknownHandle,
}

/// Commands the gateway issues to the radio.
pub trait BleCentral {
    /// Arms or stops discovery scanning.
    fn set_scanning(&mut self, enabled: bool);

    /// Opens a transport to the peer and returns its connection handle.
    fn connect(&mut self, address: PeerAddress) -> Result<ConnectionHandle, BleError>;

    fn disconnect(&mut self, handle: ConnectionHandle);

    /// Resolves the target GATT service on an open connection.
    fn resolve_service(&mut self, handle: ConnectionHandle, service_uuid: &str)
        -> Result<(), BleError>;

    /// Reads the identity/URL descriptor once. `Ok(None)` means the peer
    /// exposes no readable descriptor value.
    fn read_descriptor(&mut self, handle: ConnectionHandle) -> Result<Option<String>, BleError>;

    /// Resolves and subscribes to one notifiable characteristic.
    fn subscribe(
        &mut self,
        handle: ConnectionHandle,
        kind: CharacteristicKind,
    ) -> Result<CharacteristicHandle, BleError>;
}

/// Events the radio delivers to the gateway. The platform must invoke
/// these serially from one context; the `&mut self` receiver enforces the
/// non-reentrancy the aggregation state depends on.
pub trait BleEventSink {
    /// An advertisement was seen while scanning.
    fn on_discovered(&mut self, advertisement: &Advertisement);

    /// A subscribed characteristic notified a single-byte value.
    fn on_characteristic_notified(
        &mut self,
        handle: ConnectionHandle,
        kind: CharacteristicKind,
        value: u8,
    );

    /// The transport to a peer dropped.
    fn on_disconnected(&mut self, handle: ConnectionHandle);
}
