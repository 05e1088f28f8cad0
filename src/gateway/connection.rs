//! Connection establishment.
//!
//! Drives every `Scanned` slot through the connect procedure: open the
//! transport, resolve the target GATT service, read the identity/URL
//! descriptor once, then resolve and subscribe the four characteristics
//! in fixed order. Any resolution failure aborts that one slot
//! (disconnect + reset) and leaves it eligible for rediscovery; a
//! malformed descriptor only costs the slot its identity and endpoint.

use tracing::{debug, info, warn};

use crate::domain::descriptor;
use crate::domain::models::CharacteristicKind;
use crate::domain::slot::{SlotPool, SlotState};
use crate::infrastructure::ble::BleCentral;

/// Connects every slot currently in `Scanned` state. Runs until no
/// `Scanned` slot remains; each iteration either promotes a slot to
/// `Connected` or resets it.
pub(crate) fn connect_scanned(
    pool: &mut SlotPool,
    central: &mut dyn BleCentral,
    service_uuid: &str,
) {
    while let Some(index) = pool.find_by_state(SlotState::Scanned) {
        let address = match pool.get(index).and_then(|s| s.address) {
            Some(address) => address,
            None => {
                // A scanned slot without an address is unreachable state;
                // clear it rather than loop on it.
                pool.reset(index);
                continue;
            }
        };

        info!(%address, index, "connecting to peer");

        let handle = match central.connect(address) {
            Ok(handle) => handle,
            Err(error) => {
                warn!(%address, %error, "connect failed, releasing slot");
                pool.reset(index);
                continue;
            }
        };
        if let Some(slot) = pool.get_mut(index) {
            slot.handle = Some(handle);
        }

        if let Err(error) = central.resolve_service(handle, service_uuid) {
            warn!(%address, %error, "service resolution failed, releasing slot");
            central.disconnect(handle);
            pool.reset(index);
            continue;
        }

        // The descriptor is read once. A malformed or missing value is a
        // peer data-quality defect, not a reason to drop the connection.
        match central.read_descriptor(handle) {
            Ok(Some(raw)) => match descriptor::decode(&raw) {
                Some(decoded) => {
                    debug!(%address, identity = %decoded.identity, endpoint = %decoded.endpoint,
                        "decoded peer descriptor");
                    if let Some(slot) = pool.get_mut(index) {
                        slot.set_identity(decoded.identity, decoded.endpoint);
                    }
                }
                None => warn!(%address, "malformed peer descriptor, continuing without identity"),
            },
            Ok(None) => debug!(%address, "peer exposes no descriptor value"),
            Err(error) => warn!(%address, %error, "descriptor read failed, continuing"),
        }

        // All four characteristics must subscribe; partial subscription is
        // not a valid terminal state.
        let mut aborted = false;
        for kind in CharacteristicKind::ALL {
            match central.subscribe(handle, kind) {
                Ok(characteristic) => {
                    if let Some(slot) = pool.get_mut(index) {
                        slot.characteristics[kind.index()] = Some(characteristic);
                    }
                }
                Err(error) => {
                    warn!(%address, %kind, %error, "subscription failed, releasing slot");
                    central.disconnect(handle);
                    pool.reset(index);
                    aborted = true;
                    break;
                }
            }
        }
        if aborted {
            continue;
        }

        if let Some(slot) = pool.get_mut(index) {
            slot.state = SlotState::Connected;
        }
        info!(%address, index, "peer connected and subscribed");
    }
}
