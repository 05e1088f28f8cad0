//! Device slot pool.
//!
//! One slot per concurrently tracked peer. Every lookup goes through the
//! pool and returns an `Option`, so a miss is never a usable index.

use tracing::debug;

use crate::domain::models::{
    CharacteristicHandle, ConnectionHandle, PeerAddress, MAX_DEVICES,
};
use crate::domain::record::RecordRing;

/// Connection lifecycle of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Disconnected,
    Scanned,
    Connected,
}

/// One tracked peer: connection, identity and aggregation state.
#[derive(Debug, Clone, Default)]
pub struct DeviceSlot {
    pub state: SlotState,
    pub address: Option<PeerAddress>,
    pub handle: Option<ConnectionHandle>,
    /// Identity decoded from the peer descriptor; unset until the decoder
    /// succeeds.
    pub identity: Option<String>,
    /// Current delivery endpoint. Mutable: redirects move it.
    pub endpoint: Option<String>,
    /// Endpoint as originally decoded, the fallback when delivery fails.
    pub origin_endpoint: Option<String>,
    /// Subscription handles in characteristic order.
    pub characteristics: [Option<CharacteristicHandle>; 4],
    pub ring: RecordRing,
}

impl DeviceSlot {
    /// Clears all identity, connection and ring state and forces
    /// `Disconnected`.
    pub fn reset(&mut self) {
        *self = DeviceSlot::default();
    }

    /// Stores the decoded identity and endpoint pair. The original
    /// endpoint is remembered once and survives later redirects.
    pub fn set_identity(&mut self, identity: String, endpoint: String) {
        self.identity = Some(identity);
        self.origin_endpoint = Some(endpoint.clone());
        self.endpoint = Some(endpoint);
    }
}

/// Fixed-size registry of device slots plus the address allow-list.
#[derive(Debug, Clone)]
pub struct SlotPool {
    slots: [DeviceSlot; MAX_DEVICES],
    allow_list: Vec<PeerAddress>,
}

impl SlotPool {
    pub fn new(allow_list: Vec<PeerAddress>) -> Self {
        Self {
            slots: Default::default(),
            allow_list,
        }
    }

    pub fn is_allowed(&self, address: &PeerAddress) -> bool {
        self.allow_list.contains(address)
    }

    /// Claims the first `Disconnected` slot for `address`. Returns `None`
    /// when the address is not allow-listed, is already occupied, or no
    /// slot is free. Discovery events are processed from a single context,
    /// so the occupancy check cannot race.
    pub fn allocate(&mut self, address: PeerAddress) -> Option<usize> {
        if !self.is_allowed(&address) {
            return None;
        }
        if self.find_by_address(&address).is_some() {
            debug!(%address, "already tracked, ignoring discovery");
            return None;
        }
        let index = self.find_by_state(SlotState::Disconnected)?;
        self.slots[index].address = Some(address);
        self.slots[index].state = SlotState::Scanned;
        Some(index)
    }

    pub fn find_by_address(&self, address: &PeerAddress) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.address.as_ref() == Some(address))
    }

    pub fn find_by_handle(&self, handle: ConnectionHandle) -> Option<usize> {
        self.slots.iter().position(|s| s.handle == Some(handle))
    }

    pub fn find_by_state(&self, state: SlotState) -> Option<usize> {
        self.slots.iter().position(|s| s.state == state)
    }

    pub fn get(&self, index: usize) -> Option<&DeviceSlot> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DeviceSlot> {
        self.slots.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &DeviceSlot)> {
        self.slots.iter().enumerate()
    }

    pub fn reset(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.reset();
        }
    }

    /// True while at least one slot can still take a newly discovered
    /// peer, i.e. scanning is worth keeping armed.
    pub fn has_free_slot(&self) -> bool {
        self.slots
            .iter()
            .any(|s| s.state == SlotState::Disconnected)
    }
}
