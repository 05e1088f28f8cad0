//! Core gateway types shared across the slot pool, aggregation ring and
//! delivery protocol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum number of concurrently tracked peer devices.
pub const MAX_DEVICES: usize = 4;

/// Composite records kept in flight per device.
pub const MAX_POOL: usize = 10;

/// Upper bound on the identity/URL descriptor read from a peer.
pub const MAX_DESCRIPTOR_LEN: usize = 64;

/// 6-byte BLE hardware address, compared as an opaque byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress(pub [u8; 6]);

impl PeerAddress {
    /// Masked form used as the SenML base name: hex of the upper three
    /// bytes, then `ffff`, then hex of the lower three bytes (16 hex
    /// digits total).
    pub fn masked(&self) -> String {
        let b = &self.0;
        format!(
            "{:02x}{:02x}{:02x}ffff{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }

    /// SenML base name for this address, e.g.
    /// `urn:dev:mac:6872c3ffffeb8ea9:`.
    pub fn base_name(&self) -> String {
        format!("urn:dev:mac:{}:", self.masked())
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid peer address: {0}")]
pub struct AddressParseError(pub String);

impl FromStr for PeerAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut count = 0;
        for part in s.split(':') {
            if count == 6 || part.len() != 2 {
                return Err(AddressParseError(s.to_string()));
            }
            bytes[count] = u8::from_str_radix(part, 16)
                .map_err(|_| AddressParseError(s.to_string()))?;
            count += 1;
        }
        if count != 6 {
            return Err(AddressParseError(s.to_string()));
        }
        Ok(PeerAddress(bytes))
    }
}

/// Opaque transport handle for an open connection, issued by the BLE
/// capability. Never used as a slot index directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(pub u16);

/// Opaque handle for a subscribed characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle(pub u16);

/// The four notifiable measurements exposed by a peer, in the fixed
/// resolution/subscription order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacteristicKind {
    Battery,
    Temperature,
    Movement,
    Button,
}

impl CharacteristicKind {
    /// All kinds, in subscription order.
    pub const ALL: [CharacteristicKind; 4] = [
        CharacteristicKind::Battery,
        CharacteristicKind::Temperature,
        CharacteristicKind::Movement,
        CharacteristicKind::Button,
    ];

    /// 16-bit characteristic UUID. Battery level and temperature are the
    /// standard assigned numbers; movement and button are vendor-defined.
    pub fn uuid16(&self) -> u16 {
        match self {
            CharacteristicKind::Battery => 0x2a19,
            CharacteristicKind::Temperature => 0x2a6e,
            CharacteristicKind::Movement => 0x2c01,
            CharacteristicKind::Button => 0x2ae2,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            CharacteristicKind::Battery => 0,
            CharacteristicKind::Temperature => 1,
            CharacteristicKind::Movement => 2,
            CharacteristicKind::Button => 3,
        }
    }
}

impl fmt::Display for CharacteristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CharacteristicKind::Battery => "battery",
            CharacteristicKind::Temperature => "temperature",
            CharacteristicKind::Movement => "movement",
            CharacteristicKind::Button => "button",
        };
        write!(f, "{}", name)
    }
}

/// Advertisement seen during discovery, as reported by the BLE capability.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub address: PeerAddress,
    /// Whether the advertisement carries the gateway's target service UUID.
    pub advertises_service: bool,
}

/// Location estimate obtained by the embedding application (reverse
/// geocoding is outside the gateway core).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationEstimate {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: u32,
}

impl Default for LocationEstimate {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            accuracy: DEFAULT_ACCURACY,
        }
    }
}

/// Accuracy reported when no better estimate is available.
pub const DEFAULT_ACCURACY: u32 = 40000;
