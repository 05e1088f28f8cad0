//! SenML encoding of completed composite records.
//!
//! The wire payload is an ordered JSON array of measurement entries. Order
//! is fixed (battery, identity, latitude, longitude, temperature,
//! movement, button) and entry fields serialize in the order bn, bt, n, u,
//! v, vs, vb, so encodings are deterministic.

use serde::Serialize;

use crate::domain::models::{LocationEstimate, PeerAddress};
use crate::domain::record::CompositeRecord;

/// One SenML measurement entry. Absent fields are omitted from the JSON.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SenmlEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub u: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vb: Option<bool>,
}

/// Builds the 7-entry measurement list for one complete record.
///
/// `record` must be complete; missing fields encode as zero rather than
/// panicking, but the gateway only calls this for complete records.
pub fn encode_record(
    address: &PeerAddress,
    identity: &str,
    location: &LocationEstimate,
    record: &CompositeRecord,
) -> Vec<SenmlEntry> {
    vec![
        SenmlEntry {
            bn: Some(address.base_name()),
            bt: Some(record.timestamp.unwrap_or(0) as f64),
            n: Some("batt".to_string()),
            u: Some("%EL".to_string()),
            v: Some(f64::from(record.battery.unwrap_or(0))),
            ..Default::default()
        },
        SenmlEntry {
            n: Some("id".to_string()),
            vs: Some(identity.to_string()),
            ..Default::default()
        },
        SenmlEntry {
            u: Some("lat".to_string()),
            v: Some(location.latitude),
            ..Default::default()
        },
        SenmlEntry {
            u: Some("lon".to_string()),
            v: Some(location.longitude),
            ..Default::default()
        },
        SenmlEntry {
            n: Some("temp".to_string()),
            u: Some("Cel".to_string()),
            v: Some(f64::from(record.temperature.unwrap_or(0))),
            ..Default::default()
        },
        SenmlEntry {
            n: Some("move".to_string()),
            vb: Some(record.movement.unwrap_or(0) != 0),
            ..Default::default()
        },
        SenmlEntry {
            n: Some("button".to_string()),
            vb: Some(record.button.unwrap_or(0) != 0),
            ..Default::default()
        },
    ]
}

/// Serializes the measurement list to its JSON wire form.
pub fn encode_record_json(
    address: &PeerAddress,
    identity: &str,
    location: &LocationEstimate,
    record: &CompositeRecord,
) -> serde_json::Result<String> {
    serde_json::to_string(&encode_record(address, identity, location, record))
}
