//! Peer descriptor decoding.
//!
//! Each peer exposes one readable descriptor string of the form
//! `...i=<identity>;<url-without-scheme>`. A malformed descriptor is a
//! data-quality defect in the peer, not a fatal error: the decoder simply
//! yields nothing and the connection proceeds without identity/endpoint.

use crate::domain::models::MAX_DESCRIPTOR_LEN;

const URL_PREFIX: &str = "https://";
const MIN_DESCRIPTOR_LEN: usize = 5;

/// Identity and delivery endpoint decoded from a peer descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    pub identity: String,
    pub endpoint: String,
}

/// Decodes a descriptor string into identity and endpoint.
///
/// The identity is the substring after the first `i=` marker up to the
/// next `;` (from the start of the string when the marker is absent); the
/// endpoint is `https://` plus everything after the `;`. Returns `None`
/// when the input is too short, too long, or has no `;` terminator.
pub fn decode(descriptor: &str) -> Option<PeerIdentity> {
    if descriptor.len() < MIN_DESCRIPTOR_LEN || descriptor.len() > MAX_DESCRIPTOR_LEN {
        return None;
    }
    let separator = descriptor.find(';')?;
    let head = &descriptor[..separator];
    let start = head.find("i=").map(|p| p + 2).unwrap_or(0);
    let identity = head[start..].to_string();
    let endpoint = format!("{}{}", URL_PREFIX, &descriptor[separator + 1..]);
    Some(PeerIdentity { identity, endpoint })
}
