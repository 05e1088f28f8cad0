//! Delivery protocol.
//!
//! Posts one encoded composite record to the slot's current endpoint,
//! following redirects and retrying transient failures inside fixed
//! budgets. The slot's endpoint is the only state the protocol mutates:
//! redirects move it forward, transport failures fall it back to the
//! original endpoint, and a successful POST leaves the learned endpoint in
//! place for the next delivery.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::settings::DeliverySettings;
use crate::domain::slot::DeviceSlot;
use crate::infrastructure::http::HttpPoster;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The slot never decoded an endpoint from its peer descriptor.
    #[error("slot has no delivery endpoint")]
    NoEndpoint,
    #[error("redirect budget ({0}) exhausted")]
    RedirectBudgetExhausted(u32),
    #[error("retry budget ({0}) exhausted")]
    RetryBudgetExhausted(u32),
}

/// Bounds for one delivery attempt.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub max_redirects: u32,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self::from(&DeliverySettings::default())
    }
}

impl From<&DeliverySettings> for DeliveryConfig {
    fn from(settings: &DeliverySettings) -> Self {
        Self {
            max_redirects: settings.max_redirects,
            max_retries: settings.max_retries,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        }
    }
}

/// Delivers one payload for `slot`.
///
/// Whatever the outcome, the caller resets the record afterwards; a
/// failed composite reading is dropped, not re-queued.
pub async fn deliver(
    poster: &dyn HttpPoster,
    slot: &mut DeviceSlot,
    payload: &str,
    config: &DeliveryConfig,
) -> Result<(), DeliveryError> {
    let mut redirects = 0u32;
    let mut retries = 0u32;

    loop {
        let url = slot.endpoint.clone().ok_or(DeliveryError::NoEndpoint)?;

        match poster.post_json(&url, payload).await {
            Ok(response) if response.is_success() => {
                info!(%url, "delivered composite record");
                return Ok(());
            }
            Ok(response) if response.is_redirect() => {
                redirects += 1;
                if redirects > config.max_redirects {
                    warn!(%url, redirects, "redirect budget exhausted, dropping record");
                    return Err(DeliveryError::RedirectBudgetExhausted(config.max_redirects));
                }
                match response.location {
                    Some(location) => {
                        debug!(%url, %location, "following redirect");
                        // Learn the new endpoint so later deliveries skip
                        // the hop.
                        slot.endpoint = Some(location);
                    }
                    None => {
                        debug!(%url, "redirect without Location, falling back to origin");
                        slot.endpoint = slot.origin_endpoint.clone();
                    }
                }
            }
            Ok(response) => {
                retries += 1;
                warn!(%url, status = response.status, retries, "collector rejected POST");
                if retries > config.max_retries {
                    return Err(DeliveryError::RetryBudgetExhausted(config.max_retries));
                }
            }
            Err(error) => {
                retries += 1;
                warn!(%url, %error, retries, "POST failed, falling back to origin endpoint");
                slot.endpoint = slot.origin_endpoint.clone();
                if retries > config.max_retries {
                    return Err(DeliveryError::RetryBudgetExhausted(config.max_retries));
                }
            }
        }

        if !config.retry_delay.is_zero() {
            tokio::time::sleep(config.retry_delay).await;
        }
    }
}
