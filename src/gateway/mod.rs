//! Gateway coordinator.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        Gateway                           │
//! │   (single event-processing context, owns all slot state) │
//! └────────┬──────────────────┬──────────────────┬──────────┘
//!          │                  │                  │
//!          ▼                  ▼                  ▼
//!   ┌────────────┐     ┌────────────┐     ┌────────────┐
//!   │ connection │     │  slot pool │     │  delivery  │
//!   │            │     │  + rings   │     │            │
//!   │ - connect  │     │ - allocate │     │ - encode   │
//!   │ - resolve  │     │ - correlate│     │ - redirect │
//!   │ - subscribe│     │ - complete │     │ - retry    │
//!   └────────────┘     └────────────┘     └────────────┘
//! ```
//!
//! The BLE capability calls the [`BleEventSink`] methods; the embedding
//! application calls [`Gateway::tick`] periodically. Both go through
//! `&mut Gateway`, so discovery, notification and delivery can never
//! interleave on the slot pool; the aggregation rings rely on that.
//!
//! Each tick runs three sequential passes over the slots: connect every
//! `Scanned` slot, deliver every complete composite record, then re-arm
//! scanning while a slot is free. None of the passes blocks beyond the
//! delivery protocol's own bounded retry/redirect loop.

pub mod connection;
pub mod delivery;

use std::time::Duration;

use anyhow::Context as _;
use tracing::{error, info, trace, warn};

use crate::domain::models::{
    Advertisement, CharacteristicKind, ConnectionHandle, LocationEstimate, MAX_DEVICES,
};
use crate::domain::senml;
use crate::domain::settings::Settings;
use crate::domain::slot::{SlotPool, SlotState};
use crate::infrastructure::ble::{BleCentral, BleEventSink};
use crate::infrastructure::clock::{Clock, SystemClock};
use crate::infrastructure::http::HttpPoster;

use delivery::DeliveryConfig;

/// The gateway core: slot pool, aggregation rings and delivery, driven by
/// BLE events and a periodic tick.
pub struct Gateway {
    pool: SlotPool,
    central: Box<dyn BleCentral + Send>,
    poster: Box<dyn HttpPoster>,
    clock: Box<dyn Clock>,
    location: LocationEstimate,
    service_uuid: String,
    delivery: DeliveryConfig,
}

impl Gateway {
    /// Builds a gateway from settings, the location estimate obtained by
    /// the embedding application (per the configured fallback policy) and
    /// the two capabilities.
    pub fn new(
        settings: &Settings,
        location: Option<LocationEstimate>,
        central: Box<dyn BleCentral + Send>,
        poster: Box<dyn HttpPoster>,
    ) -> anyhow::Result<Self> {
        let allow_list = settings.allow_list().context("invalid device allow-list")?;
        let location = settings.resolve_location(location)?;

        Ok(Self {
            pool: SlotPool::new(allow_list),
            central,
            poster,
            clock: Box::new(SystemClock),
            location,
            service_uuid: settings.ble_service_uuid.clone(),
            delivery: DeliveryConfig::from(&settings.delivery),
        })
    }

    /// Replaces the wall clock. Used by tests to control correlation
    /// timestamps.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn pool(&self) -> &SlotPool {
        &self.pool
    }

    /// One scheduler iteration: connect, deliver, re-arm scanning.
    pub async fn tick(&mut self) {
        connection::connect_scanned(&mut self.pool, self.central.as_mut(), &self.service_uuid);
        self.delivery_pass().await;
        self.rearm_scanning();
    }

    /// Runs the tick loop forever with a fixed interval between
    /// iterations.
    pub async fn run(&mut self, interval: Duration) {
        loop {
            self.tick().await;
            tokio::time::sleep(interval).await;
        }
    }

    /// Encodes and posts every complete composite record, resetting each
    /// record afterwards whether or not its delivery succeeded.
    async fn delivery_pass(&mut self) {
        for index in 0..MAX_DEVICES {
            let (address, identity, complete) = match self.pool.get(index) {
                Some(slot) if slot.state == SlotState::Connected => {
                    let address = match slot.address {
                        Some(address) => address,
                        None => continue,
                    };
                    let identity = slot.identity.clone().unwrap_or_default();
                    let complete: Vec<usize> = slot
                        .ring
                        .iter()
                        .filter(|(_, record)| record.is_complete())
                        .map(|(j, _)| j)
                        .collect();
                    (address, identity, complete)
                }
                _ => continue,
            };

            for ring_index in complete {
                let slot = match self.pool.get_mut(index) {
                    Some(slot) => slot,
                    None => break,
                };
                let record = match slot.ring.get(ring_index).copied() {
                    Some(record) => record,
                    None => continue,
                };

                let payload = match senml::encode_record_json(
                    &address,
                    &identity,
                    &self.location,
                    &record,
                ) {
                    Ok(payload) => payload,
                    Err(error) => {
                        warn!(%address, %error, "failed to encode record, dropping it");
                        if let Some(record) = slot.ring.get_mut(ring_index) {
                            record.reset();
                        }
                        continue;
                    }
                };

                trace!(%address, ring_index, payload = %payload, "delivering record");
                if let Err(error) =
                    delivery::deliver(self.poster.as_ref(), slot, &payload, &self.delivery).await
                {
                    // The record is dropped either way; the slot stays
                    // intact for future readings.
                    warn!(%address, %error, "delivery failed, record dropped");
                }
                if let Some(record) = slot.ring.get_mut(ring_index) {
                    record.reset();
                }
            }
        }
    }

    /// Scanning must be re-armed after every connect attempt and every
    /// disconnect, otherwise freed slots are never refilled.
    fn rearm_scanning(&mut self) {
        self.central.set_scanning(self.pool.has_free_slot());
    }
}

impl BleEventSink for Gateway {
    fn on_discovered(&mut self, advertisement: &Advertisement) {
        if !advertisement.advertises_service {
            return;
        }
        let address = advertisement.address;
        if !self.pool.is_allowed(&address) {
            return;
        }
        if self.pool.find_by_address(&address).is_some() {
            return;
        }

        // Stop scanning before touching slot state.
        self.central.set_scanning(false);

        match self.pool.allocate(address) {
            Some(index) => info!(%address, index, "peer discovered"),
            None => error!(%address, "no free slot for discovered peer, dropping"),
        }
    }

    fn on_characteristic_notified(
        &mut self,
        handle: ConnectionHandle,
        kind: CharacteristicKind,
        value: u8,
    ) {
        // A notification must never race an in-progress discovery.
        self.central.set_scanning(false);

        let index = match self.pool.find_by_handle(handle) {
            Some(index) => index,
            None => {
                warn!(?handle, %kind, "notification for unknown connection, dropping");
                return;
            }
        };
        let timestamp = self.clock.now();

        if let Some(slot) = self.pool.get_mut(index) {
            let ring_index = slot.ring.next_index(timestamp);
            if let Some(record) = slot.ring.get_mut(ring_index) {
                match kind {
                    CharacteristicKind::Battery => record.set_battery(value),
                    CharacteristicKind::Temperature => record.set_temperature(value),
                    CharacteristicKind::Movement => record.set_movement(value),
                    CharacteristicKind::Button => record.set_button(value),
                }
            }
            trace!(timestamp, index, ring_index, %kind, value, "notification stored");
        }
    }

    fn on_disconnected(&mut self, handle: ConnectionHandle) {
        match self.pool.find_by_handle(handle) {
            Some(index) => {
                info!(index, "peer disconnected, releasing slot");
                self.pool.reset(index);
            }
            None => warn!(?handle, "disconnect for unknown connection"),
        }
    }
}
