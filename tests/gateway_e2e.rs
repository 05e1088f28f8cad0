//! End-to-end scenario through the public API: discovery, connection,
//! four correlated notifications, SenML encoding and a single POST.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ble_senml_gateway::domain::settings::Settings;
use ble_senml_gateway::infrastructure::ble::{BleCentral, BleError, BleEventSink};
use ble_senml_gateway::infrastructure::clock::Clock;
use ble_senml_gateway::infrastructure::http::{HttpError, HttpPoster, PostResponse};
use ble_senml_gateway::{
    Advertisement, CharacteristicKind, ConnectionHandle, Gateway, LocationEstimate, PeerAddress,
};
use ble_senml_gateway::domain::models::CharacteristicHandle;

#[derive(Clone, Default)]
struct ScriptedCentral {
    state: Arc<Mutex<CentralState>>,
}

#[derive(Default)]
struct CentralState {
    scanning: bool,
    next_handle: u16,
}

impl BleCentral for ScriptedCentral {
    fn set_scanning(&mut self, enabled: bool) {
        self.state.lock().unwrap().scanning = enabled;
    }

    fn connect(&mut self, _address: PeerAddress) -> Result<ConnectionHandle, BleError> {
        let mut state = self.state.lock().unwrap();
        state.next_handle += 1;
        Ok(ConnectionHandle(state.next_handle))
    }

    fn disconnect(&mut self, _handle: ConnectionHandle) {}

    fn resolve_service(
        &mut self,
        _handle: ConnectionHandle,
        _service_uuid: &str,
    ) -> Result<(), BleError> {
        Ok(())
    }

    fn read_descriptor(&mut self, _handle: ConnectionHandle) -> Result<Option<String>, BleError> {
        Ok(Some("xi=dev-123;collector.example/ingest".to_string()))
    }

    fn subscribe(
        &mut self,
        _handle: ConnectionHandle,
        kind: CharacteristicKind,
    ) -> Result<CharacteristicHandle, BleError> {
        Ok(CharacteristicHandle(kind.uuid16()))
    }
}

#[derive(Clone, Default)]
struct RecordingPoster {
    posts: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl HttpPoster for RecordingPoster {
    async fn post_json(&self, url: &str, body: &str) -> Result<PostResponse, HttpError> {
        self.posts
            .lock()
            .unwrap()
            .push((url.to_string(), body.to_string()));
        Ok(PostResponse {
            status: 200,
            location: None,
        })
    }
}

/// Clock that replays a fixed sequence of timestamps, then keeps returning
/// the last one.
struct SequenceClock {
    times: Mutex<Vec<u64>>,
    last: u64,
}

impl SequenceClock {
    fn new(times: Vec<u64>, last: u64) -> Self {
        Self {
            times: Mutex::new(times),
            last,
        }
    }
}

impl Clock for SequenceClock {
    fn now(&self) -> u64 {
        let mut times = self.times.lock().unwrap();
        if times.is_empty() {
            self.last
        } else {
            times.remove(0)
        }
    }
}

#[tokio::test]
async fn four_notifications_within_a_second_become_one_post() {
    let address: PeerAddress = "68:72:c3:eb:8e:a9".parse().unwrap();
    let mut settings = Settings::default();
    settings.devices = vec![address.to_string()];
    settings.delivery.retry_delay_ms = 0;

    let central = ScriptedCentral::default();
    let poster = RecordingPoster::default();
    let base = 1_700_000_000u64;
    // The four sub-readings land within one time unit of each other.
    let clock = SequenceClock::new(vec![base, base, base + 1, base + 1], base + 1);

    let mut gateway = Gateway::new(
        &settings,
        Some(LocationEstimate {
            latitude: 48.2,
            longitude: 16.37,
            accuracy: 40,
        }),
        Box::new(central.clone()),
        Box::new(poster.clone()),
    )
    .unwrap()
    .with_clock(Box::new(clock));

    // Discovery fills slot 0; the first tick connects and subscribes.
    gateway.on_discovered(&Advertisement {
        address,
        advertises_service: true,
    });
    gateway.tick().await;
    let handle = gateway.pool().get(0).unwrap().handle.unwrap();

    // All connection handlers and the tick run through one &mut gateway:
    // the single-context invariant the aggregation rings depend on.
    gateway.on_characteristic_notified(handle, CharacteristicKind::Battery, 80);
    gateway.on_characteristic_notified(handle, CharacteristicKind::Temperature, 21);
    gateway.on_characteristic_notified(handle, CharacteristicKind::Movement, 1);
    gateway.on_characteristic_notified(handle, CharacteristicKind::Button, 0);
    gateway.tick().await;

    let posts = poster.posts.lock().unwrap().clone();
    assert_eq!(posts.len(), 1, "exactly one POST for one composite record");

    let (url, body) = &posts[0];
    assert_eq!(url, "https://collector.example/ingest");

    let entries: serde_json::Value = serde_json::from_str(body).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 7);

    // Base name derives from the masked slot address; base time is the
    // correlated capture timestamp.
    assert_eq!(entries[0]["bn"], "urn:dev:mac:6872c3ffffeb8ea9:");
    assert_eq!(entries[0]["bt"], base as f64);
    assert_eq!(entries[0]["n"], "batt");
    assert_eq!(entries[0]["v"], 80.0);
    assert_eq!(entries[1]["vs"], "dev-123");
    assert_eq!(entries[2]["u"], "lat");
    assert_eq!(entries[3]["u"], "lon");
    assert_eq!(entries[4]["v"], 21.0);
    assert_eq!(entries[5]["vb"], true);
    assert_eq!(entries[6]["vb"], false);

    // Delivered records are destroyed: a second tick posts nothing new.
    gateway.tick().await;
    assert_eq!(poster.posts.lock().unwrap().len(), 1);
}
