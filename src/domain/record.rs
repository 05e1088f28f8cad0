//! Composite record aggregation.
//!
//! The four sensor characteristics of one peer arrive as independent,
//! unordered notifications with no shared sequence number. The only
//! available correlation key is the coarse capture timestamp plus a small
//! tolerance window, so several physical events may be assembling at once.
//! A fixed ring of records per device keeps them apart.

use tracing::warn;

use crate::domain::models::MAX_POOL;

/// Seconds two notifications may differ by and still belong to the same
/// physical event.
pub const CORRELATION_WINDOW_SECS: i64 = 3;

/// One physically-correlated reading, assembled from up to four
/// notifications. A field, once set, is immutable until the record is
/// reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeRecord {
    /// Capture timestamp (epoch seconds). `None` marks an unused entry.
    pub timestamp: Option<u64>,
    pub battery: Option<u8>,
    pub temperature: Option<u8>,
    pub movement: Option<u8>,
    pub button: Option<u8>,
}

impl CompositeRecord {
    /// Complete iff all four fields are present.
    pub fn is_complete(&self) -> bool {
        self.battery.is_some()
            && self.temperature.is_some()
            && self.movement.is_some()
            && self.button.is_some()
    }

    pub fn set_battery(&mut self, value: u8) {
        if self.battery.is_none() {
            self.battery = Some(value);
        }
    }

    pub fn set_temperature(&mut self, value: u8) {
        if self.temperature.is_none() {
            self.temperature = Some(value);
        }
    }

    pub fn set_movement(&mut self, value: u8) {
        if self.movement.is_none() {
            self.movement = Some(value);
        }
    }

    pub fn set_button(&mut self, value: u8) {
        if self.button.is_none() {
            self.button = Some(value);
        }
    }

    pub fn reset(&mut self) {
        *self = CompositeRecord::default();
    }
}

/// Fixed-capacity ring of in-flight composite records for one device.
#[derive(Debug, Clone)]
pub struct RecordRing {
    records: [CompositeRecord; MAX_POOL],
}

impl Default for RecordRing {
    fn default() -> Self {
        Self {
            records: [CompositeRecord::default(); MAX_POOL],
        }
    }
}

impl RecordRing {
    /// Returns the index of the record a reading captured at `timestamp`
    /// belongs to, stamping a fresh entry if needed.
    ///
    /// An incomplete entry within the correlation window is the same
    /// physical event, still assembling. A complete entry within the
    /// window is skipped: a new event may legitimately start inside the
    /// window. If every entry is stamped and none matches, the whole ring
    /// is sacrificed to restore forward progress.
    pub fn next_index(&mut self, timestamp: u64) -> usize {
        for (i, record) in self.records.iter_mut().enumerate() {
            match record.timestamp {
                Some(stamped) => {
                    if (timestamp as i64 - stamped as i64).abs() < CORRELATION_WINDOW_SECS {
                        if record.is_complete() {
                            continue;
                        }
                        return i;
                    }
                }
                None => {
                    record.timestamp = Some(timestamp);
                    return i;
                }
            }
        }

        // The ring is exhausted: the device is not draining. Drop every
        // in-flight partial record rather than stall.
        warn!("record ring exhausted, sacrificing in-flight records");
        for record in self.records.iter_mut() {
            record.reset();
        }
        self.records[0].timestamp = Some(timestamp);
        0
    }

    pub fn get(&self, index: usize) -> Option<&CompositeRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CompositeRecord> {
        self.records.get_mut(index)
    }

    /// Iterate over `(index, record)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &CompositeRecord)> {
        self.records.iter().enumerate()
    }

    pub fn reset(&mut self) {
        for record in self.records.iter_mut() {
            record.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_are_idempotent() {
        let mut record = CompositeRecord::default();
        record.set_battery(80);
        record.set_battery(10);
        assert_eq!(record.battery, Some(80));

        record.set_temperature(21);
        record.set_temperature(99);
        assert_eq!(record.temperature, Some(21));

        record.set_movement(1);
        record.set_movement(0);
        assert_eq!(record.movement, Some(1));

        record.set_button(0);
        record.set_button(1);
        assert_eq!(record.button, Some(0));
    }

    #[test]
    fn test_complete_iff_all_four_present() {
        // All 16 presence combinations.
        for mask in 0u8..16 {
            let mut record = CompositeRecord::default();
            if mask & 0b0001 != 0 {
                record.set_battery(1);
            }
            if mask & 0b0010 != 0 {
                record.set_temperature(1);
            }
            if mask & 0b0100 != 0 {
                record.set_movement(1);
            }
            if mask & 0b1000 != 0 {
                record.set_button(1);
            }
            assert_eq!(record.is_complete(), mask == 0b1111, "mask {:04b}", mask);
        }
    }

    #[test]
    fn test_reset_clears_all_fields() {
        let mut record = CompositeRecord::default();
        record.timestamp = Some(100);
        record.set_battery(1);
        record.set_temperature(2);
        record.set_movement(3);
        record.set_button(4);
        record.reset();
        assert!(record.timestamp.is_none());
        assert!(record.battery.is_none());
        assert!(!record.is_complete());
    }

    #[test]
    fn test_next_index_groups_within_window() {
        let mut ring = RecordRing::default();
        let first = ring.next_index(1000);
        assert_eq!(first, 0);
        // Readings within the window route to the same incomplete entry.
        assert_eq!(ring.next_index(1001), first);
        assert_eq!(ring.next_index(1002), first);
        // Outside the window a new entry is stamped.
        let second = ring.next_index(1003);
        assert_ne!(second, first);
    }

    #[test]
    fn test_next_index_skips_complete_entry_within_window() {
        let mut ring = RecordRing::default();
        let first = ring.next_index(1000);
        {
            let record = ring.get_mut(first).unwrap();
            record.set_battery(1);
            record.set_temperature(2);
            record.set_movement(3);
            record.set_button(4);
            assert!(record.is_complete());
        }
        // Same window, but the event is complete: a new one starts.
        let second = ring.next_index(1001);
        assert_ne!(second, first);
        assert_eq!(ring.get(second).unwrap().timestamp, Some(1001));
    }

    #[test]
    fn test_next_index_resets_exhausted_ring() {
        let mut ring = RecordRing::default();
        // Fill every entry with incomplete records far enough apart that
        // nothing correlates.
        for i in 0..MAX_POOL {
            let idx = ring.next_index(1000 + (i as u64) * 10);
            ring.get_mut(idx).unwrap().set_battery(1);
        }
        // Nothing matches, nothing is free: the ring restarts at 0.
        let idx = ring.next_index(5000);
        assert_eq!(idx, 0);
        let record = ring.get(0).unwrap();
        assert_eq!(record.timestamp, Some(5000));
        assert!(record.battery.is_none());
        // Every other entry was sacrificed too.
        for i in 1..MAX_POOL {
            assert!(ring.get(i).unwrap().timestamp.is_none());
        }
    }
}
