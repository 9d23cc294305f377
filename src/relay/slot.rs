//! Single-item hand-off buffer between capture callback and forwarding loop.

use parking_lot::Mutex;

struct SlotState<T> {
    payload: Vec<T>,
    fresh: bool,
}

/// A mutually exclusive, overwrite-on-arrival holding cell for the most
/// recent frame of one stream.
///
/// Written exclusively by the sensor callback, read-and-cleared exclusively
/// by the forwarding loop. There is no queueing: if the reader falls behind,
/// older unconsumed payloads are silently overwritten (latest-frame-wins).
///
/// The payload copy in [`FrameSlot::write`] always completes before the
/// fresh flag becomes observable, so a reader can never see a partially
/// written buffer.
pub struct FrameSlot<T> {
    inner: Mutex<SlotState<T>>,
}

impl<T: Copy + Default> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SlotState {
                payload: Vec::new(),
                fresh: false,
            }),
        }
    }

    /// Copy `payload` into the slot and mark it fresh.
    ///
    /// The backing storage is resized on first use or on a size change and
    /// keeps its length otherwise. Bounded: constant plus copy time.
    pub fn write(&self, payload: &[T]) {
        let mut state = self.inner.lock();
        if state.payload.len() != payload.len() {
            state.payload.resize(payload.len(), T::default());
        }
        state.payload.copy_from_slice(payload);
        state.fresh = true;
    }

    /// Copy out the payload and clear the fresh flag, or return `None` when
    /// nothing new arrived since the last take.
    pub fn take_if_fresh(&self) -> Option<Vec<T>> {
        let mut state = self.inner.lock();
        if !state.fresh {
            return None;
        }
        state.fresh = false;
        Some(state.payload.clone())
    }

    /// Whether an unconsumed payload is present.
    pub fn is_fresh(&self) -> bool {
        self.inner.lock().fresh
    }
}

impl<T: Copy + Default> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn empty_slot_yields_nothing() {
        let slot: FrameSlot<u8> = FrameSlot::new();
        assert!(!slot.is_fresh());
        assert!(slot.take_if_fresh().is_none());
    }

    #[test]
    fn write_then_take_returns_exact_bytes() {
        let slot = FrameSlot::new();
        slot.write(&[1u8, 2, 3, 4]);
        assert_eq!(slot.take_if_fresh(), Some(vec![1, 2, 3, 4]));
        // Immediately afterwards the slot is stale again
        assert_eq!(slot.take_if_fresh(), None);
    }

    #[test]
    fn latest_write_wins() {
        let slot = FrameSlot::new();
        slot.write(&[1u8; 8]);
        slot.write(&[2u8; 8]);
        assert_eq!(slot.take_if_fresh(), Some(vec![2u8; 8]));
        assert_eq!(slot.take_if_fresh(), None);
    }

    #[test]
    fn slot_resizes_on_payload_size_change() {
        let slot = FrameSlot::new();
        slot.write(&[7u8; 4]);
        slot.write(&[8u8; 16]);
        assert_eq!(slot.take_if_fresh(), Some(vec![8u8; 16]));
    }

    #[test]
    fn depth_samples_round_trip() {
        let slot = FrameSlot::new();
        let samples: Vec<u16> = (0..2048).collect();
        slot.write(&samples);
        assert_eq!(slot.take_if_fresh(), Some(samples));
    }

    #[test]
    fn write_marks_fresh_after_full_copy() {
        let slot = FrameSlot::new();
        slot.write(&[5u8; 32]);
        assert!(slot.is_fresh());
        let taken = slot.take_if_fresh().unwrap();
        assert_eq!(taken.len(), 32);
        assert!(!slot.is_fresh());
    }

    #[test]
    fn concurrent_writer_and_reader_never_tear() {
        let slot = Arc::new(FrameSlot::new());
        let writer_slot = Arc::clone(&slot);

        let writer = std::thread::spawn(move || {
            for round in 0..500u16 {
                // Each payload is uniform, so a torn copy would show up as
                // mixed values on the reader side.
                writer_slot.write(&[round; 64]);
            }
        });

        let mut observed = 0u32;
        while observed < 100 {
            if let Some(payload) = slot.take_if_fresh() {
                assert_eq!(payload.len(), 64);
                let first = payload[0];
                assert!(payload.iter().all(|&v| v == first));
                observed += 1;
            }
            if writer.is_finished() {
                break;
            }
        }
        writer.join().unwrap();
    }

    #[test]
    fn slot_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrameSlot<u8>>();
        assert_send_sync::<FrameSlot<u16>>();
    }
}
