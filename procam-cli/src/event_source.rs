//! Seeded generator of callback events for loopback sessions.
//!
//! The same seed always yields the same event sequence, so a failing session
//! can be replayed exactly.

use bytes::Bytes;
use procam_core::buffer::SharedMemoryPool;
use procam_core::ResolveError;
use procam_protocol::{
    BufferHandle, CallbackEvent, DataPayload, FaceRecord, LockStatus, LockStatusPayload,
    NotifyPayload, ResultPayload, TimestampedDataPayload,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FRAME_HEAP_BYTES: usize = 64 * 1024;
const MAX_FRAME_BYTES: usize = 4096;
const MAX_FACES: usize = 8;
const MAX_METADATA_BYTES: usize = 256;

/// Image events reference random regions of a single frame heap, registered
/// on first use and returned to the pool by [`RandomEventSource::release`].
pub struct RandomEventSource {
    rng: StdRng,
    timestamp: i64,
    frame_heap: Option<u64>,
}

impl RandomEventSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            timestamp: 0,
            frame_heap: None,
        }
    }

    /// Produces the next event. Image events point into the frame heap in `pool`.
    pub fn next_event(&mut self, pool: &SharedMemoryPool) -> Result<CallbackEvent, ResolveError> {
        let event = match self.rng.random_range(0..5) {
            0 => CallbackEvent::Notify(NotifyPayload {
                msg_type: self.rng.random_range(1..=0x800),
                ext1: self.rng.random(),
                ext2: self.rng.random(),
            }),
            1 => {
                let faces = self.rng.random_bool(0.5).then(|| {
                    let count = self.rng.random_range(0..=MAX_FACES);
                    (0..count).map(|id| self.face(id as i32)).collect()
                });
                CallbackEvent::Data(DataPayload {
                    msg_type: 0x10,
                    image: self.frame(pool)?,
                    faces,
                })
            }
            2 => {
                self.timestamp += self.rng.random_range(16_000_000..34_000_000);
                CallbackEvent::TimestampedData(TimestampedDataPayload {
                    timestamp: self.timestamp,
                    msg_type: 0x20,
                    image: self.frame(pool)?,
                })
            }
            3 => CallbackEvent::LockStatusChanged(LockStatusPayload {
                status: LockStatus::from_raw(self.rng.random_range(0..4)),
            }),
            _ => {
                let len = self.rng.random_range(0..=MAX_METADATA_BYTES);
                CallbackEvent::ResultReceived(ResultPayload {
                    frame_id: self.rng.random_range(0..i32::MAX),
                    metadata: Bytes::from(self.bytes(len)),
                })
            }
        };
        Ok(event)
    }

    /// Drops the frame heap. Call once every event has been dispatched.
    pub fn release(&mut self, pool: &SharedMemoryPool) {
        if let Some(heap) = self.frame_heap.take() {
            pool.release(heap);
        }
    }

    fn frame(&mut self, pool: &SharedMemoryPool) -> Result<BufferHandle, ResolveError> {
        let heap = match self.frame_heap {
            Some(heap) => heap,
            None => {
                let heap = pool.register(self.bytes(FRAME_HEAP_BYTES));
                self.frame_heap = Some(heap);
                heap
            }
        };
        let len = self.rng.random_range(1..=MAX_FRAME_BYTES);
        let offset = self.rng.random_range(0..=FRAME_HEAP_BYTES - len);
        // Both bounds are far below u32::MAX.
        pool.allocate(heap, offset as u32, len as u32)
    }

    fn face(&mut self, id: i32) -> FaceRecord {
        let x = self.rng.random_range(-1000..900);
        let y = self.rng.random_range(-1000..900);
        FaceRecord {
            rect: [x, y, x + 100, y + 100],
            score: self.rng.random_range(1..=100),
            id,
            left_eye: [x + 30, y + 30],
            right_eye: [x + 70, y + 30],
            mouth: [x + 50, y + 75],
        }
    }

    fn bytes(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.rng.fill(buf.as_mut_slice());
        buf
    }
}
