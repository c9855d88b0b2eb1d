//! ## procam-protocol::payload
//! Decoded forms of the five callback events.

use std::ops::Range;

use bytes::{Buf, Bytes};

use crate::error::DecodeError;
use crate::kind::EventKind;
use crate::parcel::{ParcelReader, ParcelWriter};

/// Size of one face record on the wire: twelve i32 words.
pub const FACE_RECORD_SIZE: usize = FaceRecord::WORDS * 4;

/// Geometry of one detected face, in sensor coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FaceRecord {
    /// left, top, right, bottom
    pub rect: [i32; 4],
    pub score: i32,
    pub id: i32,
    pub left_eye: [i32; 2],
    pub right_eye: [i32; 2],
    pub mouth: [i32; 2],
}

impl FaceRecord {
    pub const WORDS: usize = 12;

    pub fn to_words(&self) -> [i32; Self::WORDS] {
        let [l, t, r, b] = self.rect;
        [
            l,
            t,
            r,
            b,
            self.score,
            self.id,
            self.left_eye[0],
            self.left_eye[1],
            self.right_eye[0],
            self.right_eye[1],
            self.mouth[0],
            self.mouth[1],
        ]
    }

    pub fn from_words(w: [i32; Self::WORDS]) -> Self {
        Self {
            rect: [w[0], w[1], w[2], w[3]],
            score: w[4],
            id: w[5],
            left_eye: [w[6], w[7]],
            right_eye: [w[8], w[9]],
            mouth: [w[10], w[11]],
        }
    }

    pub(crate) fn write_to(&self, writer: &mut ParcelWriter) {
        for word in self.to_words() {
            writer.write_i32(word);
        }
    }

    /// Reads one record from a slice of exactly [`FACE_RECORD_SIZE`] bytes.
    pub(crate) fn read_from(mut record: &[u8]) -> Self {
        debug_assert_eq!(record.len(), FACE_RECORD_SIZE);
        let mut words = [0i32; Self::WORDS];
        for word in words.iter_mut() {
            *word = record.get_i32_le();
        }
        Self::from_words(words)
    }
}

/// Reference to a region of a shared heap owned by the sending side.
///
/// A handle carries no bytes and grants no ownership; it must be resolved
/// through a buffer resolver to obtain a read-only view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    pub heap_id: u64,
    pub offset: u32,
    pub size: u32,
}

impl BufferHandle {
    pub const WIRE_SIZE: usize = 16;

    pub fn new(heap_id: u64, offset: u32, size: u32) -> Self {
        Self {
            heap_id,
            offset,
            size,
        }
    }

    /// Byte range inside the heap, or `None` if `offset + size` overflows.
    pub fn range(&self) -> Option<Range<usize>> {
        let start = usize::try_from(self.offset).ok()?;
        let end = start.checked_add(usize::try_from(self.size).ok()?)?;
        Some(start..end)
    }

    pub(crate) fn write_to(&self, writer: &mut ParcelWriter) {
        writer.write_u64(self.heap_id);
        writer.write_u32(self.offset);
        writer.write_u32(self.size);
    }

    pub(crate) fn read_from(reader: &mut ParcelReader) -> Result<Self, DecodeError> {
        Ok(Self {
            heap_id: reader.read_u64()?,
            offset: reader.read_u32()?,
            size: reader.read_u32()?,
        })
    }
}

/// Camera lock state reported by the service.
///
/// Values outside the three assigned ones are service-defined and are
/// carried through unchanged as `Other`. Every raw value has exactly one
/// representation, so `from_raw(s.as_raw()) == s` for any status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockStatus {
    Acquired,
    Released,
    Stolen,
    Other(UnassignedLockStatus),
}

/// A lock status value outside the assigned range 0..=2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnassignedLockStatus(i32);

impl UnassignedLockStatus {
    /// Returns `None` for the assigned values.
    pub fn new(raw: i32) -> Option<Self> {
        (!(0..=2).contains(&raw)).then_some(Self(raw))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl LockStatus {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => LockStatus::Acquired,
            1 => LockStatus::Released,
            2 => LockStatus::Stolen,
            other => LockStatus::Other(UnassignedLockStatus(other)),
        }
    }

    pub fn as_raw(&self) -> i32 {
        match self {
            LockStatus::Acquired => 0,
            LockStatus::Released => 1,
            LockStatus::Stolen => 2,
            LockStatus::Other(raw) => raw.get(),
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, LockStatus::Acquired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyPayload {
    pub msg_type: i32,
    pub ext1: i32,
    pub ext2: i32,
}

/// Image delivery with optional face metadata.
///
/// `faces: None` sends no face block at all; `Some(vec![])` sends an
/// explicit count of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPayload {
    pub msg_type: i32,
    pub image: BufferHandle,
    pub faces: Option<Vec<FaceRecord>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampedDataPayload {
    /// Nanoseconds, in the service's clock domain.
    pub timestamp: i64,
    pub msg_type: i32,
    pub image: BufferHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockStatusPayload {
    pub status: LockStatus,
}

/// Capture result for one frame.
///
/// The metadata blob is framed but never interpreted here. An empty blob
/// means the service sent no metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPayload {
    pub frame_id: i32,
    pub metadata: Bytes,
}

impl ResultPayload {
    pub fn metadata(&self) -> Option<&[u8]> {
        (!self.metadata.is_empty()).then_some(self.metadata.as_ref())
    }
}

/// One decoded callback transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    Notify(NotifyPayload),
    Data(DataPayload),
    TimestampedData(TimestampedDataPayload),
    LockStatusChanged(LockStatusPayload),
    ResultReceived(ResultPayload),
}

impl CallbackEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CallbackEvent::Notify(_) => EventKind::Notify,
            CallbackEvent::Data(_) => EventKind::DataDelivered,
            CallbackEvent::TimestampedData(_) => EventKind::TimestampedDataDelivered,
            CallbackEvent::LockStatusChanged(_) => EventKind::LockStatusChanged,
            CallbackEvent::ResultReceived(_) => EventKind::ResultReceived,
        }
    }
}
