//! ## procam-protocol::codec
//! Encodes callback events into messages and decodes them back, enforcing
//! the frozen wire layout:
//!
//! | Kind | Fields after token and opcode |
//! |---|---|
//! | Notify | i32 msg_type, i32 ext1, i32 ext2 |
//! | DataDelivered | i32 msg_type, handle, [i32 count, count x face]? |
//! | TimestampedDataDelivered | i64 timestamp, i32 msg_type, handle |
//! | LockStatusChanged | i32 status |
//! | ResultReceived | i32 frame_id, i32 size, size bytes |

use std::fmt;

use bytes::Bytes;
use tracing::trace;

use crate::error::{DecodeError, TransactionError};
use crate::kind::EventKind;
use crate::parcel::{ParcelReader, ParcelWriter};
use crate::payload::{
    BufferHandle, CallbackEvent, DataPayload, FaceRecord, LockStatus, LockStatusPayload,
    NotifyPayload, ResultPayload, TimestampedDataPayload, FACE_RECORD_SIZE,
};

/// Interface descriptor of the pro-camera callback interface.
pub const PRO_CAMERA_CALLBACKS_DESCRIPTOR: &str = "android.hardware.IProCameraCallbacks";

/// Policy word written ahead of the descriptor by default.
pub const STRICT_MODE_PENALTY_GATHER: i32 = 0x40 << 16;

/// One encoded transaction, immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    data: Bytes,
}

impl Message {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn from_hex(text: &str) -> Result<Self, hex::FromHexError> {
        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        Ok(Self::from_bytes(hex::decode(cleaned)?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn reader(&self) -> ParcelReader {
        ParcelReader::new(self.data.clone())
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("len", &self.data.len())
            .field("data", &self.to_hex())
            .finish()
    }
}

/// Identity marker heading every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceToken {
    pub policy: i32,
    pub descriptor: Option<String>,
}

impl InterfaceToken {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            policy: STRICT_MODE_PENALTY_GATHER,
            descriptor: Some(descriptor.into()),
        }
    }

    /// Checks the descriptor against the one this side implements. The
    /// policy word is carried but not enforced.
    pub fn enforce(&self, expected: &str) -> Result<(), TransactionError> {
        if self.descriptor.as_deref() == Some(expected) {
            return Ok(());
        }
        Err(TransactionError::ProtocolMismatch {
            expected: expected.to_string(),
            found: self.descriptor.clone(),
        })
    }

    fn write_to(&self, writer: &mut ParcelWriter) {
        writer.write_i32(self.policy);
        writer.write_string16(self.descriptor.as_deref());
    }
}

impl Default for InterfaceToken {
    fn default() -> Self {
        Self::new(PRO_CAMERA_CALLBACKS_DESCRIPTOR)
    }
}

/// Token and opcode, the two fields every message starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub token: InterfaceToken,
    pub opcode: u32,
}

impl MessageHeader {
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_opcode(self.opcode)
    }
}

/// Upper bounds on variable-length regions, checked before any allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_faces: usize,
    pub max_metadata_bytes: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_faces: 64,
            max_metadata_bytes: 1024 * 1024,
        }
    }
}

/// Reads the header of a message, returning a reader positioned at the
/// first payload field.
pub fn decode_header(message: &Message) -> Result<(MessageHeader, ParcelReader), DecodeError> {
    let mut reader = message.reader();
    let policy = reader.read_i32()?;
    let descriptor = reader.read_string16("interface token")?;
    let opcode = reader.read_u32()?;
    Ok((
        MessageHeader {
            token: InterfaceToken { policy, descriptor },
            opcode,
        },
        reader,
    ))
}

/// Decodes the body of a message whose kind is already known.
///
/// Does not check for trailing bytes; callers that own the whole message
/// should call [`ParcelReader::finish`] afterwards.
pub fn decode_payload(
    kind: EventKind,
    reader: &mut ParcelReader,
    limits: &DecodeLimits,
) -> Result<CallbackEvent, DecodeError> {
    let event = match kind {
        EventKind::Notify => CallbackEvent::Notify(NotifyPayload {
            msg_type: reader.read_i32()?,
            ext1: reader.read_i32()?,
            ext2: reader.read_i32()?,
        }),
        EventKind::DataDelivered => {
            let msg_type = reader.read_i32()?;
            let image = BufferHandle::read_from(reader)?;
            let faces = if reader.remaining() > 0 {
                Some(read_faces(reader, limits)?)
            } else {
                None
            };
            CallbackEvent::Data(DataPayload {
                msg_type,
                image,
                faces,
            })
        }
        EventKind::TimestampedDataDelivered => {
            CallbackEvent::TimestampedData(TimestampedDataPayload {
                timestamp: reader.read_i64()?,
                msg_type: reader.read_i32()?,
                image: BufferHandle::read_from(reader)?,
            })
        }
        EventKind::LockStatusChanged => CallbackEvent::LockStatusChanged(LockStatusPayload {
            status: LockStatus::from_raw(reader.read_i32()?),
        }),
        EventKind::ResultReceived => CallbackEvent::ResultReceived(ResultPayload {
            frame_id: reader.read_i32()?,
            metadata: reader.read_blob("metadata", limits.max_metadata_bytes)?,
        }),
    };
    Ok(event)
}

fn read_faces(
    reader: &mut ParcelReader,
    limits: &DecodeLimits,
) -> Result<Vec<FaceRecord>, DecodeError> {
    let declared = reader.read_i32()?;
    let count =
        usize::try_from(declared).map_err(|_| DecodeError::invalid_length("faces", declared))?;
    if count > limits.max_faces {
        return Err(DecodeError::invalid_length("faces", declared));
    }
    let region = reader.read_array("faces", count, FACE_RECORD_SIZE)?;
    Ok(region
        .chunks_exact(FACE_RECORD_SIZE)
        .map(FaceRecord::read_from)
        .collect())
}

/// Encoder and validating decoder for the callback interface.
#[derive(Debug, Clone, Default)]
pub struct CallbackCodec {
    token: InterfaceToken,
    limits: DecodeLimits,
}

impl CallbackCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.token.descriptor = Some(descriptor.into());
        self
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn token(&self) -> &InterfaceToken {
        &self.token
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// The descriptor incoming messages must carry.
    pub fn descriptor(&self) -> &str {
        self.token.descriptor.as_deref().unwrap_or_default()
    }

    fn begin(&self, kind: EventKind, body_hint: usize) -> ParcelWriter {
        let mut writer = ParcelWriter::with_capacity(64 + body_hint);
        self.token.write_to(&mut writer);
        writer.write_u32(kind.opcode());
        writer
    }

    pub fn encode_notify(&self, msg_type: i32, ext1: i32, ext2: i32) -> Message {
        let mut w = self.begin(EventKind::Notify, 12);
        w.write_i32(msg_type);
        w.write_i32(ext1);
        w.write_i32(ext2);
        Message::from_bytes(w.finish())
    }

    /// Faces are written as a count followed by the records; `None` omits
    /// the block entirely.
    pub fn encode_data(
        &self,
        msg_type: i32,
        image: &BufferHandle,
        faces: Option<&[FaceRecord]>,
    ) -> Message {
        let face_bytes = faces.map_or(0, |f| 4 + f.len() * FACE_RECORD_SIZE);
        let mut w = self.begin(
            EventKind::DataDelivered,
            4 + BufferHandle::WIRE_SIZE + face_bytes,
        );
        w.write_i32(msg_type);
        image.write_to(&mut w);
        if let Some(faces) = faces {
            debug_assert!(faces.len() <= i32::MAX as usize);
            w.write_i32(faces.len() as i32);
            for face in faces {
                face.write_to(&mut w);
            }
        }
        Message::from_bytes(w.finish())
    }

    pub fn encode_data_timestamp(
        &self,
        timestamp: i64,
        msg_type: i32,
        image: &BufferHandle,
    ) -> Message {
        let mut w = self.begin(
            EventKind::TimestampedDataDelivered,
            12 + BufferHandle::WIRE_SIZE,
        );
        w.write_i64(timestamp);
        w.write_i32(msg_type);
        image.write_to(&mut w);
        Message::from_bytes(w.finish())
    }

    pub fn encode_lock_status(&self, status: LockStatus) -> Message {
        let mut w = self.begin(EventKind::LockStatusChanged, 4);
        w.write_i32(status.as_raw());
        Message::from_bytes(w.finish())
    }

    /// An empty `metadata` slice is sent as size zero, meaning "no result
    /// metadata".
    pub fn encode_result(&self, frame_id: i32, metadata: &[u8]) -> Message {
        let mut w = self.begin(EventKind::ResultReceived, 8 + metadata.len());
        w.write_i32(frame_id);
        w.write_blob(metadata);
        Message::from_bytes(w.finish())
    }

    pub fn encode(&self, event: &CallbackEvent) -> Message {
        match event {
            CallbackEvent::Notify(p) => self.encode_notify(p.msg_type, p.ext1, p.ext2),
            CallbackEvent::Data(p) => self.encode_data(p.msg_type, &p.image, p.faces.as_deref()),
            CallbackEvent::TimestampedData(p) => {
                self.encode_data_timestamp(p.timestamp, p.msg_type, &p.image)
            }
            CallbackEvent::LockStatusChanged(p) => self.encode_lock_status(p.status),
            CallbackEvent::ResultReceived(p) => self.encode_result(p.frame_id, &p.metadata),
        }
    }

    /// Validates and decodes a complete message.
    ///
    /// The token is checked before the opcode, and the opcode before any
    /// payload byte is read. A descriptor that is not valid UTF-16 cannot
    /// name this interface and is reported as a mismatch. Nothing partially
    /// decoded is ever returned.
    pub fn decode(&self, message: &Message) -> Result<CallbackEvent, TransactionError> {
        let (header, mut reader) = match decode_header(message) {
            Ok(parsed) => parsed,
            Err(DecodeError::InvalidString(_)) => {
                return Err(TransactionError::ProtocolMismatch {
                    expected: self.descriptor().to_string(),
                    found: None,
                })
            }
            Err(e) => return Err(e.into()),
        };
        header.token.enforce(self.descriptor())?;
        let kind = header
            .kind()
            .ok_or(TransactionError::UnknownOperation(header.opcode))?;
        let event = decode_payload(kind, &mut reader, &self.limits)?;
        reader.finish()?;
        trace!(kind = %kind, len = message.len(), "decoded callback transaction");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faces(n: usize) -> Vec<FaceRecord> {
        (0..n as i32)
            .map(|i| FaceRecord {
                rect: [i, i + 1, i + 100, i + 101],
                score: 90 - i,
                id: i,
                left_eye: [i + 10, i + 20],
                right_eye: [i + 30, i + 20],
                mouth: [i + 20, i + 60],
            })
            .collect()
    }

    fn handle() -> BufferHandle {
        BufferHandle::new(7, 4096, 640 * 480)
    }

    #[test]
    fn test_notify_scenario() {
        let codec = CallbackCodec::new();
        let message = codec.encode_notify(3, -1, 42);
        assert_eq!(
            codec.decode(&message).unwrap(),
            CallbackEvent::Notify(NotifyPayload {
                msg_type: 3,
                ext1: -1,
                ext2: 42
            })
        );
    }

    #[test]
    fn test_header_layout() {
        let codec = CallbackCodec::new();
        let message = codec.encode_lock_status(LockStatus::Stolen);
        let (header, mut reader) = decode_header(&message).unwrap();
        assert_eq!(header.token, InterfaceToken::default());
        assert_eq!(header.opcode, 4);
        assert_eq!(header.kind(), Some(EventKind::LockStatusChanged));
        assert_eq!(reader.read_i32().unwrap(), 2);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_data_with_two_faces() {
        let codec = CallbackCodec::new();
        let sent = faces(2);
        let message = codec.encode_data(1, &handle(), Some(sent.as_slice()));
        match codec.decode(&message).unwrap() {
            CallbackEvent::Data(p) => {
                assert_eq!(p.msg_type, 1);
                assert_eq!(p.image, handle());
                assert_eq!(p.faces, Some(sent));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_data_face_block_presence_round_trips() {
        let codec = CallbackCodec::new();
        for faces in [None, Some(vec![])] {
            let event = CallbackEvent::Data(DataPayload {
                msg_type: 16,
                image: handle(),
                faces,
            });
            assert_eq!(codec.decode(&codec.encode(&event)).unwrap(), event);
        }
        // An explicit zero count costs exactly four bytes over no block.
        let without = codec.encode_data(16, &handle(), None);
        let with_zero = codec.encode_data(16, &handle(), Some(&[][..]));
        assert_eq!(with_zero.len(), without.len() + 4);
    }

    #[test]
    fn test_result_scenario_keeps_blob_opaque() {
        let codec = CallbackCodec::new();
        let blob: Vec<u8> = (0u8..=10).collect();
        let message = codec.encode_result(7, &blob);
        match codec.decode(&message).unwrap() {
            CallbackEvent::ResultReceived(p) => {
                assert_eq!(p.frame_id, 7);
                assert_eq!(p.metadata.as_ref(), blob.as_slice());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_timestamped_round_trip() {
        let codec = CallbackCodec::new();
        let event = CallbackEvent::TimestampedData(TimestampedDataPayload {
            timestamp: i64::MIN + 1,
            msg_type: 0x10,
            image: handle(),
        });
        assert_eq!(codec.decode(&codec.encode(&event)).unwrap(), event);
    }

    #[test]
    fn test_foreign_token_is_mismatch() {
        let sender = CallbackCodec::new().with_descriptor("android.hardware.ICameraClient");
        let receiver = CallbackCodec::new();
        let err = receiver
            .decode(&sender.encode_notify(1, 2, 3))
            .unwrap_err();
        assert_eq!(
            err,
            TransactionError::ProtocolMismatch {
                expected: PRO_CAMERA_CALLBACKS_DESCRIPTOR.into(),
                found: Some("android.hardware.ICameraClient".into()),
            }
        );
    }

    #[test]
    fn test_null_token_is_mismatch() {
        let mut w = ParcelWriter::new();
        w.write_i32(0);
        w.write_string16(None);
        w.write_u32(1);
        let err = CallbackCodec::new()
            .decode(&Message::from_bytes(w.finish()))
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionError::ProtocolMismatch { found: None, .. }
        ));
    }

    #[test]
    fn test_unknown_opcode() {
        let mut w = ParcelWriter::new();
        InterfaceToken::default().write_to(&mut w);
        w.write_u32(6);
        w.write_i32(0);
        let err = CallbackCodec::new()
            .decode(&Message::from_bytes(w.finish()))
            .unwrap_err();
        assert_eq!(err, TransactionError::UnknownOperation(6));
    }

    #[test]
    fn test_face_count_without_bytes_is_truncated() {
        let codec = CallbackCodec::new();
        let mut w = codec.begin(EventKind::DataDelivered, 0);
        w.write_i32(1);
        handle().write_to(&mut w);
        w.write_i32(3);
        FaceRecord::default().write_to(&mut w);
        let err = codec.decode(&Message::from_bytes(w.finish())).unwrap_err();
        assert_eq!(
            err,
            TransactionError::Decode(DecodeError::Truncated {
                needed: 3 * FACE_RECORD_SIZE,
                available: FACE_RECORD_SIZE
            })
        );
    }

    #[test]
    fn test_face_bytes_with_zero_count_rejected() {
        let codec = CallbackCodec::new();
        let mut w = codec.begin(EventKind::DataDelivered, 0);
        w.write_i32(1);
        handle().write_to(&mut w);
        w.write_i32(0);
        FaceRecord::default().write_to(&mut w);
        let err = codec.decode(&Message::from_bytes(w.finish())).unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Decode(DecodeError::InvalidLength {
                field: "trailing bytes",
                ..
            })
        ));
    }

    #[test]
    fn test_negative_face_count() {
        let codec = CallbackCodec::new();
        let mut w = codec.begin(EventKind::DataDelivered, 0);
        w.write_i32(1);
        handle().write_to(&mut w);
        w.write_i32(-1);
        let err = codec.decode(&Message::from_bytes(w.finish())).unwrap_err();
        assert_eq!(
            err,
            TransactionError::Decode(DecodeError::InvalidLength {
                field: "faces",
                value: -1
            })
        );
    }

    #[test]
    fn test_face_limit_enforced_before_read() {
        let codec = CallbackCodec::new().with_limits(DecodeLimits {
            max_faces: 1,
            ..DecodeLimits::default()
        });
        let message = codec.encode_data(1, &handle(), Some(faces(2).as_slice()));
        assert_eq!(
            codec.decode(&message).unwrap_err(),
            TransactionError::Decode(DecodeError::InvalidLength {
                field: "faces",
                value: 2
            })
        );
    }

    #[test]
    fn test_metadata_limit_enforced() {
        let codec = CallbackCodec::new().with_limits(DecodeLimits {
            max_metadata_bytes: 8,
            ..DecodeLimits::default()
        });
        let message = codec.encode_result(1, &[0xAB; 9]);
        assert!(matches!(
            codec.decode(&message),
            Err(TransactionError::Decode(DecodeError::InvalidLength {
                field: "metadata",
                value: 9
            }))
        ));
    }

    #[test]
    fn test_truncated_notify() {
        let codec = CallbackCodec::new();
        let full = codec.encode_notify(1, 2, 3).into_bytes();
        let cut = Message::from_bytes(full.slice(..full.len() - 2));
        assert!(matches!(
            codec.decode(&cut),
            Err(TransactionError::Decode(DecodeError::Truncated { .. }))
        ));
    }

    #[test]
    fn test_every_lock_status_round_trips() {
        let codec = CallbackCodec::new();
        for raw in [i32::MIN, -1, 0, 1, 2, 3, i32::MAX] {
            let status = LockStatus::from_raw(raw);
            let back = codec.decode(&codec.encode_lock_status(status)).unwrap();
            assert_eq!(
                back,
                CallbackEvent::LockStatusChanged(LockStatusPayload { status })
            );
        }
    }

    #[test]
    fn test_hex_round_trip() {
        let codec = CallbackCodec::new();
        let message = codec.encode_lock_status(LockStatus::Acquired);
        let parsed = Message::from_hex(&message.to_hex()).unwrap();
        assert_eq!(parsed, message);
        assert!(Message::from_hex("zz").is_err());
    }
}
