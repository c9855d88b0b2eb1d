//! # Pro-Camera Callback Protocol
//!
//! Wire codec for the one-way callback channel a camera service uses to
//! notify its clients: status notices, image deliveries, timestamped frames,
//! lock-state changes and capture results.
//!
//! Decoding is fail-closed. Every count and size is checked against the
//! bytes actually present before it is used, and variable regions are
//! returned as zero-copy slices of the received message.

pub mod codec;
pub mod error;
pub mod kind;
pub mod parcel;
pub mod payload;

pub use codec::{
    decode_header, decode_payload, CallbackCodec, DecodeLimits, InterfaceToken, Message,
    MessageHeader, PRO_CAMERA_CALLBACKS_DESCRIPTOR,
};
pub use error::{DecodeError, TransactionError};
pub use kind::EventKind;
pub use parcel::{ParcelReader, ParcelWriter};
pub use payload::{
    BufferHandle, CallbackEvent, DataPayload, FaceRecord, LockStatus, LockStatusPayload,
    NotifyPayload, ResultPayload, TimestampedDataPayload, UnassignedLockStatus,
    FACE_RECORD_SIZE,
};
