//! Sending end of the channel.
//!
//! Each method encodes one transaction and submits it one-way. The returned
//! result only says whether the transport accepted the message; nothing
//! comes back from the receiver, and failed submissions are not retried.

use procam_config::ProtocolConfig;
use procam_protocol::{BufferHandle, CallbackCodec, EventKind, FaceRecord, LockStatus, Message};
use procam_telemetry::MetricsRecorder;
use tracing::{trace, warn};

use crate::error::TransportError;
use crate::transport::{Destination, SendFlags, Transport};

pub struct CallbackSender<T> {
    transport: T,
    destination: Destination,
    codec: CallbackCodec,
    metrics: Option<MetricsRecorder>,
}

impl<T: Transport> CallbackSender<T> {
    pub fn new(transport: T, destination: Destination) -> Self {
        Self {
            transport,
            destination,
            codec: CallbackCodec::new(),
            metrics: None,
        }
    }

    pub fn from_config(config: &ProtocolConfig, transport: T, destination: Destination) -> Self {
        Self::new(transport, destination).with_codec(config.codec())
    }

    pub fn with_codec(mut self, codec: CallbackCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn notify_callback(&self, msg_type: i32, ext1: i32, ext2: i32) -> Result<(), TransportError> {
        self.submit(EventKind::Notify, self.codec.encode_notify(msg_type, ext1, ext2))
    }

    /// `faces` of `None` sends no face block at all.
    pub fn data_callback(
        &self,
        msg_type: i32,
        image: &BufferHandle,
        faces: Option<&[FaceRecord]>,
    ) -> Result<(), TransportError> {
        self.submit(EventKind::DataDelivered, self.codec.encode_data(msg_type, image, faces))
    }

    pub fn data_callback_timestamp(
        &self,
        timestamp: i64,
        msg_type: i32,
        image: &BufferHandle,
    ) -> Result<(), TransportError> {
        self.submit(
            EventKind::TimestampedDataDelivered,
            self.codec.encode_data_timestamp(timestamp, msg_type, image),
        )
    }

    pub fn on_lock_status_changed(&self, status: LockStatus) -> Result<(), TransportError> {
        self.submit(EventKind::LockStatusChanged, self.codec.encode_lock_status(status))
    }

    /// An empty `metadata` slice is received as "no metadata".
    pub fn on_result_received(&self, frame_id: i32, metadata: &[u8]) -> Result<(), TransportError> {
        self.submit(EventKind::ResultReceived, self.codec.encode_result(frame_id, metadata))
    }

    fn submit(&self, kind: EventKind, message: Message) -> Result<(), TransportError> {
        trace!(kind = %kind, bytes = message.len(), destination = %self.destination, "submitting callback");
        match self.transport.send(&self.destination, message, SendFlags::ONE_WAY) {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_sent(kind.as_str());
                }
                Ok(())
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_send_failures();
                }
                warn!(kind = %kind, destination = %self.destination, error = %e, "callback submission failed");
                Err(e)
            }
        }
    }
}
