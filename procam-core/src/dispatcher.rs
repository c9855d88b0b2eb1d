//! Receiving end of the channel.
//!
//! A [`Dispatcher`] checks the interface token, decodes the payload for the
//! opcode, resolves any image handle, and invokes exactly one listener method.
//! Every failure is detected before the listener runs, so a refused
//! transaction never produces a partial callback.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use procam_config::ProtocolConfig;
use procam_protocol::{CallbackCodec, CallbackEvent, EventKind, Message, TransactionError};
use procam_telemetry::MetricsRecorder;
use tracing::{debug, trace, warn};

use crate::buffer::{BufferResolver, ImageData};
use crate::error::DispatchError;
use crate::listener::ProCameraListener;
use crate::transport::MessageHandler;

/// Stages a single transaction passes through. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Dispatching,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchState::Idle => f.write_str("idle"),
            DispatchState::Dispatching => f.write_str("dispatching"),
        }
    }
}

/// Called with the raw message when an opcode is not one of the five kinds.
pub type UnhandledHook = Box<dyn Fn(u32, &Message) + Send + Sync>;

pub struct Dispatcher<L, R> {
    listener: L,
    resolver: R,
    codec: CallbackCodec,
    metrics: Option<MetricsRecorder>,
    unhandled: Option<UnhandledHook>,
}

impl<L: ProCameraListener, R: BufferResolver> Dispatcher<L, R> {
    pub fn new(listener: L, resolver: R) -> Self {
        Self {
            listener,
            resolver,
            codec: CallbackCodec::new(),
            metrics: None,
            unhandled: None,
        }
    }

    /// Uses the descriptor and decode bounds from configuration.
    pub fn from_config(config: &ProtocolConfig, listener: L, resolver: R) -> Self {
        Self::new(listener, resolver).with_codec(config.codec())
    }

    pub fn with_codec(mut self, codec: CallbackCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Installs the fallback for unknown opcodes. Without one they are only
    /// logged and counted.
    pub fn on_unhandled(mut self, hook: UnhandledHook) -> Self {
        self.unhandled = Some(hook);
        self
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn codec(&self) -> &CallbackCodec {
        &self.codec
    }

    /// Handles one incoming transaction.
    ///
    /// On success exactly one listener method has run and its kind is
    /// returned. On error the listener was not called.
    pub fn on_transact(&self, message: &Message) -> Result<EventKind, DispatchError> {
        let started = Instant::now();
        trace!(state = %DispatchState::Dispatching, bytes = message.len(), "transaction received");

        let result = self.dispatch(message);
        match &result {
            Ok(kind) => {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_dispatched(kind.as_str());
                    metrics.observe_dispatch_ns(started.elapsed().as_nanos() as f64);
                }
                debug!(kind = %kind, "callback dispatched");
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_rejected(e.reason());
                }
                warn!(reason = e.reason(), error = %e, "transaction rejected");
                if let DispatchError::Transaction(TransactionError::UnknownOperation(opcode)) = e {
                    if let Some(hook) = &self.unhandled {
                        hook(*opcode, message);
                    }
                }
            }
        }

        trace!(state = %DispatchState::Idle, "transaction finished");
        result
    }

    fn dispatch(&self, message: &Message) -> Result<EventKind, DispatchError> {
        let event = self.codec.decode(message)?;
        let kind = event.kind();

        match event {
            CallbackEvent::Notify(p) => self.listener.notify_callback(p.msg_type, p.ext1, p.ext2),
            CallbackEvent::Data(p) => {
                let image = ImageData::new(p.image, self.resolver.resolve(&p.image)?);
                self.listener
                    .data_callback(p.msg_type, &image, p.faces.as_deref());
            }
            CallbackEvent::TimestampedData(p) => {
                let image = ImageData::new(p.image, self.resolver.resolve(&p.image)?);
                self.listener
                    .data_callback_timestamp(p.timestamp, p.msg_type, &image);
            }
            CallbackEvent::LockStatusChanged(p) => self.listener.on_lock_status_changed(p.status),
            CallbackEvent::ResultReceived(p) => {
                self.listener.on_result_received(p.frame_id, p.metadata())
            }
        }

        Ok(kind)
    }
}

impl<L, R> Dispatcher<L, R>
where
    L: ProCameraListener + 'static,
    R: BufferResolver + 'static,
{
    /// Adapts the dispatcher into an inbound transport handler. Errors are
    /// already logged and counted by [`Dispatcher::on_transact`].
    pub fn handler(self: &Arc<Self>) -> MessageHandler {
        let dispatcher = Arc::clone(self);
        Box::new(move |message| {
            let _ = dispatcher.on_transact(&message);
        })
    }
}
