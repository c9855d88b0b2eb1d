//! Transport seams and the in-process loopback transport.
//!
//! The channel needs three things from whatever carries its messages: a
//! one-way `send`, an inbound registration hook, and buffer resolution (see
//! [`crate::buffer`]). [`LoopbackTransport`] provides the first two over
//! crossbeam channels for tests and local tooling.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use procam_protocol::Message;
use tracing::debug;

use crate::error::TransportError;

/// Name of a bound receiving endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination(String);

impl Destination {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery flags for [`Transport::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendFlags {
    one_way: bool,
}

impl SendFlags {
    /// Submit and return without waiting for the receiver.
    pub const ONE_WAY: SendFlags = SendFlags { one_way: true };

    pub fn is_one_way(&self) -> bool {
        self.one_way
    }
}

/// Inbound callback installed on a receiving endpoint.
pub type MessageHandler = Box<dyn Fn(Message) + Send + Sync>;

/// Outbound half: hands a message to the carrier and returns.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        destination: &Destination,
        message: Message,
        flags: SendFlags,
    ) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(
        &self,
        destination: &Destination,
        message: Message,
        flags: SendFlags,
    ) -> Result<(), TransportError> {
        (**self).send(destination, message, flags)
    }
}

/// Inbound half: where a receiver registers for incoming transactions.
pub trait InboundTransport {
    fn on_message(&self, handler: MessageHandler);
}

/// Routes messages between endpoints in the same process.
#[derive(Default)]
pub struct LoopbackTransport {
    routes: RwLock<HashMap<Destination, Sender<Message>>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a receiving endpoint, replacing any previous binding.
    pub fn bind(&self, destination: Destination) -> LoopbackEndpoint {
        let (tx, rx) = unbounded();
        self.routes.write().insert(destination.clone(), tx);
        LoopbackEndpoint {
            destination,
            rx,
            handler: RwLock::new(None),
        }
    }

    /// Removes a binding. Once every sender is gone the endpoint's
    /// [`LoopbackEndpoint::serve`] loop returns.
    pub fn unbind(&self, destination: &Destination) -> bool {
        self.routes.write().remove(destination).is_some()
    }
}

impl Transport for LoopbackTransport {
    fn send(
        &self,
        destination: &Destination,
        message: Message,
        flags: SendFlags,
    ) -> Result<(), TransportError> {
        if !flags.is_one_way() {
            return Err(TransportError::ReplyUnsupported);
        }
        let routes = self.routes.read();
        let route = routes
            .get(destination)
            .ok_or_else(|| TransportError::UnknownDestination(destination.to_string()))?;
        route
            .send(message)
            .map_err(|_| TransportError::Disconnected(destination.to_string()))
    }
}

/// Receiving end of a loopback binding.
///
/// Messages queue until a thread drains them with [`deliver_pending`] or
/// [`serve`]; the handler runs on that thread. Messages drained while no
/// handler is registered are dropped.
///
/// [`deliver_pending`]: LoopbackEndpoint::deliver_pending
/// [`serve`]: LoopbackEndpoint::serve
pub struct LoopbackEndpoint {
    destination: Destination,
    rx: Receiver<Message>,
    handler: RwLock<Option<MessageHandler>>,
}

impl LoopbackEndpoint {
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Messages waiting to be delivered.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Delivers everything queued so far and returns how many messages
    /// reached the handler.
    pub fn deliver_pending(&self) -> usize {
        let mut delivered = 0;
        while let Ok(message) = self.rx.try_recv() {
            delivered += usize::from(self.deliver(message));
        }
        delivered
    }

    /// Blocks delivering messages until the binding is removed and every
    /// in-flight message has been drained.
    pub fn serve(&self) -> usize {
        let mut delivered = 0;
        for message in self.rx.iter() {
            delivered += usize::from(self.deliver(message));
        }
        debug!(destination = %self.destination, delivered, "loopback endpoint closed");
        delivered
    }

    fn deliver(&self, message: Message) -> bool {
        match self.handler.read().as_ref() {
            Some(handler) => {
                handler(message);
                true
            }
            None => {
                debug!(destination = %self.destination, "no handler registered, dropping message");
                false
            }
        }
    }
}

impl InboundTransport for LoopbackEndpoint {
    fn on_message(&self, handler: MessageHandler) {
        *self.handler.write() = Some(handler);
    }
}
