//! # procam-core
//!
//! Both ends of the one-way pro-camera callback channel.
//!
//! ### Key Submodules:
//! - `sender`: encodes callbacks and submits them one-way over a [`Transport`]
//! - `dispatcher`: validates incoming transactions and invokes a [`ProCameraListener`]
//! - `buffer`: shared image buffers and handle resolution
//! - `transport`: transport seams plus an in-process loopback
//!
//! [`Transport`]: transport::Transport
//! [`ProCameraListener`]: listener::ProCameraListener

pub mod buffer;
pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod sender;
pub mod transport;

pub mod prelude {
    pub use crate::buffer::*;
    pub use crate::dispatcher::*;
    pub use crate::error::*;
    pub use crate::listener::*;
    pub use crate::sender::*;
    pub use crate::transport::*;
}

pub use dispatcher::Dispatcher;
pub use error::{DispatchError, ResolveError, TransportError};
pub use listener::ProCameraListener;
pub use sender::CallbackSender;
