//! ## procam-telemetry::logging
//! Structured logging on top of `tracing`.
//!
//! `RUST_LOG` takes precedence over the filter passed to [`EventLogger::init`],
//! so operators can raise verbosity without touching configuration files.

use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Clone, Debug)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber.
    ///
    /// Fails if `filter` is not a valid directive or a subscriber is
    /// already installed.
    pub fn init(filter: &str) -> Result<(), InitError> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(from_env) => from_env,
            Err(_) => EnvFilter::try_new(filter)?,
        };
        fmt()
            .with_env_filter(env_filter)
            .with_thread_names(true)
            .with_span_events(FmtSpan::NONE)
            .try_init()
    }

    /// Records a delivered callback inside its own span.
    #[inline]
    pub fn log_event(event_type: &str, detail: &str) {
        let span = info_span!("callback_event", event_type = event_type);
        let _entered = span.enter();
        tracing::info!(detail = detail, "Callback event delivered");
    }
}
