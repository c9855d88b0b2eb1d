//! # Pro-Camera Channel Telemetry
//!
//! Logging setup and Prometheus metrics for the callback channel.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
