//! Logging and metrics configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[validate(custom(function = validation::validate_log_filter))]
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Record Prometheus counters for sends and dispatches.
    #[serde(default = "default_true")]
    pub metrics: bool,
}

fn default_log_filter() -> String {
    "info".into()
}

fn default_true() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            metrics: default_true(),
        }
    }
}
