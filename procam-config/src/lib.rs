//! # Pro-Camera Channel Configuration
//!
//! Layered configuration for both ends of the callback channel: the
//! protocol identity and decode bounds, and the telemetry settings.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod protocol;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use protocol::ProtocolConfig;
pub use telemetry::TelemetryConfig;

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct ProcamConfig {
    #[validate(nested)]
    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ProcamConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/procam.yaml`, if present
    /// 3. `config/<PROCAM_ENV>.yaml`, if present (`PROCAM_ENV` defaults to `production`)
    /// 4. `PROCAM_*` environment variables, `__` separating nested keys
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(ProcamConfig::default()));

        if Path::new("config/procam.yaml").exists() {
            figment = figment.merge(Yaml::file("config/procam.yaml"));
        }

        let env = std::env::var("PROCAM_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific file, layered over the defaults
    /// and under the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment =
            Figment::from(Serialized::defaults(ProcamConfig::default())).merge(Yaml::file(path));
        Self::finish(figment)
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed("PROCAM_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
