//! Callback protocol configuration.
//!
//! Selects the interface descriptor both ends agree on and bounds the
//! variable-length regions a receiver is willing to decode.

use procam_protocol::{CallbackCodec, DecodeLimits, PRO_CAMERA_CALLBACKS_DESCRIPTOR};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct ProtocolConfig {
    /// Descriptor carried in, and required of, every message's token.
    #[validate(custom(function = validation::validate_descriptor))]
    #[serde(default = "default_descriptor")]
    pub interface_descriptor: String,

    /// Largest face count accepted in a data delivery.
    #[validate(range(max = 4096))]
    #[serde(default = "default_max_faces")]
    pub max_faces: usize,

    /// Largest result-metadata blob accepted, in bytes.
    #[validate(range(min = 1024, max = 67108864))]
    #[serde(default = "default_max_metadata", deserialize_with = "deserialize_size")]
    pub max_metadata_bytes: usize,
}

fn default_descriptor() -> String {
    PRO_CAMERA_CALLBACKS_DESCRIPTOR.into()
}

fn default_max_faces() -> usize {
    DecodeLimits::default().max_faces
}

fn default_max_metadata() -> usize {
    DecodeLimits::default().max_metadata_bytes
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            interface_descriptor: default_descriptor(),
            max_faces: default_max_faces(),
            max_metadata_bytes: default_max_metadata(),
        }
    }
}

impl ProtocolConfig {
    pub fn limits(&self) -> DecodeLimits {
        DecodeLimits {
            max_faces: self.max_faces,
            max_metadata_bytes: self.max_metadata_bytes,
        }
    }

    /// Codec that writes and expects this configuration's descriptor.
    pub fn codec(&self) -> CallbackCodec {
        CallbackCodec::new()
            .with_descriptor(self.interface_descriptor.clone())
            .with_limits(self.limits())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Num(usize),
    Str(String),
}

/// Accepts plain byte counts or strings such as `"64KiB"` and `"1 MiB"`.
fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeValue::deserialize(deserializer)? {
        SizeValue::Num(n) => Ok(n),
        SizeValue::Str(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}

pub(crate) fn parse_size(text: &str) -> Result<usize, String> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let number: usize = digits
        .parse()
        .map_err(|_| format!("invalid size {:?}", text))?;
    let multiplier: usize = match unit.trim().to_lowercase().as_str() {
        "" | "b" => 1,
        "kb" | "kib" => 1024,
        "mb" | "mib" => 1024 * 1024,
        "gb" | "gib" => 1024 * 1024 * 1024,
        other => return Err(format!("unknown size unit {:?}", other)),
    };
    number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size {:?} overflows", text))
}
