// procam-config/src/validation.rs
//! Custom validation functions for configuration.

use regex::Regex;
use validator::ValidationError;

/// Validate that an interface descriptor is a dotted identifier such as
/// `android.hardware.IProCameraCallbacks`.
pub fn validate_descriptor(descriptor: &str) -> Result<(), ValidationError> {
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(descriptor) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_descriptor"))
    }
}

/// Validate a comma-separated list of `level` or `target=level` directives.
pub fn validate_log_filter(filter: &str) -> Result<(), ValidationError> {
    let re = Regex::new(r"^([A-Za-z_][A-Za-z0-9_:\-]*=)?(trace|debug|info|warn|error|off)$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    let valid = !filter.trim().is_empty()
        && filter
            .split(',')
            .map(|directive| directive.trim().to_lowercase())
            .all(|directive| re.is_match(&directive));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_filter"))
    }
}
