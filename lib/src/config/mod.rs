//! Configuration for print objects and regions.
//!
//! Configs are plain serde structs with `#[serde(default)]`, so a JSON file
//! only needs to name the settings it changes.

mod print_config;

pub use print_config::{
    FloatOrPercent, InfillPattern, PrintConfig, PrintObjectConfig, PrintRegionConfig,
};

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parse a config from a JSON string.
pub fn from_json_str<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

/// Load a config from a JSON file.
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    from_json_str(&text)
}

/// Map a `validate()` message into the crate error.
pub(crate) fn check(result: std::result::Result<(), String>, scope: &str) -> Result<()> {
    result.map_err(|msg| Error::Config(format!("{}: {}", scope, msg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_config_from_partial_json() {
        let config: PrintRegionConfig =
            from_json_str(r#"{ "perimeters": 2, "fill_density": 0.5 }"#).unwrap();
        assert_eq!(config.perimeters, 2);
        assert!((config.fill_density - 0.5).abs() < 1e-9);
        assert_eq!(config.top_solid_layers, 3);
    }

    #[test]
    fn test_width_from_json() {
        let config: PrintRegionConfig = from_json_str(
            r#"{ "perimeter_extrusion_width": { "Percent": 110.0 } }"#,
        )
        .unwrap();
        assert_eq!(
            config.perimeter_extrusion_width,
            FloatOrPercent::Percent(110.0)
        );
    }

    #[test]
    fn test_invalid_json_is_error() {
        let result: Result<PrintObjectConfig> = from_json_str("{ not json");
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_check_wraps_message() {
        let err = check(Err("bad".into()), "region").unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: region: bad");
    }
}
