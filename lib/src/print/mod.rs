//! Print object and its settings.
//!
//! [`ObjectSettings`] bundles the three configuration scopes with the ordered
//! list of [`PrintRegion`]s. [`PrintObject`] owns the layers and runs the
//! pipeline stages over them.

mod object;

pub use object::PrintObject;

use crate::config::{self, PrintConfig, PrintObjectConfig, PrintRegionConfig};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Handle of a print region: its index in [`ObjectSettings::regions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub(crate) usize);

impl RegionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named set of region settings (one material or modifier volume).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintRegion {
    pub name: String,
    pub config: PrintRegionConfig,
}

impl PrintRegion {
    pub fn new<S: Into<String>>(name: S, config: PrintRegionConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// All settings of one print object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSettings {
    pub print: PrintConfig,
    pub object: PrintObjectConfig,
    /// Regions in layer order: every layer holds one `LayerRegion` per entry.
    pub regions: Vec<PrintRegion>,
}

impl ObjectSettings {
    pub fn new(print: PrintConfig, object: PrintObjectConfig) -> Self {
        Self {
            print,
            object,
            regions: Vec::new(),
        }
    }

    /// Settings with a single region.
    pub fn single_region(config: PrintRegionConfig) -> Self {
        let mut settings = Self::default();
        settings.add_region(PrintRegion::new("default", config));
        settings
    }

    pub fn add_region(&mut self, region: PrintRegion) -> RegionId {
        self.regions.push(region);
        RegionId(self.regions.len() - 1)
    }

    pub fn region(&self, id: RegionId) -> Result<&PrintRegion> {
        self.regions.get(id.0).ok_or(Error::UnknownRegion(id))
    }

    #[inline]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn region_ids(&self) -> impl Iterator<Item = RegionId> {
        (0..self.regions.len()).map(RegionId)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = config::from_json_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings: Self = config::load_json(path)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        config::check(self.print.validate(), "print")?;
        config::check(self.object.validate(), "object")?;
        if self.regions.is_empty() {
            return Err(Error::Config("object has no regions".into()));
        }
        for region in &self.regions {
            config::check(region.config.validate(), &format!("region '{}'", region.name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_handles() {
        let mut settings = ObjectSettings::default();
        let a = settings.add_region(PrintRegion::new("a", PrintRegionConfig::new()));
        let b = settings.add_region(PrintRegion::new("b", PrintRegionConfig::new().perimeters(1)));
        assert_eq!(a.index(), 0);
        assert_eq!(settings.region(b).unwrap().name, "b");
        assert!(matches!(
            settings.region(RegionId(7)),
            Err(Error::UnknownRegion(RegionId(7)))
        ));
        assert_eq!(settings.region_ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_settings_from_json() {
        let json = r#"{
            "object": { "layer_height": 0.1 },
            "regions": [ { "name": "body", "config": { "perimeters": 2 } } ]
        }"#;
        let settings = ObjectSettings::from_json_str(json).unwrap();
        assert!((settings.object.layer_height - 0.1).abs() < 1e-12);
        assert_eq!(settings.regions[0].config.perimeters, 2);
        assert_eq!(settings.print.nozzle_diameter, vec![0.4]);
    }

    #[test]
    fn test_settings_without_regions_rejected() {
        let err = ObjectSettings::from_json_str("{}").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_region_rejected() {
        let json = r#"{ "regions": [ { "name": "r", "config": { "fill_density": 2.0 } } ] }"#;
        let err = ObjectSettings::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("region 'r'"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("object.json");
        let settings = ObjectSettings::single_region(PrintRegionConfig::new().perimeters(4));
        std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();

        let loaded = ObjectSettings::load(&path).unwrap();
        assert_eq!(loaded.regions, settings.regions);
    }
}
