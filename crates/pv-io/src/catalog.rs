use anyhow::{Context, Result};
use pv_core::{
    Ampacity, Amperes, CableCatalog, CableSpec, Celsius, ConductorMaterial, HtCableCatalog,
    HtCableSpec, OhmsPerKm, SquareMillimeters,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::document::read_document;

/// One row of a cable table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableRecord {
    #[serde(alias = "cross_section", alias = "size_mm2", alias = "size")]
    pub cross_section_mm2: f64,
    #[serde(alias = "conductor_material")]
    pub material: ConductorMaterial,
    #[serde(alias = "current_in_air", alias = "air")]
    pub ampacity_air: f64,
    #[serde(alias = "current_in_conduit", alias = "conduit")]
    pub ampacity_conduit: f64,
    #[serde(alias = "current_buried_conduit", alias = "buried_conduit")]
    pub ampacity_buried_conduit: f64,
    #[serde(alias = "current_direct_burial", alias = "direct_burial")]
    pub ampacity_direct_burial: f64,
    #[serde(alias = "resistance", alias = "dc_resistance_ohm_per_km")]
    pub resistance_ohm_per_km: f64,
}

impl From<&CableRecord> for CableSpec {
    fn from(record: &CableRecord) -> Self {
        CableSpec {
            cross_section: SquareMillimeters(record.cross_section_mm2),
            material: record.material,
            ampacity: Ampacity {
                air: record.ampacity_air,
                conduit: record.ampacity_conduit,
                buried_conduit: record.ampacity_buried_conduit,
                direct_burial: record.ampacity_direct_burial,
            },
            resistance: OhmsPerKm(record.resistance_ohm_per_km),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableCatalogFile {
    pub cables: Vec<CableRecord>,
}

/// Replace the built-in cable table with one read from disk.
pub fn load_cable_catalog(path: &Path) -> Result<CableCatalog> {
    let file: CableCatalogFile = read_document(path, "cable catalog")?;
    let cables: Vec<CableSpec> = file.cables.iter().map(CableSpec::from).collect();
    let catalog = CableCatalog::new(cables)
        .with_context(|| format!("validating cable catalog '{}'", path.display()))?;
    debug!(cables = catalog.cables.len(), "cable catalog loaded");
    Ok(catalog)
}

/// One row of an HT cable table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtCableRecord {
    #[serde(alias = "cross_section", alias = "size_mm2", alias = "size")]
    pub cross_section_mm2: f64,
    #[serde(default = "aluminum", alias = "conductor_material")]
    pub material: ConductorMaterial,
    #[serde(alias = "ground", alias = "ampacity_ground")]
    pub current_in_ground: f64,
    #[serde(alias = "resistance", alias = "ac_resistance_ohm_per_km")]
    pub ac_resistance: f64,
    #[serde(alias = "reactance_ohm_per_km")]
    pub reactance: f64,
    #[serde(default = "xlpe_max_temperature", alias = "max_conductor_temperature")]
    pub max_temperature: f64,
}

fn aluminum() -> ConductorMaterial {
    ConductorMaterial::Aluminum
}

fn xlpe_max_temperature() -> f64 {
    90.0
}

impl From<&HtCableRecord> for HtCableSpec {
    fn from(record: &HtCableRecord) -> Self {
        HtCableSpec {
            cross_section: SquareMillimeters(record.cross_section_mm2),
            material: record.material,
            current_in_ground: Amperes(record.current_in_ground),
            ac_resistance: OhmsPerKm(record.ac_resistance),
            reactance: OhmsPerKm(record.reactance),
            max_temperature: Celsius(record.max_temperature),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtCableCatalogFile {
    #[serde(alias = "hv_cables")]
    pub cables: Vec<HtCableRecord>,
}

/// Replace the built-in HT cable table with one read from disk.
pub fn load_ht_cable_catalog(path: &Path) -> Result<HtCableCatalog> {
    let file: HtCableCatalogFile = read_document(path, "HT cable catalog")?;
    let cables: Vec<HtCableSpec> = file.cables.iter().map(HtCableSpec::from).collect();
    let catalog = HtCableCatalog::new(cables)
        .with_context(|| format!("validating HT cable catalog '{}'", path.display()))?;
    debug!(cables = catalog.cables.len(), "HT cable catalog loaded");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_aliased_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cables.yaml");
        fs::write(
            &path,
            r#"
cables:
  - size_mm2: 6
    material: copper
    current_in_air: 51
    current_in_conduit: 44
    current_buried_conduit: 46
    current_direct_burial: 51
    resistance: 3.08
  - cross_section_mm2: 10
    material: al
    air: 54
    conduit: 46
    buried_conduit: 49
    direct_burial: 54
    resistance_ohm_per_km: 2.95
"#,
        )
        .unwrap();

        let catalog = load_cable_catalog(&path).unwrap();
        assert_eq!(catalog.cables.len(), 2);
        let cu = catalog.find(ConductorMaterial::Copper, 6.0).unwrap();
        assert_eq!(cu.ampacity.air, 51.0);
        assert_eq!(cu.resistance, OhmsPerKm(3.08));
        assert!(catalog.find(ConductorMaterial::Aluminum, 10.0).is_some());
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cables.json");
        fs::write(&path, r#"{"cables": []}"#).unwrap();
        let err = load_cable_catalog(&path).unwrap_err();
        assert!(format!("{err:#}").contains("empty"));
    }

    #[test]
    fn zero_resistance_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cables.json");
        fs::write(
            &path,
            r#"{"cables": [{"cross_section_mm2": 4, "material": "copper", "ampacity_air": 40,
                "ampacity_conduit": 34, "ampacity_buried_conduit": 36,
                "ampacity_direct_burial": 40, "resistance_ohm_per_km": 0}]}"#,
        )
        .unwrap();
        assert!(load_cable_catalog(&path).is_err());
    }

    #[test]
    fn loads_ht_rows_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ht.yaml");
        fs::write(
            &path,
            r#"
hv_cables:
  - cross_section_mm2: 185
    conductor_material: Aluminium
    current_in_ground: 335
    ac_resistance: 0.211
    reactance: 0.116
  - size: 240
    conductor_material: copper
    ground: 470
    resistance: 0.0991
    reactance: 0.107
    max_conductor_temperature: 105
"#,
        )
        .unwrap();

        let catalog = load_ht_cable_catalog(&path).unwrap();
        assert_eq!(catalog.cables.len(), 2);
        let al = catalog.by_material(ConductorMaterial::Aluminum);
        assert_eq!(al[0].max_temperature, Celsius(90.0));
        assert_eq!(al[0].reactance, OhmsPerKm(0.116));
        let cu = catalog.by_material(ConductorMaterial::Copper);
        assert_eq!(cu[0].max_temperature, Celsius(105.0));
    }

    #[test]
    fn conductor_material_alias_on_lv_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cables.json");
        fs::write(
            &path,
            r#"{"cables": [{"cross_section_mm2": 4, "conductor_material": "Copper",
                "ampacity_air": 40, "ampacity_conduit": 34, "ampacity_buried_conduit": 36,
                "ampacity_direct_burial": 40, "resistance_ohm_per_km": 4.61}]}"#,
        )
        .unwrap();
        let catalog = load_cable_catalog(&path).unwrap();
        assert!(catalog.find(ConductorMaterial::Copper, 4.0).is_some());
    }
}
