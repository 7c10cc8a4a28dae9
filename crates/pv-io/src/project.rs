use anyhow::{anyhow, Context, Result};
use pv_core::{
    AcCableRun, Amperes, Celsius, DcCableRun, DcdbOptions, DesignPolicy, HtCableRun,
    InverterElectricalSpec, ModuleElectricalSpec, PolicyOverrides, ProjectInput,
    SiteTemperatureRange, StringGroup, Volts, Watts,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::document::read_document;

/// Module datasheet values as they appear in catalog exports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleRecord {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    #[serde(alias = "voc_v", alias = "open_circuit_voltage")]
    pub voc: Option<f64>,
    #[serde(alias = "vmp_v", alias = "max_power_voltage", alias = "mpp_voltage")]
    pub vmp: Option<f64>,
    #[serde(alias = "isc_a", alias = "short_circuit_current")]
    pub isc: Option<f64>,
    #[serde(alias = "imp_a", alias = "max_power_current", alias = "mpp_current")]
    pub imp: Option<f64>,
    #[serde(
        alias = "power_rating",
        alias = "nominal_power_w",
        alias = "nominal_power",
        alias = "rated_power"
    )]
    pub power: Option<f64>,
    #[serde(
        alias = "temp_coeff_voc_percent_c",
        alias = "temperature_coefficient_voc"
    )]
    pub temp_coeff_voc: Option<f64>,
    #[serde(
        alias = "temp_coeff_vmp_percent_c",
        alias = "temperature_coefficient_vmp"
    )]
    pub temp_coeff_vmp: Option<f64>,
    #[serde(
        alias = "temp_coeff_pmax_percent_c",
        alias = "temp_coeff_power",
        alias = "temp_coeff_power_percent_c",
        alias = "temperature_coefficient_pmax"
    )]
    pub temp_coeff_pmax: Option<f64>,
}

impl ModuleRecord {
    pub fn to_spec(&self) -> ModuleElectricalSpec {
        let base = ModuleElectricalSpec::default();
        ModuleElectricalSpec {
            voc: self.voc.map(Volts).unwrap_or(base.voc),
            vmp: self.vmp.map(Volts).unwrap_or(base.vmp),
            isc: self.isc.map(Amperes).unwrap_or(base.isc),
            imp: self.imp.map(Amperes).unwrap_or(base.imp),
            power: self.power.map(Watts).unwrap_or(base.power),
            temp_coeff_voc: self.temp_coeff_voc.unwrap_or(base.temp_coeff_voc),
            temp_coeff_vmp: self.temp_coeff_vmp.unwrap_or(base.temp_coeff_vmp),
            temp_coeff_pmax: self.temp_coeff_pmax.unwrap_or(base.temp_coeff_pmax),
        }
    }
}

/// Inverter datasheet values as they appear in catalog exports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InverterRecord {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    #[serde(
        alias = "min_mpp_voltage_v",
        alias = "min_mpp_voltage",
        alias = "mppt_min_voltage"
    )]
    pub mppt_voltage_min: Option<f64>,
    #[serde(
        alias = "max_mpp_voltage_v",
        alias = "max_mppt_voltage",
        alias = "mppt_max_voltage"
    )]
    pub mppt_voltage_max: Option<f64>,
    #[serde(alias = "max_dc_voltage_v")]
    pub max_dc_voltage: Option<f64>,
    #[serde(alias = "max_dc_current_a", alias = "max_input_current")]
    pub max_dc_current: Option<f64>,
    #[serde(
        alias = "total_mppt",
        alias = "mppt_inputs",
        alias = "number_of_mppt_inputs"
    )]
    pub mppt_count: Option<u32>,
    #[serde(alias = "max_strings_per_mppt")]
    pub strings_per_mppt: Option<u32>,
    #[serde(alias = "max_string_inputs", alias = "max_strings")]
    pub total_string_inputs: Option<u32>,
    #[serde(alias = "maximum_ac_power_kw")]
    pub nominal_ac_power_kw: Option<f64>,
}

impl InverterRecord {
    /// Canonical inverter limits. `strings_per_mppt` falls back to the total string
    /// inputs spread over the MPPTs when only the total is published. An
    /// unpublished AC rating stays unknown.
    pub fn to_spec(&self) -> InverterElectricalSpec {
        let base = InverterElectricalSpec::default();
        let mppt_count = self.mppt_count.unwrap_or(base.mppt_count);
        let strings_per_mppt = match (self.strings_per_mppt, self.total_string_inputs) {
            (Some(per_mppt), _) => per_mppt,
            (None, Some(total)) if mppt_count > 0 => (total / mppt_count).max(1),
            _ => base.strings_per_mppt,
        };
        InverterElectricalSpec {
            mppt_voltage_min: self.mppt_voltage_min.map(Volts).unwrap_or(base.mppt_voltage_min),
            mppt_voltage_max: self.mppt_voltage_max.map(Volts).unwrap_or(base.mppt_voltage_max),
            max_dc_voltage: self.max_dc_voltage.map(Volts).unwrap_or(base.max_dc_voltage),
            max_dc_current: self.max_dc_current.map(Amperes).unwrap_or(base.max_dc_current),
            mppt_count,
            strings_per_mppt,
            nominal_ac_power: self.nominal_ac_power_kw.map(Watts::from_kilowatts),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteRecord {
    #[serde(alias = "min_temperature", alias = "t_min", alias = "min_temp")]
    pub min: Option<f64>,
    #[serde(alias = "max_temperature", alias = "t_max", alias = "max_temp")]
    pub max: Option<f64>,
}

impl SiteRecord {
    pub fn to_range(&self) -> SiteTemperatureRange {
        let base = SiteTemperatureRange::default();
        SiteTemperatureRange {
            min: self.min.map(Celsius).unwrap_or(base.min),
            max: self.max.map(Celsius).unwrap_or(base.max),
        }
    }
}

/// A plant description on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub module: ModuleRecord,
    #[serde(default)]
    pub inverter: InverterRecord,
    #[serde(default)]
    pub site: SiteRecord,
    #[serde(default = "default_inverter_count", alias = "inverters")]
    pub inverter_count: u32,
    pub modules_per_string: Option<u32>,
    #[serde(alias = "dc_capacity_kw")]
    pub capacity_kw: Option<f64>,
    pub module_count: Option<u32>,
    pub dcdb: Option<DcdbOptions>,
    #[serde(default)]
    pub string_groups: Vec<StringGroup>,
    pub string_cable: Option<DcCableRun>,
    pub dcdb_cable: Option<DcCableRun>,
    pub ac_cable: Option<AcCableRun>,
    pub ht_cable: Option<HtCableRun>,
    /// Fields set here override the caller's policy one by one
    pub policy: Option<PolicyOverrides>,
}

fn default_name() -> String {
    "project".to_string()
}

fn default_inverter_count() -> u32 {
    1
}

pub fn load_project(path: &Path) -> Result<ProjectFile> {
    read_document(path, "project")
}

/// Fill defaults and validate. Policy fields the file sets replace those of
/// `policy`; the rest are kept.
pub fn resolve(file: &ProjectFile, policy: &DesignPolicy) -> Result<ProjectInput> {
    if file.name.trim().is_empty() {
        return Err(anyhow!("project name cannot be empty"));
    }
    if file.inverter_count == 0 {
        return Err(anyhow!(
            "project '{}' must have at least one inverter",
            file.name
        ));
    }
    let input = ProjectInput {
        name: file.name.clone(),
        module: file.module.to_spec(),
        inverter: file.inverter.to_spec(),
        site: file.site.to_range(),
        inverter_count: file.inverter_count,
        modules_per_string: file.modules_per_string,
        capacity_kw: file.capacity_kw,
        module_count: file.module_count,
        dcdb: file.dcdb,
        string_groups: file.string_groups.clone(),
        string_cable: file.string_cable,
        dcdb_cable: file.dcdb_cable,
        ac_cable: file.ac_cable,
        ht_cable: file.ht_cable,
        policy: file
            .policy
            .map(|overrides| overrides.apply(policy))
            .unwrap_or(*policy),
    };
    input
        .validate()
        .with_context(|| format!("validating project '{}'", file.name))?;
    debug!(project = %input.name, "project resolved");
    Ok(input)
}

/// [`load_project`] followed by [`resolve`].
pub fn load_project_input(path: &Path, policy: &DesignPolicy) -> Result<ProjectInput> {
    let file = load_project(path)?;
    resolve(&file, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_core::{ConductorMaterial, InstallationMethod};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn yaml_aliases_resolve_to_canonical_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plant.yaml");
        fs::write(
            &path,
            r#"
name: carport
module:
  voc_v: 49.5
  vmp_v: 41.6
  isc_a: 13.9
  imp_a: 13.2
  power_rating: 550
  temp_coeff_voc_percent_c: -0.27
inverter:
  min_mpp_voltage_v: 200
  max_mpp_voltage_v: 1000
  max_dc_voltage_v: 1100
  max_dc_current_a: 40
  number_of_mppt_inputs: 4
  max_string_inputs: 8
  maximum_ac_power_kw: 60
site:
  t_min: -5
  t_max: 65
inverters: 3
"#,
        )
        .unwrap();

        let input = load_project_input(&path, &DesignPolicy::default()).unwrap();
        assert_eq!(input.name, "carport");
        assert_eq!(input.module.voc, Volts(49.5));
        assert_eq!(input.module.power, Watts(550.0));
        assert_eq!(input.module.temp_coeff_voc, -0.27);
        // unset coefficients keep their defaults
        assert_eq!(input.module.temp_coeff_vmp, -0.38);
        assert_eq!(input.inverter.mppt_count, 4);
        assert_eq!(input.inverter.strings_per_mppt, 2);
        assert_eq!(input.inverter.nominal_ac_power, Some(Watts(60_000.0)));
        assert_eq!(input.site, SiteTemperatureRange::new(-5.0, 65.0));
        assert_eq!(input.inverter_count, 3);
    }

    #[test]
    fn json_with_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plant.json");
        fs::write(
            &path,
            r#"{
  "name": "field",
  "capacity_kw": 100,
  "modules_per_string": 18,
  "string_cable": { "length": 35, "material": "cu" },
  "ac_cable": { "length": 80, "line_voltage": 415, "material": "al", "breaker": "MCCB" },
  "policy": { "current_safety_factor": 1.3 }
}"#,
        )
        .unwrap();

        let input = load_project_input(&path, &DesignPolicy::default()).unwrap();
        assert_eq!(input.modules_per_string, Some(18));
        assert_eq!(input.string_cable.unwrap().runs, 1);
        assert_eq!(input.policy.current_safety_factor, 1.3);
        assert_eq!(input.policy.string_drop_limit_percent, 3.0);
        assert!(input.ac_cable.is_some());
    }

    #[test]
    fn project_policy_merges_over_config_policy() {
        let config = DesignPolicy {
            string_drop_limit_percent: 1.5,
            ..Default::default()
        };
        let file: ProjectFile = serde_yaml::from_str(
            "name: merged\npolicy:\n  current_safety_factor: 1.3\n",
        )
        .unwrap();

        let input = resolve(&file, &config).unwrap();
        assert_eq!(input.policy.current_safety_factor, 1.3);
        assert_eq!(input.policy.string_drop_limit_percent, 1.5);

        let bare: ProjectFile = serde_yaml::from_str("name: bare\n").unwrap();
        assert_eq!(resolve(&bare, &config).unwrap().policy, config);
    }

    #[test]
    fn misspelled_policy_field_is_rejected() {
        let parsed: Result<ProjectFile, _> =
            serde_yaml::from_str("name: typo\npolicy:\n  current_safety_facter: 1.3\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn material_names_are_case_insensitive() {
        let file: ProjectFile = serde_yaml::from_str(
            r#"
name: mixed-case
string_cable:
  length: 30
  material: Copper
  conditions:
    method: Direct Burial
ac_cable:
  length: 60
  line_voltage: 415
  material: Aluminium
"#,
        )
        .unwrap();

        let input = resolve(&file, &DesignPolicy::default()).unwrap();
        let string_cable = input.string_cable.unwrap();
        assert_eq!(string_cable.material, ConductorMaterial::Copper);
        assert_eq!(string_cable.conditions.method, InstallationMethod::DirectBurial);
        assert_eq!(input.ac_cable.unwrap().material, ConductorMaterial::Aluminum);
    }

    #[test]
    fn unpublished_ac_rating_stays_unknown() {
        let file: ProjectFile =
            serde_yaml::from_str("name: dc-only\ninverter:\n  max_dc_voltage_v: 1100\n").unwrap();
        let input = resolve(&file, &DesignPolicy::default()).unwrap();
        assert_eq!(input.inverter.nominal_ac_power, None);
    }

    #[test]
    fn ht_section_with_burial() {
        let file: ProjectFile = serde_yaml::from_str(
            r#"
name: export
ht_cable:
  length: 2500
  line_voltage: 33000
  runs: 2
  burial:
    depth: 1.2
    soil_thermal_resistivity: 2.0
"#,
        )
        .unwrap();
        let ht = resolve(&file, &DesignPolicy::default()).unwrap().ht_cable.unwrap();
        assert_eq!(ht.runs, 2);
        assert_eq!(ht.material, ConductorMaterial::Aluminum);
        assert_eq!(ht.burial.depth.value(), 1.2);
        assert_eq!(ht.burial.soil_temperature, Celsius(40.0));
    }

    #[test]
    fn unknown_extension_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plant.txt");
        fs::write(&path, "{\"name\": \"fallback\"}").unwrap();
        let file = load_project(&path).unwrap();
        assert_eq!(file.name, "fallback");
        assert_eq!(file.inverter_count, 1);
    }

    #[test]
    fn invalid_inverter_window_is_rejected() {
        let file: ProjectFile = serde_yaml::from_str(
            "name: bad\ninverter:\n  mppt_min_voltage: 900\n  mppt_max_voltage: 800\n",
        )
        .unwrap();
        let err = resolve(&file, &DesignPolicy::default()).unwrap_err();
        assert!(format!("{err:#}").contains("mppt_voltage_min"));
    }

    #[test]
    fn zero_inverters_rejected() {
        let file: ProjectFile = serde_yaml::from_str("name: empty\ninverter_count: 0\n").unwrap();
        assert!(resolve(&file, &DesignPolicy::default()).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_project(Path::new("/nonexistent/plant.yaml")).unwrap_err();
        assert!(err.to_string().contains("plant.yaml"));
    }
}
