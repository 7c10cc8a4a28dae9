//! DC distribution board (DCDB) counts for central-inverter plants.
//!
//! Strings land on DCDBs, DCDBs feed the inverter's MPPT inputs. For a
//! central inverter, the inverter's "string inputs" count is the number of
//! DCDB connections it accepts.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{category, Diagnostics};
use crate::equipment::InverterElectricalSpec;
use crate::string_sizing::ceil_count;

/// String inputs on a standard DCDB.
pub const DEFAULT_DCDB_STRING_INPUTS: u32 = 16;

/// Overrides for DCDB sizing; `None` falls back to the inverter's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcdbOptions {
    pub dcdb_per_inverter: Option<u32>,
    pub string_inputs_per_dcdb: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcdbRequirements {
    pub total_inverters: u32,
    pub dcdb_per_inverter: u32,
    pub total_dcdb_in_system: u32,
    pub string_inputs_per_dcdb: u32,
    pub strings_per_dcdb: u32,
    pub strings_per_mppt: u32,
    /// Largest string count an MPPT could see with full DCDBs
    pub max_strings_per_mppt: u32,
    pub utilization_percent: f64,
    pub valid: bool,
    pub diagnostics: Diagnostics,
}

/// Distribute `total_strings` over the DCDBs of `total_inverters` inverters.
pub fn dcdb_requirements(
    total_strings: u32,
    total_inverters: u32,
    inverter: &InverterElectricalSpec,
    options: DcdbOptions,
) -> DcdbRequirements {
    let dcdb_per_inverter = options
        .dcdb_per_inverter
        .unwrap_or_else(|| inverter.total_string_inputs());
    let string_inputs_per_dcdb = options
        .string_inputs_per_dcdb
        .unwrap_or(DEFAULT_DCDB_STRING_INPUTS);
    let total_dcdb_in_system = total_inverters.saturating_mul(dcdb_per_inverter);
    let mut diagnostics = Diagnostics::new();

    if total_dcdb_in_system == 0 || inverter.mppt_count == 0 {
        diagnostics.add_error(
            category::CONFIGURATION,
            "No DCDBs or MPPT inputs configured; DCDB requirements cannot be computed",
        );
        return DcdbRequirements {
            total_inverters,
            dcdb_per_inverter,
            total_dcdb_in_system,
            string_inputs_per_dcdb,
            strings_per_dcdb: 0,
            strings_per_mppt: 0,
            max_strings_per_mppt: 0,
            utilization_percent: f64::NAN,
            valid: false,
            diagnostics,
        };
    }

    let mppts = f64::from(inverter.mppt_count);
    let strings_per_dcdb = ceil_count(f64::from(total_strings) / f64::from(total_dcdb_in_system));
    let strings_per_mppt =
        ceil_count(f64::from(dcdb_per_inverter) * f64::from(strings_per_dcdb) / mppts);
    let max_strings_per_mppt =
        (f64::from(dcdb_per_inverter) * f64::from(string_inputs_per_dcdb) / mppts).floor() as u32;
    let utilization_percent = if max_strings_per_mppt == 0 {
        f64::NAN
    } else {
        f64::from(strings_per_mppt) / f64::from(max_strings_per_mppt) * 100.0
    };

    let valid = strings_per_dcdb <= string_inputs_per_dcdb;
    if !valid {
        diagnostics.add_error(
            category::CONFIGURATION,
            &format!(
                "{} strings per DCDB exceeds the {} available inputs",
                strings_per_dcdb, string_inputs_per_dcdb
            ),
        );
    }

    DcdbRequirements {
        total_inverters,
        dcdb_per_inverter,
        total_dcdb_in_system,
        string_inputs_per_dcdb,
        strings_per_dcdb,
        strings_per_mppt,
        max_strings_per_mppt,
        utilization_percent,
        valid,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_inverter_inputs() {
        let inverter = InverterElectricalSpec::default();
        // 2 inverters × 20 DCDBs = 40, 600 strings → 15 per DCDB
        let req = dcdb_requirements(600, 2, &inverter, DcdbOptions::default());

        assert_eq!(req.dcdb_per_inverter, 20);
        assert_eq!(req.total_dcdb_in_system, 40);
        assert_eq!(req.strings_per_dcdb, 15);
        // ceil(20 × 15 / 2) = 150, floor(20 × 16 / 2) = 160
        assert_eq!(req.strings_per_mppt, 150);
        assert_eq!(req.max_strings_per_mppt, 160);
        assert!((req.utilization_percent - 93.75).abs() < 1e-9);
        assert!(req.valid);
    }

    #[test]
    fn overfull_dcdb_is_invalid() {
        let inverter = InverterElectricalSpec::default();
        let options = DcdbOptions {
            dcdb_per_inverter: Some(4),
            string_inputs_per_dcdb: None,
        };
        let req = dcdb_requirements(148, 2, &inverter, options);

        // ceil(148 / 8) = 19 > 16
        assert_eq!(req.strings_per_dcdb, 19);
        assert!(!req.valid);
        assert!(req.diagnostics.mentions("exceeds the 16 available inputs"));
    }

    #[test]
    fn zero_inverters_is_unconfigured() {
        let req = dcdb_requirements(100, 0, &InverterElectricalSpec::default(), DcdbOptions::default());
        assert!(!req.valid);
        assert!(req.utilization_percent.is_nan());
        assert!(req.diagnostics.has_errors());
    }
}
