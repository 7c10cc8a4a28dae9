//! Design policy: the safety factors and limits every calculation consults.
//!
//! Defaults follow common NEC/IEC practice for PV DC circuits. The CLI can
//! override any field from its `[policy]` config section.

use serde::{Deserialize, Serialize};

use crate::units::Celsius;
use crate::{PvError, PvResult};

/// Tunable thresholds shared by string sizing, cable sizing and drop checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignPolicy {
    /// Continuous-current multiplier applied to operating current (125 %)
    pub current_safety_factor: f64,
    /// Fraction of the inverter's absolute DC limit usable by a cold string
    pub dc_voltage_safety_ratio: f64,
    /// Target fraction of MPPT max voltage for the "sweet spot" candidate
    pub mppt_sweet_spot_ratio: f64,
    /// Minimum acceptable Voc headroom below max DC voltage, percent
    pub voc_margin_min_percent: f64,
    /// Minimum acceptable hot-Vmp headroom above MPPT minimum, percent
    pub mppt_margin_min_percent: f64,
    /// Voltage-drop limit for module-to-inverter string runs, percent
    pub string_drop_limit_percent: f64,
    /// Voltage-drop limit for DCDB-to-inverter runs, percent
    pub dcdb_drop_limit_percent: f64,
    /// Voltage-drop limit for three-phase AC runs, percent
    pub ac_drop_limit_percent: f64,
    /// Voltage-drop limit for HT (medium-voltage) runs, percent
    pub ht_drop_limit_percent: f64,
    /// Cell temperature used for the "operating power" estimate
    pub operating_cell_temperature: Celsius,
    /// Power factor used to derive inverter AC current
    pub power_factor: f64,
    /// Tilt/azimuth tolerance for strings sharing an MPPT, degrees
    pub orientation_tolerance_deg: f64,
    /// MPPT utilization below which a warning is raised, percent
    pub mppt_utilization_min_percent: f64,
}

impl Default for DesignPolicy {
    fn default() -> Self {
        Self {
            current_safety_factor: 1.25,
            dc_voltage_safety_ratio: 0.95,
            mppt_sweet_spot_ratio: 0.80,
            voc_margin_min_percent: 5.0,
            mppt_margin_min_percent: 10.0,
            string_drop_limit_percent: 3.0,
            dcdb_drop_limit_percent: 2.0,
            ac_drop_limit_percent: 3.0,
            ht_drop_limit_percent: 2.0,
            operating_cell_temperature: Celsius(60.0),
            power_factor: 0.95,
            orientation_tolerance_deg: 5.0,
            mppt_utilization_min_percent: 80.0,
        }
    }
}

impl DesignPolicy {
    /// Reject values that would make every downstream check meaningless.
    pub fn validate(&self) -> PvResult<()> {
        if !(self.current_safety_factor >= 1.0) {
            return Err(PvError::Config(format!(
                "current_safety_factor must be >= 1.0 (got {})",
                self.current_safety_factor
            )));
        }
        if !(self.dc_voltage_safety_ratio > 0.0 && self.dc_voltage_safety_ratio <= 1.0) {
            return Err(PvError::Config(format!(
                "dc_voltage_safety_ratio must be in (0, 1] (got {})",
                self.dc_voltage_safety_ratio
            )));
        }
        if !(self.mppt_sweet_spot_ratio > 0.0 && self.mppt_sweet_spot_ratio <= 1.0) {
            return Err(PvError::Config(format!(
                "mppt_sweet_spot_ratio must be in (0, 1] (got {})",
                self.mppt_sweet_spot_ratio
            )));
        }
        if !(self.power_factor > 0.0 && self.power_factor <= 1.0) {
            return Err(PvError::Config(format!(
                "power_factor must be in (0, 1] (got {})",
                self.power_factor
            )));
        }
        for (name, value) in [
            ("string_drop_limit_percent", self.string_drop_limit_percent),
            ("dcdb_drop_limit_percent", self.dcdb_drop_limit_percent),
            ("ac_drop_limit_percent", self.ac_drop_limit_percent),
            ("ht_drop_limit_percent", self.ht_drop_limit_percent),
        ] {
            if !(value > 0.0) {
                return Err(PvError::Config(format!(
                    "{} must be positive (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// A sparse policy: only the fields a document actually sets.
///
/// Layered over a base policy with [`PolicyOverrides::apply`], so a project
/// that sets one field keeps every other field from the caller's policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyOverrides {
    pub current_safety_factor: Option<f64>,
    pub dc_voltage_safety_ratio: Option<f64>,
    pub mppt_sweet_spot_ratio: Option<f64>,
    pub voc_margin_min_percent: Option<f64>,
    pub mppt_margin_min_percent: Option<f64>,
    pub string_drop_limit_percent: Option<f64>,
    pub dcdb_drop_limit_percent: Option<f64>,
    pub ac_drop_limit_percent: Option<f64>,
    pub ht_drop_limit_percent: Option<f64>,
    pub operating_cell_temperature: Option<Celsius>,
    pub power_factor: Option<f64>,
    pub orientation_tolerance_deg: Option<f64>,
    pub mppt_utilization_min_percent: Option<f64>,
}

impl PolicyOverrides {
    pub fn apply(&self, base: &DesignPolicy) -> DesignPolicy {
        DesignPolicy {
            current_safety_factor: self.current_safety_factor.unwrap_or(base.current_safety_factor),
            dc_voltage_safety_ratio: self
                .dc_voltage_safety_ratio
                .unwrap_or(base.dc_voltage_safety_ratio),
            mppt_sweet_spot_ratio: self.mppt_sweet_spot_ratio.unwrap_or(base.mppt_sweet_spot_ratio),
            voc_margin_min_percent: self
                .voc_margin_min_percent
                .unwrap_or(base.voc_margin_min_percent),
            mppt_margin_min_percent: self
                .mppt_margin_min_percent
                .unwrap_or(base.mppt_margin_min_percent),
            string_drop_limit_percent: self
                .string_drop_limit_percent
                .unwrap_or(base.string_drop_limit_percent),
            dcdb_drop_limit_percent: self
                .dcdb_drop_limit_percent
                .unwrap_or(base.dcdb_drop_limit_percent),
            ac_drop_limit_percent: self.ac_drop_limit_percent.unwrap_or(base.ac_drop_limit_percent),
            ht_drop_limit_percent: self.ht_drop_limit_percent.unwrap_or(base.ht_drop_limit_percent),
            operating_cell_temperature: self
                .operating_cell_temperature
                .unwrap_or(base.operating_cell_temperature),
            power_factor: self.power_factor.unwrap_or(base.power_factor),
            orientation_tolerance_deg: self
                .orientation_tolerance_deg
                .unwrap_or(base.orientation_tolerance_deg),
            mppt_utilization_min_percent: self
                .mppt_utilization_min_percent
                .unwrap_or(base.mppt_utilization_min_percent),
        }
    }
}
