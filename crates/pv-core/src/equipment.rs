//! Module, inverter and site records in canonical form.
//!
//! Catalog entries arrive with inconsistent field names; `pv-io` maps them
//! onto these types once, so everything downstream sees one field per
//! attribute. Defaults mirror a typical 400 W mono module and a 50 kW
//! two-MPPT string inverter.

use serde::{Deserialize, Serialize};

use crate::units::{Amperes, Celsius, Volts, Watts};
use crate::{PvError, PvResult};

/// Module nameplate values at STC (25 °C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleElectricalSpec {
    pub voc: Volts,
    pub vmp: Volts,
    pub isc: Amperes,
    pub imp: Amperes,
    pub power: Watts,
    /// Voc temperature coefficient, %/°C
    pub temp_coeff_voc: f64,
    /// Vmp temperature coefficient, %/°C
    pub temp_coeff_vmp: f64,
    /// Pmax temperature coefficient, %/°C
    pub temp_coeff_pmax: f64,
}

impl Default for ModuleElectricalSpec {
    fn default() -> Self {
        Self {
            voc: Volts(45.0),
            vmp: Volts(37.0),
            isc: Amperes(11.5),
            imp: Amperes(10.8),
            power: Watts(400.0),
            temp_coeff_voc: -0.25,
            temp_coeff_vmp: -0.38,
            temp_coeff_pmax: -0.41,
        }
    }
}

impl ModuleElectricalSpec {
    /// All nameplate values must be positive and finite. Coefficients only
    /// need to be finite: zero and positive coefficients are unusual but valid.
    pub fn validate(&self) -> PvResult<()> {
        for (name, value) in [
            ("voc", self.voc.value()),
            ("vmp", self.vmp.value()),
            ("isc", self.isc.value()),
            ("imp", self.imp.value()),
            ("power", self.power.value()),
        ] {
            require_positive("module", name, value)?;
        }
        for (name, value) in [
            ("temp_coeff_voc", self.temp_coeff_voc),
            ("temp_coeff_vmp", self.temp_coeff_vmp),
            ("temp_coeff_pmax", self.temp_coeff_pmax),
        ] {
            if !value.is_finite() {
                return Err(PvError::Validation(format!(
                    "module {} must be finite (got {})",
                    name, value
                )));
            }
        }
        if self.vmp > self.voc {
            return Err(PvError::Validation(format!(
                "module vmp ({}) cannot exceed voc ({})",
                self.vmp, self.voc
            )));
        }
        Ok(())
    }
}

/// Inverter DC input limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InverterElectricalSpec {
    pub mppt_voltage_min: Volts,
    pub mppt_voltage_max: Volts,
    pub max_dc_voltage: Volts,
    /// Maximum DC input current across all MPPTs
    pub max_dc_current: Amperes,
    pub mppt_count: u32,
    pub strings_per_mppt: u32,
    /// Rated AC output, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_ac_power: Option<Watts>,
}

impl Default for InverterElectricalSpec {
    fn default() -> Self {
        Self {
            mppt_voltage_min: Volts(125.0),
            mppt_voltage_max: Volts(850.0),
            max_dc_voltage: Volts(1000.0),
            max_dc_current: Amperes(15.0),
            mppt_count: 2,
            strings_per_mppt: 10,
            nominal_ac_power: Some(Watts(50_000.0)),
        }
    }
}

impl InverterElectricalSpec {
    /// Total string inputs across every MPPT
    pub fn total_string_inputs(&self) -> u32 {
        self.mppt_count.saturating_mul(self.strings_per_mppt)
    }

    /// Current budget for a single MPPT channel
    pub fn current_limit_per_mppt(&self) -> Amperes {
        if self.mppt_count == 0 {
            return Amperes(0.0);
        }
        self.max_dc_current / f64::from(self.mppt_count)
    }

    /// Enforces `0 < mppt_min < mppt_max <= max_dc_voltage`.
    pub fn validate(&self) -> PvResult<()> {
        require_positive("inverter", "mppt_voltage_min", self.mppt_voltage_min.value())?;
        require_positive("inverter", "max_dc_voltage", self.max_dc_voltage.value())?;
        require_positive("inverter", "max_dc_current", self.max_dc_current.value())?;
        if let Some(power) = self.nominal_ac_power {
            require_positive("inverter", "nominal_ac_power", power.value())?;
        }
        if self.mppt_voltage_min >= self.mppt_voltage_max {
            return Err(PvError::Validation(format!(
                "inverter mppt_voltage_min ({}) must be below mppt_voltage_max ({})",
                self.mppt_voltage_min, self.mppt_voltage_max
            )));
        }
        if self.mppt_voltage_max > self.max_dc_voltage {
            return Err(PvError::Validation(format!(
                "inverter mppt_voltage_max ({}) exceeds max_dc_voltage ({})",
                self.mppt_voltage_max, self.max_dc_voltage
            )));
        }
        if self.mppt_count == 0 {
            return Err(PvError::Validation(
                "inverter must have at least one MPPT".to_string(),
            ));
        }
        if self.strings_per_mppt == 0 {
            return Err(PvError::Validation(
                "inverter strings_per_mppt must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Site temperature extremes. Cold drives maximum Voc, heat drives minimum Vmp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteTemperatureRange {
    pub min: Celsius,
    pub max: Celsius,
}

impl Default for SiteTemperatureRange {
    fn default() -> Self {
        Self {
            min: Celsius(-10.0),
            max: Celsius(70.0),
        }
    }
}

impl SiteTemperatureRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Celsius(min),
            max: Celsius(max),
        }
    }

    /// `min == max` is accepted.
    pub fn validate(&self) -> PvResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(PvError::Validation(
                "site temperatures must be finite".to_string(),
            ));
        }
        if self.min > self.max {
            return Err(PvError::Validation(format!(
                "site minimum temperature ({}) is above maximum ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

fn require_positive(entity: &str, name: &str, value: f64) -> PvResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PvError::Validation(format!(
            "{} {} must be positive (got {})",
            entity, name, value
        )))
    }
}
