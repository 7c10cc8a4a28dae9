//! Linear temperature correction of module nameplate values.
//!
//! `V(T) = V_stc × (1 + coeff/100 × (T − 25))`, with `coeff` in %/°C. The same
//! relation is used for power with the Pmax coefficient.

use crate::equipment::ModuleElectricalSpec;
use crate::units::{Celsius, Volts, Watts};

/// Scale factor for a %/°C coefficient at temperature `t`.
#[inline]
pub fn correction_factor(coeff_percent_per_c: f64, t: Celsius) -> f64 {
    1.0 + coeff_percent_per_c / 100.0 * t.delta_from_stc()
}

/// Temperature-corrected voltage.
#[inline]
pub fn corrected_voltage(v_stc: Volts, coeff_percent_per_c: f64, t: Celsius) -> Volts {
    v_stc * correction_factor(coeff_percent_per_c, t)
}

/// Temperature-corrected power.
#[inline]
pub fn corrected_power(p_stc: Watts, coeff_percent_per_c: f64, t: Celsius) -> Watts {
    p_stc * correction_factor(coeff_percent_per_c, t)
}

impl ModuleElectricalSpec {
    /// Single-module Voc at temperature `t`
    pub fn voc_at(&self, t: Celsius) -> Volts {
        corrected_voltage(self.voc, self.temp_coeff_voc, t)
    }

    /// Single-module Vmp at temperature `t`
    pub fn vmp_at(&self, t: Celsius) -> Volts {
        corrected_voltage(self.vmp, self.temp_coeff_vmp, t)
    }

    /// Single-module Pmax at cell temperature `t`
    pub fn power_at(&self, t: Celsius) -> Watts {
        corrected_power(self.power, self.temp_coeff_pmax, t)
    }
}
