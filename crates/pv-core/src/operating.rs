//! Operating conditions and array-level string counts.

use serde::{Deserialize, Serialize};

use crate::equipment::{ModuleElectricalSpec, SiteTemperatureRange};
use crate::string_sizing::{ceil_count, round_count};
use crate::units::{Celsius, Volts, Watts};

/// Module and string voltages at the site extremes, plus string power.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingConditions {
    pub modules_per_string: u32,
    pub vmp_at_min_temp: Volts,
    pub vmp_at_max_temp: Volts,
    pub voc_at_min_temp: Volts,
    pub voc_at_max_temp: Volts,
    pub string_vmp_at_min_temp: Volts,
    pub string_vmp_at_max_temp: Volts,
    pub string_voc_at_min_temp: Volts,
    pub string_voc_at_max_temp: Volts,
    pub power_at_stc: Watts,
    /// String power at the policy's operating cell temperature
    pub power_at_operating: Watts,
    pub operating_cell_temperature: Celsius,
}

/// Returns `None` for an empty string, which has no meaningful conditions.
pub fn operating_conditions(
    module: &ModuleElectricalSpec,
    temps: &SiteTemperatureRange,
    modules_per_string: u32,
    operating_cell_temperature: Celsius,
) -> Option<OperatingConditions> {
    if modules_per_string == 0 {
        return None;
    }
    let n = f64::from(modules_per_string);
    let vmp_at_min_temp = module.vmp_at(temps.min);
    let vmp_at_max_temp = module.vmp_at(temps.max);
    let voc_at_min_temp = module.voc_at(temps.min);
    let voc_at_max_temp = module.voc_at(temps.max);

    Some(OperatingConditions {
        modules_per_string,
        vmp_at_min_temp,
        vmp_at_max_temp,
        voc_at_min_temp,
        voc_at_max_temp,
        string_vmp_at_min_temp: vmp_at_min_temp * n,
        string_vmp_at_max_temp: vmp_at_max_temp * n,
        string_voc_at_min_temp: voc_at_min_temp * n,
        string_voc_at_max_temp: voc_at_max_temp * n,
        power_at_stc: module.power * n,
        power_at_operating: module.power_at(operating_cell_temperature) * n,
        operating_cell_temperature,
    })
}

/// How a block of modules splits into strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StringConfiguration {
    pub modules_per_string: u32,
    pub string_count: u32,
    pub power_per_string: Watts,
    /// Modules that do not fill a complete string
    pub leftover_modules: u32,
}

impl StringConfiguration {
    pub fn total_power(&self) -> Watts {
        self.power_per_string * f64::from(self.string_count)
    }
}

/// Split `module_count` modules into complete strings of `modules_per_string`.
pub fn auto_configure(
    module_count: u32,
    modules_per_string: u32,
    module_power: Watts,
) -> StringConfiguration {
    let string_count = module_count.checked_div(modules_per_string).unwrap_or(0);
    StringConfiguration {
        modules_per_string,
        string_count,
        power_per_string: module_power * f64::from(modules_per_string),
        leftover_modules: module_count - string_count * modules_per_string,
    }
}

/// Module and string totals for a plant of a given DC capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasicStringParameters {
    pub total_modules: u32,
    pub total_strings: u32,
    pub modules_per_string: u32,
    /// STC string voltage (modules × Vmp)
    pub average_string_voltage: Volts,
}

/// `total_modules = round(kW × 1000 / W)`, `total_strings = ceil(modules / mps)`.
pub fn basic_string_parameters(
    capacity_kw: f64,
    module: &ModuleElectricalSpec,
    modules_per_string: u32,
) -> BasicStringParameters {
    let total_modules = round_count(Watts::from_kilowatts(capacity_kw) / module.power);
    let total_strings = if modules_per_string == 0 {
        0
    } else {
        ceil_count(f64::from(total_modules) / f64::from(modules_per_string))
    };
    BasicStringParameters {
        total_modules,
        total_strings,
        modules_per_string,
        average_string_voltage: module.vmp * f64::from(modules_per_string),
    }
}
