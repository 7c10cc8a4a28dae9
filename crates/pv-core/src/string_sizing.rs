//! Modules-per-string bounds from temperature-corrected voltages.
//!
//! The coldest site temperature sets the highest string Voc, which must stay
//! under the inverter's DC limit (with a safety ratio) and its MPPT ceiling.
//! The hottest temperature sets the lowest string Vmp, which must stay above
//! the MPPT floor. Within the resulting `[min, max]` window a recommended
//! count is picked from three candidates in priority order.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::diagnostics::{category, Diagnostics};
use crate::equipment::{InverterElectricalSpec, ModuleElectricalSpec, SiteTemperatureRange};
use crate::policy::DesignPolicy;
use crate::units::Volts;

/// Why a particular modules-per-string count was recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationReason {
    /// STC string Vmp lands near 80 % of MPPT max (75-85 % window)
    MpptSweetSpot,
    /// Longest allowed string, fewest strings and combiner inputs
    MaximumEfficiency,
    /// STC string Vmp near the middle of the MPPT window
    ConservativeMidRange,
    /// No candidate fit; conservative count clamped into range
    FallbackConservative,
    /// Inputs were degenerate and no range could be computed
    Unconfigured,
}

impl RecommendationReason {
    fn priority(self) -> u8 {
        match self {
            RecommendationReason::MpptSweetSpot => 1,
            RecommendationReason::MaximumEfficiency => 2,
            RecommendationReason::ConservativeMidRange => 3,
            RecommendationReason::FallbackConservative => 4,
            RecommendationReason::Unconfigured => 5,
        }
    }
}

impl std::fmt::Display for RecommendationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RecommendationReason::MpptSweetSpot => "MPPT sweet spot (75-85%)",
            RecommendationReason::MaximumEfficiency => "Maximum efficiency",
            RecommendationReason::ConservativeMidRange => "Conservative mid-range",
            RecommendationReason::FallbackConservative => "Fallback conservative",
            RecommendationReason::Unconfigured => "Unconfigured",
        };
        f.write_str(label)
    }
}

/// A candidate count that fell inside the allowed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringCandidate {
    pub count: u32,
    pub reason: RecommendationReason,
    pub priority: u8,
    /// String Vmp at STC
    pub vmp_string: Volts,
    /// STC string Vmp as a percentage of MPPT max
    pub mppt_utilization_percent: f64,
}

/// String voltages at both temperature extremes for a given length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StringVoltages {
    pub modules_per_string: u32,
    pub voc_at_min_temp: Volts,
    pub voc_at_max_temp: Volts,
    pub vmp_at_min_temp: Volts,
    pub vmp_at_max_temp: Volts,
}

impl StringVoltages {
    pub fn for_length(
        module: &ModuleElectricalSpec,
        temps: &SiteTemperatureRange,
        modules_per_string: u32,
    ) -> Self {
        let n = f64::from(modules_per_string);
        Self {
            modules_per_string,
            voc_at_min_temp: module.voc_at(temps.min) * n,
            voc_at_max_temp: module.voc_at(temps.max) * n,
            vmp_at_min_temp: module.vmp_at(temps.min) * n,
            vmp_at_max_temp: module.vmp_at(temps.max) * n,
        }
    }
}

/// Output of [`calculate_optimal_string_length`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringLengthResult {
    /// Lower bound of the reported window
    pub min_modules: u32,
    /// Upper bound of the reported window
    pub max_modules: u32,
    pub recommended: u32,
    pub reason: RecommendationReason,
    pub max_by_voc: u32,
    pub max_by_mppt: u32,
    pub min_by_vmp: u32,
    /// Single-module Voc at the coldest temperature
    pub module_voc_at_min_temp: Volts,
    /// Single-module Vmp at the hottest temperature
    pub module_vmp_at_max_temp: Volts,
    /// Voltages for the recommended string length
    pub string_voltages: StringVoltages,
    /// Candidates that fit the window, best first
    pub candidates: Vec<StringCandidate>,
    /// STC string Vmp of the recommendation as a percentage of MPPT max
    pub mppt_utilization_percent: f64,
    /// True when min exceeded max and the window was swapped
    pub adjusted: bool,
    pub diagnostics: Diagnostics,
}

impl StringLengthResult {
    /// Plain warning strings for display
    pub fn warnings(&self) -> Vec<String> {
        self.diagnostics.messages()
    }

    /// False when the inputs were too degenerate to size a string
    pub fn is_configured(&self) -> bool {
        self.reason != RecommendationReason::Unconfigured
    }

    /// True if `count` lies inside the reported window
    pub fn contains(&self, count: u32) -> bool {
        count >= self.min_modules && count <= self.max_modules
    }
}

pub(crate) fn floor_count(x: f64) -> u32 {
    if x.is_finite() && x > 0.0 {
        x.floor() as u32
    } else {
        0
    }
}

pub(crate) fn ceil_count(x: f64) -> u32 {
    if x.is_finite() && x > 0.0 {
        x.ceil() as u32
    } else {
        0
    }
}

pub(crate) fn round_count(x: f64) -> u32 {
    if x.is_finite() && x > 0.0 {
        x.round() as u32
    } else {
        0
    }
}

/// Size a string for the given module, inverter and site.
///
/// Never panics and never returns a recommendation outside the window it
/// reports. When the raw bounds cross (`min > max`) the window is swapped
/// and two warnings describe the adjustment.
pub fn calculate_optimal_string_length(
    module: &ModuleElectricalSpec,
    inverter: &InverterElectricalSpec,
    temps: &SiteTemperatureRange,
    policy: &DesignPolicy,
) -> StringLengthResult {
    let voc_cold = module.voc_at(temps.min);
    let vmp_hot = module.vmp_at(temps.max);
    debug!(
        voc_cold = voc_cold.value(),
        vmp_hot = vmp_hot.value(),
        "temperature-corrected module voltages"
    );

    let usable = |v: Volts| v.is_finite() && v.value() > 0.0;
    if !usable(voc_cold) || !usable(vmp_hot) || !usable(module.vmp) {
        warn!("module voltage is not positive at the site temperature extremes");
        return unconfigured(module, temps, voc_cold, vmp_hot);
    }

    let max_by_voc = floor_count(
        inverter.max_dc_voltage.value() * policy.dc_voltage_safety_ratio / voc_cold.value(),
    );
    let max_by_mppt = floor_count(inverter.mppt_voltage_max / voc_cold);
    let min_by_vmp = ceil_count(inverter.mppt_voltage_min / vmp_hot);

    let raw_max = max_by_voc.min(max_by_mppt);
    let raw_min = min_by_vmp.max(1);

    let mut diagnostics = Diagnostics::new();
    let adjusted = raw_min > raw_max;
    let (lo, hi) = (raw_min.min(raw_max), raw_min.max(raw_max));
    if adjusted {
        warn!(raw_min, raw_max, "string length bounds crossed; window swapped");
        diagnostics.add_warning(
            category::CONFIGURATION,
            "Challenging operating conditions detected - constraints automatically adjusted",
        );
        diagnostics.add_warning(
            category::CONFIGURATION,
            &format!(
                "Original range: {}-{} modules, Adjusted to: {}-{} modules",
                raw_min, raw_max, lo, hi
            ),
        );
    }

    let sweet_spot = round_count(
        inverter.mppt_voltage_max.value() * policy.mppt_sweet_spot_ratio / module.vmp.value(),
    );
    let conservative = round_count(
        (inverter.mppt_voltage_min.value() + inverter.mppt_voltage_max.value())
            / 2.0
            / module.vmp.value(),
    );

    let floor = lo.max(1);
    let candidates: Vec<StringCandidate> = [
        (sweet_spot, RecommendationReason::MpptSweetSpot),
        (raw_max, RecommendationReason::MaximumEfficiency),
        (conservative, RecommendationReason::ConservativeMidRange),
    ]
    .into_iter()
    .filter(|(count, _)| *count >= floor && *count <= hi)
    .map(|(count, reason)| candidate(module, inverter, count, reason))
    .collect();

    let (recommended, reason) = match candidates.first() {
        Some(best) => (best.count, best.reason),
        None => (
            conservative.clamp(floor, hi.max(floor)),
            RecommendationReason::FallbackConservative,
        ),
    };
    debug!(lo, hi, recommended, %reason, "string length selected");

    let string_voltages = StringVoltages::for_length(module, temps, recommended);
    diagnostics.merge(check_string_voltages(&string_voltages, inverter, temps, policy));

    StringLengthResult {
        min_modules: lo,
        max_modules: hi,
        recommended,
        reason,
        max_by_voc,
        max_by_mppt,
        min_by_vmp,
        module_voc_at_min_temp: voc_cold,
        module_vmp_at_max_temp: vmp_hot,
        string_voltages,
        candidates,
        mppt_utilization_percent: mppt_utilization(module, inverter, recommended),
        adjusted,
        diagnostics,
    }
}

fn candidate(
    module: &ModuleElectricalSpec,
    inverter: &InverterElectricalSpec,
    count: u32,
    reason: RecommendationReason,
) -> StringCandidate {
    StringCandidate {
        count,
        reason,
        priority: reason.priority(),
        vmp_string: module.vmp * f64::from(count),
        mppt_utilization_percent: mppt_utilization(module, inverter, count),
    }
}

fn mppt_utilization(
    module: &ModuleElectricalSpec,
    inverter: &InverterElectricalSpec,
    count: u32,
) -> f64 {
    (module.vmp * f64::from(count)).percent_of(inverter.mppt_voltage_max)
}

fn unconfigured(
    module: &ModuleElectricalSpec,
    temps: &SiteTemperatureRange,
    voc_cold: Volts,
    vmp_hot: Volts,
) -> StringLengthResult {
    let mut diagnostics = Diagnostics::new();
    diagnostics.add_error(
        category::CONFIGURATION,
        "Module voltage is not positive at the site temperature extremes; string length cannot be computed",
    );
    StringLengthResult {
        min_modules: 0,
        max_modules: 0,
        recommended: 0,
        reason: RecommendationReason::Unconfigured,
        max_by_voc: 0,
        max_by_mppt: 0,
        min_by_vmp: 0,
        module_voc_at_min_temp: voc_cold,
        module_vmp_at_max_temp: vmp_hot,
        string_voltages: StringVoltages::for_length(module, temps, 0),
        candidates: Vec::new(),
        mppt_utilization_percent: 0.0,
        adjusted: false,
        diagnostics,
    }
}

/// Voltage-window and margin checks for one string length.
///
/// Exceeding the inverter's absolute DC limit is an error; the MPPT window
/// and margin checks are warnings.
pub fn check_string_voltages(
    voltages: &StringVoltages,
    inverter: &InverterElectricalSpec,
    temps: &SiteTemperatureRange,
    policy: &DesignPolicy,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    let t_min = temps.min.value();
    let t_max = temps.max.value();
    let max_dc = inverter.max_dc_voltage.value();
    let mppt_min = inverter.mppt_voltage_min.value();
    let mppt_max = inverter.mppt_voltage_max.value();

    if voltages.voc_at_min_temp.value() > max_dc {
        diagnostics.add_error(
            category::VOLTAGE,
            &format!(
                "String Voc at {}°C ({:.1}V) exceeds inverter max DC voltage ({}V)",
                t_min,
                voltages.voc_at_min_temp.value(),
                max_dc
            ),
        );
    }
    if voltages.vmp_at_max_temp.value() < mppt_min {
        diagnostics.add_warning(
            category::VOLTAGE,
            &format!(
                "String Vmp at {}°C ({:.1}V) below MPPT minimum ({}V)",
                t_max,
                voltages.vmp_at_max_temp.value(),
                mppt_min
            ),
        );
    }
    if voltages.vmp_at_min_temp.value() > mppt_max {
        diagnostics.add_warning(
            category::VOLTAGE,
            &format!(
                "String Vmp at {}°C ({:.1}V) exceeds MPPT maximum ({}V)",
                t_min,
                voltages.vmp_at_min_temp.value(),
                mppt_max
            ),
        );
    }

    let voc_margin = (max_dc - voltages.voc_at_min_temp.value()) / max_dc * 100.0;
    if voc_margin < policy.voc_margin_min_percent {
        diagnostics.add_warning(
            category::MARGIN,
            &format!(
                "Low Voc safety margin: {:.1}% (recommended >{}%)",
                voc_margin, policy.voc_margin_min_percent
            ),
        );
    }

    let vmp_margin = (voltages.vmp_at_max_temp.value() - mppt_min) / mppt_min * 100.0;
    if vmp_margin < policy.mppt_margin_min_percent {
        diagnostics.add_warning(
            category::MARGIN,
            &format!(
                "Low Vmp safety margin at high temp: {:.1}% (recommended >{}%)",
                vmp_margin, policy.mppt_margin_min_percent
            ),
        );
    }

    diagnostics
}

/// Result of checking a user-chosen string length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringCheck {
    pub voltages: StringVoltages,
    pub min_modules: u32,
    pub max_modules: u32,
    pub within_range: bool,
    pub diagnostics: Diagnostics,
}

/// Check an explicit modules-per-string count against the computed window.
pub fn check_string_configuration(
    module: &ModuleElectricalSpec,
    inverter: &InverterElectricalSpec,
    temps: &SiteTemperatureRange,
    modules_per_string: u32,
    policy: &DesignPolicy,
) -> StringCheck {
    let window = calculate_optimal_string_length(module, inverter, temps, policy);
    let voltages = StringVoltages::for_length(module, temps, modules_per_string);
    let mut diagnostics = check_string_voltages(&voltages, inverter, temps, policy);

    let within_range = window.is_configured() && window.contains(modules_per_string);
    if !within_range {
        diagnostics.add_warning(
            category::CONFIGURATION,
            &format!(
                "{} modules per string is outside the allowed range {}-{}",
                modules_per_string, window.min_modules, window.max_modules
            ),
        );
    }

    StringCheck {
        voltages,
        min_modules: window.min_modules,
        max_modules: window.max_modules,
        within_range,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Amperes;

    fn module() -> ModuleElectricalSpec {
        ModuleElectricalSpec {
            voc: Volts(45.0),
            vmp: Volts(37.0),
            temp_coeff_voc: -0.28,
            temp_coeff_vmp: -0.38,
            ..Default::default()
        }
    }

    fn inverter() -> InverterElectricalSpec {
        InverterElectricalSpec {
            mppt_voltage_min: Volts(125.0),
            mppt_voltage_max: Volts(850.0),
            max_dc_voltage: Volts(1000.0),
            max_dc_current: Amperes(30.0),
            ..Default::default()
        }
    }

    fn site() -> SiteTemperatureRange {
        SiteTemperatureRange::new(-10.0, 45.0)
    }

    #[test]
    fn bounds_for_reference_module() {
        let result =
            calculate_optimal_string_length(&module(), &inverter(), &site(), &DesignPolicy::default());

        assert!((result.module_voc_at_min_temp.value() - 49.41).abs() < 1e-9);
        assert_eq!(result.max_by_voc, 19);
        assert_eq!(result.max_by_mppt, 17);
        assert_eq!(result.max_modules, 17);
        // 125 / 34.188 = 3.66
        assert_eq!(result.min_by_vmp, 4);
        assert_eq!(result.min_modules, 4);
        assert!(!result.adjusted);
    }

    #[test]
    fn maximum_efficiency_when_sweet_spot_exceeds_window() {
        let result =
            calculate_optimal_string_length(&module(), &inverter(), &site(), &DesignPolicy::default());

        // round(680 / 37) = 18 is above max 17, so maximum efficiency wins
        assert_eq!(result.recommended, 17);
        assert_eq!(result.reason, RecommendationReason::MaximumEfficiency);
        assert_eq!(result.candidates[0].count, 17);
        // conservative round(487.5 / 37) = 13 also fits
        assert!(result.candidates.iter().any(|c| c.count == 13));
    }

    #[test]
    fn sweet_spot_selected_once_it_fits_the_window() {
        let inverter = InverterElectricalSpec {
            mppt_voltage_max: Volts(600.0),
            ..inverter()
        };
        let result =
            calculate_optimal_string_length(&module(), &inverter, &site(), &DesignPolicy::default());

        // sweet spot round(480 / 37) = 13 is above floor(600 / 49.41) = 12
        assert_eq!(result.max_modules, 12);
        assert_eq!(result.reason, RecommendationReason::MaximumEfficiency);

        let relaxed = DesignPolicy {
            mppt_sweet_spot_ratio: 0.70,
            ..DesignPolicy::default()
        };
        let result = calculate_optimal_string_length(&module(), &inverter, &site(), &relaxed);
        // round(420 / 37) = 11
        assert_eq!(result.recommended, 11);
        assert_eq!(result.reason, RecommendationReason::MpptSweetSpot);
    }

    #[test]
    fn crossed_bounds_are_swapped_and_reported() {
        let inverter = InverterElectricalSpec {
            mppt_voltage_min: Volts(700.0),
            mppt_voltage_max: Volts(750.0),
            max_dc_voltage: Volts(800.0),
            ..inverter()
        };
        let hot_site = SiteTemperatureRange::new(-10.0, 80.0);
        let result =
            calculate_optimal_string_length(&module(), &inverter, &hot_site, &DesignPolicy::default());

        assert!(result.adjusted);
        assert!(result.min_modules <= result.max_modules);
        assert!(result.contains(result.recommended));
        assert!(result.diagnostics.mentions("Challenging operating conditions"));
        assert!(result.diagnostics.mentions("Original range:"));
    }

    #[test]
    fn equal_temperatures_still_compute() {
        let site = SiteTemperatureRange::new(25.0, 25.0);
        let result =
            calculate_optimal_string_length(&module(), &inverter(), &site, &DesignPolicy::default());
        assert!(result.is_configured());
        // floor(850 / 45) = 18
        assert_eq!(result.max_modules, 18);
    }

    #[test]
    fn degenerate_module_is_unconfigured() {
        let module = ModuleElectricalSpec {
            temp_coeff_vmp: -6.0,
            ..module()
        };
        // 1 − 0.06 × 20 < 0 at 45 °C
        let result =
            calculate_optimal_string_length(&module, &inverter(), &site(), &DesignPolicy::default());
        assert!(!result.is_configured());
        assert_eq!(result.recommended, 0);
        assert!(result.diagnostics.has_errors());
    }

    #[test]
    fn margin_warning_near_dc_limit() {
        let voltages = StringVoltages::for_length(&module(), &site(), 20);
        let diag = check_string_voltages(&voltages, &inverter(), &site(), &DesignPolicy::default());

        // 20 × 49.41 = 988.2 V: inside the limit but under 5 % headroom
        assert!(!diag.has_errors());
        assert_eq!(diag.warning_count(), 1);
        assert!(diag.mentions("Low Voc safety margin: 1.2%"));
    }

    #[test]
    fn cold_vmp_above_mppt_window_warns() {
        let inverter = InverterElectricalSpec {
            mppt_voltage_max: Volts(700.0),
            ..inverter()
        };
        let voltages = StringVoltages::for_length(&module(), &site(), 18);
        let diag = check_string_voltages(&voltages, &inverter, &site(), &DesignPolicy::default());

        // 18 × 37 × (1 + 0.0038 × 35) = 754.6 V
        assert!(!diag.has_errors());
        assert_eq!(diag.warning_count(), 1);
        assert!(diag.mentions("String Vmp at -10°C (754.6V) exceeds MPPT maximum (700V)"));
    }

    #[test]
    fn thin_hot_vmp_margin_warns() {
        let voltages = StringVoltages::for_length(&module(), &site(), 4);
        let diag = check_string_voltages(&voltages, &inverter(), &site(), &DesignPolicy::default());

        // 4 × 34.188 = 136.75 V, 9.4 % above the 125 V MPPT minimum
        assert!(!diag.has_errors());
        assert_eq!(diag.warning_count(), 1);
        assert!(diag.mentions("Low Vmp safety margin at high temp: 9.4%"));
    }

    #[test]
    fn over_voltage_is_an_error() {
        let voltages = StringVoltages::for_length(&module(), &site(), 21);
        let diag = check_string_voltages(&voltages, &inverter(), &site(), &DesignPolicy::default());
        assert!(diag.has_errors());
        assert!(diag.mentions("exceeds inverter max DC voltage"));
    }

    #[test]
    fn explicit_length_outside_window() {
        let check = check_string_configuration(
            &module(),
            &inverter(),
            &site(),
            3,
            &DesignPolicy::default(),
        );
        assert!(!check.within_range);
        assert!(check.diagnostics.mentions("outside the allowed range 4-17"));
        assert!(check.diagnostics.mentions("below MPPT minimum"));
    }

    #[test]
    fn explicit_length_inside_window() {
        let check = check_string_configuration(
            &module(),
            &inverter(),
            &site(),
            12,
            &DesignPolicy::default(),
        );
        assert!(check.within_range);
        assert!(!check.diagnostics.has_issues());
        assert_eq!(check.voltages.modules_per_string, 12);
    }
}
