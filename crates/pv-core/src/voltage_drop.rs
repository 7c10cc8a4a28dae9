//! DC and three-phase AC voltage drop.
//!
//! DC: a two-conductor loop, optionally split over parallel runs,
//! `Vd = I × 2 × R_km × L / (1000 × runs)`.
//!
//! AC: resistive three-phase approximation, `R = ρ × L / A`,
//! `Vd = √3 × I × R / runs`, losses `3 × I² × R / runs`. A single run is the
//! plain `√3 × I × R`.
//!
//! HT: tabulated AC resistance and reactance per km, with the drop taken
//! over the impedance `√(R² + X²)` and losses over the resistance alone.

use serde::{Deserialize, Serialize};

use crate::cable::ConductorMaterial;
use crate::policy::DesignPolicy;
use crate::units::{Amperes, Meters, Ohms, OhmsPerKm, SquareMillimeters, Volts, Watts};

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Which DC segment a drop belongs to. Each has its own limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcSegment {
    /// Module string to inverter or combiner
    String,
    /// DCDB output to inverter
    DcdbToInverter,
}

impl DcSegment {
    pub fn limit_percent(&self, policy: &DesignPolicy) -> f64 {
        match self {
            DcSegment::String => policy.string_drop_limit_percent,
            DcSegment::DcdbToInverter => policy.dcdb_drop_limit_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageDrop {
    pub volts: Volts,
    pub percent: f64,
    pub limit_percent: f64,
    pub acceptable: bool,
}

impl VoltageDrop {
    fn classify(volts: Volts, system_voltage: Volts, limit_percent: f64) -> Self {
        let percent = if system_voltage.value() > 0.0 {
            volts.percent_of(system_voltage)
        } else {
            f64::NAN
        };
        Self {
            volts,
            percent,
            limit_percent,
            // NaN compares false
            acceptable: percent <= limit_percent,
        }
    }
}

/// DC loop drop over `runs` parallel runs of a cable with resistance `r`.
///
/// `runs == 0` or a non-positive system voltage yields a non-acceptable
/// result rather than an error.
pub fn dc_voltage_drop(
    current: Amperes,
    resistance: OhmsPerKm,
    length: Meters,
    runs: u32,
    system_voltage: Volts,
    limit_percent: f64,
) -> VoltageDrop {
    let volts = if runs == 0 {
        Volts(f64::INFINITY)
    } else {
        let loop_resistance = resistance.over_length(length * 2.0) / f64::from(runs);
        loop_resistance.voltage_at(current)
    };
    VoltageDrop::classify(volts, system_voltage, limit_percent)
}

/// [`dc_voltage_drop`] with the segment's limit from `policy`.
pub fn dc_segment_drop(
    segment: DcSegment,
    current: Amperes,
    resistance: OhmsPerKm,
    length: Meters,
    runs: u32,
    system_voltage: Volts,
    policy: &DesignPolicy,
) -> VoltageDrop {
    dc_voltage_drop(
        current,
        resistance,
        length,
        runs,
        system_voltage,
        segment.limit_percent(policy),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcVoltageDrop {
    /// Resistance of the parallel set, one phase
    pub resistance: Ohms,
    /// Impedance of the parallel set; equals `resistance` for the resistive model
    pub impedance: Ohms,
    pub runs: u32,
    pub volts: Volts,
    pub percent: f64,
    pub limit_percent: f64,
    pub acceptable: bool,
    pub power_loss: Watts,
}

impl AcVoltageDrop {
    pub fn power_loss_kw(&self) -> f64 {
        self.power_loss.to_kilowatts()
    }
}

/// Three-phase drop for a single run of `cross_section` and `length`.
pub fn ac_voltage_drop(
    current: Amperes,
    length: Meters,
    cross_section: SquareMillimeters,
    material: ConductorMaterial,
    line_voltage: Volts,
    limit_percent: f64,
) -> AcVoltageDrop {
    ac_parallel_voltage_drop(
        current,
        length,
        cross_section,
        material,
        1,
        line_voltage,
        limit_percent,
    )
}

/// Three-phase drop with the current shared over `runs` identical runs.
///
/// `runs == 0` or a non-positive cross-section gives an infinite resistance
/// and a non-acceptable result.
pub fn ac_parallel_voltage_drop(
    current: Amperes,
    length: Meters,
    cross_section: SquareMillimeters,
    material: ConductorMaterial,
    runs: u32,
    line_voltage: Volts,
    limit_percent: f64,
) -> AcVoltageDrop {
    let resistance = if cross_section.value() > 0.0 && runs > 0 {
        Ohms(material.resistivity() * length.value() / cross_section.value() / f64::from(runs))
    } else {
        Ohms(f64::INFINITY)
    };
    three_phase_drop(current, resistance, resistance, runs, line_voltage, limit_percent)
}

/// Three-phase drop over the impedance of a tabulated HT cable.
pub fn impedance_voltage_drop(
    current: Amperes,
    resistance: OhmsPerKm,
    reactance: OhmsPerKm,
    length: Meters,
    runs: u32,
    line_voltage: Volts,
    limit_percent: f64,
) -> AcVoltageDrop {
    let (r, z) = if runs > 0 {
        let per_run = f64::from(runs);
        let r = resistance.over_length(length) / per_run;
        let z = OhmsPerKm(resistance.value().hypot(reactance.value())).over_length(length) / per_run;
        (r, z)
    } else {
        (Ohms(f64::INFINITY), Ohms(f64::INFINITY))
    };
    three_phase_drop(current, r, z, runs, line_voltage, limit_percent)
}

fn three_phase_drop(
    current: Amperes,
    resistance: Ohms,
    impedance: Ohms,
    runs: u32,
    line_voltage: Volts,
    limit_percent: f64,
) -> AcVoltageDrop {
    let volts = impedance.voltage_at(current) * SQRT_3;
    let drop = VoltageDrop::classify(volts, line_voltage, limit_percent);
    AcVoltageDrop {
        resistance,
        impedance,
        runs,
        volts,
        percent: drop.percent,
        limit_percent,
        acceptable: drop.acceptable,
        power_loss: Watts(3.0 * current.value().powi(2) * resistance.value()),
    }
}

/// Line current of a three-phase inverter: `P / (√3 × V × pf)`.
///
/// Zero voltage or power factor yields NaN or infinity.
pub fn inverter_ac_current(power: Watts, line_voltage: Volts, power_factor: f64) -> Amperes {
    let denominator = SQRT_3 * line_voltage.value() * power_factor;
    if denominator == 0.0 {
        return Amperes(f64::NAN);
    }
    Amperes(power.value() / denominator)
}
