//! HT (medium-voltage) cable sizing for the plant export run.
//!
//! HT cables are tabulated with their in-ground ampacity, AC resistance and
//! reactance. A size is suitable when `base × K × runs` carries the design
//! current, where `K` is the buried K1-K4 product for that cable's conductor
//! rating. The drop is taken over the impedance `√(R² + X²)`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cable::{design_current, ConductorMaterial};
use crate::derating::{BurialConditions, KFactors, XLPE_MAX_TEMPERATURE};
use crate::diagnostics::{category, Diagnostics};
use crate::policy::DesignPolicy;
use crate::units::{Amperes, Celsius, Meters, OhmsPerKm, SquareMillimeters, Volts};
use crate::voltage_drop::{impedance_voltage_drop, AcVoltageDrop};
use crate::{PvError, PvResult};

/// One row of an HT cable table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HtCableSpec {
    pub cross_section: SquareMillimeters,
    pub material: ConductorMaterial,
    /// Ampacity laid direct in ground at reference conditions
    pub current_in_ground: Amperes,
    pub ac_resistance: OhmsPerKm,
    pub reactance: OhmsPerKm,
    /// Maximum conductor temperature, for the K2 factor
    pub max_temperature: Celsius,
}

impl HtCableSpec {
    pub fn label(&self) -> String {
        format!("{} mm² {} HT", self.cross_section.value(), self.material.symbol())
    }
}

const fn ht(mm2: f64, ground: f64, r: f64, x: f64) -> HtCableSpec {
    HtCableSpec {
        cross_section: SquareMillimeters(mm2),
        material: ConductorMaterial::Aluminum,
        current_in_ground: Amperes(ground),
        ac_resistance: OhmsPerKm(r),
        reactance: OhmsPerKm(x),
        max_temperature: Celsius(XLPE_MAX_TEMPERATURE),
    }
}

// 33 kV single-core aluminum XLPE, trefoil
static BUILTIN: Lazy<Vec<HtCableSpec>> = Lazy::new(|| {
    vec![
        ht(95.0, 235.0, 0.411, 0.129),
        ht(120.0, 265.0, 0.325, 0.124),
        ht(150.0, 295.0, 0.265, 0.120),
        ht(185.0, 335.0, 0.211, 0.116),
        ht(240.0, 385.0, 0.161, 0.111),
        ht(300.0, 430.0, 0.130, 0.107),
        ht(400.0, 485.0, 0.102, 0.103),
        ht(500.0, 545.0, 0.0804, 0.0996),
        ht(630.0, 605.0, 0.0639, 0.0961),
    ]
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtCableCatalog {
    pub cables: Vec<HtCableSpec>,
}

impl HtCableCatalog {
    pub fn new(cables: Vec<HtCableSpec>) -> PvResult<Self> {
        if cables.is_empty() {
            return Err(PvError::Catalog("HT cable table is empty".to_string()));
        }
        if let Some(bad) = cables.iter().find(|c| {
            !(c.cross_section.value() > 0.0
                && c.current_in_ground.value() > 0.0
                && c.ac_resistance.value() > 0.0
                && c.reactance.value() >= 0.0)
        }) {
            return Err(PvError::Catalog(format!(
                "HT cable {} has a non-positive cross-section, ampacity or resistance",
                bad.label()
            )));
        }
        Ok(Self { cables })
    }

    /// Built-in 33 kV aluminum XLPE table, 95-630 mm².
    pub fn builtin() -> Self {
        Self {
            cables: BUILTIN.clone(),
        }
    }

    /// Cables of one material, ascending by cross-section.
    pub fn by_material(&self, material: ConductorMaterial) -> Vec<HtCableSpec> {
        let mut cables: Vec<HtCableSpec> = self
            .cables
            .iter()
            .filter(|c| c.material == material)
            .copied()
            .collect();
        cables.sort_by(|a, b| a.cross_section.0.total_cmp(&b.cross_section.0));
        cables
    }
}

impl Default for HtCableCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The buried run from the plant transformer to the grid connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HtCableRun {
    pub length: Meters,
    pub line_voltage: Volts,
    #[serde(default = "aluminum")]
    pub material: ConductorMaterial,
    #[serde(default = "one")]
    pub runs: u32,
    #[serde(default)]
    pub burial: BurialConditions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_section: Option<f64>,
}

fn aluminum() -> ConductorMaterial {
    ConductorMaterial::Aluminum
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtCandidate {
    pub cable: HtCableSpec,
    pub base_ampacity: Amperes,
    pub k_factors: KFactors,
    /// `base × K × runs`
    pub derated_ampacity: Amperes,
    pub suitable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtRunReport {
    pub current: Amperes,
    pub design_current: Amperes,
    pub runs: u32,
    pub candidates: Vec<HtCandidate>,
    pub recommended: Option<HtCableSpec>,
    pub chosen: Option<HtCableSpec>,
    pub chosen_suitable: bool,
    pub voltage_drop: Option<AcVoltageDrop>,
    pub diagnostics: Diagnostics,
}

impl HtRunReport {
    pub fn candidate(&self, cross_section: f64) -> Option<&HtCandidate> {
        self.candidates
            .iter()
            .find(|c| (c.cable.cross_section.value() - cross_section).abs() < 1e-9)
    }
}

/// Size an HT run carrying `current` and compute its impedance drop.
///
/// The drop uses the operating current; suitability uses the design current.
pub fn size_ht_run(
    catalog: &HtCableCatalog,
    run: &HtCableRun,
    current: Amperes,
    policy: &DesignPolicy,
) -> HtRunReport {
    let design = design_current(current, policy.current_safety_factor);
    let mut diagnostics = Diagnostics::new();
    if run.runs == 0 {
        diagnostics.add_error(category::CONFIGURATION, "Number of parallel runs must be at least 1");
    }

    let mut burial_diagnostics = Diagnostics::new();
    let candidates: Vec<HtCandidate> = catalog
        .by_material(run.material)
        .into_iter()
        .map(|cable| {
            let (k, issues) = run.burial.k_factors(cable.max_temperature);
            if !burial_diagnostics.has_issues() {
                burial_diagnostics = issues;
            }
            let derated = cable.current_in_ground * k.total * f64::from(run.runs);
            HtCandidate {
                cable,
                base_ampacity: cable.current_in_ground,
                k_factors: k,
                derated_ampacity: derated,
                suitable: derated.is_finite() && derated >= design,
            }
        })
        .collect();
    diagnostics.merge(burial_diagnostics);

    let recommended = candidates.iter().find(|c| c.suitable).map(|c| c.cable);
    if recommended.is_none() {
        diagnostics.add_error(
            category::AMPACITY,
            &format!(
                "No suitable HT cable: {:.1}A design current over {} run(s) exceeds every {} size",
                design.value(),
                run.runs,
                run.material.symbol()
            ),
        );
    }

    let (chosen, chosen_suitable) = match run.cross_section {
        Some(size) => {
            let found = candidates
                .iter()
                .find(|c| (c.cable.cross_section.value() - size).abs() < 1e-9);
            match found {
                Some(candidate) => (Some(candidate.cable), candidate.suitable),
                None => {
                    diagnostics.add_error(
                        category::CONFIGURATION,
                        &format!("Requested HT cable size {} mm² is not in the catalog", size),
                    );
                    (None, false)
                }
            }
        }
        None => (recommended, recommended.is_some()),
    };
    if let (Some(cable), false) = (chosen, chosen_suitable) {
        diagnostics.add_error(
            category::AMPACITY,
            &format!("{} is undersized for {:.1}A", cable.label(), design.value()),
        );
    }

    let voltage_drop = chosen.map(|cable| {
        impedance_voltage_drop(
            current,
            cable.ac_resistance,
            cable.reactance,
            run.length,
            run.runs,
            run.line_voltage,
            policy.ht_drop_limit_percent,
        )
    });
    if let Some(drop) = voltage_drop {
        if !drop.acceptable {
            diagnostics.add_warning(
                category::VOLTAGE_DROP,
                &format!(
                    "Voltage drop {:.2}% exceeds {}% limit",
                    drop.percent, drop.limit_percent
                ),
            );
        }
    }
    debug!(
        design = design.value(),
        runs = run.runs,
        chosen = ?chosen.map(|c| c.cross_section.value()),
        "HT cable sized"
    );

    HtRunReport {
        current,
        design_current: design,
        runs: run.runs,
        candidates,
        recommended,
        chosen,
        chosen_suitable,
        voltage_drop,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(length: f64, runs: u32) -> HtCableRun {
        HtCableRun {
            length: Meters(length),
            line_voltage: Volts(33_000.0),
            material: ConductorMaterial::Aluminum,
            runs,
            burial: BurialConditions::default(),
            cross_section: None,
        }
    }

    fn size(run: &HtCableRun, current: f64) -> HtRunReport {
        size_ht_run(
            &HtCableCatalog::builtin(),
            run,
            Amperes(current),
            &DesignPolicy::default(),
        )
    }

    #[test]
    fn smallest_size_carrying_design_current() {
        // 150 A × 1.25 = 187.5 A; 95 mm² carries 235 × 0.7184 = 168.8 A
        let report = size(&run(2000.0, 1), 150.0);

        assert_eq!(report.design_current, Amperes(187.5));
        assert!(!report.candidate(95.0).unwrap().suitable);
        let chosen = report.chosen.unwrap();
        assert_eq!(chosen.cross_section.value(), 120.0);
        let k = report.candidate(120.0).unwrap().k_factors.total;
        assert!((k - 0.718_381).abs() < 1e-6);
        assert!(!report.diagnostics.has_issues());
    }

    #[test]
    fn drop_over_impedance() {
        let mut ht_run = run(2000.0, 1);
        ht_run.cross_section = Some(240.0);
        let report = size(&ht_run, 150.0);

        let drop = report.voltage_drop.unwrap();
        let z = 0.161f64.hypot(0.111) * 2.0;
        assert!((drop.impedance.value() - z).abs() < 1e-9);
        assert!((drop.volts.value() - 3f64.sqrt() * 150.0 * z).abs() < 1e-6);
        assert!(drop.acceptable);
        assert_eq!(drop.limit_percent, 2.0);
    }

    #[test]
    fn parallel_runs_multiply_ampacity() {
        // 900 A × 1.25 = 1125 A; the largest single run carries 605 × 0.7184 = 434.6 A
        let single = size(&run(1000.0, 1), 900.0);
        assert!(single.recommended.is_none());
        assert!(single.diagnostics.mentions("No suitable HT cable"));

        let triple = size(&run(1000.0, 3), 900.0);
        let chosen = triple.chosen.unwrap();
        let candidate = triple.candidate(chosen.cross_section.value()).unwrap();
        assert!(candidate.derated_ampacity >= triple.design_current);
        assert_eq!(triple.voltage_drop.unwrap().runs, 3);
    }

    #[test]
    fn unknown_requested_size_is_reported() {
        let mut ht_run = run(500.0, 1);
        ht_run.cross_section = Some(110.0);
        let report = size(&ht_run, 100.0);
        assert!(report.chosen.is_none());
        assert!(report.voltage_drop.is_none());
        assert!(report.diagnostics.mentions("110 mm² is not in the catalog"));
    }

    #[test]
    fn hot_soil_leaves_nothing_suitable() {
        let mut ht_run = run(500.0, 1);
        ht_run.burial.soil_temperature = Celsius(95.0);
        let report = size(&ht_run, 50.0);
        assert!(report.recommended.is_none());
        assert!(report.diagnostics.mentions("no headroom"));
    }

    #[test]
    fn catalog_rejects_bad_rows() {
        let mut bad = HtCableCatalog::builtin().cables;
        bad[0].ac_resistance = OhmsPerKm(0.0);
        assert!(HtCableCatalog::new(bad).is_err());
        assert!(HtCableCatalog::new(Vec::new()).is_err());
    }
}
