//! End-to-end evaluation of a plant description.
//!
//! Chains the individual calculations the way a designer would: size the
//! string, count strings and DCDBs, land strings on MPPTs, then size the
//! string, DCDB, AC and HT cables and check their voltage drop.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::breaker::{select_breaker, BreakerKind, BreakerSelection};
use crate::cable::{
    select_cables, CableCatalog, CableSelection, CableSpec, ConductorMaterial, SelectionRequest,
};
use crate::dcdb::{dcdb_requirements, DcdbOptions, DcdbRequirements};
use crate::derating::{
    BurialConditions, DeratingTables, InstallationConditions, XLPE_MAX_TEMPERATURE,
};
use crate::diagnostics::{category, Diagnostics};
use crate::equipment::{InverterElectricalSpec, ModuleElectricalSpec, SiteTemperatureRange};
use crate::ht_cable::{size_ht_run, HtCableCatalog, HtCableRun, HtRunReport};
use crate::mppt::{auto_assign_strings, AutoAssignment, StringGroup};
use crate::operating::{
    auto_configure, basic_string_parameters, operating_conditions, BasicStringParameters,
    OperatingConditions, StringConfiguration,
};
use crate::policy::DesignPolicy;
use crate::string_sizing::{
    calculate_optimal_string_length, check_string_configuration, StringCheck, StringLengthResult,
};
use crate::units::{Amperes, Celsius, Meters, Volts, Watts};
use crate::voltage_drop::{
    ac_parallel_voltage_drop, dc_segment_drop, inverter_ac_current, AcVoltageDrop, DcSegment,
    VoltageDrop,
};
use crate::PvResult;

/// A DC cable run to size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcCableRun {
    pub length: Meters,
    #[serde(default)]
    pub material: ConductorMaterial,
    #[serde(default)]
    pub conditions: InstallationConditions,
    /// Parallel runs sharing the current
    #[serde(default = "one")]
    pub runs: u32,
    /// Chosen cross-section in mm²; the recommendation is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_section: Option<f64>,
}

/// The three-phase run from inverter to the AC point of connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcCableRun {
    pub length: Meters,
    pub line_voltage: Volts,
    #[serde(default)]
    pub material: ConductorMaterial,
    #[serde(default)]
    pub conditions: InstallationConditions,
    /// Parallel runs per phase
    #[serde(default = "one")]
    pub runs: u32,
    /// Trench conditions; replaces the table derating when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burial: Option<BurialConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_section: Option<f64>,
    #[serde(default = "default_ac_breaker")]
    pub breaker: BreakerKind,
}

fn one() -> u32 {
    1
}

fn default_ac_breaker() -> BreakerKind {
    BreakerKind::Mccb
}

/// Canonical plant description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInput {
    pub name: String,
    pub module: ModuleElectricalSpec,
    pub inverter: InverterElectricalSpec,
    pub site: SiteTemperatureRange,
    pub inverter_count: u32,
    /// Explicit string length; recommended length is used when absent
    pub modules_per_string: Option<u32>,
    /// DC capacity in kW, for plant-level string counts
    pub capacity_kw: Option<f64>,
    /// Module count of a single sub-array, for auto-configuration
    pub module_count: Option<u32>,
    pub dcdb: Option<DcdbOptions>,
    pub string_groups: Vec<StringGroup>,
    pub string_cable: Option<DcCableRun>,
    pub dcdb_cable: Option<DcCableRun>,
    pub ac_cable: Option<AcCableRun>,
    pub ht_cable: Option<HtCableRun>,
    pub policy: DesignPolicy,
}

impl ProjectInput {
    pub fn validate(&self) -> PvResult<()> {
        self.module.validate()?;
        self.inverter.validate()?;
        self.site.validate()?;
        self.policy.validate()?;
        Ok(())
    }
}

/// Sizing and drop for one cable run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableRunReport {
    pub selection: CableSelection,
    /// Cable the drop was computed for
    pub chosen: Option<CableSpec>,
    pub chosen_suitable: bool,
    pub voltage_drop: Option<VoltageDrop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcRunReport {
    pub current: Amperes,
    pub selection: CableSelection,
    pub chosen: Option<CableSpec>,
    pub voltage_drop: Option<AcVoltageDrop>,
    pub breaker: BreakerSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub name: String,
    pub string_length: StringLengthResult,
    pub modules_per_string: u32,
    pub string_check: Option<StringCheck>,
    pub operating: Option<OperatingConditions>,
    pub configuration: Option<StringConfiguration>,
    pub plant: Option<BasicStringParameters>,
    pub dcdb: Option<DcdbRequirements>,
    pub mppt: Option<AutoAssignment>,
    pub string_cable: Option<CableRunReport>,
    pub dcdb_cable: Option<CableRunReport>,
    pub ac_cable: Option<AcRunReport>,
    pub ht_cable: Option<HtRunReport>,
    pub diagnostics: Diagnostics,
}

/// Evaluate every section the project describes.
///
/// AC and HT runs are sized from the inverter's nominal AC power; without
/// it both sections are skipped with a configuration warning.
pub fn evaluate_project(
    project: &ProjectInput,
    catalog: &CableCatalog,
    ht_catalog: &HtCableCatalog,
    tables: &DeratingTables,
) -> ProjectReport {
    let policy = &project.policy;
    let mut diagnostics = Diagnostics::new();

    let string_length =
        calculate_optimal_string_length(&project.module, &project.inverter, &project.site, policy);
    diagnostics.merge_with_entity(string_length.diagnostics.clone(), "string sizing");

    let modules_per_string = project
        .modules_per_string
        .unwrap_or(string_length.recommended);
    let string_check = project.modules_per_string.map(|mps| {
        let check = check_string_configuration(
            &project.module,
            &project.inverter,
            &project.site,
            mps,
            policy,
        );
        diagnostics.merge_with_entity(check.diagnostics.clone(), "string check");
        check
    });
    info!(project = %project.name, modules_per_string, "string length fixed");

    let operating = operating_conditions(
        &project.module,
        &project.site,
        modules_per_string,
        policy.operating_cell_temperature,
    );
    let configuration = project
        .module_count
        .map(|count| auto_configure(count, modules_per_string, project.module.power));
    let plant = project
        .capacity_kw
        .map(|kw| basic_string_parameters(kw, &project.module, modules_per_string));

    let dcdb = match (project.dcdb, plant) {
        (Some(options), Some(plant)) => {
            let req = dcdb_requirements(
                plant.total_strings,
                project.inverter_count,
                &project.inverter,
                options,
            );
            diagnostics.merge_with_entity(req.diagnostics.clone(), "dcdb");
            Some(req)
        }
        (Some(_), None) => {
            diagnostics.add_warning(
                category::CONFIGURATION,
                "DCDB sizing needs capacity_kw to count strings; section skipped",
            );
            None
        }
        _ => None,
    };

    let mppt = if project.string_groups.is_empty() {
        None
    } else {
        let result = auto_assign_strings(
            &project.string_groups,
            &project.module,
            &project.inverter,
            project.inverter_count as usize,
            policy,
        );
        diagnostics.merge(result.report.diagnostics.clone());
        Some(result)
    };

    let string_voltage = project.module.vmp * f64::from(modules_per_string);
    let string_cable = project.string_cable.map(|run| {
        let report = size_dc_run(
            &run,
            project.module.imp,
            string_voltage,
            DcSegment::String,
            catalog,
            tables,
            policy,
        );
        diagnostics.merge_with_entity(report.diagnostics(), "string cable");
        report
    });

    let dcdb_cable = match (project.dcdb_cable, dcdb.as_ref()) {
        (Some(run), Some(req)) => {
            let output_current = project.module.imp * f64::from(req.strings_per_dcdb);
            let report = size_dc_run(
                &run,
                output_current,
                string_voltage,
                DcSegment::DcdbToInverter,
                catalog,
                tables,
                policy,
            );
            diagnostics.merge_with_entity(report.diagnostics(), "dcdb cable");
            Some(report)
        }
        (Some(_), None) => {
            diagnostics.add_warning(
                category::CONFIGURATION,
                "DCDB cable sizing needs DCDB requirements; section skipped",
            );
            None
        }
        _ => None,
    };

    let ac_power = project.inverter.nominal_ac_power;
    let ac_cable = match (project.ac_cable, ac_power) {
        (Some(run), Some(power)) => {
            let report = size_ac_run(&run, power, catalog, tables, policy);
            diagnostics.merge_with_entity(ac_diagnostics(&report), "ac cable");
            Some(report)
        }
        (Some(_), None) => {
            diagnostics.add_warning(
                category::CONFIGURATION,
                "AC cable sizing needs the inverter's nominal AC power; section skipped",
            );
            None
        }
        _ => None,
    };

    let ht_cable = match (project.ht_cable, ac_power) {
        (Some(run), Some(power)) => {
            let plant_power = power * f64::from(project.inverter_count);
            let current = inverter_ac_current(plant_power, run.line_voltage, policy.power_factor);
            let report = size_ht_run(ht_catalog, &run, current, policy);
            diagnostics.merge_with_entity(report.diagnostics.clone(), "ht cable");
            Some(report)
        }
        (Some(_), None) => {
            diagnostics.add_warning(
                category::CONFIGURATION,
                "HT cable sizing needs the inverter's nominal AC power; section skipped",
            );
            None
        }
        _ => None,
    };

    debug!(summary = %diagnostics.summary(), "project evaluated");
    ProjectReport {
        name: project.name.clone(),
        string_length,
        modules_per_string,
        string_check,
        operating,
        configuration,
        plant,
        dcdb,
        mppt,
        string_cable,
        dcdb_cable,
        ac_cable,
        ht_cable,
        diagnostics,
    }
}

/// Size a DC run and compute its drop for the chosen (or recommended) cable.
///
/// The drop uses the operating current, not the design current.
pub fn size_dc_run(
    run: &DcCableRun,
    operating_current: Amperes,
    system_voltage: Volts,
    segment: DcSegment,
    catalog: &CableCatalog,
    tables: &DeratingTables,
    policy: &DesignPolicy,
) -> CableRunReport {
    let selection = select_cables(
        catalog,
        SelectionRequest {
            material: run.material,
            method: run.conditions.method,
            operating_current,
            runs: run.runs,
            safety_factor: policy.current_safety_factor,
        },
        tables.derate(&run.conditions),
    );
    let (chosen, chosen_suitable) = choose(&selection, run.cross_section);
    let voltage_drop = chosen.map(|cable| {
        dc_segment_drop(
            segment,
            operating_current,
            cable.resistance,
            run.length,
            run.runs,
            system_voltage,
            policy,
        )
    });
    CableRunReport {
        selection,
        chosen,
        chosen_suitable,
        voltage_drop,
    }
}

/// Size the AC run from the inverter's rated power.
///
/// With `runs > 1` each run carries an equal share of the current and the
/// drop is taken over the parallel resistance. A buried run is derated by
/// its K-factors instead of the installation tables.
pub fn size_ac_run(
    run: &AcCableRun,
    inverter_power: Watts,
    catalog: &CableCatalog,
    tables: &DeratingTables,
    policy: &DesignPolicy,
) -> AcRunReport {
    let current = inverter_ac_current(inverter_power, run.line_voltage, policy.power_factor);
    let derating = match run.burial {
        Some(burial) => burial.derate(Celsius(XLPE_MAX_TEMPERATURE)),
        None => tables.derate(&run.conditions),
    };
    let selection = select_cables(
        catalog,
        SelectionRequest {
            material: run.material,
            method: run.conditions.method,
            operating_current: current,
            runs: run.runs,
            safety_factor: policy.current_safety_factor,
        },
        derating,
    );
    let (chosen, _) = choose(&selection, run.cross_section);
    let voltage_drop = chosen.map(|cable| {
        ac_parallel_voltage_drop(
            current,
            run.length,
            cable.cross_section,
            cable.material,
            run.runs,
            run.line_voltage,
            policy.ac_drop_limit_percent,
        )
    });
    let breaker = select_breaker(run.breaker, current, policy.current_safety_factor);
    AcRunReport {
        current,
        selection,
        chosen,
        voltage_drop,
        breaker,
    }
}

/// The requested size if present (and whether it is suitable), else the
/// recommendation. A requested size missing from the catalog gives `None`.
pub fn choose(selection: &CableSelection, requested: Option<f64>) -> (Option<CableSpec>, bool) {
    match requested {
        Some(size) => match selection.candidate(size) {
            Some(candidate) => (Some(candidate.cable), candidate.suitable),
            None => (None, false),
        },
        None => (selection.recommended, selection.recommended.is_some()),
    }
}

impl CableRunReport {
    /// Selection issues plus those of the chosen cable and its drop.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diagnostics = self.selection.diagnostics.clone();
        if let Some(cable) = self.chosen {
            if !self.chosen_suitable {
                diagnostics.add_error(
                    category::AMPACITY,
                    &format!(
                        "{} is undersized: derated ampacity below {:.1}A per run",
                        cable.label(),
                        self.selection.current_per_run.value()
                    ),
                );
            }
        } else if self.selection.recommended.is_some() {
            diagnostics.add_error(
                category::CONFIGURATION,
                "Requested cable size is not in the catalog",
            );
        }
        if let Some(drop) = self.voltage_drop {
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
        diagnostics
    }
}

fn ac_diagnostics(report: &AcRunReport) -> Diagnostics {
    let mut diagnostics = report.selection.diagnostics.clone();
    if let Some(drop) = report.voltage_drop {
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
    if !report.breaker.adequate() {
        diagnostics.add_error(
            category::CONFIGURATION,
            &format!(
                "No standard {:?} rating covers {:.1}A",
                report.breaker.kind,
                report.breaker.required_rating.value()
            ),
        );
    }
    diagnostics
}
