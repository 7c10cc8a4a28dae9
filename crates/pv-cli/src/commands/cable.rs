use anyhow::Result;
use pv_cli::cli::{BurialArgs, CableArgs, CableCommands};
use pv_cli::common::{emit, OutputFormat, Report};
use pv_core::{
    choose, dc_segment_drop, select_cables, size_ht_run, Amperes, CableCatalog, CableRunReport,
    ConductorMaterial, DcSegment, DeratingTables, DesignPolicy, HtCableCatalog, HtCableRun,
    HtRunReport, Meters, SelectionRequest, Volts,
};
use pv_io::{load_cable_catalog, load_ht_cable_catalog};
use std::path::PathBuf;
use tracing::info;

pub fn handle(command: &CableCommands, policy: &DesignPolicy, format: OutputFormat) -> Result<()> {
    let (segment, current, voltage, cable) = match command {
        CableCommands::StringRun {
            imp,
            modules,
            vmp,
            cable,
        } => (DcSegment::String, *imp, system_voltage(*modules, *vmp), cable),
        CableCommands::Dcdb {
            imp,
            strings,
            modules,
            vmp,
            cable,
        } => (
            DcSegment::DcdbToInverter,
            imp * f64::from(*strings),
            system_voltage(*modules, *vmp),
            cable,
        ),
        CableCommands::Ht {
            current,
            length,
            voltage,
            material,
            runs,
            burial,
            cross_section,
            catalog,
        } => {
            let run = ht_run(*length, *voltage, *material, *runs, burial, *cross_section);
            return handle_ht(*current, &run, catalog.as_ref(), policy, format);
        }
    };
    let catalog = catalog(cable)?;
    let selection = select_cables(
        &catalog,
        SelectionRequest {
            material: cable.material,
            method: cable.method,
            operating_current: Amperes(current),
            runs: cable.runs,
            safety_factor: policy.current_safety_factor,
        },
        DeratingTables::canonical().derate(&cable.conditions()),
    );
    let (chosen, chosen_suitable) = choose(&selection, cable.cross_section);
    let voltage_drop = match (chosen, cable.length, voltage) {
        (Some(chosen), Some(length), Some(voltage)) => Some(dc_segment_drop(
            segment,
            Amperes(current),
            chosen.resistance,
            Meters(length),
            cable.runs,
            voltage,
            policy,
        )),
        _ => None,
    };
    let report = CableRunReport {
        chosen,
        chosen_suitable,
        voltage_drop,
        selection,
    };
    info!(
        design = report.selection.design_current.value(),
        chosen = ?report.chosen.map(|c| c.cross_section.value()),
        "cable sized"
    );
    let diagnostics = report.diagnostics();
    emit(format, &report, |t| {
        cable_rows(t, &report);
        t.diagnostics(&diagnostics);
    })
}

fn ht_run(
    length: f64,
    voltage: f64,
    material: ConductorMaterial,
    runs: u32,
    burial: &BurialArgs,
    cross_section: Option<f64>,
) -> HtCableRun {
    HtCableRun {
        length: Meters(length),
        line_voltage: Volts(voltage),
        material,
        runs,
        burial: burial.conditions(),
        cross_section,
    }
}

fn handle_ht(
    current: f64,
    run: &HtCableRun,
    catalog: Option<&PathBuf>,
    policy: &DesignPolicy,
    format: OutputFormat,
) -> Result<()> {
    let catalog = match catalog {
        Some(path) => load_ht_cable_catalog(path)?,
        None => HtCableCatalog::builtin(),
    };
    let report = size_ht_run(&catalog, run, Amperes(current), policy);
    info!(
        design = report.design_current.value(),
        chosen = ?report.chosen.map(|c| c.cross_section.value()),
        "HT cable sized"
    );
    emit(format, &report, |t| {
        ht_rows(t, &report);
        t.diagnostics(&report.diagnostics);
    })
}

fn system_voltage(modules: Option<u32>, vmp: f64) -> Option<Volts> {
    modules.map(|m| Volts(vmp) * f64::from(m))
}

pub(crate) fn catalog(args: &CableArgs) -> Result<CableCatalog> {
    match &args.catalog {
        Some(path) => load_cable_catalog(path),
        None => Ok(CableCatalog::builtin()),
    }
}

pub(crate) fn cable_rows(t: &mut Report, report: &CableRunReport) {
    let selection = &report.selection;
    let derating = &selection.derating;
    t.row("design current", selection.design_current)
        .row("current per run", selection.current_per_run)
        .row(
            "derating",
            format!(
                "{:.3} (temp {:.2} × group {:.2} × insulation {:.2})",
                derating.total, derating.temperature, derating.grouping, derating.insulation
            ),
        )
        .row("required ampacity", selection.required_ampacity);
    match selection.recommended {
        Some(cable) => t.row("recommended", cable.label()),
        None => t.row("recommended", "none"),
    };
    if report.chosen != selection.recommended {
        match report.chosen {
            Some(cable) if report.chosen_suitable => t.row("chosen", cable.label()),
            Some(cable) => t.row("chosen", format!("{} (undersized)", cable.label())),
            None => t.row("chosen", "not in catalog"),
        };
    }
    if let Some(drop) = report.voltage_drop {
        t.row(
            "voltage drop",
            format!(
                "{} ({:.2}% of {}% limit) {}",
                drop.volts,
                drop.percent,
                drop.limit_percent,
                if drop.acceptable { "OK" } else { "EXCEEDED" }
            ),
        );
    }
    t.section("candidates");
    for candidate in &selection.candidates {
        t.row(
            &candidate.cable.label(),
            format!(
                "{} base, {} derated{}",
                candidate.base_ampacity,
                candidate.derated_ampacity,
                if candidate.suitable { "" } else { "  (insufficient)" }
            ),
        );
    }
}

pub(crate) fn ht_rows(t: &mut Report, report: &HtRunReport) {
    t.row("line current", report.current)
        .row("design current", report.design_current)
        .row("parallel runs", report.runs);
    let shown = report.chosen.or(report.recommended);
    if let Some(k) = shown
        .and_then(|cable| report.candidate(cable.cross_section.value()))
        .map(|c| c.k_factors)
    {
        t.row(
            "K factors",
            format!(
                "{:.3} (K1 {:.2} × K2 {:.3} × K3 {:.3} × K4 {:.2})",
                k.total, k.k1, k.k2, k.k3, k.k4
            ),
        );
    }
    match report.recommended {
        Some(cable) => t.row("recommended", cable.label()),
        None => t.row("recommended", "none"),
    };
    if report.chosen != report.recommended {
        match report.chosen {
            Some(cable) if report.chosen_suitable => t.row("chosen", cable.label()),
            Some(cable) => t.row("chosen", format!("{} (undersized)", cable.label())),
            None => t.row("chosen", "not in catalog"),
        };
    }
    if let Some(drop) = report.voltage_drop {
        t.row("impedance", drop.impedance)
            .row(
                "voltage drop",
                format!(
                    "{} ({:.2}% of {}% limit) {}",
                    drop.volts,
                    drop.percent,
                    drop.limit_percent,
                    if drop.acceptable { "OK" } else { "EXCEEDED" }
                ),
            )
            .row("power loss", format!("{:.2} kW", drop.power_loss_kw()));
    }
    t.section("candidates");
    for candidate in &report.candidates {
        t.row(
            &candidate.cable.label(),
            format!(
                "{} base, {} derated{}",
                candidate.base_ampacity,
                candidate.derated_ampacity,
                if candidate.suitable { "" } else { "  (insufficient)" }
            ),
        );
    }
}
