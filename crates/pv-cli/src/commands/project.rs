use anyhow::{Context, Result};
use pv_cli::cli::ProjectCommands;
use pv_cli::common::{emit, write_json, OutputFormat, Report};
use pv_cli::manifest::record_manifest;
use pv_core::{
    evaluate_project, CableCatalog, DeratingTables, DesignPolicy, HtCableCatalog, ProjectReport,
};
use pv_io::{load_cable_catalog, load_ht_cable_catalog, load_project_input};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::commands::cable::{cable_rows, ht_rows};

pub fn handle(command: &ProjectCommands, policy: &DesignPolicy, format: OutputFormat) -> Result<()> {
    match command {
        ProjectCommands::Evaluate {
            project,
            catalog,
            ht_catalog,
            out,
        } => {
            let input = load_project_input(project, policy)?;
            let cables = match catalog {
                Some(path) => load_cable_catalog(path)?,
                None => CableCatalog::builtin(),
            };
            let ht_cables = match ht_catalog {
                Some(path) => load_ht_cable_catalog(path)?,
                None => HtCableCatalog::builtin(),
            };
            info!(project = %input.name, "evaluating project");
            let report = evaluate_project(
                &input,
                &cables,
                &ht_cables,
                DeratingTables::canonical(),
            );

            if let Some(out) = out {
                write_report(&report, out)?;
                let mut inputs: Vec<&Path> = vec![project.as_path()];
                if let Some(path) = catalog {
                    inputs.push(path.as_path());
                }
                if let Some(path) = ht_catalog {
                    inputs.push(path.as_path());
                }
                let manifest = record_manifest(
                    out,
                    "project evaluate",
                    &inputs,
                    &[("project", input.name.as_str())],
                )?;
                println!("Report written to {}", out.display());
                println!("Recorded run manifest {}", manifest.display());
                return Ok(());
            }

            emit(format, &report, |t| report_rows(t, &report))
        }
    }
}

fn write_report(report: &ProjectReport, out: &Path) -> Result<()> {
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file =
        fs::File::create(out).with_context(|| format!("creating report '{}'", out.display()))?;
    write_json(report, &mut file)
}

fn report_rows(t: &mut Report, report: &ProjectReport) {
    let sizing = &report.string_length;
    t.row("project", &report.name)
        .row(
            "string range",
            format!("{}-{} modules", sizing.min_modules, sizing.max_modules),
        )
        .row(
            "recommended",
            format!("{} ({})", sizing.recommended, sizing.reason),
        )
        .row("modules per string", report.modules_per_string);

    if let Some(op) = &report.operating {
        t.section("operating")
            .row("string Voc @ Tmin", op.string_voc_at_min_temp)
            .row("string Vmp @ Tmax", op.string_vmp_at_max_temp)
            .row("string power (STC)", op.power_at_stc)
            .row(
                &format!("string power @ {}", op.operating_cell_temperature),
                op.power_at_operating,
            );
    }
    if let Some(config) = &report.configuration {
        t.section("sub-array")
            .row("strings", config.string_count)
            .row("power per string", config.power_per_string)
            .row("total power", config.total_power())
            .row("leftover modules", config.leftover_modules);
    }
    if let Some(plant) = &report.plant {
        t.section("plant")
            .row("total modules", plant.total_modules)
            .row("total strings", plant.total_strings);
    }
    if let Some(dcdb) = &report.dcdb {
        t.section("dcdb")
            .row("DCDB in system", dcdb.total_dcdb_in_system)
            .row("strings per DCDB", dcdb.strings_per_dcdb)
            .row("utilization", format!("{:.1}%", dcdb.utilization_percent));
    }
    if let Some(mppt) = &report.mppt {
        t.section("mppt")
            .row(
                "MPPTs used",
                format!(
                    "{} of {}",
                    mppt.report.utilized_mppts, mppt.report.total_mppts
                ),
            )
            .row("unassigned strings", mppt.unassigned_strings);
    }
    if let Some(run) = &report.string_cable {
        t.section("string cable");
        cable_rows(t, run);
    }
    if let Some(run) = &report.dcdb_cable {
        t.section("dcdb cable");
        cable_rows(t, run);
    }
    if let Some(ac) = &report.ac_cable {
        t.section("ac cable")
            .row("inverter current", ac.current)
            .row("parallel runs", ac.selection.request.runs);
        match ac.chosen {
            Some(cable) => t.row("cable", cable.label()),
            None => t.row("cable", "none"),
        };
        if let Some(drop) = ac.voltage_drop {
            t.row(
                "voltage drop",
                format!("{} ({:.2}% of {}%)", drop.volts, drop.percent, drop.limit_percent),
            )
            .row("power loss", format!("{:.2} kW", drop.power_loss_kw()));
        }
        match ac.breaker.rating {
            Some(rating) => t.row("breaker", format!("{:?} {}", ac.breaker.kind, rating)),
            None => t.row("breaker", "none"),
        };
    }
    if let Some(ht) = &report.ht_cable {
        t.section("ht cable");
        ht_rows(t, ht);
    }
    t.diagnostics(&report.diagnostics);
}
