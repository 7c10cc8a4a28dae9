use anyhow::{anyhow, Result};
use pv_cli::cli::MpptCommands;
use pv_cli::common::{emit, OutputFormat, Report};
use pv_core::{
    auto_assign_strings, validate_mppt_assignments, AssignmentReport, DesignPolicy,
    MpptAssignment, StringGroup,
};
use pv_io::read_document;
use tracing::info;

pub fn handle(command: &MpptCommands, policy: &DesignPolicy, format: OutputFormat) -> Result<()> {
    match command {
        MpptCommands::Assign {
            groups,
            inverters,
            module,
            inverter,
        } => {
            let module = module.to_spec();
            let inverter = inverter.to_spec();
            module.validate()?;
            inverter.validate()?;
            let groups: Vec<StringGroup> = read_document(groups, "string groups")?;
            if groups.is_empty() {
                return Err(anyhow!("string group file contains no groups"));
            }

            let result =
                auto_assign_strings(&groups, &module, &inverter, *inverters as usize, policy);
            info!(
                used = result.report.utilized_mppts,
                unassigned = result.unassigned_strings,
                "strings assigned"
            );
            emit(format, &result, |t| {
                assignment_rows(t, &result.assignments, &result.report);
                t.row("unassigned strings", result.unassigned_strings);
                t.diagnostics(&result.report.diagnostics);
            })
        }
        MpptCommands::Check {
            assignments,
            inverters,
            module,
            inverter,
        } => {
            let module = module.to_spec();
            let inverter = inverter.to_spec();
            module.validate()?;
            inverter.validate()?;
            let assignments: Vec<MpptAssignment> = read_document(assignments, "MPPT assignments")?;

            let report = validate_mppt_assignments(
                &assignments,
                &module,
                &inverter,
                *inverters as usize,
                policy,
            );
            emit(format, &report, |t| {
                assignment_rows(t, &assignments, &report);
                t.diagnostics(&report.diagnostics);
            })
        }
    }
}

fn assignment_rows(t: &mut Report, assignments: &[MpptAssignment], report: &AssignmentReport) {
    for (assignment, mppt) in assignments.iter().zip(&report.mppts) {
        let groups = assignment
            .groups
            .iter()
            .map(|g| format!("{}×{}", g.name, g.strings))
            .collect::<Vec<_>>()
            .join(", ");
        t.row(
            &mppt.label,
            format!(
                "{} strings, {} / {}, {}  [{}]",
                mppt.strings, mppt.total_current, mppt.current_limit, mppt.total_power, groups
            ),
        );
    }
    t.section("summary").row(
        "MPPTs used",
        format!(
            "{} of {} ({:.1}%)",
            report.utilized_mppts, report.total_mppts, report.utilization_percent
        ),
    );
}
