use anyhow::Result;
use pv_cli::cli::StringCommands;
use pv_cli::common::{emit, OutputFormat, Report};
use pv_core::{
    basic_string_parameters, calculate_optimal_string_length, check_string_configuration,
    DesignPolicy, StringVoltages,
};
use tracing::info;

pub fn handle(command: &StringCommands, policy: &DesignPolicy, format: OutputFormat) -> Result<()> {
    match command {
        StringCommands::Size {
            module,
            inverter,
            site,
        } => {
            let module = module.to_spec();
            let inverter = inverter.to_spec();
            let site = site.to_range();
            module.validate()?;
            inverter.validate()?;
            site.validate()?;

            let result = calculate_optimal_string_length(&module, &inverter, &site, policy);
            info!(
                min = result.min_modules,
                max = result.max_modules,
                recommended = result.recommended,
                "string length sized"
            );
            emit(format, &result, |t| {
                t.row(
                    "range",
                    format!("{}-{} modules", result.min_modules, result.max_modules),
                )
                .row("recommended", format!("{} ({})", result.recommended, result.reason))
                .row("max by Voc", result.max_by_voc)
                .row("max by MPPT", result.max_by_mppt)
                .row("min by Vmp", result.min_by_vmp)
                .row("module Voc @ Tmin", result.module_voc_at_min_temp)
                .row("module Vmp @ Tmax", result.module_vmp_at_max_temp)
                .row(
                    "MPPT utilization",
                    format!("{:.1}%", result.mppt_utilization_percent),
                );
                voltage_rows(t, &result.string_voltages);
                t.section("candidates");
                for candidate in &result.candidates {
                    t.row(
                        &candidate.reason.to_string(),
                        format!(
                            "{} modules, {} ({:.1}% of MPPT max)",
                            candidate.count, candidate.vmp_string, candidate.mppt_utilization_percent
                        ),
                    );
                }
                t.diagnostics(&result.diagnostics);
            })
        }
        StringCommands::Check {
            modules,
            module,
            inverter,
            site,
        } => {
            let module = module.to_spec();
            let inverter = inverter.to_spec();
            let site = site.to_range();
            module.validate()?;
            inverter.validate()?;
            site.validate()?;

            let check = check_string_configuration(&module, &inverter, &site, *modules, policy);
            emit(format, &check, |t| {
                t.row("modules per string", modules)
                    .row(
                        "allowed range",
                        format!("{}-{}", check.min_modules, check.max_modules),
                    )
                    .row("within range", check.within_range);
                voltage_rows(t, &check.voltages);
                t.diagnostics(&check.diagnostics);
            })
        }
        StringCommands::Params {
            capacity_kw,
            modules,
            module,
        } => {
            let module = module.to_spec();
            module.validate()?;
            let params = basic_string_parameters(*capacity_kw, &module, *modules);
            emit(format, &params, |t| {
                t.row("total modules", params.total_modules)
                    .row("total strings", params.total_strings)
                    .row("modules per string", params.modules_per_string)
                    .row("string voltage (STC)", params.average_string_voltage)
                    .row(
                        "string power (STC)",
                        module.power * f64::from(params.modules_per_string),
                    );
            })
        }
    }
}

fn voltage_rows(t: &mut Report, voltages: &StringVoltages) {
    t.section(&format!("string of {}", voltages.modules_per_string))
        .row("Voc @ Tmin", voltages.voc_at_min_temp)
        .row("Voc @ Tmax", voltages.voc_at_max_temp)
        .row("Vmp @ Tmin", voltages.vmp_at_min_temp)
        .row("Vmp @ Tmax", voltages.vmp_at_max_temp);
}
