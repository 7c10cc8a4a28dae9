use anyhow::Result;
use pv_cli::cli::InverterArgs;
use pv_cli::common::{emit, OutputFormat};
use pv_core::{dcdb_requirements, DcdbOptions};

pub fn handle(
    total_strings: u32,
    inverters: u32,
    dcdb_per_inverter: Option<u32>,
    inputs_per_dcdb: Option<u32>,
    inverter: &InverterArgs,
    format: OutputFormat,
) -> Result<()> {
    let inverter = inverter.to_spec();
    inverter.validate()?;
    let req = dcdb_requirements(
        total_strings,
        inverters,
        &inverter,
        DcdbOptions {
            dcdb_per_inverter,
            string_inputs_per_dcdb: inputs_per_dcdb,
        },
    );
    emit(format, &req, |t| {
        t.row("inverters", req.total_inverters)
            .row("DCDB per inverter", req.dcdb_per_inverter)
            .row("DCDB in system", req.total_dcdb_in_system)
            .row("inputs per DCDB", req.string_inputs_per_dcdb)
            .row("strings per DCDB", req.strings_per_dcdb)
            .row("strings per MPPT", req.strings_per_mppt)
            .row("max strings per MPPT", req.max_strings_per_mppt)
            .row("utilization", format!("{:.1}%", req.utilization_percent))
            .row("valid", req.valid);
        t.diagnostics(&req.diagnostics);
    })
}
