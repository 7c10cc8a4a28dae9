use anyhow::Result;
use pv_cli::cli::DropCommands;
use pv_cli::common::{emit, OutputFormat};
use pv_core::{
    ac_parallel_voltage_drop, dc_voltage_drop, Amperes, DesignPolicy, Meters, OhmsPerKm, SquareMillimeters,
    Volts,
};

pub fn handle(command: &DropCommands, policy: &DesignPolicy, format: OutputFormat) -> Result<()> {
    match command {
        DropCommands::Dc {
            current,
            resistance,
            length,
            runs,
            voltage,
            limit,
        } => {
            let drop = dc_voltage_drop(
                Amperes(*current),
                OhmsPerKm(*resistance),
                Meters(*length),
                *runs,
                Volts(*voltage),
                limit.unwrap_or(policy.string_drop_limit_percent),
            );
            emit(format, &drop, |t| {
                t.row("voltage drop", drop.volts)
                    .row("percent", format!("{:.2}%", drop.percent))
                    .row("limit", format!("{}%", drop.limit_percent))
                    .row("acceptable", drop.acceptable);
            })
        }
        DropCommands::Ac {
            current,
            length,
            cross_section,
            material,
            runs,
            voltage,
            limit,
        } => {
            let drop = ac_parallel_voltage_drop(
                Amperes(*current),
                Meters(*length),
                SquareMillimeters(*cross_section),
                *material,
                *runs,
                Volts(*voltage),
                limit.unwrap_or(policy.ac_drop_limit_percent),
            );
            emit(format, &drop, |t| {
                t.row("conductor resistance", drop.resistance)
                    .row("parallel runs", drop.runs)
                    .row("voltage drop", drop.volts)
                    .row("percent", format!("{:.2}%", drop.percent))
                    .row("limit", format!("{}%", drop.limit_percent))
                    .row("acceptable", drop.acceptable)
                    .row("power loss", format!("{:.2} kW", drop.power_loss_kw()));
            })
        }
    }
}
