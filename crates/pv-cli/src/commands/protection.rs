use anyhow::{anyhow, Result};
use pv_cli::common::{emit, OutputFormat};
use pv_core::{inverter_ac_current, select_breaker, Amperes, BreakerKind, DesignPolicy, Volts, Watts};

pub fn breaker(
    current: f64,
    kind: BreakerKind,
    policy: &DesignPolicy,
    format: OutputFormat,
) -> Result<()> {
    let selection = select_breaker(kind, Amperes(current), policy.current_safety_factor);
    emit(format, &selection, |t| {
        t.row("type", format!("{:?}", selection.kind).to_uppercase())
            .row("load current", selection.load_current)
            .row("required rating", selection.required_rating);
        match selection.rating {
            Some(rating) => t.row("rating", rating),
            None => t.row("rating", "none (exceeds largest standard frame)"),
        };
    })
}

pub fn ac_current(
    power_kw: f64,
    voltage: f64,
    power_factor: Option<f64>,
    policy: &DesignPolicy,
    format: OutputFormat,
) -> Result<()> {
    let power_factor = power_factor.unwrap_or(policy.power_factor);
    if !(power_factor > 0.0 && power_factor <= 1.0) {
        return Err(anyhow!("power factor must be in (0, 1], got {power_factor}"));
    }
    let current = inverter_ac_current(Watts::from_kilowatts(power_kw), Volts(voltage), power_factor);
    emit(format, &current, |t| {
        t.row("power", format!("{power_kw} kW"))
            .row("line voltage", Volts(voltage))
            .row("power factor", power_factor)
            .row("current", current);
    })
}
