use clap::Parser;
use pv_cli::cli::{Cli, Commands};
use pv_cli::config::load_config;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(2);
        }
    };
    let level = match cli.log_level.map(Ok).unwrap_or_else(|| config.logging.level()) {
        Ok(level) => level,
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(2);
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }
    debug!(?level, "pv-cli starting");

    let policy = config.policy;
    let format = cli.format;
    let result = match &cli.command {
        Commands::Strings { command } => commands::string::handle(command, &policy, format),
        Commands::Dcdb {
            total_strings,
            inverters,
            dcdb_per_inverter,
            inputs_per_dcdb,
            inverter,
        } => commands::dcdb::handle(
            *total_strings,
            *inverters,
            *dcdb_per_inverter,
            *inputs_per_dcdb,
            inverter,
            format,
        ),
        Commands::Mppt { command } => commands::mppt::handle(command, &policy, format),
        Commands::Cable { command } => commands::cable::handle(command, &policy, format),
        Commands::Drop { command } => commands::drop::handle(command, &policy, format),
        Commands::Breaker { current, kind } => {
            commands::protection::breaker(*current, *kind, &policy, format)
        }
        Commands::AcCurrent {
            power_kw,
            voltage,
            power_factor,
        } => commands::protection::ac_current(*power_kw, *voltage, *power_factor, &policy, format),
        Commands::Project { command } => commands::project::handle(command, &policy, format),
        Commands::Completions { shell, out } => commands::completions::handle(*shell, out.as_deref()),
    };

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
