use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::Shell;
use pv_core::{
    Amperes, Arrangement, BreakerKind, BurialConditions, Celsius, ConductorMaterial,
    InstallationConditions, InstallationMethod, InverterElectricalSpec, Meters,
    ModuleElectricalSpec, SiteTemperatureRange, Volts, Watts,
};
use std::path::PathBuf;

use crate::common::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "pv", author, version, about = "PV string, cable and voltage-drop sizing", long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides the config file)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    /// Config file (defaults to ~/.pv-sizing/config.toml)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// String length sizing
    #[command(name = "string")]
    Strings {
        #[command(subcommand)]
        command: StringCommands,
    },
    /// DCDB counts for central-inverter plants
    Dcdb {
        /// Total strings in the plant
        #[arg(long)]
        total_strings: u32,
        /// Number of inverters
        #[arg(long, default_value_t = 1)]
        inverters: u32,
        /// DCDBs per inverter (defaults to the inverter's string inputs)
        #[arg(long)]
        dcdb_per_inverter: Option<u32>,
        /// String inputs on each DCDB
        #[arg(long)]
        inputs_per_dcdb: Option<u32>,
        #[command(flatten)]
        inverter: InverterArgs,
    },
    /// MPPT channel assignment
    Mppt {
        #[command(subcommand)]
        command: MpptCommands,
    },
    /// Cable selection by ampacity and derating
    Cable {
        #[command(subcommand)]
        command: CableCommands,
    },
    /// Voltage drop of a single run
    Drop {
        #[command(subcommand)]
        command: DropCommands,
    },
    /// Next standard breaker rating for a load
    Breaker {
        /// Load current in amperes
        #[arg(long)]
        current: f64,
        /// Breaker family: mcb, mccb, acb, vcb
        #[arg(long, default_value = "mccb")]
        kind: BreakerKind,
    },
    /// Three-phase inverter output current
    AcCurrent {
        /// Inverter AC power in kW
        #[arg(long)]
        power_kw: f64,
        /// Line-to-line voltage
        #[arg(long, default_value_t = 415.0)]
        voltage: f64,
        /// Power factor (defaults to the policy value)
        #[arg(long)]
        power_factor: Option<f64>,
    },
    /// Whole-plant evaluation from a project file
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum StringCommands {
    /// Recommended modules per string for a module/inverter/site
    Size {
        #[command(flatten)]
        module: ModuleArgs,
        #[command(flatten)]
        inverter: InverterArgs,
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Check an explicit modules-per-string count
    Check {
        /// Modules per string
        #[arg(long)]
        modules: u32,
        #[command(flatten)]
        module: ModuleArgs,
        #[command(flatten)]
        inverter: InverterArgs,
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Module and string counts for a DC capacity
    Params {
        /// DC capacity in kW
        #[arg(long)]
        capacity_kw: f64,
        /// Modules per string
        #[arg(long)]
        modules: u32,
        #[command(flatten)]
        module: ModuleArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum MpptCommands {
    /// Spread string groups over the available MPPT channels
    Assign {
        /// YAML or JSON list of string groups
        #[arg(long, value_hint = ValueHint::FilePath)]
        groups: PathBuf,
        /// Number of inverters
        #[arg(long, default_value_t = 1)]
        inverters: u32,
        #[command(flatten)]
        module: ModuleArgs,
        #[command(flatten)]
        inverter: InverterArgs,
    },
    /// Check a hand-made assignment of groups to MPPT channels
    Check {
        /// YAML or JSON list of MPPT assignments
        #[arg(long, value_hint = ValueHint::FilePath)]
        assignments: PathBuf,
        /// Number of inverters
        #[arg(long, default_value_t = 1)]
        inverters: u32,
        #[command(flatten)]
        module: ModuleArgs,
        #[command(flatten)]
        inverter: InverterArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum CableCommands {
    /// Size the run from a string to its combiner
    #[command(name = "string")]
    StringRun {
        /// Module Imp in amperes
        #[arg(long, default_value_t = 10.8)]
        imp: f64,
        /// Modules per string, for the drop voltage
        #[arg(long)]
        modules: Option<u32>,
        /// Module Vmp, for the drop voltage
        #[arg(long, default_value_t = 37.0)]
        vmp: f64,
        #[command(flatten)]
        cable: CableArgs,
    },
    /// Size the run from a DCDB to the inverter
    Dcdb {
        /// Module Imp in amperes
        #[arg(long, default_value_t = 10.8)]
        imp: f64,
        /// Strings combined in the DCDB
        #[arg(long)]
        strings: u32,
        /// Modules per string, for the drop voltage
        #[arg(long)]
        modules: Option<u32>,
        /// Module Vmp, for the drop voltage
        #[arg(long, default_value_t = 37.0)]
        vmp: f64,
        #[command(flatten)]
        cable: CableArgs,
    },
    /// Size a buried HT run by K-factor derating and impedance drop
    Ht {
        /// Line current in amperes
        #[arg(long)]
        current: f64,
        /// One-way length in meters
        #[arg(long)]
        length: f64,
        /// Line-to-line voltage
        #[arg(long, default_value_t = 33_000.0)]
        voltage: f64,
        #[arg(long, default_value = "aluminum")]
        material: ConductorMaterial,
        /// Parallel runs per phase
        #[arg(long, default_value_t = 1)]
        runs: u32,
        #[command(flatten)]
        burial: BurialArgs,
        /// Cable size in mm² to check instead of the recommendation
        #[arg(long)]
        cross_section: Option<f64>,
        /// HT cable table replacing the built-in one
        #[arg(long, value_hint = ValueHint::FilePath)]
        catalog: Option<PathBuf>,
    },
}

/// Trench conditions for buried runs.
#[derive(Args, Debug, Clone)]
pub struct BurialArgs {
    /// Burial depth in meters
    #[arg(long, default_value_t = 0.7)]
    pub depth: f64,
    /// Soil temperature, °C
    #[arg(long, default_value_t = 40.0, allow_negative_numbers = true)]
    pub soil_temperature: f64,
    /// Soil thermal resistivity, K·m/W
    #[arg(long, default_value_t = 1.5)]
    pub soil_resistivity: f64,
    /// Grouping factor of the cable formation
    #[arg(long, default_value_t = 0.85)]
    pub grouping_factor: f64,
}

impl BurialArgs {
    pub fn conditions(&self) -> BurialConditions {
        BurialConditions {
            depth: Meters(self.depth),
            soil_temperature: Celsius(self.soil_temperature),
            soil_thermal_resistivity: self.soil_resistivity,
            grouping_factor: self.grouping_factor,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum DropCommands {
    /// DC loop drop
    Dc {
        /// Operating current in amperes
        #[arg(long)]
        current: f64,
        /// Conductor resistance in ohm/km
        #[arg(long)]
        resistance: f64,
        /// One-way length in meters
        #[arg(long)]
        length: f64,
        /// Parallel runs
        #[arg(long, default_value_t = 1)]
        runs: u32,
        /// System voltage
        #[arg(long)]
        voltage: f64,
        /// Drop limit in percent (defaults to the string limit)
        #[arg(long)]
        limit: Option<f64>,
    },
    /// Three-phase AC drop
    Ac {
        /// Line current in amperes
        #[arg(long)]
        current: f64,
        /// One-way length in meters
        #[arg(long)]
        length: f64,
        /// Conductor cross-section in mm²
        #[arg(long)]
        cross_section: f64,
        #[arg(long, default_value = "copper")]
        material: ConductorMaterial,
        /// Parallel runs per phase
        #[arg(long, default_value_t = 1)]
        runs: u32,
        /// Line-to-line voltage
        #[arg(long, default_value_t = 415.0)]
        voltage: f64,
        /// Drop limit in percent (defaults to the AC limit)
        #[arg(long)]
        limit: Option<f64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Evaluate every section of a project file
    Evaluate {
        /// Project file (YAML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        project: PathBuf,
        /// Cable table replacing the built-in one
        #[arg(long, value_hint = ValueHint::FilePath)]
        catalog: Option<PathBuf>,
        /// HT cable table replacing the built-in one
        #[arg(long, value_hint = ValueHint::FilePath)]
        ht_catalog: Option<PathBuf>,
        /// Write the report as JSON and record a run manifest beside it
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
}

/// Module nameplate values; defaults describe a 400 W mono module.
#[derive(Args, Debug, Clone)]
pub struct ModuleArgs {
    #[arg(long, default_value_t = 45.0)]
    pub voc: f64,
    #[arg(long, default_value_t = 37.0)]
    pub vmp: f64,
    #[arg(long, default_value_t = 11.5)]
    pub isc: f64,
    #[arg(long, default_value_t = 10.8)]
    pub imp: f64,
    /// Module power in W
    #[arg(long, default_value_t = 400.0)]
    pub power: f64,
    /// Voc coefficient, %/°C
    #[arg(long, default_value_t = -0.25, allow_negative_numbers = true)]
    pub coeff_voc: f64,
    /// Vmp coefficient, %/°C
    #[arg(long, default_value_t = -0.38, allow_negative_numbers = true)]
    pub coeff_vmp: f64,
    /// Pmax coefficient, %/°C
    #[arg(long, default_value_t = -0.41, allow_negative_numbers = true)]
    pub coeff_pmax: f64,
}

impl ModuleArgs {
    pub fn to_spec(&self) -> ModuleElectricalSpec {
        ModuleElectricalSpec {
            voc: Volts(self.voc),
            vmp: Volts(self.vmp),
            isc: Amperes(self.isc),
            imp: Amperes(self.imp),
            power: Watts(self.power),
            temp_coeff_voc: self.coeff_voc,
            temp_coeff_vmp: self.coeff_vmp,
            temp_coeff_pmax: self.coeff_pmax,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct InverterArgs {
    #[arg(long, default_value_t = 125.0)]
    pub mppt_min: f64,
    #[arg(long, default_value_t = 850.0)]
    pub mppt_max: f64,
    #[arg(long, default_value_t = 1000.0)]
    pub max_dc_voltage: f64,
    /// Maximum DC input current across all MPPTs
    #[arg(long, default_value_t = 15.0)]
    pub max_dc_current: f64,
    #[arg(long, default_value_t = 2)]
    pub mppts: u32,
    #[arg(long, default_value_t = 10)]
    pub strings_per_mppt: u32,
}

impl InverterArgs {
    pub fn to_spec(&self) -> InverterElectricalSpec {
        InverterElectricalSpec {
            mppt_voltage_min: Volts(self.mppt_min),
            mppt_voltage_max: Volts(self.mppt_max),
            max_dc_voltage: Volts(self.max_dc_voltage),
            max_dc_current: Amperes(self.max_dc_current),
            mppt_count: self.mppts,
            strings_per_mppt: self.strings_per_mppt,
            nominal_ac_power: None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SiteArgs {
    /// Coldest site temperature, °C
    #[arg(long, default_value_t = -10.0, allow_negative_numbers = true)]
    pub t_min: f64,
    /// Hottest site temperature, °C
    #[arg(long, default_value_t = 70.0, allow_negative_numbers = true)]
    pub t_max: f64,
}

impl SiteArgs {
    pub fn to_range(&self) -> SiteTemperatureRange {
        SiteTemperatureRange::new(self.t_min, self.t_max)
    }
}

/// Run geometry and installation conditions shared by cable commands.
#[derive(Args, Debug, Clone)]
pub struct CableArgs {
    #[arg(long, default_value = "copper")]
    pub material: ConductorMaterial,
    /// air, conduit, buried_conduit or direct_burial
    #[arg(long, default_value = "air")]
    pub method: InstallationMethod,
    /// Ambient temperature, °C
    #[arg(long, default_value_t = 50.0, allow_negative_numbers = true)]
    pub ambient: f64,
    /// Loaded circuits in the group
    #[arg(long, default_value_t = 1)]
    pub circuits: u32,
    /// conduit, touching_trefoil, laid_flat or spaced
    #[arg(long, default_value = "conduit")]
    pub arrangement: Arrangement,
    /// Clear spacing between circuits in meters
    #[arg(long, default_value_t = 0.30)]
    pub spacing: f64,
    /// Cable runs through thermal insulation
    #[arg(long)]
    pub insulation: bool,
    /// Parallel runs
    #[arg(long, default_value_t = 1)]
    pub runs: u32,
    /// One-way run length in meters, enables the drop check
    #[arg(long)]
    pub length: Option<f64>,
    /// Cable size in mm² to check instead of the recommendation
    #[arg(long)]
    pub cross_section: Option<f64>,
    /// Cable table replacing the built-in one
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub catalog: Option<PathBuf>,
}

impl CableArgs {
    pub fn conditions(&self) -> InstallationConditions {
        InstallationConditions {
            ambient_temperature: Celsius(self.ambient),
            method: self.method,
            circuits: self.circuits,
            arrangement: self.arrangement,
            spacing: Meters(self.spacing),
            thermal_insulation: self.insulation,
        }
    }
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
