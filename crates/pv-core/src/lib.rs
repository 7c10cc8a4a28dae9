//! # pv-core: PV String and Cable Sizing
//!
//! Pure, synchronous calculations for photovoltaic DC design:
//!
//! - **String sizing**: temperature-corrected Voc/Vmp bounds on modules per
//!   string, a recommended length, and margin warnings
//! - **Plant layout**: string counts, DCDB requirements, MPPT assignment
//! - **Cable sizing**: derating composition and ampacity-based selection
//! - **Voltage drop**: DC string and DCDB runs, three-phase AC runs
//! - **HT cables**: buried K-factor derating and impedance drop
//! - **Protection**: next standard breaker rating
//!
//! ## Design Philosophy
//!
//! Every calculation is a function of its inputs. Degenerate inputs (zero
//! derating, zero voltage, crossed bounds) never panic or return errors;
//! they produce sentinel values (`NaN`, infinity, an "unconfigured" result)
//! together with [`Diagnostics`] the caller can render or act on. Errors are
//! reserved for invalid equipment records and I/O.
//!
//! ## Quick Start
//!
//! ```rust
//! use pv_core::*;
//!
//! let module = ModuleElectricalSpec {
//!     voc: Volts(45.0),
//!     vmp: Volts(37.0),
//!     temp_coeff_voc: -0.28,
//!     temp_coeff_vmp: -0.38,
//!     ..Default::default()
//! };
//! let inverter = InverterElectricalSpec::default();
//! let site = SiteTemperatureRange::new(-10.0, 45.0);
//!
//! let sizing = calculate_optimal_string_length(&module, &inverter, &site, &DesignPolicy::default());
//! assert_eq!(sizing.max_modules, 17);
//! assert!(sizing.contains(sizing.recommended));
//! ```

pub mod breaker;
pub mod cable;
pub mod dcdb;
pub mod derating;
pub mod design;
pub mod diagnostics;
pub mod equipment;
pub mod error;
pub mod ht_cable;
pub mod mppt;
pub mod operating;
pub mod policy;
pub mod string_sizing;
pub mod temperature;
pub mod units;
pub mod voltage_drop;

pub use breaker::{select_breaker, BreakerKind, BreakerSelection};
pub use cable::{
    design_current, required_ampacity, select_cables, Ampacity, CableCandidate, CableCatalog,
    CableSelection, CableSpec, ConductorMaterial, InstallationMethod, SelectionRequest,
};
pub use dcdb::{dcdb_requirements, DcdbOptions, DcdbRequirements, DEFAULT_DCDB_STRING_INPUTS};
pub use derating::{
    depth_factor, derate, Arrangement, BurialConditions, DeratingBreakdown, DeratingFactor,
    DeratingTables, FactorKind, GroupingTable, InstallationConditions, KFactors,
};
pub use design::{
    choose, evaluate_project, size_ac_run, size_dc_run, AcCableRun, AcRunReport, CableRunReport,
    DcCableRun, ProjectInput, ProjectReport,
};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use equipment::{InverterElectricalSpec, ModuleElectricalSpec, SiteTemperatureRange};
pub use error::{PvError, PvResult};
pub use ht_cable::{
    size_ht_run, HtCableCatalog, HtCableRun, HtCableSpec, HtCandidate, HtRunReport,
};
pub use mppt::{
    auto_assign_strings, validate_mppt_assignments, AssignmentReport, AutoAssignment,
    MpptAssignment, Orientation, StringGroup,
};
pub use operating::{
    auto_configure, basic_string_parameters, operating_conditions, BasicStringParameters,
    OperatingConditions, StringConfiguration,
};
pub use policy::{DesignPolicy, PolicyOverrides};
pub use string_sizing::{
    calculate_optimal_string_length, check_string_configuration, check_string_voltages,
    RecommendationReason, StringCheck, StringLengthResult, StringVoltages,
};
pub use temperature::{corrected_power, corrected_voltage};
pub use units::{Amperes, Celsius, Meters, Ohms, OhmsPerKm, SquareMillimeters, Volts, Watts};
pub use voltage_drop::{
    ac_parallel_voltage_drop, ac_voltage_drop, dc_segment_drop, dc_voltage_drop,
    impedance_voltage_drop, inverter_ac_current, AcVoltageDrop, DcSegment, VoltageDrop,
};
