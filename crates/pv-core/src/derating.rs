//! Derating factor tables and their composition.
//!
//! The total factor is `temperature × grouping × insulation`. Each factor is
//! looked up independently:
//!
//! - temperature: exact ambient key, else the nearest tabulated ambient
//! - grouping: table chosen by cable arrangement (and spacing, for spaced
//!   single-core runs), keyed by circuit count; a missing key counts as 1.00
//! - insulation: a single factor applied when the run passes through
//!   thermal insulation
//!
//! The canonical tables are XLPE-insulated LV copper values at a 30 °C
//! reference ambient.
//!
//! Buried runs can instead use the K-factor method, `K1 × K2 × K3 × K4`:
//! burial depth, soil temperature `√((θmax − θsoil) / (θmax − 20))`, soil
//! thermal resistivity `√(1.5 / ρ)` and a fixed grouping factor.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::cable::InstallationMethod;
use crate::diagnostics::{category, Diagnostics};
use crate::units::{Celsius, Meters};

/// Factor applied when a cable is enclosed in thermal insulation.
pub const THERMAL_INSULATION_FACTOR: f64 = 0.50;

/// How the circuits of a group are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arrangement {
    /// Multiple circuits bunched in a conduit or trunking
    #[default]
    Conduit,
    /// Single-core cables touching in trefoil
    TouchingTrefoil,
    /// Single-core cables touching, laid flat
    LaidFlat,
    /// Single-core cables with clear spacing between circuits
    Spaced,
}

impl std::str::FromStr for Arrangement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "conduit" | "grouping_conduit" => Ok(Arrangement::Conduit),
            "touching_trefoil" | "trefoil" => Ok(Arrangement::TouchingTrefoil),
            "laid_flat" | "flat" => Ok(Arrangement::LaidFlat),
            "spaced" => Ok(Arrangement::Spaced),
            other => Err(format!("unknown cable arrangement '{}'", other)),
        }
    }
}

/// Which grouping table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingTable {
    GroupingConduit,
    TouchingTrefoil,
    LaidFlat,
    Spacing015,
    Spacing030,
    Spacing045,
    Spacing060,
}

impl GroupingTable {
    /// Spacing thresholds are inclusive: 0.15 m uses the 0.15 m table.
    pub fn for_arrangement(arrangement: Arrangement, spacing: Meters) -> Self {
        match arrangement {
            Arrangement::Conduit => GroupingTable::GroupingConduit,
            Arrangement::TouchingTrefoil => GroupingTable::TouchingTrefoil,
            Arrangement::LaidFlat => GroupingTable::LaidFlat,
            Arrangement::Spaced => {
                let s = spacing.value();
                if s <= 0.15 {
                    GroupingTable::Spacing015
                } else if s <= 0.30 {
                    GroupingTable::Spacing030
                } else if s <= 0.45 {
                    GroupingTable::Spacing045
                } else {
                    GroupingTable::Spacing060
                }
            }
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            GroupingTable::GroupingConduit => "grouping_conduit",
            GroupingTable::TouchingTrefoil => "grouping_single_core_touching_trefoil",
            GroupingTable::LaidFlat => "grouping_single_core_laid_flat",
            GroupingTable::Spacing015 => "grouping_single_core_spacing_015",
            GroupingTable::Spacing030 => "grouping_single_core_spacing_030",
            GroupingTable::Spacing045 => "grouping_single_core_spacing_045",
            GroupingTable::Spacing060 => "grouping_single_core_spacing_060",
        }
    }
}

/// Site and routing inputs for derating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallationConditions {
    pub ambient_temperature: Celsius,
    pub method: InstallationMethod,
    /// Number of loaded circuits in the group
    pub circuits: u32,
    pub arrangement: Arrangement,
    /// Clear spacing between circuits, for [`Arrangement::Spaced`]
    pub spacing: Meters,
    pub thermal_insulation: bool,
}

impl Default for InstallationConditions {
    fn default() -> Self {
        Self {
            ambient_temperature: Celsius(50.0),
            method: InstallationMethod::Air,
            circuits: 1,
            arrangement: Arrangement::Conduit,
            spacing: Meters(0.30),
            thermal_insulation: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Temperature,
    Grouping,
    Insulation,
    Depth,
    SoilResistivity,
}

/// One looked-up factor and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeratingFactor {
    pub kind: FactorKind,
    /// Table and key used, e.g. "ambient_temperature@50"
    pub source: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeratingBreakdown {
    pub temperature: f64,
    pub grouping: f64,
    pub insulation: f64,
    pub total: f64,
    pub factors: Vec<DeratingFactor>,
    pub diagnostics: Diagnostics,
}

impl DeratingBreakdown {
    /// A breakdown with a single, already-composed factor.
    pub fn fixed(total: f64) -> Self {
        Self {
            temperature: total,
            grouping: 1.0,
            insulation: 1.0,
            total,
            factors: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Temperature and grouping tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeratingTables {
    /// (ambient °C, factor), ascending by temperature
    pub temperature: Vec<(f64, f64)>,
    /// grouping table → circuits → factor
    pub grouping: BTreeMap<GroupingTable, BTreeMap<u32, f64>>,
    pub thermal_insulation: f64,
}

static CANONICAL: Lazy<DeratingTables> = Lazy::new(|| {
    let temperature = vec![
        (10.0, 1.15),
        (15.0, 1.12),
        (20.0, 1.08),
        (25.0, 1.04),
        (30.0, 1.00),
        (35.0, 0.96),
        (40.0, 0.91),
        (45.0, 0.87),
        (50.0, 0.82),
        (55.0, 0.76),
    ];

    let table = |rows: &[(u32, f64)]| rows.iter().copied().collect::<BTreeMap<u32, f64>>();
    let mut grouping = BTreeMap::new();
    grouping.insert(
        GroupingTable::GroupingConduit,
        table(&[(1, 1.00), (2, 0.80), (3, 0.70), (4, 0.65)]),
    );
    grouping.insert(
        GroupingTable::TouchingTrefoil,
        table(&[(2, 0.78), (3, 0.66), (4, 0.61), (5, 0.56), (6, 0.53)]),
    );
    grouping.insert(
        GroupingTable::LaidFlat,
        table(&[(2, 0.81), (3, 0.70), (4, 0.64)]),
    );
    grouping.insert(GroupingTable::Spacing015, table(&[(2, 0.83)]));
    grouping.insert(
        GroupingTable::Spacing030,
        table(&[(2, 0.88), (3, 0.79), (4, 0.73)]),
    );
    grouping.insert(GroupingTable::Spacing045, table(&[(2, 0.91)]));
    grouping.insert(GroupingTable::Spacing060, table(&[(2, 0.93)]));

    DeratingTables {
        temperature,
        grouping,
        thermal_insulation: THERMAL_INSULATION_FACTOR,
    }
});

impl DeratingTables {
    /// Built-in tables shared by every calculation.
    pub fn canonical() -> &'static DeratingTables {
        &CANONICAL
    }

    /// Exact match, else nearest tabulated ambient. Ties go to the cooler
    /// entry; an empty table yields 1.00.
    pub fn temperature_factor(&self, ambient: Celsius) -> DeratingFactor {
        let t = ambient.value();
        let nearest = self
            .temperature
            .iter()
            .copied()
            .fold(None::<(f64, f64)>, |best, row| match best {
                Some(b) if (b.0 - t).abs() <= (row.0 - t).abs() => Some(b),
                _ => Some(row),
            });
        match nearest {
            Some((key, value)) => DeratingFactor {
                kind: FactorKind::Temperature,
                source: format!("ambient_temperature@{}", key),
                value,
            },
            None => DeratingFactor {
                kind: FactorKind::Temperature,
                source: "ambient_temperature@default".to_string(),
                value: 1.0,
            },
        }
    }

    /// Grouping factor for `circuits` loaded circuits. `None` when the table
    /// has no entry for that count.
    pub fn grouping_factor(
        &self,
        arrangement: Arrangement,
        spacing: Meters,
        circuits: u32,
    ) -> (GroupingTable, Option<f64>) {
        let table = GroupingTable::for_arrangement(arrangement, spacing);
        if circuits <= 1 {
            return (table, Some(1.0));
        }
        let value = self
            .grouping
            .get(&table)
            .and_then(|rows| rows.get(&circuits))
            .copied();
        (table, value)
    }

    pub fn insulation_factor(&self, thermal_insulation: bool) -> f64 {
        if thermal_insulation {
            self.thermal_insulation
        } else {
            1.0
        }
    }

    /// Compose all three factors for an installation.
    pub fn derate(&self, conditions: &InstallationConditions) -> DeratingBreakdown {
        let mut diagnostics = Diagnostics::new();
        let temperature = self.temperature_factor(conditions.ambient_temperature);

        let (table, grouping_value) =
            self.grouping_factor(conditions.arrangement, conditions.spacing, conditions.circuits);
        let grouping = grouping_value.unwrap_or_else(|| {
            diagnostics.add_warning(
                category::DERATING,
                &format!(
                    "No {} factor for {} circuits; grouping factor taken as 1.00",
                    table.key(),
                    conditions.circuits
                ),
            );
            1.0
        });

        let insulation = self.insulation_factor(conditions.thermal_insulation);
        let total = temperature.value * grouping * insulation;
        debug!(
            temperature = temperature.value,
            grouping,
            insulation,
            total,
            "derating factors composed"
        );

        let mut factors = vec![
            temperature.clone(),
            DeratingFactor {
                kind: FactorKind::Grouping,
                source: format!("{}@{}", table.key(), conditions.circuits),
                value: grouping,
            },
        ];
        if conditions.thermal_insulation {
            factors.push(DeratingFactor {
                kind: FactorKind::Insulation,
                source: "thermal_insulation".to_string(),
                value: insulation,
            });
        }

        DeratingBreakdown {
            temperature: temperature.value,
            grouping,
            insulation,
            total,
            factors,
            diagnostics,
        }
    }
}

/// Reference soil temperature for the K2 factor, °C
pub const REFERENCE_SOIL_TEMPERATURE: f64 = 20.0;
/// Reference soil thermal resistivity for the K3 factor, K·m/W
pub const REFERENCE_SOIL_RESISTIVITY: f64 = 1.5;
/// Maximum conductor temperature of XLPE insulation, °C
pub const XLPE_MAX_TEMPERATURE: f64 = 90.0;

/// Trench conditions of a buried run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurialConditions {
    pub depth: Meters,
    pub soil_temperature: Celsius,
    /// Soil thermal resistivity, K·m/W
    pub soil_thermal_resistivity: f64,
    /// K4 for the cable formation, e.g. 0.85 for trefoil at 30 cm spacing
    pub grouping_factor: f64,
}

impl Default for BurialConditions {
    fn default() -> Self {
        Self {
            depth: Meters(0.7),
            soil_temperature: Celsius(40.0),
            soil_thermal_resistivity: REFERENCE_SOIL_RESISTIVITY,
            grouping_factor: 0.85,
        }
    }
}

/// The four factors of the buried-cable method and their product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KFactors {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
    pub total: f64,
}

/// K1: shallow burial dissipates heat better than the 0.7 m reference.
pub fn depth_factor(depth: Meters) -> f64 {
    let d = depth.value();
    if d <= 0.5 {
        1.10
    } else if d <= 0.7 {
        1.00
    } else if d <= 1.0 {
        0.95
    } else if d <= 1.5 {
        0.90
    } else {
        0.85
    }
}

impl BurialConditions {
    /// Factors for a conductor rated to `conductor_max_temperature`.
    ///
    /// A soil at or above the conductor rating, or a non-positive soil
    /// resistivity, gives a zero factor and an error diagnostic.
    pub fn k_factors(&self, conductor_max_temperature: Celsius) -> (KFactors, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let k1 = depth_factor(self.depth);

        let headroom = conductor_max_temperature.value() - self.soil_temperature.value();
        let span = conductor_max_temperature.value() - REFERENCE_SOIL_TEMPERATURE;
        let k2 = if headroom > 0.0 && span > 0.0 {
            (headroom / span).sqrt()
        } else {
            diagnostics.add_error(
                category::DERATING,
                &format!(
                    "Soil temperature {} leaves no headroom below the {} conductor rating",
                    self.soil_temperature, conductor_max_temperature
                ),
            );
            0.0
        };

        let rho = self.soil_thermal_resistivity;
        let k3 = if rho > 0.0 && rho.is_finite() {
            (REFERENCE_SOIL_RESISTIVITY / rho).sqrt()
        } else {
            diagnostics.add_error(
                category::DERATING,
                &format!("Soil thermal resistivity must be positive (got {})", rho),
            );
            0.0
        };

        let k4 = self.grouping_factor;
        let factors = KFactors {
            k1,
            k2,
            k3,
            k4,
            total: k1 * k2 * k3 * k4,
        };
        debug!(k1, k2, k3, k4, total = factors.total, "burial factors composed");
        (factors, diagnostics)
    }

    /// The K-factor product as a [`DeratingBreakdown`]: K2 reports as the
    /// temperature factor and K4 as the grouping factor.
    pub fn derate(&self, conductor_max_temperature: Celsius) -> DeratingBreakdown {
        let (k, diagnostics) = self.k_factors(conductor_max_temperature);
        let factor = |kind, source: String, value| DeratingFactor {
            kind,
            source,
            value,
        };
        DeratingBreakdown {
            temperature: k.k2,
            grouping: k.k4,
            insulation: 1.0,
            total: k.total,
            factors: vec![
                factor(FactorKind::Depth, format!("burial_depth@{}", self.depth.value()), k.k1),
                factor(
                    FactorKind::Temperature,
                    format!("soil_temperature@{}", self.soil_temperature.value()),
                    k.k2,
                ),
                factor(
                    FactorKind::SoilResistivity,
                    format!("soil_resistivity@{}", self.soil_thermal_resistivity),
                    k.k3,
                ),
                factor(FactorKind::Grouping, "burial_grouping".to_string(), k.k4),
            ],
            diagnostics,
        }
    }
}

/// Shorthand for [`DeratingTables::derate`] on the canonical tables.
pub fn derate(conditions: &InstallationConditions) -> DeratingBreakdown {
    DeratingTables::canonical().derate(conditions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_temperature_key() {
        let f = DeratingTables::canonical().temperature_factor(Celsius(50.0));
        assert_eq!(f.value, 0.82);
        assert_eq!(f.source, "ambient_temperature@50");
    }

    #[test]
    fn nearest_temperature_key() {
        let tables = DeratingTables::canonical();
        assert_eq!(tables.temperature_factor(Celsius(48.0)).value, 0.82);
        assert_eq!(tables.temperature_factor(Celsius(70.0)).value, 0.76);
        assert_eq!(tables.temperature_factor(Celsius(-5.0)).value, 1.15);
        // 42.5 is equidistant from 40 and 45: cooler entry wins
        assert_eq!(tables.temperature_factor(Celsius(42.5)).value, 0.91);
    }

    #[test]
    fn spacing_selects_table() {
        assert_eq!(
            GroupingTable::for_arrangement(Arrangement::Spaced, Meters(0.15)),
            GroupingTable::Spacing015
        );
        assert_eq!(
            GroupingTable::for_arrangement(Arrangement::Spaced, Meters(0.2)),
            GroupingTable::Spacing030
        );
        assert_eq!(
            GroupingTable::for_arrangement(Arrangement::Spaced, Meters(0.45)),
            GroupingTable::Spacing045
        );
        assert_eq!(
            GroupingTable::for_arrangement(Arrangement::Spaced, Meters(1.0)),
            GroupingTable::Spacing060
        );
    }

    #[test]
    fn composed_total() {
        let conditions = InstallationConditions {
            ambient_temperature: Celsius(40.0),
            circuits: 3,
            arrangement: Arrangement::TouchingTrefoil,
            thermal_insulation: true,
            ..Default::default()
        };
        let breakdown = derate(&conditions);

        assert_eq!(breakdown.temperature, 0.91);
        assert_eq!(breakdown.grouping, 0.66);
        assert_eq!(breakdown.insulation, 0.50);
        assert!((breakdown.total - 0.91 * 0.66 * 0.50).abs() < 1e-12);
        assert_eq!(breakdown.factors.len(), 3);
        assert!(!breakdown.diagnostics.has_issues());
    }

    #[test]
    fn missing_grouping_key_defaults_to_one() {
        let conditions = InstallationConditions {
            circuits: 9,
            arrangement: Arrangement::LaidFlat,
            ..Default::default()
        };
        let breakdown = derate(&conditions);

        assert_eq!(breakdown.grouping, 1.0);
        assert!(breakdown
            .diagnostics
            .mentions("No grouping_single_core_laid_flat factor for 9 circuits"));
    }

    #[test]
    fn single_circuit_is_not_grouped() {
        let breakdown = derate(&InstallationConditions {
            arrangement: Arrangement::TouchingTrefoil,
            ..Default::default()
        });
        assert_eq!(breakdown.grouping, 1.0);
        assert_eq!(breakdown.total, 0.82);
    }

    #[test]
    fn reference_trench_k_factors() {
        let (k, diagnostics) = BurialConditions::default().k_factors(Celsius(XLPE_MAX_TEMPERATURE));
        assert_eq!(k.k1, 1.0);
        // √((90 − 40) / (90 − 20)) = √(5/7)
        assert!((k.k2 - (50.0f64 / 70.0).sqrt()).abs() < 1e-12);
        assert_eq!(k.k3, 1.0);
        assert!((k.total - 0.845_154_254_7 * 0.85).abs() < 1e-9);
        assert!(!diagnostics.has_issues());
    }

    #[test]
    fn depth_bands() {
        assert_eq!(depth_factor(Meters(0.5)), 1.10);
        assert_eq!(depth_factor(Meters(0.7)), 1.00);
        assert_eq!(depth_factor(Meters(0.9)), 0.95);
        assert_eq!(depth_factor(Meters(1.5)), 0.90);
        assert_eq!(depth_factor(Meters(2.0)), 0.85);
    }

    #[test]
    fn drier_soil_derates_more() {
        let dry = BurialConditions {
            soil_thermal_resistivity: 2.5,
            ..Default::default()
        };
        let (k, _) = dry.k_factors(Celsius(90.0));
        assert!((k.k3 - (1.5f64 / 2.5).sqrt()).abs() < 1e-12);
        assert!(k.k3 < 1.0);
    }

    #[test]
    fn hot_soil_zeroes_the_factor() {
        let hot = BurialConditions {
            soil_temperature: Celsius(95.0),
            ..Default::default()
        };
        let breakdown = hot.derate(Celsius(90.0));
        assert_eq!(breakdown.total, 0.0);
        assert!(breakdown.diagnostics.mentions("no headroom"));

        let (k, diagnostics) = BurialConditions {
            soil_thermal_resistivity: 0.0,
            ..Default::default()
        }
        .k_factors(Celsius(90.0));
        assert_eq!(k.k3, 0.0);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn burial_breakdown_lists_every_factor() {
        let breakdown = BurialConditions::default().derate(Celsius(90.0));
        assert_eq!(breakdown.factors.len(), 4);
        assert_eq!(breakdown.grouping, 0.85);
        assert_eq!(breakdown.insulation, 1.0);
    }

    #[test]
    fn arrangement_from_str() {
        assert_eq!("trefoil".parse::<Arrangement>(), Ok(Arrangement::TouchingTrefoil));
        assert_eq!("laid-flat".parse::<Arrangement>(), Ok(Arrangement::LaidFlat));
        assert!("stacked".parse::<Arrangement>().is_err());
    }
}
