//! Cable catalog and ampacity-based selection.
//!
//! Operating current is multiplied by the continuous-current safety factor
//! to get the design current. A cable is suitable when its base ampacity for
//! the installation method, times the total derating factor, covers the
//! design current, or the current per parallel run when several runs share
//! the load.

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::derating::DeratingBreakdown;
use crate::diagnostics::{category, Diagnostics};
use crate::units::{Amperes, OhmsPerKm, SquareMillimeters};
use crate::{PvError, PvResult};

/// Conductor metal. Files may spell it `Copper`, `cu`, `Aluminium`, `AL`, ...
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConductorMaterial {
    #[default]
    Copper,
    Aluminum,
}

impl ConductorMaterial {
    /// Resistivity at 20 °C in Ω·mm²/m
    pub fn resistivity(&self) -> f64 {
        match self {
            ConductorMaterial::Copper => 0.0175,
            ConductorMaterial::Aluminum => 0.0282,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ConductorMaterial::Copper => "Cu",
            ConductorMaterial::Aluminum => "Al",
        }
    }
}

impl std::str::FromStr for ConductorMaterial {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "copper" | "cu" => Ok(ConductorMaterial::Copper),
            "aluminum" | "aluminium" | "al" => Ok(ConductorMaterial::Aluminum),
            other => Err(format!("unknown conductor material '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for ConductorMaterial {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: String = Deserialize::deserialize(deserializer)?;
        raw.trim().parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationMethod {
    #[default]
    Air,
    Conduit,
    BuriedConduit,
    DirectBurial,
}

impl std::str::FromStr for InstallationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "air" | "free_air" => Ok(InstallationMethod::Air),
            "conduit" => Ok(InstallationMethod::Conduit),
            "buried_conduit" | "buried" => Ok(InstallationMethod::BuriedConduit),
            "direct_burial" | "direct" => Ok(InstallationMethod::DirectBurial),
            other => Err(format!("unknown installation method '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for InstallationMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: String = Deserialize::deserialize(deserializer)?;
        raw.trim().parse().map_err(serde::de::Error::custom)
    }
}

/// Base ampacity for each installation method, in amperes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ampacity {
    pub air: f64,
    pub conduit: f64,
    pub buried_conduit: f64,
    pub direct_burial: f64,
}

impl Ampacity {
    pub fn for_method(&self, method: InstallationMethod) -> Amperes {
        Amperes(match method {
            InstallationMethod::Air => self.air,
            InstallationMethod::Conduit => self.conduit,
            InstallationMethod::BuriedConduit => self.buried_conduit,
            InstallationMethod::DirectBurial => self.direct_burial,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CableSpec {
    pub cross_section: SquareMillimeters,
    pub material: ConductorMaterial,
    pub ampacity: Ampacity,
    pub resistance: OhmsPerKm,
}

impl CableSpec {
    pub fn label(&self) -> String {
        format!("{} mm² {}", self.cross_section.value(), self.material.symbol())
    }
}

const fn cable(
    mm2: f64,
    material: ConductorMaterial,
    air: f64,
    conduit: f64,
    buried_conduit: f64,
    direct_burial: f64,
    ohm_per_km: f64,
) -> CableSpec {
    CableSpec {
        cross_section: SquareMillimeters(mm2),
        material,
        ampacity: Ampacity {
            air,
            conduit,
            buried_conduit,
            direct_burial,
        },
        resistance: OhmsPerKm(ohm_per_km),
    }
}

static BUILTIN: Lazy<Vec<CableSpec>> = Lazy::new(|| {
    use ConductorMaterial::{Aluminum as Al, Copper as Cu};
    vec![
        cable(4.0, Cu, 40.0, 34.0, 38.0, 42.0, 4.61),
        cable(6.0, Cu, 51.0, 43.0, 47.0, 53.0, 3.08),
        cable(10.0, Cu, 70.0, 60.0, 63.0, 70.0, 1.84),
        cable(16.0, Cu, 94.0, 80.0, 81.0, 91.0, 1.15),
        cable(25.0, Cu, 125.0, 107.0, 110.0, 125.0, 0.727),
        cable(35.0, Cu, 154.0, 132.0, 135.0, 154.0, 0.524),
        cable(50.0, Cu, 196.0, 168.0, 172.0, 196.0, 0.387),
        cable(70.0, Cu, 251.0, 216.0, 220.0, 251.0, 0.268),
        cable(95.0, Cu, 310.0, 267.0, 272.0, 310.0, 0.193),
        cable(120.0, Cu, 357.0, 308.0, 314.0, 357.0, 0.153),
        cable(4.0, Al, 31.0, 26.0, 29.0, 32.0, 7.41),
        cable(6.0, Al, 39.0, 33.0, 36.0, 41.0, 4.95),
        cable(10.0, Al, 54.0, 46.0, 49.0, 54.0, 2.95),
        cable(16.0, Al, 73.0, 62.0, 63.0, 70.0, 1.85),
        cable(25.0, Al, 97.0, 83.0, 85.0, 97.0, 1.20),
        cable(35.0, Al, 119.0, 102.0, 105.0, 119.0, 0.868),
        cable(50.0, Al, 152.0, 130.0, 133.0, 152.0, 0.641),
        cable(70.0, Al, 196.0, 167.0, 171.0, 196.0, 0.443),
        cable(95.0, Al, 241.0, 207.0, 211.0, 241.0, 0.320),
        cable(120.0, Al, 278.0, 240.0, 245.0, 278.0, 0.253),
    ]
});

/// An in-memory cable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableCatalog {
    pub cables: Vec<CableSpec>,
}

impl CableCatalog {
    pub fn new(cables: Vec<CableSpec>) -> PvResult<Self> {
        if cables.is_empty() {
            return Err(PvError::Catalog("cable table is empty".to_string()));
        }
        if let Some(bad) = cables
            .iter()
            .find(|c| !(c.cross_section.value() > 0.0 && c.resistance.value() > 0.0))
        {
            return Err(PvError::Catalog(format!(
                "cable {} has a non-positive cross-section or resistance",
                bad.label()
            )));
        }
        Ok(Self { cables })
    }

    /// Built-in LV XLPE table, copper and aluminum 4-120 mm².
    pub fn builtin() -> Self {
        Self {
            cables: BUILTIN.clone(),
        }
    }

    /// Cables of one material, ascending by cross-section.
    pub fn by_material(&self, material: ConductorMaterial) -> Vec<CableSpec> {
        let mut cables: Vec<CableSpec> = self
            .cables
            .iter()
            .filter(|c| c.material == material)
            .copied()
            .collect();
        cables.sort_by(|a, b| a.cross_section.0.total_cmp(&b.cross_section.0));
        cables
    }

    pub fn find(&self, material: ConductorMaterial, cross_section: f64) -> Option<&CableSpec> {
        self.cables
            .iter()
            .find(|c| c.material == material && (c.cross_section.value() - cross_section).abs() < 1e-9)
    }
}

impl Default for CableCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// `I × safety_factor`
pub fn design_current(operating: Amperes, safety_factor: f64) -> Amperes {
    operating * safety_factor
}

/// `design / derating`; infinite when the derating factor is not positive.
pub fn required_ampacity(design: Amperes, total_derating: f64) -> Amperes {
    if total_derating > 0.0 && total_derating.is_finite() {
        design / total_derating
    } else {
        Amperes(f64::INFINITY)
    }
}

/// One labeled row of a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableCandidate {
    pub cable: CableSpec,
    pub base_ampacity: Amperes,
    pub derated_ampacity: Amperes,
    pub suitable: bool,
}

/// What a selection is sized against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub material: ConductorMaterial,
    pub method: InstallationMethod,
    pub operating_current: Amperes,
    /// Parallel runs sharing the current; 1 for a single run
    pub runs: u32,
    pub safety_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableSelection {
    pub request: SelectionRequest,
    pub design_current: Amperes,
    /// Design current divided by parallel runs
    pub current_per_run: Amperes,
    /// Current per run divided by total derating
    pub required_ampacity: Amperes,
    pub derating: DeratingBreakdown,
    /// Every cable of the material, ascending by cross-section
    pub candidates: Vec<CableCandidate>,
    /// Smallest suitable cable, if any
    pub recommended: Option<CableSpec>,
    pub diagnostics: Diagnostics,
}

impl CableSelection {
    pub fn suitable(&self) -> impl Iterator<Item = &CableCandidate> {
        self.candidates.iter().filter(|c| c.suitable)
    }

    /// Look up the label of an explicitly chosen size.
    pub fn candidate(&self, cross_section: f64) -> Option<&CableCandidate> {
        self.candidates
            .iter()
            .find(|c| (c.cable.cross_section.value() - cross_section).abs() < 1e-9)
    }
}

/// Label every cable of the requested material and pick the smallest that
/// carries the per-run design current after derating.
pub fn select_cables(
    catalog: &CableCatalog,
    request: SelectionRequest,
    derating: DeratingBreakdown,
) -> CableSelection {
    let design = design_current(request.operating_current, request.safety_factor);
    let current_per_run = if request.runs == 0 {
        Amperes(f64::INFINITY)
    } else {
        design / f64::from(request.runs)
    };
    let required = required_ampacity(current_per_run, derating.total);

    let candidates: Vec<CableCandidate> = catalog
        .by_material(request.material)
        .into_iter()
        .map(|cable| {
            let base = cable.ampacity.for_method(request.method);
            let derated = base * derating.total;
            CableCandidate {
                cable,
                base_ampacity: base,
                derated_ampacity: derated,
                suitable: derated.is_finite() && derated >= current_per_run,
            }
        })
        .collect();

    let recommended = candidates.iter().find(|c| c.suitable).map(|c| c.cable);
    let mut diagnostics = derating.diagnostics.clone();
    if request.runs == 0 {
        diagnostics.add_error(category::CONFIGURATION, "Number of parallel runs must be at least 1");
    }
    if recommended.is_none() {
        diagnostics.add_error(
            category::AMPACITY,
            &format!(
                "No suitable cable: required ampacity {:.1}A exceeds every {} size",
                required.value(),
                request.material.symbol()
            ),
        );
    }
    debug!(
        design = design.value(),
        per_run = current_per_run.value(),
        required = required.value(),
        recommended = ?recommended.map(|c| c.cross_section.value()),
        "cable selection"
    );

    CableSelection {
        request,
        design_current: design,
        current_per_run,
        required_ampacity: required,
        derating,
        candidates,
        recommended,
        diagnostics,
    }
}
