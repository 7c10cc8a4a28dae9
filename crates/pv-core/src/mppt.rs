//! Assigning strings to MPPT inputs.
//!
//! Design rules for a single MPPT channel:
//! - every string shares one orientation (tilt and azimuth within tolerance)
//! - every string has the same module count
//! - the summed short-circuit current stays within the channel's share of
//!   the inverter's DC current limit
//! - string count stays within the channel's input count

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diagnostics::{category, Diagnostics};
use crate::equipment::{InverterElectricalSpec, ModuleElectricalSpec};
use crate::policy::DesignPolicy;
use crate::units::{Amperes, Watts};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Degrees from horizontal
    pub tilt: f64,
    /// Degrees from north, clockwise
    pub azimuth: f64,
}

impl Orientation {
    pub fn new(tilt: f64, azimuth: f64) -> Self {
        Self { tilt, azimuth }
    }

    pub fn compatible_with(&self, other: &Orientation, tolerance_deg: f64) -> bool {
        (self.tilt - other.tilt).abs() <= tolerance_deg
            && (self.azimuth - other.azimuth).abs() <= tolerance_deg
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tilt {}°, azimuth {}°", self.tilt, self.azimuth)
    }
}

/// Identical strings from one sub-array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringGroup {
    pub name: String,
    pub strings: u32,
    pub modules_per_string: u32,
    #[serde(default)]
    pub orientation: Orientation,
}

/// Strings landed on one MPPT channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpptAssignment {
    #[serde(default)]
    pub inverter: usize,
    pub mppt: usize,
    pub groups: Vec<StringGroup>,
}

impl MpptAssignment {
    pub fn new(inverter: usize, mppt: usize) -> Self {
        Self {
            inverter,
            mppt,
            groups: Vec::new(),
        }
    }

    pub fn label(&self) -> String {
        format!("Inverter {} MPPT {}", self.inverter + 1, self.mppt + 1)
    }

    pub fn total_strings(&self) -> u32 {
        self.groups.iter().map(|g| g.strings).sum()
    }

    fn orientation(&self) -> Option<Orientation> {
        self.groups.first().map(|g| g.orientation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpptReport {
    pub label: String,
    pub strings: u32,
    pub total_current: Amperes,
    pub current_limit: Amperes,
    pub total_power: Watts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentReport {
    pub mppts: Vec<MpptReport>,
    pub utilized_mppts: usize,
    pub total_mppts: usize,
    pub utilization_percent: f64,
    pub diagnostics: Diagnostics,
}

/// Check a set of MPPT assignments across `inverter_count` identical inverters.
pub fn validate_mppt_assignments(
    assignments: &[MpptAssignment],
    module: &ModuleElectricalSpec,
    inverter: &InverterElectricalSpec,
    inverter_count: usize,
    policy: &DesignPolicy,
) -> AssignmentReport {
    let mut diagnostics = Diagnostics::new();
    let current_limit = inverter.current_limit_per_mppt();
    let mut mppts = Vec::with_capacity(assignments.len());

    for assignment in assignments {
        let label = assignment.label();
        let mut local = Diagnostics::new();

        if assignment.inverter >= inverter_count
            || assignment.mppt >= inverter.mppt_count as usize
        {
            local.add_error(
                category::MPPT,
                "Assignment refers to an MPPT input that does not exist",
            );
        }

        if let Some(reference) = assignment.orientation() {
            for group in assignment.groups.iter().skip(1) {
                if !group
                    .orientation
                    .compatible_with(&reference, policy.orientation_tolerance_deg)
                {
                    local.add_error_with_entity(
                        category::MPPT,
                        &format!(
                            "Orientation mismatch: {} vs {} (tolerance ±{}°)",
                            group.orientation, reference, policy.orientation_tolerance_deg
                        ),
                        &group.name,
                    );
                }
            }
        }

        if let Some(first) = assignment.groups.first() {
            for group in assignment.groups.iter().skip(1) {
                if group.modules_per_string != first.modules_per_string {
                    local.add_warning_with_entity(
                        category::MPPT,
                        &format!(
                            "String mismatch: {} modules/string vs {} modules/string",
                            group.modules_per_string, first.modules_per_string
                        ),
                        &group.name,
                    );
                }
            }
        }

        let strings = assignment.total_strings();
        let total_current = module.isc * f64::from(strings);
        if total_current > current_limit {
            local.add_error(
                category::MPPT,
                &format!(
                    "Current limit exceeded: {:.1}A on an MPPT limited to {:.0}A",
                    total_current.value(),
                    current_limit.value()
                ),
            );
        }
        if strings > inverter.strings_per_mppt {
            local.add_error(
                category::MPPT,
                &format!(
                    "{} strings exceed the {} string inputs of this MPPT",
                    strings, inverter.strings_per_mppt
                ),
            );
        }

        let total_power: Watts = assignment
            .groups
            .iter()
            .map(|g| module.power * f64::from(g.strings) * f64::from(g.modules_per_string))
            .sum();

        diagnostics.merge_with_entity(local, &label);
        mppts.push(MpptReport {
            label,
            strings,
            total_current,
            current_limit,
            total_power,
        });
    }

    let total_mppts = inverter_count * inverter.mppt_count as usize;
    let utilized_mppts = assignments
        .iter()
        .filter(|a| a.total_strings() > 0)
        .map(|a| (a.inverter, a.mppt))
        .collect::<std::collections::BTreeSet<_>>()
        .len();
    let utilization_percent = if total_mppts == 0 {
        0.0
    } else {
        utilized_mppts as f64 / total_mppts as f64 * 100.0
    };
    if utilization_percent < policy.mppt_utilization_min_percent {
        diagnostics.add_warning(
            category::MPPT,
            &format!(
                "MPPT utilization {:.1}% ({}/{}) is below {}%; consider redistributing strings",
                utilization_percent, utilized_mppts, total_mppts, policy.mppt_utilization_min_percent
            ),
        );
    }

    AssignmentReport {
        mppts,
        utilized_mppts,
        total_mppts,
        utilization_percent,
        diagnostics,
    }
}

/// Result of [`auto_assign_strings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoAssignment {
    pub assignments: Vec<MpptAssignment>,
    pub unassigned_strings: u32,
    pub report: AssignmentReport,
}

/// Spread string groups over every MPPT of `inverter_count` inverters.
///
/// Groups are taken in order of first appearance of their orientation. A
/// round-robin pointer walks the MPPT inventory, handing each channel
/// `min(remaining, available, max(1, remaining / channels_left))` strings,
/// and wraps while compatible capacity remains. A channel only accepts
/// strings matching the orientation it already carries.
pub fn auto_assign_strings(
    groups: &[StringGroup],
    module: &ModuleElectricalSpec,
    inverter: &InverterElectricalSpec,
    inverter_count: usize,
    policy: &DesignPolicy,
) -> AutoAssignment {
    let mut slots: Vec<MpptAssignment> = (0..inverter_count)
        .flat_map(|inv| (0..inverter.mppt_count as usize).map(move |m| MpptAssignment::new(inv, m)))
        .collect();
    let capacity = inverter.strings_per_mppt;
    let tolerance = policy.orientation_tolerance_deg;

    let mut ordered: Vec<&StringGroup> = Vec::with_capacity(groups.len());
    for group in groups {
        if ordered.iter().any(|g| g.orientation == group.orientation) {
            continue;
        }
        ordered.extend(groups.iter().filter(|g| g.orientation == group.orientation));
    }

    let accepts = |slot: &MpptAssignment, group: &StringGroup| {
        slot.total_strings() < capacity
            && slot
                .orientation()
                .map_or(true, |o| o.compatible_with(&group.orientation, tolerance))
    };

    let mut pointer = 0usize;
    let mut unassigned = 0u32;
    for group in ordered {
        let mut remaining = group.strings;
        if pointer >= slots.len() {
            pointer = 0;
        }
        let slot_count = slots.len();
        while remaining > 0 && pointer < slot_count {
            let slot = &mut slots[pointer];
            if accepts(slot, group) {
                let available = capacity - slot.total_strings();
                let channels_left = (slot_count - pointer).max(1) as u32;
                let share = (remaining / channels_left).max(1);
                let assign = remaining.min(available).min(share);
                debug!(group = %group.name, slot = %slot.label(), assign, "assigning strings");
                slot.groups.push(StringGroup {
                    strings: assign,
                    ..group.clone()
                });
                remaining -= assign;
            }
            pointer += 1;

            if pointer >= slot_count && remaining > 0 {
                pointer = 0;
                if !slots.iter().any(|s| accepts(s, group)) {
                    break;
                }
            }
        }
        if remaining > 0 {
            info!(group = %group.name, remaining, "strings could not be assigned");
        }
        unassigned += remaining;
    }

    let assignments: Vec<MpptAssignment> = slots.into_iter().filter(|s| !s.groups.is_empty()).collect();
    let mut report = validate_mppt_assignments(&assignments, module, inverter, inverter_count, policy);
    if unassigned > 0 {
        report.diagnostics.add_error(
            category::MPPT,
            &format!("{} strings could not be assigned (all MPPTs at capacity)", unassigned),
        );
    }

    AutoAssignment {
        assignments,
        unassigned_strings: unassigned,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inverter() -> InverterElectricalSpec {
        InverterElectricalSpec {
            max_dc_current: Amperes(60.0),
            mppt_count: 2,
            strings_per_mppt: 2,
            ..Default::default()
        }
    }

    fn group(name: &str, strings: u32, tilt: f64, azimuth: f64) -> StringGroup {
        StringGroup {
            name: name.to_string(),
            strings,
            modules_per_string: 17,
            orientation: Orientation::new(tilt, azimuth),
        }
    }

    #[test]
    fn orientation_tolerance_is_inclusive() {
        let a = Orientation::new(20.0, 180.0);
        assert!(a.compatible_with(&Orientation::new(25.0, 175.0), 5.0));
        assert!(!a.compatible_with(&Orientation::new(26.0, 180.0), 5.0));
    }

    #[test]
    fn validation_flags_mixed_orientation_and_lengths() {
        let mut assignment = MpptAssignment::new(0, 0);
        assignment.groups.push(group("roof-south", 1, 20.0, 180.0));
        let mut east = group("roof-east", 1, 20.0, 90.0);
        east.modules_per_string = 16;
        assignment.groups.push(east);

        let report = validate_mppt_assignments(
            &[assignment],
            &ModuleElectricalSpec::default(),
            &inverter(),
            1,
            &DesignPolicy::default(),
        );

        assert!(report.diagnostics.mentions("Orientation mismatch"));
        assert!(report.diagnostics.mentions("String mismatch"));
        // one of two MPPTs in use
        assert_eq!(report.utilized_mppts, 1);
        assert!(report.diagnostics.mentions("MPPT utilization 50.0%"));
    }

    #[test]
    fn validation_flags_over_current() {
        let mut assignment = MpptAssignment::new(0, 0);
        assignment.groups.push(group("a", 2, 20.0, 180.0));
        let inverter = InverterElectricalSpec {
            max_dc_current: Amperes(30.0),
            ..inverter()
        };

        let report = validate_mppt_assignments(
            &[assignment],
            &ModuleElectricalSpec::default(),
            &inverter,
            1,
            &DesignPolicy::default(),
        );
        // 2 × 11.5 = 23 A on a 15 A channel
        assert!(report.diagnostics.mentions("Current limit exceeded: 23.0A"));
        assert_eq!(report.mppts[0].current_limit, Amperes(15.0));
    }

    #[test]
    fn auto_assign_spreads_over_all_mppts() {
        let result = auto_assign_strings(
            &[group("a", 4, 20.0, 180.0)],
            &ModuleElectricalSpec::default(),
            &inverter(),
            2,
            &DesignPolicy::default(),
        );

        // 4 strings over 4 MPPTs: 4/4 = 1, 3/3 = 1, 2/2 = 1, 1/1 = 1
        assert_eq!(result.unassigned_strings, 0);
        assert_eq!(result.assignments.len(), 4);
        assert!(result.assignments.iter().all(|a| a.total_strings() == 1));
        assert_eq!(result.report.utilization_percent, 100.0);
    }

    #[test]
    fn auto_assign_reports_overflow() {
        let result = auto_assign_strings(
            &[group("a", 6, 20.0, 180.0)],
            &ModuleElectricalSpec::default(),
            &inverter(),
            1,
            &DesignPolicy::default(),
        );

        assert_eq!(result.unassigned_strings, 2);
        assert!(result.report.diagnostics.mentions("2 strings could not be assigned"));
    }

    #[test]
    fn auto_assign_keeps_orientations_apart() {
        let result = auto_assign_strings(
            &[group("south", 2, 20.0, 180.0), group("east", 2, 20.0, 90.0)],
            &ModuleElectricalSpec::default(),
            &inverter(),
            1,
            &DesignPolicy::default(),
        );

        // south lands on both channels, so east has no compatible input
        assert_eq!(result.unassigned_strings, 2);
        for assignment in &result.assignments {
            let first = assignment.groups[0].orientation;
            assert!(assignment.groups.iter().all(|g| g.orientation == first));
        }
        assert!(!result.report.diagnostics.mentions("Orientation mismatch"));
    }

    #[test]
    fn validation_flags_too_many_strings_per_mppt() {
        let mut assignment = MpptAssignment::new(0, 0);
        assignment.groups.push(group("a", 3, 20.0, 180.0));
        let inverter = InverterElectricalSpec {
            max_dc_current: Amperes(200.0),
            ..inverter()
        };

        let report = validate_mppt_assignments(
            &[assignment],
            &ModuleElectricalSpec::default(),
            &inverter,
            1,
            &DesignPolicy::default(),
        );
        assert!(report
            .diagnostics
            .mentions("3 strings exceed the 2 string inputs of this MPPT"));
        assert!(report.diagnostics.has_errors());
    }

    #[test]
    fn validation_flags_missing_mppt_input() {
        let on_missing_mppt = MpptAssignment {
            groups: vec![group("a", 1, 20.0, 180.0)],
            ..MpptAssignment::new(0, 2)
        };
        let on_missing_inverter = MpptAssignment {
            groups: vec![group("b", 1, 20.0, 180.0)],
            ..MpptAssignment::new(1, 0)
        };

        let report = validate_mppt_assignments(
            &[on_missing_mppt, on_missing_inverter],
            &ModuleElectricalSpec::default(),
            &inverter(),
            1,
            &DesignPolicy::default(),
        );
        let missing = report
            .diagnostics
            .issues
            .iter()
            .filter(|i| i.message.contains("MPPT input that does not exist"))
            .count();
        assert_eq!(missing, 2);
    }

    #[test]
    fn total_power_handles_large_groups() {
        let mut assignment = MpptAssignment::new(0, 0);
        let mut big = group("a", 70_000, 20.0, 180.0);
        big.modules_per_string = 70_000;
        assignment.groups.push(big);
        let module = ModuleElectricalSpec {
            power: Watts(1.0),
            ..Default::default()
        };

        let report =
            validate_mppt_assignments(&[assignment], &module, &inverter(), 1, &DesignPolicy::default());
        assert_eq!(report.mppts[0].total_power, Watts(4.9e9));
    }
}
